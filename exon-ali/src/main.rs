use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use exon_ali::align::{AlignMode, AlignOpt, SwParams, MAX_HITS_AT_ONCE};
use exon_ali::batch::{Batch, BatchStats};
use exon_ali::index::nt4;
use exon_ali::io::report::ConsoleReport;

#[derive(Parser, Debug)]
#[command(
    name = "exon-ali",
    author,
    version,
    about = "Align cDNA probes to a 2-bit packed genome, crude tiles first then banded SW",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Kind of probe, which sets how far apart its exons may lie
    #[arg(long, value_enum, default_value_t = AlignMode::Cdna)]
    mode: AlignMode,
    /// Hit cap per strand and chromosome
    #[arg(long = "max-hits", default_value_t = MAX_HITS_AT_ONCE)]
    max_hits: usize,
    /// Probes aligned in parallel
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    threads: usize,
    #[arg(long = "band-width", default_value_t = 16)]
    band_width: usize,
    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl RunArgs {
    fn align_opt(&self) -> AlignOpt {
        AlignOpt {
            mode: self.mode,
            max_hits: self.max_hits.max(1),
            threads: self.threads.max(1),
            sw: SwParams { band_width: self.band_width, ..SwParams::default() },
            ..AlignOpt::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align the named probes; console only, the report file is not touched
    Named {
        output: PathBuf,
        fa_file: PathBuf,
        nt_dir: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Align probes listed one per line in a file, appending to the report
    In {
        output: PathBuf,
        list_file: PathBuf,
        fa_file: PathBuf,
        nt_dir: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Align every probe, appending to the report
    All {
        output: PathBuf,
        fa_file: PathBuf,
        nt_dir: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Align from the 1-based probe index on, optionally only `count` probes
    Starting {
        output: PathBuf,
        fa_file: PathBuf,
        nt_dir: PathBuf,
        start_ix: usize,
        count: Option<usize>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Carry on after the last probe with a summary line in the report
    Resume {
        output: PathBuf,
        fa_file: PathBuf,
        nt_dir: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Pack each FASTA record into its own .nt4 file
    Pack {
        fa_file: PathBuf,
        out_dir: PathBuf,
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Named { output: _, fa_file, nt_dir, names, run } => {
            start_run(&run);
            let genomes = nt4::load_dir(&nt_dir)?;
            let batch = Batch::new(&genomes, run.align_opt())?;
            let stats = batch.run_named(&fa_file, &names, &mut ConsoleReport::console())?;
            finish(stats);
        }
        Commands::In { output, list_file, fa_file, nt_dir, run } => {
            start_run(&run);
            let genomes = nt4::load_dir(&nt_dir)?;
            let mut sink = ConsoleReport::append_to(&output)?;
            let batch = Batch::new(&genomes, run.align_opt())?;
            finish(batch.run_list(&list_file, &fa_file, &mut sink)?);
        }
        Commands::All { output, fa_file, nt_dir, run } => {
            start_run(&run);
            let (genomes, mut sink) = open_run(&output, &nt_dir)?;
            let batch = Batch::new(&genomes, run.align_opt())?;
            finish(batch.run_all(&fa_file, &mut sink)?);
        }
        Commands::Starting { output, fa_file, nt_dir, start_ix, count, run } => {
            start_run(&run);
            let (genomes, mut sink) = open_run(&output, &nt_dir)?;
            let batch = Batch::new(&genomes, run.align_opt())?;
            finish(batch.run_starting(&fa_file, start_ix, count, &mut sink)?);
        }
        Commands::Resume { output, fa_file, nt_dir, run } => {
            start_run(&run);
            let (genomes, mut sink) = open_run(&output, &nt_dir)?;
            let batch = Batch::new(&genomes, run.align_opt())?;
            finish(batch.run_resume(&output, &fa_file, &mut sink)?);
        }
        Commands::Pack { fa_file, out_dir, verbose } => {
            init_logging(verbose);
            let n = nt4::pack_fasta(&fa_file, &out_dir)?;
            println!("{} .nt4 files written to {}", n, out_dir.display());
        }
    }
    Ok(())
}

fn start_run(run: &RunArgs) {
    init_logging(run.verbose);
    log::info!("exon-ali started {}", chrono::Local::now().to_rfc3339());
    log::info!("mode {:?}, max hits {}, threads {}, band {}", run.mode, run.max_hits, run.threads, run.band_width);
}

fn open_run(output: &Path, nt_dir: &Path) -> Result<(Vec<nt4::PackedGenome>, ConsoleReport)> {
    let sink = ConsoleReport::append_to(output)?;
    let genomes = nt4::load_dir(nt_dir)?;
    Ok((genomes, sink))
}

fn finish(stats: BatchStats) {
    log::info!("{} probes, {} alignments", stats.probes, stats.alignments);
}
