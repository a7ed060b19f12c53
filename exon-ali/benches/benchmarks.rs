use criterion::{black_box, criterion_group, criterion_main, Criterion};

use exon_ali::align::sw::{banded_sw_diag, SwBuffer, SwParams};
use exon_ali::align::{lump, scan};
use exon_ali::index::nt4::PackedGenome;
use exon_ali::index::tile::FastProber;

fn make_reference(len: usize) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut seq = Vec::with_capacity(len);
    let mut x: u32 = 42;
    for _ in 0..len {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        seq.push(bases[(x >> 16) as usize % 4]);
    }
    seq
}

fn bench_build_prober(c: &mut Criterion) {
    let reference = make_reference(10_000);
    let probe = &reference[2_000..4_000];

    c.bench_function("build_prober_2kb", |b| {
        b.iter(|| {
            black_box(FastProber::build(black_box(probe)));
        })
    });
}

fn bench_scan(c: &mut Criterion) {
    let reference = make_reference(1_000_000);
    let genome = PackedGenome::from_dna("bench", &reference);
    let prober = FastProber::build(&reference[500_000..502_000]).unwrap();

    c.bench_function("scan_1mb", |b| {
        b.iter(|| {
            black_box(scan::scan(black_box(&prober), black_box(&genome), scan::MAX_HITS_AT_ONCE));
        })
    });
}

fn bench_lump(c: &mut Criterion) {
    let reference = make_reference(200_000);
    let genome = PackedGenome::from_dna("bench", &reference);
    let mut probe = reference[10_000..10_400].to_vec();
    probe.extend_from_slice(&reference[14_000..14_400]);
    probe.extend_from_slice(&reference[21_000..21_400]);
    let prober = FastProber::build(&probe).unwrap();
    let mut hits = scan::scan(&prober, &genome, scan::MAX_HITS_AT_ONCE).hits;
    scan::sort_hits(&mut hits);

    c.bench_function("lump_hits_and_exons", |b| {
        b.iter(|| {
            let mut exons = lump::lump_hits(black_box(&hits));
            lump::sort_exons(&mut exons);
            black_box(lump::lump_exons(&exons, 0, false, lump::LumpParams::default()));
        })
    });
}

fn bench_banded_sw(c: &mut Criterion) {
    let query = make_reference(100);
    let mut ref_seq = make_reference(140);
    ref_seq[20..120].copy_from_slice(&query);
    ref_seq[70] = b'N'; // introduce mismatch
    let params = SwParams::default();
    let mut buf = SwBuffer::new();

    c.bench_function("banded_sw_100bp", |b| {
        b.iter(|| {
            black_box(banded_sw_diag(black_box(&query), black_box(&ref_seq), 20, params, &mut buf));
        })
    });
}

criterion_group!(benches, bench_build_prober, bench_scan, bench_lump, bench_banded_sw);
criterion_main!(benches);
