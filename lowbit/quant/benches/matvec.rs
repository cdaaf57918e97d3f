use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lowbit_quant::QuantizedMatrix;

fn make_weights(rows: usize, cols: usize) -> Vec<f32> {
    (0..rows * cols).map(|i| (i as f32 * 0.013).sin()).collect()
}

fn bench_matvec(c: &mut Criterion) {
    let (rows, cols) = (4096, 4096);
    let w = QuantizedMatrix::from_f32(rows, cols, &make_weights(rows, cols)).unwrap();
    let x: Vec<f32> = (0..cols).map(|i| (i as f32 * 0.01).cos()).collect();

    let mut group = c.benchmark_group("sym_int4_matvec_4096x4096");
    for shards in [1, 2, 4, 8] {
        group.bench_function(format!("shards={}", shards), |b| {
            let mut y = vec![0.0f32; rows];
            b.iter(|| w.matvec(black_box(&x), &mut y, shards))
        });
    }
    group.finish();
}

fn bench_quantize(c: &mut Criterion) {
    let data = make_weights(1024, 1024);
    c.bench_function("quantize_sym_int4_1m", |b| {
        b.iter(|| lowbit_quant::quantize_sym_int4(black_box(&data)).unwrap())
    });
}

criterion_group!(benches, bench_matvec, bench_quantize);
criterion_main!(benches);
