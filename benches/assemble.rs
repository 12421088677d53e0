use asm8080::{assembler, frontend::image};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const SAMPLE: &str = include_str!("../asm/sample.asm");

fn bench_sample(c: &mut Criterion) {
    c.bench_function("assemble sample", |b| {
        b.iter(|| assembler::assemble(black_box(SAMPLE)).unwrap())
    });

    let lines = assembler::assemble(SAMPLE).unwrap();
    c.bench_function("intel hex sample", |b| {
        b.iter(|| image::intel_hex(black_box(&lines)).unwrap())
    });
}

criterion_group!(benches, bench_sample);
criterion_main!(benches);
