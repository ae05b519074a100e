use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pir::{
    attribute::builtin::{Int32Attribute, Int64Attribute},
    dialect::builtin::{GetParameterOp, SetParameterOp},
    prelude::*,
    types::builtin::Float32Type,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn bench_interning(c: &mut Criterion) {
    let ctx = IrContext::new();
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);
    let keys: Vec<i64> = (0..1024).map(|_| rng.random_range(0..256)).collect();

    c.bench_function("intern int64 (mostly hits)", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(Int64Attribute::get(&ctx, *key));
            }
        })
    });

    c.bench_function("intern int32 (fresh context)", |b| {
        b.iter(|| {
            let ctx = IrContext::new();
            for key in 0..256 {
                black_box(Int32Attribute::get(&ctx, key));
            }
        })
    });
}

fn bench_operations(c: &mut Criterion) {
    let ctx = IrContext::new();
    let producer = GetParameterOp::build(&ctx, "w", Float32Type::get(&ctx)).unwrap();

    c.bench_function("create/destroy set_parameter", |b| {
        b.iter(|| {
            let op = SetParameterOp::build(&ctx, "w_out", producer.result()).unwrap();
            unsafe { black_box(op.operation()).destroy() };
        })
    });

    c.bench_function("program of 256 operations", |b| {
        b.iter(|| {
            let mut program = Program::new(&ctx);
            let get = GetParameterOp::build(&ctx, "x", Float32Type::get(&ctx)).unwrap();
            program.as_mut().push_back(get.operation());
            for _ in 0..255 {
                let set = SetParameterOp::build(&ctx, "y", get.result()).unwrap();
                program.as_mut().push_back(set.operation());
            }
            black_box(program.len())
        })
    });

    unsafe { producer.operation().destroy() };
}

criterion_group!(benches, bench_interning, bench_operations);
criterion_main!(benches);
