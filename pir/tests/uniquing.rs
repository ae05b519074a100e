use std::collections::HashMap;

use pir::{
    attribute::builtin::{Int64Attribute, StrAttribute},
    prelude::*,
    types::builtin::{BoolType, Float32Type, IndexType},
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

#[test]
fn equal_keys_always_share_a_storage() {
    let ctx = IrContext::new();
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);
    let mut seen: HashMap<i64, Attribute> = HashMap::new();

    for _ in 0..2_000 {
        let key = rng.random_range(-64i64..64);
        let attr: Attribute = Int64Attribute::get(&ctx, key).into();
        match seen.get(&key) {
            Some(previous) => assert_eq!(*previous, attr, "key {key} was interned twice"),
            None => {
                seen.insert(key, attr);
            }
        }
    }

    assert_eq!(ctx.num_interned_attributes(), seen.len());
    let distinct: std::collections::HashSet<_> = seen.values().copied().collect();
    assert_eq!(distinct.len(), seen.len());
}

#[test]
fn attributes_and_types_use_separate_tables() {
    let ctx = IrContext::new();
    let _ = StrAttribute::get(&ctx, "x");
    let _ = StrAttribute::get(&ctx, "x");
    let _ = Float32Type::get(&ctx);
    let _ = BoolType::get(&ctx);
    let _ = IndexType::get(&ctx);

    assert_eq!(ctx.num_interned_attributes(), 1);
    assert_eq!(ctx.num_interned_types(), 3);
}

#[test]
fn interning_from_many_threads() {
    let ctx = IrContext::new();
    let per_thread: Vec<Vec<Attribute>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4u64)
            .map(|seed| {
                let ctx = &ctx;
                scope.spawn(move || {
                    let mut rng = ChaCha20Rng::seed_from_u64(seed);
                    let mut attrs: Vec<Attribute> = (0..16)
                        .map(|key| StrAttribute::get(ctx, format!("k{key}")).into())
                        .collect();
                    // Touch the keys again in a random order.
                    for _ in 0..64 {
                        let key = rng.random_range(0..16);
                        let again: Attribute = StrAttribute::get(ctx, format!("k{key}")).into();
                        assert_eq!(again, attrs[key]);
                    }
                    attrs.sort_by_key(|attr| attr.to_string());
                    attrs
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(per_thread.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(ctx.num_interned_attributes(), 16);
}
