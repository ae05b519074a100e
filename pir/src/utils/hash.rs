use std::hash::{DefaultHasher, Hash, Hasher};

/// Hash a single value with the process-wide deterministic hasher.
#[inline]
pub fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Mix `value` into `seed` (boost-style `hash_combine`).
#[inline]
pub const fn hash_combine(seed: u64, value: u64) -> u64 {
    seed ^ (value
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2))
}

/// Fold a sequence of hashable values into one hash, starting from `seed`.
pub fn hash_iter<T: Hash>(seed: u64, values: impl IntoIterator<Item = T>) -> u64 {
    values
        .into_iter()
        .fold(seed, |acc, value| hash_combine(acc, hash_of(&value)))
}
