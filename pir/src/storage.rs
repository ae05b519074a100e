//! Storage uniquing
//!
//! Attributes and types are immutable values that live in a [`StorageUniquer`]
//! owned by an [`IrContext`](crate::context::IrContext). Each kind of value is
//! described by a [`ParametricStorage`] implementation which declares:
//!
//! - the key (`ParamKey`) identifying one value of the kind,
//! - how to build a storage from a key (`construct`),
//! - how to hash a key (`hash_value`) and compare a storage to a key (`matches`).
//!
//! The uniquer guarantees that for one kind, equal keys always resolve to the
//! very same storage instance, so handles can be compared by address.
use std::{any::TypeId, collections::HashMap, fmt, ptr::NonNull};

use downcast_rs::{DowncastSync, impl_downcast};
use log::{debug, info};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use smallvec::{SmallVec, smallvec};

use crate::utils::conf::UniquerConfig;

/// Object-safe face of every interned storage.
///
/// Handles ([`Attribute`](crate::attribute::Attribute), [`Type`](crate::types::Type))
/// refer to storages through this trait and recover the concrete kind with
/// `downcast_ref`.
pub trait AbstractStorage: DowncastSync + fmt::Debug {
    /// Name of the storage kind (e.g. `"pd.int_array"`).
    fn kind_name(&self) -> &'static str;

    /// Render the payload in the textual IR syntax.
    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}
impl_downcast!(sync AbstractStorage);

/// A storage kind that can be interned by a [`StorageUniquer`].
///
/// `hash_value` and `matches` must agree: two keys for which `matches` holds
/// must hash to the same value, and a storage built from `key` must match `key`.
pub trait ParametricStorage: AbstractStorage + Sized {
    /// The semantic payload identifying one value of this kind.
    type ParamKey;

    /// Build the storage for `key`. Called at most once per distinct key and uniquer.
    fn construct(key: Self::ParamKey) -> Self;

    /// Hash of a key.
    fn hash_value(key: &Self::ParamKey) -> u64;

    /// Whether this storage was built from a key equal to `key`.
    fn matches(&self, key: &Self::ParamKey) -> bool;

    /// Rebuild the key this storage was constructed from.
    fn as_key(&self) -> Self::ParamKey;
}

/// Heap cell holding one interned storage.
///
/// The storage sits at offset 0 of a cell that is never zero-sized, so every
/// interned storage has its own address even when `S` itself is a unit struct.
#[repr(C)]
struct Interned<S> {
    storage: S,
    hash: u64,
}

/// Type-erased face of an [`Interned`] cell.
trait InternedEntry: Send + Sync {
    fn storage(&self) -> &dyn AbstractStorage;

    fn key_hash(&self) -> u64;
}

impl<S: ParametricStorage> InternedEntry for Interned<S> {
    fn storage(&self) -> &dyn AbstractStorage {
        &self.storage
    }

    fn key_hash(&self) -> u64 {
        self.hash
    }
}

/// Owning pointer to a leaked, type-erased cell.
struct StorageEntry(NonNull<dyn InternedEntry>);

// SAFETY: `InternedEntry` requires `Send + Sync`; the entry is only a uniquely
// owned box turned into a raw pointer.
unsafe impl Send for StorageEntry {}
unsafe impl Sync for StorageEntry {}

impl StorageEntry {
    #[inline]
    fn get(&self) -> &dyn AbstractStorage {
        // SAFETY: entries are only freed when the uniquer drops.
        unsafe { self.0.as_ref() }.storage()
    }

    #[inline]
    fn key_hash(&self) -> u64 {
        // SAFETY: as above.
        unsafe { self.0.as_ref() }.key_hash()
    }
}

#[derive(Default)]
struct Table {
    buckets: HashMap<(TypeId, u64), SmallVec<[StorageEntry; 1]>>,
    len: usize,
}

/// Table interning storages of any [`ParametricStorage`] kind.
///
/// The table is keyed by `(kind, hash)` and falls back to
/// [`ParametricStorage::matches`] to resolve collisions. Storages are never freed
/// before the uniquer itself, which is what allows [`StorageUniquer::get`] to hand
/// out plain references.
///
/// ```rust
/// # use pir::storage::StorageUniquer;
/// # use pir::attribute::builtin::Int32AttributeStorage;
/// let uniquer = StorageUniquer::new(Default::default());
/// let a = uniquer.get::<Int32AttributeStorage>(2);
/// let b = uniquer.get::<Int32AttributeStorage>(2);
/// assert!(std::ptr::eq(a, b));
/// assert_eq!(uniquer.len(), 1);
/// ```
pub struct StorageUniquer {
    table: RwLock<Table>,
    config: UniquerConfig,
}

impl StorageUniquer {
    pub fn new(config: UniquerConfig) -> Self {
        Self {
            table: RwLock::new(Table {
                buckets: HashMap::with_capacity(config.initial_capacity),
                len: 0,
            }),
            config,
        }
    }

    fn lookup<'a, S: ParametricStorage>(
        table: &Table,
        slot: &(TypeId, u64),
        key: &S::ParamKey,
    ) -> Option<&'a S> {
        let bucket = table.buckets.get(slot)?;
        bucket.iter().find_map(|entry| {
            let storage = entry.get().downcast_ref::<S>()?;
            // SAFETY: the storage outlives the table guard, see `StorageEntry::get`.
            storage
                .matches(key)
                .then(|| unsafe { &*(storage as *const S) })
        })
    }

    /// Return the unique storage for `key`, constructing it on first use.
    ///
    /// # A note on concurrency
    /// Lookups hold an upgradable read lock which is upgraded to a write lock
    /// only when the key is missing. Only one upgradable reader may exist at a
    /// time, so two threads interning the same key can never both insert it.
    pub fn get<S: ParametricStorage>(&self, key: S::ParamKey) -> &S {
        let hash = S::hash_value(&key);
        let slot = (TypeId::of::<S>(), hash);

        let table = self.table.upgradable_read();
        if let Some(storage) = Self::lookup::<S>(&table, &slot, &key) {
            return storage;
        }

        let mut table = RwLockUpgradableReadGuard::upgrade(table);
        let cell: NonNull<Interned<S>> = NonNull::from(Box::leak(Box::new(Interned {
            storage: S::construct(key),
            hash,
        })));
        // SAFETY: freshly leaked, see `Drop`.
        let storage_ref: &S = unsafe { &cell.as_ref().storage };
        debug_assert_eq!(
            S::hash_value(&storage_ref.as_key()),
            hash,
            "storage `{}` does not hash like the key it was built from",
            storage_ref.kind_name()
        );

        let entry = StorageEntry(cell);
        match table.buckets.get_mut(&slot) {
            Some(bucket) => {
                if self.config.log_collisions {
                    info!(
                        "Detected an hash collision on hash 0x{:016x}. The following {} storages collided:\n{}\n - {:?}",
                        hash,
                        storage_ref.kind_name(),
                        bucket
                            .iter()
                            .map(|entry| format!(" - {:?} (0x{:016x})", entry.get(), entry.key_hash()))
                            .collect::<Vec<_>>()
                            .join("\n"),
                        storage_ref,
                    );
                }
                bucket.push(entry);
            }
            None => {
                debug!(
                    "New {} storage interned with hash 0x{:016x}: {:?}",
                    storage_ref.kind_name(),
                    hash,
                    storage_ref
                );
                table.buckets.insert(slot, smallvec![entry]);
            }
        }
        table.len += 1;

        storage_ref
    }

    /// Number of storages currently interned.
    pub fn len(&self) -> usize {
        self.table.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for StorageUniquer {
    fn drop(&mut self) {
        let table = self.table.get_mut();
        for (_, bucket) in table.buckets.drain() {
            for entry in bucket {
                // SAFETY: every entry was produced by `Box::leak` in `get` and is
                // dropped exactly once here.
                drop(unsafe { Box::from_raw(entry.0.as_ptr()) });
            }
        }
        table.len = 0;
    }
}
