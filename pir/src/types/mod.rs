//! Types
//!
//! Types are interned exactly like attributes, through their own
//! [`StorageUniquer`](crate::storage::StorageUniquer) in the context. A [`Type`]
//! is a copyable handle compared by identity; typed wrappers implement
//! [`TypeView`].
use std::{fmt, hash::Hash};

use crate::storage::{AbstractStorage, ParametricStorage};

pub mod builtin;

/// Marker for storages that back types.
pub trait TypeStorage: ParametricStorage {}

/// A typed view over one type kind.
pub trait TypeView<'ctx>: Copy + Into<Type<'ctx>> {
    type Storage: TypeStorage;

    fn from_storage(storage: &'ctx Self::Storage) -> Self;

    fn storage(&self) -> &'ctx Self::Storage;
}

/// Non-owning handle to an interned type storage.
#[derive(Clone, Copy)]
pub struct Type<'ctx> {
    storage: &'ctx dyn AbstractStorage,
}

impl<'ctx> Type<'ctx> {
    pub fn from_storage<S: TypeStorage>(storage: &'ctx S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &'ctx dyn AbstractStorage {
        self.storage
    }

    pub fn kind_name(&self) -> &'static str {
        self.storage.kind_name()
    }

    pub fn isa<T: TypeView<'ctx>>(&self) -> bool {
        self.storage.is::<T::Storage>()
    }

    pub fn dyn_cast<T: TypeView<'ctx>>(&self) -> Option<T> {
        self.storage
            .downcast_ref::<T::Storage>()
            .map(|storage| T::from_storage(storage))
    }

    #[inline]
    fn addr(&self) -> *const () {
        self.storage as *const dyn AbstractStorage as *const ()
    }
}

impl PartialEq for Type<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.addr(), other.addr())
    }
}

impl Eq for Type<'_> {}

impl Hash for Type<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({self})")
    }
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.storage.print(f)
    }
}
