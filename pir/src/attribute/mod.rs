//! Attributes
//!
//! An [`Attribute`] is a lightweight, copyable handle to an interned
//! [`AttributeStorage`]. Because storages are uniqued per context, two handles
//! are equal if and only if they point to the same storage.
//!
//! Typed wrappers (e.g. [`builtin::Int32Attribute`]) implement [`AttributeView`]
//! and are obtained either from the context (`Int32Attribute::get(&ctx, 2)`) or
//! by downcasting a generic handle with [`Attribute::dyn_cast`].
use std::{fmt, hash::Hash, ops::Index};

use smallvec::SmallVec;

use crate::storage::{AbstractStorage, ParametricStorage};

pub mod builtin;

/// Marker for storages that back attributes (as opposed to types).
pub trait AttributeStorage: ParametricStorage {}

/// A typed view over one attribute kind.
pub trait AttributeView<'ctx>: Copy + Into<Attribute<'ctx>> {
    type Storage: AttributeStorage;

    /// Wrap an interned storage.
    fn from_storage(storage: &'ctx Self::Storage) -> Self;

    /// The interned storage behind this view.
    fn storage(&self) -> &'ctx Self::Storage;
}

/// Non-owning handle to an interned attribute storage.
#[derive(Clone, Copy)]
pub struct Attribute<'ctx> {
    storage: &'ctx dyn AbstractStorage,
}

impl<'ctx> Attribute<'ctx> {
    /// Wrap an interned attribute storage.
    pub fn from_storage<S: AttributeStorage>(storage: &'ctx S) -> Self {
        Self { storage }
    }

    /// The type-erased storage behind this handle.
    pub fn storage(&self) -> &'ctx dyn AbstractStorage {
        self.storage
    }

    /// Name of the attribute kind (e.g. `"builtin.int32"`).
    pub fn kind_name(&self) -> &'static str {
        self.storage.kind_name()
    }

    /// Returns `true` if this attribute is of the kind viewed by `A`.
    pub fn isa<A: AttributeView<'ctx>>(&self) -> bool {
        self.storage.is::<A::Storage>()
    }

    /// Recover the typed view of this attribute, or `None` if it is of another kind.
    pub fn dyn_cast<A: AttributeView<'ctx>>(&self) -> Option<A> {
        self.storage
            .downcast_ref::<A::Storage>()
            .map(|storage| A::from_storage(storage))
    }

    #[inline]
    fn addr(&self) -> *const () {
        self.storage as *const dyn AbstractStorage as *const ()
    }
}

impl PartialEq for Attribute<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.addr(), other.addr())
    }
}

impl Eq for Attribute<'_> {}

impl Hash for Attribute<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute({:?} @ {:p})", self.storage, self.addr())
    }
}

impl fmt::Display for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.storage.print(f)
    }
}

/// Named attributes of an operation.
///
/// Keys are unique. Inserting an existing name replaces its value but keeps the
/// position of the first insertion, so iteration (and therefore printing) follows
/// insertion order. Equality ignores ordering.
#[derive(Clone, Default)]
pub struct AttributeMap<'ctx> {
    entries: SmallVec<[(String, Attribute<'ctx>); 4]>,
}

impl<'ctx> AttributeMap<'ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `attr` under `name`, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, attr: Attribute<'ctx>) -> Option<Attribute<'ctx>> {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, attr)),
            None => {
                self.entries.push((name, attr));
                None
            }
        }
    }

    /// Look up the attribute stored under `name`.
    pub fn get(&self, name: &str) -> Option<Attribute<'ctx>> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, attr)| *attr)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove the attribute stored under `name`, preserving the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<Attribute<'ctx>> {
        let position = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(position).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, attribute)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Attribute<'ctx>)> {
        self.entries.iter().map(|(key, attr)| (key.as_str(), *attr))
    }
}

impl<'ctx> Index<&str> for AttributeMap<'ctx> {
    type Output = Attribute<'ctx>;

    fn index(&self, name: &str) -> &Self::Output {
        match self.entries.iter().find(|(key, _)| key == name) {
            Some((_, attr)) => attr,
            None => panic!("no attribute named `{name}` in this map"),
        }
    }
}

impl PartialEq for AttributeMap<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(name, attr)| other.get(name) == Some(attr))
    }
}

impl Eq for AttributeMap<'_> {}

impl fmt::Debug for AttributeMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'ctx, K: Into<String>> Extend<(K, Attribute<'ctx>)> for AttributeMap<'ctx> {
    fn extend<I: IntoIterator<Item = (K, Attribute<'ctx>)>>(&mut self, iter: I) {
        for (name, attr) in iter {
            self.insert(name, attr);
        }
    }
}

impl<'ctx, K: Into<String>> FromIterator<(K, Attribute<'ctx>)> for AttributeMap<'ctx> {
    fn from_iter<I: IntoIterator<Item = (K, Attribute<'ctx>)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}
