//! Attribute kinds of the `pd` dialect.
//!
//! Every kind wraps one of the descriptors of [`crate::common`]. Hashes mix
//! each field into a running seed with [`hash_combine`], so a storage hashes
//! exactly like the key it was built from.
use std::fmt;

use pir::{
    attribute::{Attribute, AttributeStorage, AttributeView},
    context::IrContext,
    storage::{AbstractStorage, ParametricStorage},
    utils::hash::{hash_combine, hash_of},
};

use crate::common::{DataLayout, DataType, IntArray, Place, Scalar};

macro_rules! pd_attribute {
    (
        $(#[$meta:meta])*
        $view:ident, $storage:ident, $key:ty, $kind:literal, $hash:expr
    ) => {
        #[derive(Debug)]
        pub struct $storage {
            data: $key,
        }

        impl AbstractStorage for $storage {
            fn kind_name(&self) -> &'static str {
                $kind
            }

            fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.data)
            }
        }

        impl ParametricStorage for $storage {
            type ParamKey = $key;

            fn construct(key: $key) -> Self {
                Self { data: key }
            }

            fn hash_value(key: &$key) -> u64 {
                ($hash)(key)
            }

            fn matches(&self, key: &$key) -> bool {
                self.data == *key
            }

            fn as_key(&self) -> $key {
                self.data.clone()
            }
        }

        impl AttributeStorage for $storage {}

        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $view<'ctx>(&'ctx $storage);

        impl<'ctx> $view<'ctx> {
            /// Intern `data` in `ctx`.
            pub fn get(ctx: &'ctx IrContext, data: impl Into<$key>) -> Self {
                Self(ctx.intern_attribute::<$storage>(data.into()))
            }

            pub fn data(&self) -> &'ctx $key {
                &self.0.data
            }
        }

        impl<'ctx> AttributeView<'ctx> for $view<'ctx> {
            type Storage = $storage;

            fn from_storage(storage: &'ctx $storage) -> Self {
                Self(storage)
            }

            fn storage(&self) -> &'ctx $storage {
                self.0
            }
        }

        impl<'ctx> From<$view<'ctx>> for Attribute<'ctx> {
            fn from(view: $view<'ctx>) -> Self {
                Attribute::from_storage(view.0)
            }
        }

        impl PartialEq for $view<'_> {
            fn eq(&self, other: &Self) -> bool {
                std::ptr::eq(self.0, other.0)
            }
        }

        impl Eq for $view<'_> {}
    };
}

pd_attribute!(
    /// A list of integers, e.g. a shape or a list of axes.
    IntArrayAttribute, IntArrayAttributeStorage, IntArray, "pd.int_array",
    |key: &IntArray| {
        key.data
            .iter()
            .fold(hash_combine(0, hash_of(&key.from_tensor)), |seed, value| {
                hash_combine(seed, hash_of(value))
            })
    }
);

pd_attribute!(
    /// A single number of any supported element type.
    ScalarAttribute, ScalarAttributeStorage, Scalar, "pd.scalar",
    |key: &Scalar| hash_combine(hash_of(&key.value), hash_of(&key.from_tensor))
);

pd_attribute!(
    DataTypeAttribute, DataTypeAttributeStorage, DataType, "pd.data_type",
    |key: &DataType| hash_of(key)
);

pd_attribute!(
    PlaceAttribute, PlaceAttributeStorage, Place, "pd.place",
    |key: &Place| hash_combine(hash_of(&key.allocation), hash_of(&key.device))
);

pd_attribute!(
    DataLayoutAttribute, DataLayoutAttributeStorage, DataLayout, "pd.data_layout",
    |key: &DataLayout| hash_of(key)
);
