//! Builtin attribute kinds: booleans, integers, floating-point numbers and strings.
use std::fmt;

use crate::{
    attribute::{Attribute, AttributeStorage, AttributeView},
    context::IrContext,
    storage::{AbstractStorage, ParametricStorage},
    utils::hash::hash_of,
};

/// Define a storage holding a single `Copy` value plus its typed view.
///
/// `$canon` maps the value to the representation used for hashing and
/// equality (floats are compared bitwise so that keys stay `Eq`).
macro_rules! value_attribute {
    (
        $(#[$meta:meta])*
        $view:ident, $storage:ident, $value:ty, $kind:literal, $canon:expr
    ) => {
        #[derive(Debug)]
        pub struct $storage {
            data: $value,
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
            type ParamKey = $value;

            fn construct(key: $value) -> Self {
                Self { data: key }
            }

            fn hash_value(key: &$value) -> u64 {
                hash_of(&($canon)(*key))
            }

            fn matches(&self, key: &$value) -> bool {
                ($canon)(self.data) == ($canon)(*key)
            }

            fn as_key(&self) -> $value {
                self.data
            }
        }

        impl AttributeStorage for $storage {}

        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $view<'ctx>(&'ctx $storage);

        impl<'ctx> $view<'ctx> {
            /// Intern `data` in `ctx`.
            pub fn get(ctx: &'ctx IrContext, data: $value) -> Self {
                Self(ctx.intern_attribute::<$storage>(data))
            }

            pub fn data(&self) -> $value {
                self.0.data
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

value_attribute!(
    /// A boolean flag.
    BoolAttribute, BoolAttributeStorage, bool, "builtin.bool", |v: bool| v
);

value_attribute!(
    /// A 32-bit signed integer.
    Int32Attribute, Int32AttributeStorage, i32, "builtin.int32", |v: i32| v
);

value_attribute!(
    /// A 64-bit signed integer.
    Int64Attribute, Int64AttributeStorage, i64, "builtin.int64", |v: i64| v
);

value_attribute!(
    /// A 32-bit float, uniqued by bit pattern (`0.0` and `-0.0` are distinct).
    FloatAttribute, FloatAttributeStorage, f32, "builtin.float", |v: f32| v.to_bits()
);

value_attribute!(
    /// A 64-bit float, uniqued by bit pattern.
    DoubleAttribute, DoubleAttributeStorage, f64, "builtin.double", |v: f64| v.to_bits()
);

#[derive(Debug)]
pub struct StrAttributeStorage {
    data: String,
}

impl AbstractStorage for StrAttributeStorage {
    fn kind_name(&self) -> &'static str {
        "builtin.str"
    }

    fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.data)
    }
}

impl ParametricStorage for StrAttributeStorage {
    type ParamKey = String;

    fn construct(key: String) -> Self {
        Self { data: key }
    }

    fn hash_value(key: &String) -> u64 {
        hash_of(key.as_str())
    }

    fn matches(&self, key: &String) -> bool {
        self.data == *key
    }

    fn as_key(&self) -> String {
        self.data.clone()
    }
}

impl AttributeStorage for StrAttributeStorage {}

/// An immutable string.
#[derive(Debug, Clone, Copy)]
pub struct StrAttribute<'ctx>(&'ctx StrAttributeStorage);

impl<'ctx> StrAttribute<'ctx> {
    pub fn get(ctx: &'ctx IrContext, data: impl Into<String>) -> Self {
        Self(ctx.intern_attribute::<StrAttributeStorage>(data.into()))
    }

    pub fn data(&self) -> &'ctx str {
        &self.0.data
    }
}

impl<'ctx> AttributeView<'ctx> for StrAttribute<'ctx> {
    type Storage = StrAttributeStorage;

    fn from_storage(storage: &'ctx StrAttributeStorage) -> Self {
        Self(storage)
    }

    fn storage(&self) -> &'ctx StrAttributeStorage {
        self.0
    }
}

impl<'ctx> From<StrAttribute<'ctx>> for Attribute<'ctx> {
    fn from(view: StrAttribute<'ctx>) -> Self {
        Attribute::from_storage(view.0)
    }
}

impl PartialEq for StrAttribute<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for StrAttribute<'_> {}
