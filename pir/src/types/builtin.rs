//! Builtin scalar types. None of them carries parameters, so each kind interns
//! to exactly one storage per context.
use std::fmt;

use crate::{
    context::IrContext,
    storage::{AbstractStorage, ParametricStorage},
    types::{Type, TypeStorage, TypeView},
};

macro_rules! singleton_type {
    ($(#[$meta:meta])* $view:ident, $storage:ident, $mnemonic:literal) => {
        #[derive(Debug)]
        pub struct $storage;

        impl AbstractStorage for $storage {
            fn kind_name(&self) -> &'static str {
                concat!("builtin.", $mnemonic)
            }

            fn print(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str($mnemonic)
            }
        }

        impl ParametricStorage for $storage {
            type ParamKey = ();

            fn construct(_key: ()) -> Self {
                $storage
            }

            fn hash_value(_key: &()) -> u64 {
                0
            }

            fn matches(&self, _key: &()) -> bool {
                true
            }

            fn as_key(&self) {}
        }

        impl TypeStorage for $storage {}

        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $view<'ctx>(&'ctx $storage);

        impl<'ctx> $view<'ctx> {
            pub fn get(ctx: &'ctx IrContext) -> Self {
                Self(ctx.intern_type::<$storage>(()))
            }
        }

        impl<'ctx> TypeView<'ctx> for $view<'ctx> {
            type Storage = $storage;

            fn from_storage(storage: &'ctx $storage) -> Self {
                Self(storage)
            }

            fn storage(&self) -> &'ctx $storage {
                self.0
            }
        }

        impl<'ctx> From<$view<'ctx>> for Type<'ctx> {
            fn from(view: $view<'ctx>) -> Self {
                Type::from_storage(view.0)
            }
        }

        impl fmt::Display for $view<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str($mnemonic)
            }
        }
    };
}

singleton_type!(
    /// Brain floating point (`bfloat16`).
    BFloat16Type, BFloat16TypeStorage, "bf16"
);
singleton_type!(Float16Type, Float16TypeStorage, "f16");
singleton_type!(Float32Type, Float32TypeStorage, "f32");
singleton_type!(Float64Type, Float64TypeStorage, "f64");
singleton_type!(Int8Type, Int8TypeStorage, "i8");
singleton_type!(Int16Type, Int16TypeStorage, "i16");
singleton_type!(Int32Type, Int32TypeStorage, "i32");
singleton_type!(Int64Type, Int64TypeStorage, "i64");
singleton_type!(UInt8Type, UInt8TypeStorage, "u8");
singleton_type!(BoolType, BoolTypeStorage, "bool");
singleton_type!(
    /// Target-sized integer used for indices and extents.
    IndexType, IndexTypeStorage, "index"
);
