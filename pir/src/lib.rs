//! Core of a tensor program IR: attributes and types interned per context,
//! operations stored in a single allocation together with their operand and
//! result slots, and programs owning ordered lists of operations.

pub mod argument;
pub mod attribute;
pub mod context;
pub mod dialect;
pub mod fmt;
pub mod magic;
pub mod op_info;
pub mod operation;
pub mod program;
pub mod storage;
pub mod types;
pub mod utils;
pub mod value;

pub mod prelude {
    pub use crate::{
        argument::OperationArgument,
        attribute::{Attribute, AttributeMap, AttributeView},
        context::IrContext,
        dialect::Dialect,
        op_info::{
            CastTarget, InterfaceSet, InterfaceView, Op, OpInfo, OpInterface, OpTrait, TraitSet,
            TraitView,
        },
        operation::{Operation, OperationRef},
        program::Program,
        types::{Type, TypeView},
        utils::error::{IrError, IrResult},
        value::{OpOperand, OpResult},
    };
}
