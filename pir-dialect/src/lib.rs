//! The `pd` dialect: tensor descriptors as attributes, a dense tensor type and
//! a handful of tensor operations, registered into a [`pir`] context with
//! [`PaddleDialect`].

pub mod attribute;
pub mod common;
pub mod ops;
pub mod types;

use pir::{context::IrContext, dialect::Dialect, utils::error::IrResult};

use crate::ops::{AnyOp, Conv2dOp, FeedOp, FullOp, ReluInplaceOp};

pub struct PaddleDialect;

impl Dialect for PaddleDialect {
    const NAME: &'static str = "pd";

    fn initialize(ctx: &IrContext) -> IrResult<()> {
        ctx.register_op::<FeedOp>()?;
        ctx.register_op::<FullOp>()?;
        ctx.register_op::<Conv2dOp>()?;
        ctx.register_op::<AnyOp>()?;
        ctx.register_op::<ReluInplaceOp>()?;
        Ok(())
    }
}

pub mod prelude {
    pub use crate::{
        PaddleDialect,
        attribute::{
            DataLayoutAttribute, DataTypeAttribute, IntArrayAttribute, PlaceAttribute,
            ScalarAttribute,
        },
        common::{AllocationType, DataLayout, DataType, IntArray, Place, Scalar, ScalarValue},
        ops::{
            AnyOp, Conv2dOp, Conv2dParams, FeedOp, FullOp, InplaceTrait, OpSchemaInterface,
            ReadOnlyTrait, ReluInplaceOp,
        },
        types::{DYNAMIC_DIM, DenseTensorDesc, DenseTensorType},
    };
}
