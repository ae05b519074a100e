//! Dialects
//!
//! A dialect is a named group of op kinds registered together into an
//! [`IrContext`]. Op names are prefixed with the dialect name
//! (`builtin.get_parameter`, `pd.conv2d`, ...).
use crate::{context::IrContext, utils::error::IrResult};

pub mod builtin;

pub trait Dialect {
    /// Prefix shared by the names of every op of the dialect.
    const NAME: &'static str;

    /// Register the op kinds of the dialect into `ctx`.
    fn initialize(ctx: &IrContext) -> IrResult<()>;
}
