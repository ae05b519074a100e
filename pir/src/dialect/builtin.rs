//! The builtin dialect: loading and storing named program parameters.
use crate::{
    argument::OperationArgument,
    attribute::builtin::StrAttribute,
    context::IrContext,
    dialect::Dialect,
    op_info::Op,
    operation::OperationRef,
    types::Type,
    utils::error::IrResult,
    value::OpResult,
};

pub struct BuiltinDialect;

impl Dialect for BuiltinDialect {
    const NAME: &'static str = "builtin";

    fn initialize(ctx: &IrContext) -> IrResult<()> {
        ctx.register_op::<GetParameterOp>()?;
        ctx.register_op::<SetParameterOp>()?;
        Ok(())
    }
}

/// Reads the parameter `parameter_name`; no operand, one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetParameterOp<'ctx>(OperationRef<'ctx>);

impl<'ctx> GetParameterOp<'ctx> {
    pub fn build(
        ctx: &'ctx IrContext,
        parameter_name: &str,
        ty: impl Into<Type<'ctx>>,
    ) -> IrResult<Self> {
        let mut argument = OperationArgument::from_name(ctx, Self::NAME)?;
        argument
            .add_type(ty)
            .add_attribute("parameter_name", StrAttribute::get(ctx, parameter_name));
        Ok(Self(argument.build()))
    }

    pub fn parameter_name(&self) -> &'ctx str {
        parameter_name(self.0)
    }

    pub fn result(&self) -> OpResult<'ctx> {
        self.0.result(0)
    }
}

impl<'ctx> Op<'ctx> for GetParameterOp<'ctx> {
    const NAME: &'static str = "builtin.get_parameter";
    const ATTRIBUTE_NAMES: &'static [&'static str] = &["parameter_name"];

    fn from_operation_unchecked(op: OperationRef<'ctx>) -> Self {
        Self(op)
    }

    fn operation(&self) -> OperationRef<'ctx> {
        self.0
    }
}

/// Stores its single operand into the parameter `parameter_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetParameterOp<'ctx>(OperationRef<'ctx>);

impl<'ctx> SetParameterOp<'ctx> {
    pub fn build(
        ctx: &'ctx IrContext,
        parameter_name: &str,
        value: OpResult<'ctx>,
    ) -> IrResult<Self> {
        let mut argument = OperationArgument::from_name(ctx, Self::NAME)?;
        argument
            .add_operand(value)
            .add_attribute("parameter_name", StrAttribute::get(ctx, parameter_name));
        Ok(Self(argument.build()))
    }

    pub fn parameter_name(&self) -> &'ctx str {
        parameter_name(self.0)
    }

    pub fn value(&self) -> OpResult<'ctx> {
        self.0.operand_source(0)
    }
}

impl<'ctx> Op<'ctx> for SetParameterOp<'ctx> {
    const NAME: &'static str = "builtin.set_parameter";
    const ATTRIBUTE_NAMES: &'static [&'static str] = &["parameter_name"];

    fn from_operation_unchecked(op: OperationRef<'ctx>) -> Self {
        Self(op)
    }

    fn operation(&self) -> OperationRef<'ctx> {
        self.0
    }
}

#[track_caller]
fn parameter_name(op: OperationRef<'_>) -> &str {
    match op
        .attribute("parameter_name")
        .and_then(|attr| attr.dyn_cast::<StrAttribute>())
    {
        Some(name) => name.data(),
        None => panic!("`{}` has no string `parameter_name` attribute", op.name()),
    }
}
