//! Accumulator for the parts of an operation under construction.
use crate::{
    attribute::{Attribute, AttributeMap},
    context::IrContext,
    op_info::OpInfo,
    operation::{Operation, OperationRef},
    types::Type,
    utils::error::{IrError, IrResult},
    value::OpResult,
};

/// Operands, result types and attributes gathered before calling
/// [`Operation::create_from_argument`].
///
/// ```rust
/// # use pir::prelude::*;
/// # use pir::dialect::builtin::GetParameterOp;
/// # use pir::attribute::builtin::StrAttribute;
/// # use pir::types::builtin::Float32Type;
/// let ctx = IrContext::new();
/// let mut argument = OperationArgument::from_name(&ctx, GetParameterOp::NAME).unwrap();
/// argument
///     .add_type(Float32Type::get(&ctx))
///     .add_attribute("parameter_name", StrAttribute::get(&ctx, "w"));
/// let op = argument.build();
/// assert_eq!(op.num_results(), 1);
/// unsafe { op.destroy() };
/// ```
#[derive(Debug, Clone)]
pub struct OperationArgument<'ctx> {
    info: OpInfo<'ctx>,
    operands: Vec<OpResult<'ctx>>,
    output_types: Vec<Type<'ctx>>,
    attributes: AttributeMap<'ctx>,
}

impl<'ctx> OperationArgument<'ctx> {
    pub fn new(info: OpInfo<'ctx>) -> Self {
        Self {
            info,
            operands: Vec::new(),
            output_types: Vec::new(),
            attributes: AttributeMap::new(),
        }
    }

    /// Look `name` up in the context registry.
    pub fn from_name(ctx: &'ctx IrContext, name: &str) -> IrResult<Self> {
        ctx.op_info(name)
            .map(Self::new)
            .ok_or_else(|| IrError::UnregisteredOperation(name.to_string()))
    }

    pub fn with_parts(
        info: OpInfo<'ctx>,
        operands: Vec<OpResult<'ctx>>,
        output_types: Vec<Type<'ctx>>,
        attributes: AttributeMap<'ctx>,
    ) -> Self {
        Self {
            info,
            operands,
            output_types,
            attributes,
        }
    }

    pub fn add_operands(&mut self, operands: impl IntoIterator<Item = OpResult<'ctx>>) -> &mut Self {
        self.operands.extend(operands);
        self
    }

    pub fn add_operand(&mut self, operand: OpResult<'ctx>) -> &mut Self {
        self.operands.push(operand);
        self
    }

    pub fn add_types<T: Into<Type<'ctx>>>(&mut self, types: impl IntoIterator<Item = T>) -> &mut Self {
        self.output_types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn add_type(&mut self, ty: impl Into<Type<'ctx>>) -> &mut Self {
        self.output_types.push(ty.into());
        self
    }

    /// Set `name`; an existing entry with the same name is overwritten.
    pub fn add_attribute(
        &mut self,
        name: impl Into<String>,
        attribute: impl Into<Attribute<'ctx>>,
    ) -> &mut Self {
        self.attributes.insert(name, attribute.into());
        self
    }

    pub fn add_attributes<N: Into<String>>(
        &mut self,
        attributes: impl IntoIterator<Item = (N, Attribute<'ctx>)>,
    ) -> &mut Self {
        for (name, attribute) in attributes {
            self.attributes.insert(name, attribute);
        }
        self
    }

    /// The context the operation will be created in.
    pub fn ctx(&self) -> &'ctx IrContext {
        self.info.ctx()
    }

    pub fn info(&self) -> OpInfo<'ctx> {
        self.info
    }

    pub fn operands(&self) -> &[OpResult<'ctx>] {
        &self.operands
    }

    pub fn output_types(&self) -> &[Type<'ctx>] {
        &self.output_types
    }

    pub fn attributes(&self) -> &AttributeMap<'ctx> {
        &self.attributes
    }

    /// Create the operation. Shorthand for [`Operation::create_from_argument`].
    pub fn build(self) -> OperationRef<'ctx> {
        Operation::create_from_argument(self)
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        OpInfo<'ctx>,
        Vec<OpResult<'ctx>>,
        Vec<Type<'ctx>>,
        AttributeMap<'ctx>,
    ) {
        (self.info, self.operands, self.output_types, self.attributes)
    }
}
