//! Operations of the `pd` dialect.
//!
//! Each op kind is a thin copyable view over an [`OperationRef`] with:
//!
//! - a `build` helper filling an [`OperationArgument`] and inferring result
//!   types from operand types when they are dense tensors,
//! - typed attribute accessors (which panic on ops that were not verified),
//! - a verifier checking attribute presence and values.
use log::debug;
use pir::{
    argument::OperationArgument,
    attribute::{
        AttributeView,
        builtin::{BoolAttribute, Int32Attribute, StrAttribute},
    },
    context::IrContext,
    op_info::{InterfaceSet, Op, OpInterface, OpTrait, TraitSet, verify_required_attributes},
    operation::{Operation, OperationRef},
    types::Type,
    utils::error::{IrError, IrResult},
    value::OpResult,
};
use smallvec::SmallVec;

use crate::{
    attribute::{DataTypeAttribute, IntArrayAttribute, PlaceAttribute, ScalarAttribute},
    common::{DataType, IntArray, Place, Scalar},
    types::{DYNAMIC_DIM, DenseTensorDesc, DenseTensorType},
};

/// The op never writes to the memory of its operands.
pub struct ReadOnlyTrait;
impl OpTrait for ReadOnlyTrait {}

/// The op writes its result into the memory of its first operand.
pub struct InplaceTrait;
impl OpTrait for InplaceTrait {}

/// Names of the inputs, attributes and outputs of an op kind, in order.
#[derive(Debug, Clone, Copy)]
pub struct OpSchemaInterface {
    pub inputs: &'static [&'static str],
    pub attributes: &'static [&'static str],
    pub outputs: &'static [&'static str],
}

impl OpInterface for OpSchemaInterface {}

impl OpSchemaInterface {
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|input| *input == name)
    }

    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|output| *output == name)
    }
}

fn verification_error(op: &Operation<'_>, reason: impl Into<String>) -> IrError {
    IrError::VerificationFailed {
        op: op.name().to_string(),
        reason: reason.into(),
    }
}

fn check_arity(op: &Operation<'_>, operands: u32, results: u32) -> IrResult<()> {
    if op.num_operands() != operands || op.num_results() != results {
        return Err(verification_error(
            op,
            format!(
                "expected {operands} operands and {results} results, found {} and {}",
                op.num_operands(),
                op.num_results()
            ),
        ));
    }
    Ok(())
}

/// The attribute `name` of `op` viewed as `A`, or a verification error.
fn typed_attribute<'ctx, A: AttributeView<'ctx>>(op: &Operation<'ctx>, name: &str) -> IrResult<A> {
    let attr = op
        .attribute(name)
        .ok_or_else(|| verification_error(op, format!("missing required attribute `{name}`")))?;
    attr.dyn_cast::<A>().ok_or_else(|| {
        verification_error(
            op,
            format!("attribute `{name}` has unexpected kind `{}`", attr.kind_name()),
        )
    })
}

/// Like [`typed_attribute`] but panics; used by accessors of verified ops.
#[track_caller]
fn expect_attribute<'ctx, A: AttributeView<'ctx>>(op: &Operation<'ctx>, name: &str) -> A {
    match typed_attribute(op, name) {
        Ok(attr) => attr,
        Err(err) => panic!("{err}"),
    }
}

macro_rules! op_view {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name<'ctx>(OperationRef<'ctx>);
    };
}

op_view!(
    /// Placeholder for a named program input.
    FeedOp
);

impl<'ctx> FeedOp<'ctx> {
    pub fn build(ctx: &'ctx IrContext, name: &str, ty: impl Into<Type<'ctx>>) -> IrResult<Self> {
        let mut argument = OperationArgument::from_name(ctx, Self::NAME)?;
        argument
            .add_type(ty)
            .add_attribute("name", StrAttribute::get(ctx, name));
        Ok(Self(argument.build()))
    }

    pub fn name(&self) -> &'ctx str {
        expect_attribute::<StrAttribute>(&self.0, "name").data()
    }

    pub fn out(&self) -> OpResult<'ctx> {
        self.0.result(0)
    }
}

impl<'ctx> Op<'ctx> for FeedOp<'ctx> {
    const NAME: &'static str = "pd.feed";
    const ATTRIBUTE_NAMES: &'static [&'static str] = &["name"];

    fn interfaces() -> InterfaceSet {
        InterfaceSet::new().with(OpSchemaInterface {
            inputs: &[],
            attributes: Self::ATTRIBUTE_NAMES,
            outputs: &["out"],
        })
    }

    fn verify(op: &Operation<'_>) -> IrResult<()> {
        check_arity(op, 0, 1)?;
        typed_attribute::<StrAttribute>(op, "name")?;
        Ok(())
    }

    fn from_operation_unchecked(op: OperationRef<'ctx>) -> Self {
        Self(op)
    }

    fn operation(&self) -> OperationRef<'ctx> {
        self.0
    }
}

op_view!(
    /// A tensor of the given shape filled with one value.
    FullOp
);

impl<'ctx> FullOp<'ctx> {
    pub fn build(
        ctx: &'ctx IrContext,
        shape: impl Into<IntArray>,
        value: impl Into<Scalar>,
        dtype: DataType,
        place: Place,
    ) -> IrResult<Self> {
        let shape = shape.into();
        let ty = DenseTensorType::get(ctx, DenseTensorDesc::new(dtype, shape.data.clone()));

        let mut argument = OperationArgument::from_name(ctx, Self::NAME)?;
        argument
            .add_type(ty)
            .add_attribute("shape", IntArrayAttribute::get(ctx, shape))
            .add_attribute("value", ScalarAttribute::get(ctx, value))
            .add_attribute("dtype", DataTypeAttribute::get(ctx, dtype))
            .add_attribute("place", PlaceAttribute::get(ctx, place));
        Ok(Self(argument.build()))
    }

    pub fn shape(&self) -> &'ctx IntArray {
        expect_attribute::<IntArrayAttribute>(&self.0, "shape").data()
    }

    pub fn value(&self) -> Scalar {
        *expect_attribute::<ScalarAttribute>(&self.0, "value").data()
    }

    pub fn dtype(&self) -> DataType {
        *expect_attribute::<DataTypeAttribute>(&self.0, "dtype").data()
    }

    pub fn place(&self) -> Place {
        *expect_attribute::<PlaceAttribute>(&self.0, "place").data()
    }

    pub fn out(&self) -> OpResult<'ctx> {
        self.0.result(0)
    }
}

impl<'ctx> Op<'ctx> for FullOp<'ctx> {
    const NAME: &'static str = "pd.full";
    const ATTRIBUTE_NAMES: &'static [&'static str] = &["shape", "value", "dtype", "place"];

    fn interfaces() -> InterfaceSet {
        InterfaceSet::new().with(OpSchemaInterface {
            inputs: &[],
            attributes: Self::ATTRIBUTE_NAMES,
            outputs: &["out"],
        })
    }

    fn verify(op: &Operation<'_>) -> IrResult<()> {
        check_arity(op, 0, 1)?;
        let shape = typed_attribute::<IntArrayAttribute>(op, "shape")?;
        if let Some(dim) = shape.data().data.iter().find(|dim| **dim < 0) {
            return Err(verification_error(op, format!("negative extent {dim} in shape")));
        }
        typed_attribute::<ScalarAttribute>(op, "value")?;
        typed_attribute::<DataTypeAttribute>(op, "dtype")?;
        typed_attribute::<PlaceAttribute>(op, "place")?;
        Ok(())
    }

    fn from_operation_unchecked(op: OperationRef<'ctx>) -> Self {
        Self(op)
    }

    fn operation(&self) -> OperationRef<'ctx> {
        self.0
    }
}

/// Attributes of a 2-D convolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conv2dParams {
    pub strides: Vec<i64>,
    /// Either `[h, w]` or `[top, bottom, left, right]`.
    pub paddings: Vec<i64>,
    /// `EXPLICIT`, `SAME` or `VALID`.
    pub padding_algorithm: String,
    pub dilations: Vec<i64>,
    pub groups: i32,
    /// `NCHW`, `NHWC` or `AnyLayout`.
    pub data_format: String,
}

impl Default for Conv2dParams {
    fn default() -> Self {
        Self {
            strides: vec![1, 1],
            paddings: vec![0, 0],
            padding_algorithm: "EXPLICIT".to_string(),
            dilations: vec![1, 1],
            groups: 1,
            data_format: "NCHW".to_string(),
        }
    }
}

impl Conv2dParams {
    /// `(top, bottom, left, right)` padding, or `None` if the list is malformed.
    fn explicit_paddings(&self) -> Option<[i64; 4]> {
        if self.padding_algorithm == "VALID" {
            return Some([0; 4]);
        }
        match self.paddings[..] {
            [h, w] => Some([h, h, w, w]),
            [top, bottom, left, right] => Some([top, bottom, left, right]),
            _ => None,
        }
    }

    /// Extent of one spatial output dimension, `None` if the stride or
    /// dilation along `axis` is missing or not positive, or if the dilated
    /// kernel does not fit in the padded input.
    fn output_extent(&self, input: i64, kernel: i64, axis: usize, pads: (i64, i64)) -> Option<i64> {
        let stride = *self.strides.get(axis)?;
        let dilation = *self.dilations.get(axis)?;
        if stride < 1 || dilation < 1 {
            return None;
        }
        if input < 0 || kernel < 0 {
            return Some(DYNAMIC_DIM);
        }
        if self.padding_algorithm == "SAME" {
            return (input > 0).then(|| (input + stride - 1) / stride);
        }
        let span = input + pads.0 + pads.1 - (dilation * (kernel - 1) + 1);
        (span >= 0).then(|| span / stride + 1)
    }

    /// Output shape for an `input` and an OIHW `filter`, both 4-D.
    fn infer_shape(&self, input: &[i64], filter: &[i64]) -> Option<Vec<i64>> {
        let ([n, c, h, w], [o, _, kh, kw]) = (input, filter) else {
            return None;
        };
        let channels_last = self.data_format == "NHWC";
        let (h, w) = if channels_last { (*c, *h) } else { (*h, *w) };
        let [top, bottom, left, right] = self.explicit_paddings()?;
        let out_h = self.output_extent(h, *kh, 0, (top, bottom))?;
        let out_w = self.output_extent(w, *kw, 1, (left, right))?;
        Some(if channels_last {
            vec![*n, out_h, out_w, *o]
        } else {
            vec![*n, *o, out_h, out_w]
        })
    }
}

impl Conv2dParams {
    /// Read the parameters back from the attributes of `op`.
    fn from_operation(op: &Operation<'_>) -> IrResult<Self> {
        Ok(Self {
            strides: typed_attribute::<IntArrayAttribute>(op, "strides")?.data().data.clone(),
            paddings: typed_attribute::<IntArrayAttribute>(op, "paddings")?.data().data.clone(),
            padding_algorithm: typed_attribute::<StrAttribute>(op, "padding_algorithm")?
                .data()
                .to_string(),
            dilations: typed_attribute::<IntArrayAttribute>(op, "dilations")?.data().data.clone(),
            groups: typed_attribute::<Int32Attribute>(op, "groups")?.data(),
            data_format: typed_attribute::<StrAttribute>(op, "data_format")?.data().to_string(),
        })
    }
}

/// Whether two shapes agree, a dynamic extent matching anything.
fn shapes_agree(lhs: &[i64], rhs: &[i64]) -> bool {
    lhs.len() == rhs.len()
        && lhs
            .iter()
            .zip(rhs)
            .all(|(a, b)| *a == DYNAMIC_DIM || *b == DYNAMIC_DIM || a == b)
}

op_view!(
    /// 2-D convolution of `input` by `filter`.
    Conv2dOp
);

impl<'ctx> Conv2dOp<'ctx> {
    pub fn build(
        ctx: &'ctx IrContext,
        input: OpResult<'ctx>,
        filter: OpResult<'ctx>,
        params: Conv2dParams,
    ) -> IrResult<Self> {
        let output_type = match (
            input.ty().dyn_cast::<DenseTensorType>(),
            filter.ty().dyn_cast::<DenseTensorType>(),
        ) {
            (Some(input_ty), Some(filter_ty)) => params
                .infer_shape(input_ty.dims(), filter_ty.dims())
                .map(|dims| {
                    let desc = DenseTensorDesc::new(input_ty.dtype(), dims)
                        .with_layout(input_ty.layout());
                    Type::from(DenseTensorType::get(ctx, desc))
                }),
            _ => None,
        };
        let output_type = output_type.unwrap_or_else(|| {
            debug!("Could not infer the result shape of `{}`, reusing the input type", Self::NAME);
            input.ty()
        });

        let mut argument = OperationArgument::from_name(ctx, Self::NAME)?;
        argument
            .add_operands([input, filter])
            .add_type(output_type)
            .add_attribute("strides", IntArrayAttribute::get(ctx, params.strides))
            .add_attribute("paddings", IntArrayAttribute::get(ctx, params.paddings))
            .add_attribute(
                "padding_algorithm",
                StrAttribute::get(ctx, params.padding_algorithm),
            )
            .add_attribute("dilations", IntArrayAttribute::get(ctx, params.dilations))
            .add_attribute("groups", Int32Attribute::get(ctx, params.groups))
            .add_attribute("data_format", StrAttribute::get(ctx, params.data_format));
        Ok(Self(argument.build()))
    }

    pub fn input(&self) -> OpResult<'ctx> {
        self.0.operand_source(0)
    }

    pub fn filter(&self) -> OpResult<'ctx> {
        self.0.operand_source(1)
    }

    pub fn out(&self) -> OpResult<'ctx> {
        self.0.result(0)
    }

    pub fn strides(&self) -> &'ctx [i64] {
        &expect_attribute::<IntArrayAttribute>(&self.0, "strides").data().data
    }

    pub fn paddings(&self) -> &'ctx [i64] {
        &expect_attribute::<IntArrayAttribute>(&self.0, "paddings").data().data
    }

    pub fn dilations(&self) -> &'ctx [i64] {
        &expect_attribute::<IntArrayAttribute>(&self.0, "dilations").data().data
    }

    pub fn padding_algorithm(&self) -> &'ctx str {
        expect_attribute::<StrAttribute>(&self.0, "padding_algorithm").data()
    }

    pub fn groups(&self) -> i32 {
        expect_attribute::<Int32Attribute>(&self.0, "groups").data()
    }

    pub fn data_format(&self) -> &'ctx str {
        expect_attribute::<StrAttribute>(&self.0, "data_format").data()
    }
}

impl<'ctx> Op<'ctx> for Conv2dOp<'ctx> {
    const NAME: &'static str = "pd.conv2d";
    const ATTRIBUTE_NAMES: &'static [&'static str] = &[
        "strides",
        "paddings",
        "padding_algorithm",
        "dilations",
        "groups",
        "data_format",
    ];

    fn traits() -> TraitSet {
        TraitSet::new().with::<ReadOnlyTrait>()
    }

    fn interfaces() -> InterfaceSet {
        InterfaceSet::new().with(OpSchemaInterface {
            inputs: &["input", "filter"],
            attributes: Self::ATTRIBUTE_NAMES,
            outputs: &["out"],
        })
    }

    fn verify(op: &Operation<'_>) -> IrResult<()> {
        check_arity(op, 2, 1)?;
        verify_required_attributes(op, Self::ATTRIBUTE_NAMES)?;

        for name in ["strides", "dilations"] {
            let values = typed_attribute::<IntArrayAttribute>(op, name)?;
            let values = &values.data().data;
            if values.len() != 2 || values.iter().any(|v| *v < 1) {
                return Err(verification_error(
                    op,
                    format!("`{name}` must hold two positive values, found {values:?}"),
                ));
            }
        }

        let paddings = typed_attribute::<IntArrayAttribute>(op, "paddings")?;
        if !matches!(paddings.data().data.len(), 2 | 4) {
            return Err(verification_error(op, "`paddings` must hold 2 or 4 values"));
        }

        let algorithm = typed_attribute::<StrAttribute>(op, "padding_algorithm")?;
        if !matches!(algorithm.data(), "EXPLICIT" | "SAME" | "VALID") {
            return Err(verification_error(
                op,
                format!("unknown padding algorithm `{}`", algorithm.data()),
            ));
        }

        let groups = typed_attribute::<Int32Attribute>(op, "groups")?;
        if groups.data() < 1 {
            return Err(verification_error(op, "`groups` must be at least 1"));
        }

        let format = typed_attribute::<StrAttribute>(op, "data_format")?;
        if !matches!(format.data(), "NCHW" | "NHWC" | "AnyLayout") {
            return Err(verification_error(
                op,
                format!("unknown data format `{}`", format.data()),
            ));
        }

        let (Some(input), Some(filter)) = (
            op.operand_source(0).ty().dyn_cast::<DenseTensorType>(),
            op.operand_source(1).ty().dyn_cast::<DenseTensorType>(),
        ) else {
            return Ok(());
        };
        let params = Conv2dParams::from_operation(op)?;
        let Some(expected) = params.infer_shape(input.dims(), filter.dims()) else {
            return Err(verification_error(
                op,
                format!(
                    "input {:?} and filter {:?} do not yield a valid output shape",
                    input.dims(),
                    filter.dims()
                ),
            ));
        };
        let result = op.result(0).ty();
        match result.dyn_cast::<DenseTensorType>() {
            Some(out) if shapes_agree(out.dims(), &expected) => Ok(()),
            _ => Err(verification_error(
                op,
                format!("result type `{result}` does not match the inferred shape {expected:?}"),
            )),
        }
    }

    fn from_operation_unchecked(op: OperationRef<'ctx>) -> Self {
        Self(op)
    }

    fn operation(&self) -> OperationRef<'ctx> {
        self.0
    }
}

op_view!(
    /// Logical "or" reduction of a boolean tensor along `axis`.
    AnyOp
);

/// Reduced dims of `dims` along `axis`; an empty `axis` reduces everything.
fn reduce_dims(dims: &[i64], axis: &[i64], keepdim: bool) -> Vec<i64> {
    let rank = dims.len() as i64;
    let axes: SmallVec<[i64; 4]> = axis
        .iter()
        .map(|a| if *a < 0 { a + rank } else { *a })
        .collect();
    let reduce_all = axes.is_empty() || (0..rank).all(|d| axes.contains(&d));

    (0..rank)
        .zip(dims)
        .filter_map(|(d, dim)| match (reduce_all || axes.contains(&d), keepdim) {
            (true, true) => Some(1),
            (true, false) => None,
            (false, _) => Some(*dim),
        })
        .collect()
}

impl<'ctx> AnyOp<'ctx> {
    pub fn build(
        ctx: &'ctx IrContext,
        x: OpResult<'ctx>,
        axis: impl Into<IntArray>,
        keepdim: bool,
    ) -> IrResult<Self> {
        let axis = axis.into();
        let output_type = match x.ty().dyn_cast::<DenseTensorType>() {
            Some(x_ty) => {
                let dims = reduce_dims(x_ty.dims(), &axis.data, keepdim);
                let desc = DenseTensorDesc::new(DataType::Bool, dims).with_layout(x_ty.layout());
                Type::from(DenseTensorType::get(ctx, desc))
            }
            None => x.ty(),
        };

        let mut argument = OperationArgument::from_name(ctx, Self::NAME)?;
        argument
            .add_operand(x)
            .add_type(output_type)
            .add_attribute("axis", IntArrayAttribute::get(ctx, axis))
            .add_attribute("keepdim", BoolAttribute::get(ctx, keepdim));
        Ok(Self(argument.build()))
    }

    pub fn x(&self) -> OpResult<'ctx> {
        self.0.operand_source(0)
    }

    pub fn out(&self) -> OpResult<'ctx> {
        self.0.result(0)
    }

    pub fn axis(&self) -> &'ctx [i64] {
        &expect_attribute::<IntArrayAttribute>(&self.0, "axis").data().data
    }

    pub fn keepdim(&self) -> bool {
        expect_attribute::<BoolAttribute>(&self.0, "keepdim").data()
    }
}

impl<'ctx> Op<'ctx> for AnyOp<'ctx> {
    const NAME: &'static str = "pd.any";
    const ATTRIBUTE_NAMES: &'static [&'static str] = &["axis", "keepdim"];

    fn traits() -> TraitSet {
        TraitSet::new().with::<ReadOnlyTrait>()
    }

    fn interfaces() -> InterfaceSet {
        InterfaceSet::new().with(OpSchemaInterface {
            inputs: &["x"],
            attributes: Self::ATTRIBUTE_NAMES,
            outputs: &["out"],
        })
    }

    fn verify(op: &Operation<'_>) -> IrResult<()> {
        check_arity(op, 1, 1)?;
        typed_attribute::<IntArrayAttribute>(op, "axis")?;
        typed_attribute::<BoolAttribute>(op, "keepdim")?;
        Ok(())
    }

    fn from_operation_unchecked(op: OperationRef<'ctx>) -> Self {
        Self(op)
    }

    fn operation(&self) -> OperationRef<'ctx> {
        self.0
    }
}

op_view!(
    /// Rectified linear unit computed in place.
    ReluInplaceOp
);

impl<'ctx> ReluInplaceOp<'ctx> {
    pub fn build(ctx: &'ctx IrContext, x: OpResult<'ctx>) -> IrResult<Self> {
        let mut argument = OperationArgument::from_name(ctx, Self::NAME)?;
        argument.add_operand(x).add_type(x.ty());
        Ok(Self(argument.build()))
    }

    pub fn x(&self) -> OpResult<'ctx> {
        self.0.operand_source(0)
    }

    pub fn out(&self) -> OpResult<'ctx> {
        self.0.result(0)
    }
}

impl<'ctx> Op<'ctx> for ReluInplaceOp<'ctx> {
    const NAME: &'static str = "pd.relu_";

    fn traits() -> TraitSet {
        TraitSet::new().with::<InplaceTrait>()
    }

    fn interfaces() -> InterfaceSet {
        InterfaceSet::new().with(OpSchemaInterface {
            inputs: &["x"],
            attributes: &[],
            outputs: &["out"],
        })
    }

    fn verify(op: &Operation<'_>) -> IrResult<()> {
        check_arity(op, 1, 1)?;
        if op.operand_source(0).ty() != op.result(0).ty() {
            return Err(verification_error(op, "result type must match the operand type"));
        }
        Ok(())
    }

    fn from_operation_unchecked(op: OperationRef<'ctx>) -> Self {
        Self(op)
    }

    fn operation(&self) -> OperationRef<'ctx> {
        self.0
    }
}
