use pir::{
    attribute::builtin::{Int32Attribute, StrAttribute},
    prelude::*,
    types::builtin::{Float32Type, Int32Type},
};
use pir_dialect::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn context() -> IrContext {
    let ctx = IrContext::new();
    ctx.register_dialect::<PaddleDialect>().unwrap();
    ctx
}

fn tensor<'ctx>(ctx: &'ctx IrContext, dims: &[i64]) -> Type<'ctx> {
    DenseTensorType::get(ctx, DenseTensorDesc::new(DataType::Float32, dims)).into()
}

#[test]
fn int_arrays_are_uniqued_by_value() {
    let ctx = IrContext::new();
    let first = IntArrayAttribute::get(&ctx, IntArray::new(vec![1i64, 2, 3]));
    let second = IntArrayAttribute::get(&ctx, IntArray::new(vec![1i64, 2, 3]));
    let other = IntArrayAttribute::get(&ctx, IntArray::new(vec![1i64, 2, 4]));

    assert!(std::ptr::eq(first.storage(), second.storage()));
    assert!(!std::ptr::eq(first.storage(), other.storage()));
    assert_eq!(ctx.num_interned_attributes(), 2);
}

#[test]
fn random_keys_respect_uniquing() {
    let ctx = IrContext::new();
    let mut rng = ChaCha20Rng::seed_from_u64(0x5eed);
    let mut interned: Vec<(Scalar, Attribute)> = Vec::new();

    for _ in 0..500 {
        let scalar = match rng.random_range(0..3) {
            0 => Scalar::from(rng.random_range(0i32..8)),
            1 => Scalar::from(rng.random_range(0i64..8)),
            _ => Scalar::from(rng.random_range(0..8) as f32 * 0.5),
        };
        let attr: Attribute = ScalarAttribute::get(&ctx, scalar).into();
        for (key, existing) in &interned {
            assert_eq!(key == &scalar, *existing == attr, "{key} vs {scalar}");
        }
        interned.push((scalar, attr));
    }
}

#[test]
fn conv2d_carries_its_attributes() {
    let ctx = context();
    let input = FeedOp::build(&ctx, "image", tensor(&ctx, &[1, 4, 16, 16])).unwrap();
    let filter = FeedOp::build(&ctx, "filter", tensor(&ctx, &[8, 2, 3, 3])).unwrap();
    let conv = Conv2dOp::build(
        &ctx,
        input.out(),
        filter.out(),
        Conv2dParams {
            paddings: vec![1, 1],
            groups: 2,
            ..Default::default()
        },
    )
    .unwrap();

    let op = conv.operation();
    assert_eq!(op.num_operands(), 2);
    assert_eq!(op.num_results(), 1);
    assert_eq!(op.attributes()["groups"], Attribute::from(Int32Attribute::get(&ctx, 2)));
    assert_eq!(conv.groups(), 2);
    assert_eq!(conv.strides(), [1i64, 1]);
    assert_eq!(conv.data_format(), "NCHW");
    assert_eq!(conv.input(), input.out());
    assert_eq!(conv.filter(), filter.out());
    assert_eq!(conv.out().ty(), tensor(&ctx, &[1, 8, 16, 16]));
    assert!(op.verify().is_ok());

    unsafe {
        op.destroy();
        input.operation().destroy();
        filter.operation().destroy();
    }
}

#[test]
fn verifier_rejects_bad_conv2d_attributes() {
    let ctx = context();
    let input = FeedOp::build(&ctx, "x", tensor(&ctx, &[1, 1, 4, 4])).unwrap();
    let filter = FeedOp::build(&ctx, "w", tensor(&ctx, &[1, 1, 1, 1])).unwrap();

    let mut argument = OperationArgument::from_name(&ctx, Conv2dOp::NAME).unwrap();
    argument
        .add_operands([input.out(), filter.out()])
        .add_type(tensor(&ctx, &[1, 1, 4, 4]))
        .add_attribute("strides", IntArrayAttribute::get(&ctx, [1i64, 1]))
        .add_attribute("paddings", IntArrayAttribute::get(&ctx, [0i64, 0]))
        .add_attribute("padding_algorithm", StrAttribute::get(&ctx, "EXPLICIT"))
        .add_attribute("dilations", IntArrayAttribute::get(&ctx, [1i64, 1]))
        .add_attribute("groups", Int32Attribute::get(&ctx, 0))
        .add_attribute("data_format", StrAttribute::get(&ctx, "NCHW"));
    let op = argument.build();

    let err = op.verify().unwrap_err();
    assert!(err.to_string().contains("`groups` must be at least 1"), "{err}");

    unsafe {
        op.destroy();
        input.operation().destroy();
        filter.operation().destroy();
    }
}

#[test]
fn full_and_any_infer_result_types() {
    let ctx = context();
    let full = FullOp::build(&ctx, [2i64, 3], true, DataType::Bool, Place::cpu()).unwrap();
    assert_eq!(full.shape().data, [2i64, 3]);
    assert_eq!(full.value(), Scalar::from(true));
    assert_eq!(full.dtype(), DataType::Bool);
    assert_eq!(full.place(), Place::cpu());
    assert!(full.operation().verify().is_ok());

    let any = AnyOp::build(&ctx, full.out(), [1i64], true).unwrap();
    assert_eq!(any.axis(), [1i64]);
    assert!(any.keepdim());
    let out = any.out().ty().dyn_cast::<DenseTensorType>().unwrap();
    assert_eq!(out.dims(), [2i64, 1]);
    assert_eq!(out.dtype(), DataType::Bool);

    unsafe {
        any.operation().destroy();
        full.operation().destroy();
    }
}

#[test]
fn capabilities_are_declared_per_kind() {
    let ctx = context();
    let x = FeedOp::build(&ctx, "x", tensor(&ctx, &[4])).unwrap();
    let relu = ReluInplaceOp::build(&ctx, x.out()).unwrap();
    let any = AnyOp::build(&ctx, x.out(), [0i64], false).unwrap();

    assert!(relu.operation().has_trait::<InplaceTrait>());
    assert!(!relu.operation().has_trait::<ReadOnlyTrait>());
    assert!(any.operation().isa::<TraitView<ReadOnlyTrait>>());

    let schema = any.operation().dyn_cast::<InterfaceView<OpSchemaInterface>>();
    assert_eq!(schema.inputs, ["x"]);
    assert_eq!(schema.attributes, ["axis", "keepdim"]);
    assert_eq!(schema.output_index("out"), Some(0));

    let feed_schema = x.operation().dyn_cast::<InterfaceView<OpSchemaInterface>>();
    assert!(feed_schema.inputs.is_empty());
    assert!(x.operation().try_cast::<TraitView<InplaceTrait>>().is_none());

    unsafe {
        any.operation().destroy();
        relu.operation().destroy();
        x.operation().destroy();
    }
}

#[test]
fn programs_print_pd_operations() {
    let ctx = context();
    let mut program = Program::new(&ctx);
    let full = FullOp::build(&ctx, [2i64], 1.5f32, DataType::Float32, Place::cpu()).unwrap();
    let any = AnyOp::build(&ctx, full.out(), [0i64], false).unwrap();
    program.as_mut().push_back(full.operation());
    program.as_mut().push_back(any.operation());

    let text = program.print();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[1],
        "    (%0) = \"pd.full\" () {shape:[2],value:Scalar(float32:1.5),dtype:float32,place:Place(cpu)} : () -> (pd.tensor<2xfloat32>)"
    );
    assert_eq!(
        lines[2],
        "    (%1) = \"pd.any\" (%0) {axis:[0],keepdim:false} : (pd.tensor<2xfloat32>) -> (pd.tensor<bool>)"
    );

    program.as_mut().erase(any.operation()).unwrap();
    assert_eq!(program.len(), 1);
    assert!(full.out().use_empty());
}

#[test]
fn malformed_conv2d_params_reach_the_verifier() {
    let ctx = context();
    let input = FeedOp::build(&ctx, "x", tensor(&ctx, &[1, 1, 8, 8])).unwrap();
    let filter = FeedOp::build(&ctx, "w", tensor(&ctx, &[1, 1, 3, 3])).unwrap();

    let cases = [
        Conv2dParams {
            strides: vec![0, 0],
            ..Default::default()
        },
        Conv2dParams {
            strides: vec![1],
            ..Default::default()
        },
        Conv2dParams {
            dilations: vec![1],
            ..Default::default()
        },
    ];
    for params in cases {
        let conv = Conv2dOp::build(&ctx, input.out(), filter.out(), params).unwrap();
        // Shapes cannot be inferred, so the input type is reused.
        assert_eq!(conv.out().ty(), input.out().ty());
        let err = conv.operation().verify().unwrap_err();
        assert!(err.to_string().contains("must hold two positive values"), "{err}");
        unsafe { conv.operation().destroy() };
    }

    unsafe {
        input.operation().destroy();
        filter.operation().destroy();
    }
}

#[test]
fn oversized_kernels_are_rejected() {
    let ctx = context();
    let input = FeedOp::build(&ctx, "x", tensor(&ctx, &[1, 1, 3, 3])).unwrap();
    let filter = FeedOp::build(&ctx, "w", tensor(&ctx, &[1, 1, 5, 5])).unwrap();

    let conv = Conv2dOp::build(&ctx, input.out(), filter.out(), Conv2dParams::default()).unwrap();
    let out = conv.out().ty().dyn_cast::<DenseTensorType>().unwrap();
    assert!(!out.dims().contains(&DYNAMIC_DIM));
    let err = conv.operation().verify().unwrap_err();
    assert!(err.to_string().contains("do not yield a valid output shape"), "{err}");

    unsafe {
        conv.operation().destroy();
        input.operation().destroy();
        filter.operation().destroy();
    }
}

#[test]
fn conv2d_result_must_match_the_inferred_shape() {
    let ctx = context();
    let input = FeedOp::build(&ctx, "x", tensor(&ctx, &[1, 1, 8, 8])).unwrap();
    let filter = FeedOp::build(&ctx, "w", tensor(&ctx, &[2, 1, 3, 3])).unwrap();
    let params = Conv2dParams::default();

    let mut argument = OperationArgument::from_name(&ctx, Conv2dOp::NAME).unwrap();
    argument
        .add_operands([input.out(), filter.out()])
        .add_type(tensor(&ctx, &[1, 2, 8, 8]))
        .add_attribute("strides", IntArrayAttribute::get(&ctx, params.strides.clone()))
        .add_attribute("paddings", IntArrayAttribute::get(&ctx, params.paddings.clone()))
        .add_attribute("padding_algorithm", StrAttribute::get(&ctx, "EXPLICIT"))
        .add_attribute("dilations", IntArrayAttribute::get(&ctx, params.dilations.clone()))
        .add_attribute("groups", Int32Attribute::get(&ctx, 1))
        .add_attribute("data_format", StrAttribute::get(&ctx, "NCHW"));
    let wrong = argument.build();
    let err = wrong.verify().unwrap_err();
    assert!(err.to_string().contains("does not match the inferred shape"), "{err}");

    let right = Conv2dOp::build(&ctx, input.out(), filter.out(), params).unwrap();
    assert_eq!(right.out().ty(), tensor(&ctx, &[1, 2, 6, 6]));
    assert!(right.operation().verify().is_ok());

    unsafe {
        wrong.destroy();
        right.operation().destroy();
        input.operation().destroy();
        filter.operation().destroy();
    }
}

#[test]
fn inplace_relu_keeps_the_operand_type() {
    let ctx = context();
    let x = FeedOp::build(&ctx, "x", Float32Type::get(&ctx)).unwrap();

    let relu = ReluInplaceOp::build(&ctx, x.out()).unwrap();
    assert!(relu.operation().verify().is_ok());

    let mut argument = OperationArgument::from_name(&ctx, ReluInplaceOp::NAME).unwrap();
    argument.add_operand(x.out()).add_type(Int32Type::get(&ctx));
    let mismatched = argument.build();
    let err = mismatched.verify().unwrap_err();
    assert!(err.to_string().contains("result type must match the operand type"), "{err}");

    unsafe {
        mismatched.destroy();
        relu.operation().destroy();
        x.operation().destroy();
    }
}
