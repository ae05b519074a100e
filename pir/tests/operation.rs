use pir::{
    attribute::builtin::{Int32Attribute, Int64Attribute, StrAttribute},
    dialect::builtin::GetParameterOp,
    prelude::*,
    types::builtin::{
        BFloat16Type, BoolType, Float16Type, Float32Type, Float64Type, IndexType, Int8Type,
        Int16Type, Int32Type, Int64Type, UInt8Type,
    },
};

struct PureTrait;
impl OpTrait for PureTrait {}

struct CostInterface {
    cost: fn(&Operation<'_>) -> u32,
}
impl OpInterface for CostInterface {}

#[derive(Debug, Clone, Copy)]
struct AddOp<'ctx>(OperationRef<'ctx>);

impl<'ctx> Op<'ctx> for AddOp<'ctx> {
    const NAME: &'static str = "test.add";
    const ATTRIBUTE_NAMES: &'static [&'static str] = &["groups"];

    fn traits() -> TraitSet {
        TraitSet::new().with::<PureTrait>()
    }

    fn interfaces() -> InterfaceSet {
        InterfaceSet::new().with(CostInterface {
            cost: |op| op.num_operands() * 10,
        })
    }

    fn from_operation_unchecked(op: OperationRef<'ctx>) -> Self {
        Self(op)
    }

    fn operation(&self) -> OperationRef<'ctx> {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct SinkOp<'ctx>(OperationRef<'ctx>);

impl<'ctx> Op<'ctx> for SinkOp<'ctx> {
    const NAME: &'static str = "test.sink";

    fn from_operation_unchecked(op: OperationRef<'ctx>) -> Self {
        Self(op)
    }

    fn operation(&self) -> OperationRef<'ctx> {
        self.0
    }
}

struct TestDialect;

impl Dialect for TestDialect {
    const NAME: &'static str = "test";

    fn initialize(ctx: &IrContext) -> IrResult<()> {
        ctx.register_op::<AddOp>()?;
        ctx.register_op::<SinkOp>()?;
        Ok(())
    }
}

fn context() -> IrContext {
    let ctx = IrContext::new();
    ctx.register_dialect::<TestDialect>().unwrap();
    ctx
}

fn parameter<'ctx>(ctx: &'ctx IrContext, name: &str) -> OpResult<'ctx> {
    GetParameterOp::build(ctx, name, Float32Type::get(ctx))
        .unwrap()
        .result()
}

#[test]
fn layout_keeps_every_slot_reachable() {
    let ctx = context();
    let a = parameter(&ctx, "a");
    let b = parameter(&ctx, "b");

    let mut argument = OperationArgument::from_name(&ctx, "test.add").unwrap();
    argument
        .add_operands([a, b])
        .add_type(Float32Type::get(&ctx))
        .add_attribute("groups", Int32Attribute::get(&ctx, 2));
    let op = argument.build();

    assert_eq!(op.num_operands(), 2);
    assert_eq!(op.num_results(), 1);
    assert_eq!(op.operand_source(0), a);
    assert_eq!(op.operand_source(1), b);
    assert_eq!(op.operand(1).index(), 1);
    assert_eq!(op.operand(0).owner(), op);

    let result = op.result(0);
    assert_eq!(result.owner(), op);
    assert_eq!(result.index(), 0);
    assert_eq!(result.ty(), Type::from(Float32Type::get(&ctx)));
    assert_eq!(
        op.attribute("groups").and_then(|g| g.dyn_cast::<Int32Attribute>()).map(|g| g.data()),
        Some(2)
    );
    assert!(op.verify().is_ok());

    let (a_op, b_op) = (a.owner(), b.owner());
    unsafe {
        op.destroy();
        a_op.destroy();
        b_op.destroy();
    }
}

#[test]
fn builder_accumulates_and_overwrites() {
    let ctx = context();
    let info = ctx.op_info("test.sink").unwrap();
    let mut argument = OperationArgument::new(info);
    argument
        .add_types([Float32Type::get(&ctx), Float32Type::get(&ctx)])
        .add_type(Int64Type::get(&ctx))
        .add_attribute("name", StrAttribute::get(&ctx, "first"))
        .add_attributes([("axis", Attribute::from(Int32Attribute::get(&ctx, 1)))])
        .add_attribute("name", StrAttribute::get(&ctx, "second"));

    assert_eq!(argument.output_types().len(), 3);
    assert_eq!(argument.attributes().len(), 2);

    let op = Operation::create_from_argument(argument);
    let names: Vec<_> = op.attributes().iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["name", "axis"]);
    assert_eq!(
        op.attribute("name").and_then(|n| n.dyn_cast::<StrAttribute>()).map(|n| n.data()),
        Some("second")
    );
    assert_eq!(op.result(2).ty(), Type::from(Int64Type::get(&ctx)));
    unsafe { op.destroy() };
}

#[test]
fn unregistered_names_are_reported() {
    let ctx = IrContext::new();
    let err = OperationArgument::from_name(&ctx, "test.add").unwrap_err();
    assert!(err.is_unregistered_operation());
}

#[test]
fn missing_attributes_fail_verification() {
    let ctx = context();
    let info = ctx.op_info("test.add").unwrap();
    let op = Operation::create(vec![], vec![], AttributeMap::new(), info);
    let err = op.verify().unwrap_err();
    assert!(err.is_verification_failed());
    assert!(err.to_string().contains("groups"));
    unsafe { op.destroy() };
}

#[test]
#[should_panic(expected = "result index 1 out of range")]
fn result_index_is_checked() {
    let ctx = context();
    let info = ctx.op_info("test.sink").unwrap();
    let op = Operation::create(vec![], vec![Float32Type::get(&ctx).into()], AttributeMap::new(), info);
    op.result(1);
}

#[test]
#[should_panic(expected = "operand index 0 out of range")]
fn operand_index_is_checked() {
    let ctx = context();
    let info = ctx.op_info("test.sink").unwrap();
    let op = Operation::create(vec![], vec![], AttributeMap::new(), info);
    op.operand(0);
}

#[test]
fn capabilities_drive_casts() {
    let ctx = context();
    let add = Operation::create(vec![], vec![], AttributeMap::new(), ctx.op_info("test.add").unwrap());
    let sink = Operation::create(vec![], vec![], AttributeMap::new(), ctx.op_info("test.sink").unwrap());

    assert!(add.has_trait::<PureTrait>());
    assert!(add.has_interface::<CostInterface>());
    assert!(!sink.has_trait::<PureTrait>());

    assert_eq!(add.dyn_cast::<AddOp>().operation(), add);
    assert_eq!(add.dyn_cast::<TraitView<PureTrait>>().operation(), add);
    let cost = add.dyn_cast::<InterfaceView<CostInterface>>();
    assert_eq!((cost.cost)(&cost.operation()), 0);

    assert!(sink.isa::<SinkOp>());
    assert!(!sink.isa::<AddOp>());
    assert!(sink.try_cast::<TraitView<PureTrait>>().is_none());
    assert!(sink.try_cast::<InterfaceView<CostInterface>>().is_none());

    unsafe {
        add.destroy();
        sink.destroy();
    }
}

#[test]
#[should_panic(expected = "can't dyn_cast `test.sink` to op `test.add`")]
fn invalid_cast_panics() {
    let ctx = context();
    let sink = Operation::create(vec![], vec![], AttributeMap::new(), ctx.op_info("test.sink").unwrap());
    sink.dyn_cast::<AddOp>();
}

#[test]
fn use_lists_follow_operands() {
    let ctx = context();
    let a = parameter(&ctx, "a");
    let b = parameter(&ctx, "b");
    let info = ctx.op_info("test.sink").unwrap();

    let first = Operation::create(vec![a, a], vec![], AttributeMap::new(), info);
    let second = Operation::create(vec![a], vec![], AttributeMap::new(), info);
    assert_eq!(a.num_uses(), 3);
    assert!(b.use_empty());
    assert!(a.uses().all(|operand| operand.source() == a));

    second.operand(0).set_source(b);
    assert_eq!(a.num_uses(), 2);
    assert_eq!(b.uses().map(|operand| operand.owner()).collect::<Vec<_>>(), [second]);

    a.replace_all_uses_with(b);
    assert!(a.use_empty());
    assert_eq!(b.num_uses(), 3);
    assert_eq!(first.operand_source(1), b);

    unsafe { first.destroy() };
    assert_eq!(b.num_uses(), 1);
    unsafe { second.destroy() };
    assert!(b.use_empty());

    let (a_op, b_op) = (a.owner(), b.owner());
    unsafe {
        a_op.destroy();
        b_op.destroy();
    }
}

#[test]
#[should_panic(expected = "still has 1 uses")]
fn destroying_a_used_value_panics() {
    let ctx = context();
    let a = parameter(&ctx, "a");
    let info = ctx.op_info("test.sink").unwrap();
    let _user = Operation::create(vec![a], vec![], AttributeMap::new(), info);
    unsafe { a.owner().destroy() };
}

#[test]
fn program_owns_and_erases_operations() {
    let ctx = context();
    let mut program = Program::new(&ctx);
    let a = parameter(&ctx, "a");
    let info = ctx.op_info("test.sink").unwrap();
    let sink = Operation::create(vec![a], vec![], AttributeMap::new(), info);
    program.as_mut().push_back(a.owner());
    program.as_mut().push_back(sink);

    assert_eq!(program.ops(), [a.owner(), sink]);
    assert!(sink.parent_program().is_some());

    program.as_mut().erase(sink).unwrap();
    assert_eq!(program.len(), 1);
    assert!(a.use_empty());

    drop(program);
}

#[test]
fn builtin_types_are_distinct() {
    let ctx = IrContext::new();
    let types: Vec<Type> = vec![
        BFloat16Type::get(&ctx).into(),
        Float16Type::get(&ctx).into(),
        Float32Type::get(&ctx).into(),
        Float64Type::get(&ctx).into(),
        Int8Type::get(&ctx).into(),
        Int16Type::get(&ctx).into(),
        Int32Type::get(&ctx).into(),
        Int64Type::get(&ctx).into(),
        UInt8Type::get(&ctx).into(),
        BoolType::get(&ctx).into(),
        IndexType::get(&ctx).into(),
    ];

    for (i, lhs) in types.iter().enumerate() {
        for (j, rhs) in types.iter().enumerate() {
            assert_eq!(i == j, lhs == rhs, "{lhs} vs {rhs}");
        }
    }
    let unique: std::collections::HashSet<Type> = types.iter().copied().collect();
    assert_eq!(unique.len(), types.len());
    assert_eq!(Type::from(Float32Type::get(&ctx)), types[2]);
    assert_eq!(ctx.num_interned_types(), types.len());

    let narrow: Attribute = Int32Attribute::get(&ctx, 1).into();
    let wide: Attribute = Int64Attribute::get(&ctx, 1).into();
    assert_ne!(narrow, wide);
}

#[test]
fn operations_know_their_context() {
    let ctx = context();
    let mut argument = OperationArgument::from_name(&ctx, "test.sink").unwrap();
    argument.add_type(Float32Type::get(&ctx));
    assert!(std::ptr::eq(argument.ctx(), &ctx));

    let op = argument.build();
    assert!(std::ptr::eq(op.ctx(), &ctx));
    assert!(std::ptr::eq(op.info().ctx(), &ctx));
    unsafe { op.destroy() };
}

#[test]
fn erasing_a_used_producer_leaves_the_program_intact() {
    let ctx = context();
    let mut program = Program::new(&ctx);
    let a = parameter(&ctx, "a");
    let info = ctx.op_info("test.sink").unwrap();
    let sink = Operation::create(vec![a], vec![], AttributeMap::new(), info);
    program.as_mut().push_back(a.owner());
    program.as_mut().push_back(sink);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        program.as_mut().erase(a.owner())
    }));
    assert!(outcome.is_err());
    assert_eq!(program.ops(), [a.owner(), sink]);
    assert!(a.owner().parent_program().is_some());
    assert_eq!(a.num_uses(), 1);

    drop(program);
}
