//! Operation kinds and their capabilities
//!
//! Every operation points to an [`OpInfo`], the registered description of its
//! kind. An `OpInfo` carries an explicit capability table:
//!
//! - trait tags ([`OpTrait`]): zero-sized markers such as "read only",
//! - interface concepts ([`OpInterface`]): tables of functions implemented by
//!   the kind,
//! - the names of the attributes the kind expects and an optional verifier.
//!
//! Typed views over operations are obtained with
//! [`Operation::dyn_cast`](crate::operation::Operation::dyn_cast), which is
//! driven by the [`CastTarget`] trait implemented for op kinds ([`Op`]), for
//! [`TraitView`] and for [`InterfaceView`].
use std::{
    any::{Any, TypeId, type_name},
    fmt,
    marker::PhantomData,
    ops::Deref,
};

use smallvec::SmallVec;

use crate::{
    context::IrContext,
    operation::{Operation, OperationRef},
    utils::error::{IrError, IrResult},
};

/// Capability tag declared by an op kind. Implementors are usually unit structs.
pub trait OpTrait: Send + Sync + 'static {}

/// Interface concept: a table of functions an op kind provides for an interface.
pub trait OpInterface: Send + Sync + 'static {}

/// Signature of the verifier hook stored in [`OpInfo`].
pub type VerifyFn = for<'a, 'ctx> fn(&'a Operation<'ctx>) -> IrResult<()>;

/// Set of trait tags declared by an op kind.
#[derive(Debug, Clone, Default)]
pub struct TraitSet {
    ids: SmallVec<[TypeId; 4]>,
    names: SmallVec<[&'static str; 4]>,
}

impl TraitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the trait `T`.
    pub fn with<T: OpTrait>(mut self) -> Self {
        let id = TypeId::of::<T>();
        if !self.ids.contains(&id) {
            self.ids.push(id);
            self.names.push(type_name::<T>());
        }
        self
    }

    pub fn contains<T: OpTrait>(&self) -> bool {
        self.ids.contains(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Interface concepts implemented by an op kind, keyed by concept type.
#[derive(Default)]
pub struct InterfaceSet {
    concepts: Vec<(TypeId, &'static str, Box<dyn Any + Send + Sync>)>,
}

impl InterfaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `concept` as this kind's implementation of interface `I`.
    /// A second registration of the same interface replaces the first.
    pub fn with<I: OpInterface>(mut self, concept: I) -> Self {
        let id = TypeId::of::<I>();
        self.concepts.retain(|(existing, _, _)| *existing != id);
        self.concepts.push((id, type_name::<I>(), Box::new(concept)));
        self
    }

    pub fn get<I: OpInterface>(&self) -> Option<&I> {
        let id = TypeId::of::<I>();
        self.concepts
            .iter()
            .find(|(existing, _, _)| *existing == id)
            .and_then(|(_, _, concept)| concept.downcast_ref::<I>())
    }

    pub fn contains<I: OpInterface>(&self) -> bool {
        self.get::<I>().is_some()
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

impl fmt::Debug for InterfaceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.concepts.iter().map(|(_, name, _)| name))
            .finish()
    }
}

/// A kind of operation, viewed through a typed wrapper around an [`OperationRef`].
///
/// ```rust
/// # use pir::prelude::*;
/// #[derive(Debug, Clone, Copy)]
/// struct NopOp<'ctx>(OperationRef<'ctx>);
///
/// impl<'ctx> Op<'ctx> for NopOp<'ctx> {
///     const NAME: &'static str = "test.nop";
///
///     fn from_operation_unchecked(op: OperationRef<'ctx>) -> Self {
///         Self(op)
///     }
///
///     fn operation(&self) -> OperationRef<'ctx> {
///         self.0
///     }
/// }
///
/// let ctx = IrContext::new();
/// ctx.register_op::<NopOp>().unwrap();
/// let info = ctx.op_info("test.nop").unwrap();
/// let op = Operation::create(vec![], vec![], AttributeMap::new(), info);
/// assert_eq!(op.dyn_cast::<NopOp>().operation(), op);
/// unsafe { op.destroy() };
/// ```
pub trait Op<'ctx>: Copy + Sized {
    /// Fully qualified name, `dialect.operation`.
    const NAME: &'static str;

    /// Attributes every instance of this kind is expected to carry.
    const ATTRIBUTE_NAMES: &'static [&'static str] = &[];

    fn traits() -> TraitSet {
        TraitSet::new()
    }

    fn interfaces() -> InterfaceSet {
        InterfaceSet::new()
    }

    /// Check an operation of this kind. The default checks that every name in
    /// [`Self::ATTRIBUTE_NAMES`] is present.
    fn verify(op: &Operation<'_>) -> IrResult<()> {
        verify_required_attributes(op, Self::ATTRIBUTE_NAMES)
    }

    /// Wrap `op` without checking its kind.
    fn from_operation_unchecked(op: OperationRef<'ctx>) -> Self;

    fn operation(&self) -> OperationRef<'ctx>;
}

/// Fails with [`IrError::VerificationFailed`] naming the first missing attribute.
pub fn verify_required_attributes(op: &Operation<'_>, names: &[&str]) -> IrResult<()> {
    match names.iter().find(|name| !op.attributes().contains(name)) {
        Some(missing) => Err(IrError::VerificationFailed {
            op: op.name().to_string(),
            reason: format!("missing required attribute `{missing}`"),
        }),
        None => Ok(()),
    }
}

/// Registered description of an op kind. Owned by the context.
pub struct OpInfoImpl {
    name: &'static str,
    attribute_names: &'static [&'static str],
    traits: TraitSet,
    interfaces: InterfaceSet,
    verify: VerifyFn,
}

impl OpInfoImpl {
    pub(crate) fn new<'a, O: Op<'a>>() -> Self {
        Self {
            name: O::NAME,
            attribute_names: O::ATTRIBUTE_NAMES,
            traits: O::traits(),
            interfaces: O::interfaces(),
            verify: O::verify,
        }
    }
}

/// Copyable handle to a registered op kind; compares by identity.
#[derive(Clone, Copy)]
pub struct OpInfo<'ctx> {
    imp: &'ctx OpInfoImpl,
    ctx: &'ctx IrContext,
}

impl<'ctx> OpInfo<'ctx> {
    pub(crate) fn from_impl(imp: &'ctx OpInfoImpl, ctx: &'ctx IrContext) -> Self {
        Self { imp, ctx }
    }

    /// The context this kind is registered in.
    pub fn ctx(&self) -> &'ctx IrContext {
        self.ctx
    }

    /// Fully qualified name of the kind.
    pub fn name(&self) -> &'static str {
        self.imp.name
    }

    /// Dialect prefix of the name.
    pub fn dialect_name(&self) -> &'static str {
        self.imp
            .name
            .split_once('.')
            .map_or(self.imp.name, |(dialect, _)| dialect)
    }

    pub fn attribute_names(&self) -> &'static [&'static str] {
        self.imp.attribute_names
    }

    pub fn has_trait<T: OpTrait>(&self) -> bool {
        self.imp.traits.contains::<T>()
    }

    pub fn has_interface<I: OpInterface>(&self) -> bool {
        self.imp.interfaces.contains::<I>()
    }

    /// The concept registered for interface `I`, if any.
    pub fn interface<I: OpInterface>(&self) -> Option<&'ctx I> {
        self.imp.interfaces.get::<I>()
    }

    pub fn traits(&self) -> &'ctx TraitSet {
        &self.imp.traits
    }

    pub(crate) fn verify(&self, op: &Operation<'_>) -> IrResult<()> {
        (self.imp.verify)(op)
    }
}

impl PartialEq for OpInfo<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.imp, other.imp)
    }
}

impl Eq for OpInfo<'_> {}

impl std::hash::Hash for OpInfo<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.imp, state);
    }
}

impl fmt::Debug for OpInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpInfo")
            .field("name", &self.imp.name)
            .field("traits", &self.imp.traits.names)
            .field("interfaces", &self.imp.interfaces)
            .finish()
    }
}

/// View of an operation whose kind declares the trait `T`.
pub struct TraitView<'ctx, T: OpTrait> {
    op: OperationRef<'ctx>,
    _trait: PhantomData<fn() -> T>,
}

impl<'ctx, T: OpTrait> TraitView<'ctx, T> {
    pub fn operation(&self) -> OperationRef<'ctx> {
        self.op
    }
}

impl<T: OpTrait> Clone for TraitView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: OpTrait> Copy for TraitView<'_, T> {}

impl<T: OpTrait> fmt::Debug for TraitView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraitView<{}>({:?})", type_name::<T>(), self.op)
    }
}

/// View of an operation whose kind implements the interface `I`.
///
/// Dereferences to the concept, so interface functions are reachable directly.
pub struct InterfaceView<'ctx, I: OpInterface> {
    op: OperationRef<'ctx>,
    concept: &'ctx I,
}

impl<'ctx, I: OpInterface> InterfaceView<'ctx, I> {
    pub fn operation(&self) -> OperationRef<'ctx> {
        self.op
    }

    pub fn concept(&self) -> &'ctx I {
        self.concept
    }
}

impl<I: OpInterface> Clone for InterfaceView<'_, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I: OpInterface> Copy for InterfaceView<'_, I> {}

impl<I: OpInterface> Deref for InterfaceView<'_, I> {
    type Target = I;

    fn deref(&self) -> &I {
        self.concept
    }
}

impl<I: OpInterface> fmt::Debug for InterfaceView<'_, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceView<{}>({:?})", type_name::<I>(), self.op)
    }
}

/// Something an operation can be cast to: an op kind, a trait view or an
/// interface view.
pub trait CastTarget<'ctx>: Sized {
    /// The view of `op`, or `None` if the capability is absent.
    fn try_cast(op: OperationRef<'ctx>) -> Option<Self>;

    /// Human readable description of the target, used in cast failures.
    fn describe() -> String;
}

impl<'ctx, O: Op<'ctx>> CastTarget<'ctx> for O {
    fn try_cast(op: OperationRef<'ctx>) -> Option<Self> {
        (op.name() == O::NAME).then(|| O::from_operation_unchecked(op))
    }

    fn describe() -> String {
        format!("op `{}`", O::NAME)
    }
}

impl<'ctx, T: OpTrait> CastTarget<'ctx> for TraitView<'ctx, T> {
    fn try_cast(op: OperationRef<'ctx>) -> Option<Self> {
        op.info().has_trait::<T>().then_some(TraitView {
            op,
            _trait: PhantomData,
        })
    }

    fn describe() -> String {
        format!("trait `{}`", type_name::<T>())
    }
}

impl<'ctx, I: OpInterface> CastTarget<'ctx> for InterfaceView<'ctx, I> {
    fn try_cast(op: OperationRef<'ctx>) -> Option<Self> {
        op.info()
            .interface::<I>()
            .map(|concept| InterfaceView { op, concept })
    }

    fn describe() -> String {
        format!("interface `{}`", type_name::<I>())
    }
}
