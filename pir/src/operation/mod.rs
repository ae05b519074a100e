//! Operations
//!
//! An [`Operation`] is an immutable graph node: a fixed number of operands,
//! a fixed number of results, named attributes and the [`OpInfo`] of its kind.
//! [`Operation::create`] performs a single allocation holding, in order, the
//! operand slots, the operation body and the result slots,
//! and returns an [`OperationRef`] pointing at the body.
//!
//! Operations are released explicitly with [`OperationRef::destroy`]; in
//! practice the owning [`Program`] does it exactly once.
use std::{
    alloc::{alloc, dealloc, handle_alloc_error},
    cell::Cell,
    fmt,
    hash::Hash,
    ops::Deref,
    ptr::{self, NonNull},
};

use log::trace;

use crate::{
    argument::OperationArgument,
    attribute::{Attribute, AttributeMap},
    context::IrContext,
    op_info::{CastTarget, OpInfo, OpInterface, OpTrait},
    program::Program,
    types::Type,
    utils::error::IrResult,
    value::{OpOperand, OpOperandImpl, OpResult, OpResultImpl},
};

pub(crate) mod layout;

use layout::OperationLayout;

/// Body of an operation, sitting between its operand and result slots.
pub struct Operation<'ctx> {
    attributes: AttributeMap<'ctx>,
    info: OpInfo<'ctx>,
    num_results: u32,
    num_operands: u32,
    parent_program: Cell<Option<NonNull<Program<'ctx>>>>,
}

#[cold]
#[track_caller]
fn index_out_of_range(what: &str, index: u32, count: u32, name: &str) -> ! {
    panic!("{what} index {index} out of range for operation `{name}` with {count} {what}s")
}

impl<'ctx> Operation<'ctx> {
    /// Allocate and construct an operation.
    ///
    /// Nothing is validated: operand arity, types and attributes are checked,
    /// if at all, by the kind's verifier (see [`Operation::verify`]). Allocation
    /// failure aborts through [`handle_alloc_error`].
    pub fn create(
        operands: Vec<OpResult<'ctx>>,
        output_types: Vec<Type<'ctx>>,
        attributes: AttributeMap<'ctx>,
        info: OpInfo<'ctx>,
    ) -> OperationRef<'ctx> {
        let Ok(num_operands) = u32::try_from(operands.len()) else {
            panic!("too many operands for `{}`: {}", info.name(), operands.len());
        };
        let Ok(num_results) = u32::try_from(output_types.len()) else {
            panic!("too many results for `{}`: {}", info.name(), output_types.len());
        };

        let layout = OperationLayout::new(num_operands, num_results);
        // SAFETY: the layout always contains the body, so its size is non-zero.
        let Some(base) = NonNull::new(unsafe { alloc(layout.layout) }) else {
            handle_alloc_error(layout.layout)
        };

        // SAFETY: every write below targets a distinct, properly aligned region
        // of the block computed by `OperationLayout`.
        let body = unsafe {
            let body = base.add(layout.body_offset).cast::<Operation<'ctx>>();
            body.write(Operation {
                attributes,
                info,
                num_results,
                num_operands,
                parent_program: Cell::new(None),
            });

            for (index, source) in (0u32..).zip(operands) {
                let slot = base
                    .add(layout.operand_offset(index))
                    .cast::<OpOperandImpl<'ctx>>();
                slot.write(OpOperandImpl::new(source, body, index));
                slot.as_ref().link();
            }

            for (index, ty) in (0u32..).zip(output_types) {
                let slot = base
                    .add(layout.result_offset(index))
                    .cast::<OpResultImpl<'ctx>>();
                slot.write(OpResultImpl::new(ty, body, index));
            }

            body
        };

        trace!(
            "Created `{}` with {} operands and {} results ({} bytes at {:p})",
            info.name(),
            num_operands,
            num_results,
            layout.layout.size(),
            body
        );

        OperationRef::from_ptr(body)
    }

    /// Create an operation from a filled [`OperationArgument`].
    pub fn create_from_argument(argument: OperationArgument<'ctx>) -> OperationRef<'ctx> {
        let (info, operands, output_types, attributes) = argument.into_parts();
        Self::create(operands, output_types, attributes, info)
    }

    #[inline]
    fn layout(&self) -> OperationLayout {
        OperationLayout::new(self.num_operands, self.num_results)
    }

    /// Start of the block this body lives in.
    #[inline]
    fn base(&self) -> NonNull<u8> {
        let body = NonNull::from(self).cast::<u8>();
        // SAFETY: the body was placed `body_offset` bytes into its block.
        unsafe { body.sub(self.layout().body_offset) }
    }

    /// The `index`-th result. Panics if `index >= num_results()`.
    #[track_caller]
    pub fn result(&self, index: u32) -> OpResult<'ctx> {
        if index >= self.num_results {
            index_out_of_range("result", index, self.num_results, self.name());
        }
        // SAFETY: in range, so the slot was initialized by `create`.
        let slot = unsafe { self.base().add(self.layout().result_offset(index)) };
        OpResult::from_impl(slot.cast())
    }

    /// The `index`-th operand. Panics if `index >= num_operands()`.
    #[track_caller]
    pub fn operand(&self, index: u32) -> OpOperand<'ctx> {
        if index >= self.num_operands {
            index_out_of_range("operand", index, self.num_operands, self.name());
        }
        // SAFETY: in range, so the slot was initialized by `create`.
        let slot = unsafe { self.base().add(self.layout().operand_offset(index)) };
        OpOperand::from_impl(slot.cast())
    }

    /// Value read by the `index`-th operand.
    #[track_caller]
    pub fn operand_source(&self, index: u32) -> OpResult<'ctx> {
        self.operand(index).source()
    }

    pub fn results(&self) -> impl ExactSizeIterator<Item = OpResult<'ctx>> + '_ {
        (0..self.num_results).map(|index| self.result(index))
    }

    pub fn operands(&self) -> impl ExactSizeIterator<Item = OpOperand<'ctx>> + '_ {
        (0..self.num_operands).map(|index| self.operand(index))
    }

    pub fn attributes(&self) -> &AttributeMap<'ctx> {
        &self.attributes
    }

    /// Attribute stored under `name`.
    pub fn attribute(&self, name: &str) -> Option<Attribute<'ctx>> {
        self.attributes.get(name)
    }

    pub fn info(&self) -> OpInfo<'ctx> {
        self.info
    }

    pub fn num_results(&self) -> u32 {
        self.num_results
    }

    pub fn num_operands(&self) -> u32 {
        self.num_operands
    }

    /// Fully qualified name of the operation kind.
    pub fn name(&self) -> &'static str {
        self.info.name()
    }

    pub fn has_trait<T: OpTrait>(&self) -> bool {
        self.info.has_trait::<T>()
    }

    pub fn has_interface<I: OpInterface>(&self) -> bool {
        self.info.has_interface::<I>()
    }

    /// Returns `true` if this operation can be viewed as `T`.
    pub fn isa<T: CastTarget<'ctx>>(&self) -> bool {
        self.try_cast::<T>().is_some()
    }

    /// View this operation as `T`, or `None` if the kind lacks that capability.
    pub fn try_cast<T: CastTarget<'ctx>>(&self) -> Option<T> {
        T::try_cast(OperationRef::from_ptr(NonNull::from(self)))
    }

    /// View this operation as `T`.
    ///
    /// Casting to a kind, trait or interface the operation does not have is a
    /// programming error and panics; query [`Operation::isa`] first when unsure.
    #[track_caller]
    pub fn dyn_cast<T: CastTarget<'ctx>>(&self) -> T {
        match self.try_cast::<T>() {
            Some(view) => view,
            None => panic!("can't dyn_cast `{}` to {}", self.name(), T::describe()),
        }
    }

    /// Run the verifier registered for this operation's kind.
    pub fn verify(&self) -> IrResult<()> {
        self.info.verify(self)
    }

    /// The program owning this operation, if any.
    pub fn parent_program(&self) -> Option<&Program<'ctx>> {
        // SAFETY: the back-reference is set by the owning program, which is
        // pinned and destroys its operations before going away.
        self.parent_program
            .get()
            .map(|program| unsafe { program.as_ref() })
    }

    pub(crate) fn set_parent_program(&self, program: Option<NonNull<Program<'ctx>>>) {
        self.parent_program.set(program);
    }

    /// Panics if a result of this operation still has uses.
    #[track_caller]
    pub(crate) fn assert_results_unused(&self) {
        if let Some(result) = self.results().find(|result| !result.use_empty()) {
            panic!(
                "destroying `{}` while result #{} still has {} uses",
                self.name(),
                result.index(),
                result.num_uses()
            );
        }
    }

    /// Take every operand slot out of its source's use-list, leaving the
    /// sources themselves untouched. Used when a whole group of operations is
    /// torn down at once and def-use order no longer matters.
    ///
    /// # Safety
    /// The operation must not be used afterwards except to be destroyed.
    pub(crate) unsafe fn detach_operands(&self) {
        for operand in self.operands() {
            // SAFETY: slots are linked from construction and unlinking twice is
            // a no-op; the sources are alive by contract.
            unsafe { operand.detach() };
        }
    }

    /// The context this operation was created in.
    pub fn ctx(&self) -> &'ctx IrContext {
        self.info.ctx()
    }

    /// Render this operation alone, using the printer options of its context;
    /// values are numbered locally.
    pub fn print(&self) -> String {
        let mut out = String::new();
        let mut printer = crate::fmt::IrPrinter::new(&mut out, self.ctx().config().printer.clone());
        match printer.print_operation(self) {
            Ok(()) => out,
            Err(_) => unreachable!("writing to a String cannot fail"),
        }
    }
}

impl fmt::Debug for Operation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name())
            .field("num_operands", &self.num_operands)
            .field("num_results", &self.num_results)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Copyable handle to a live operation.
///
/// The handle is a plain pointer to the body: it stays valid from
/// [`Operation::create`] until [`OperationRef::destroy`], and must not be used
/// afterwards. Handles compare by identity.
#[derive(Clone, Copy)]
pub struct OperationRef<'ctx> {
    ptr: NonNull<Operation<'ctx>>,
}

impl<'ctx> OperationRef<'ctx> {
    pub(crate) fn from_ptr(ptr: NonNull<Operation<'ctx>>) -> Self {
        Self { ptr }
    }

    pub fn as_ptr(&self) -> *const Operation<'ctx> {
        self.ptr.as_ptr()
    }

    /// Tear the operation down and free its block: result slots first, then
    /// operand slots (leaving their sources' use-lists), then the body.
    ///
    /// Panics, before touching anything, if a result still has uses.
    ///
    /// # Safety
    /// Must be called at most once per operation, and no handle or view
    /// derived from it may be used afterwards.
    pub unsafe fn destroy(self) {
        let op: &Operation<'ctx> = &self;
        op.assert_results_unused();

        let layout = op.layout();
        let base = op.base();
        let name = op.name();
        let (num_operands, num_results) = (op.num_operands, op.num_results);

        // SAFETY: slots and body were initialized by `create` and are dropped
        // once here; the block is then returned with the layout it was
        // allocated with.
        unsafe {
            for index in 0..num_results {
                let slot = base.add(layout.result_offset(index)).cast::<OpResultImpl<'ctx>>();
                ptr::drop_in_place(slot.as_ptr());
            }
            for index in 0..num_operands {
                let slot = base.add(layout.operand_offset(index)).cast::<OpOperandImpl<'ctx>>();
                slot.as_ref().unlink();
                ptr::drop_in_place(slot.as_ptr());
            }
            ptr::drop_in_place(self.ptr.as_ptr());
            dealloc(base.as_ptr(), layout.layout);
        }

        trace!("Destroyed `{}` ({} bytes)", name, layout.layout.size());
    }
}

impl<'ctx> Deref for OperationRef<'ctx> {
    type Target = Operation<'ctx>;

    fn deref(&self) -> &Operation<'ctx> {
        // SAFETY: see the type-level contract.
        unsafe { self.ptr.as_ref() }
    }
}

impl PartialEq for OperationRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl Eq for OperationRef<'_> {}

impl Hash for OperationRef<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ptr.hash(state);
    }
}

impl fmt::Debug for OperationRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationRef(`{}` @ {:p})", self.name(), self.ptr)
    }
}

impl fmt::Display for OperationRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print())
    }
}
