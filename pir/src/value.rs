//! Values and use-lists
//!
//! Every operation owns two arrays of slots inside its allocation (see
//! [`crate::operation`]): one [`OpOperandImpl`] per operand and one
//! [`OpResultImpl`] per result. A result keeps the head of an intrusive doubly
//! linked list of the operand slots reading it, so the def-use edges of the
//! graph can be walked in both directions without extra allocations.
//!
//! [`OpResult`] and [`OpOperand`] are copyable views into those slots. Like
//! [`OperationRef`], they stay valid until their owning operation is destroyed.
use std::{cell::Cell, fmt, hash::Hash, marker::PhantomData, ptr::NonNull};

use crate::{
    operation::{Operation, OperationRef},
    types::Type,
};

type UseLink<'ctx> = Cell<Option<NonNull<OpOperandImpl<'ctx>>>>;

/// Result slot stored after the operation body.
pub(crate) struct OpResultImpl<'ctx> {
    ty: Type<'ctx>,
    first_use: UseLink<'ctx>,
    owner: NonNull<Operation<'ctx>>,
    index: u32,
}

impl<'ctx> OpResultImpl<'ctx> {
    pub(crate) fn new(ty: Type<'ctx>, owner: NonNull<Operation<'ctx>>, index: u32) -> Self {
        Self {
            ty,
            first_use: Cell::new(None),
            owner,
            index,
        }
    }

    pub(crate) fn use_empty(&self) -> bool {
        self.first_use.get().is_none()
    }
}

/// Operand slot stored before the operation body.
pub(crate) struct OpOperandImpl<'ctx> {
    source: Cell<NonNull<OpResultImpl<'ctx>>>,
    next_use: UseLink<'ctx>,
    /// Address of the link currently pointing at this slot: either the
    /// source's `first_use` or the previous operand's `next_use`.
    prev_use: Cell<Option<NonNull<UseLink<'ctx>>>>,
    owner: NonNull<Operation<'ctx>>,
    index: u32,
}

impl<'ctx> OpOperandImpl<'ctx> {
    pub(crate) fn new(
        source: OpResult<'ctx>,
        owner: NonNull<Operation<'ctx>>,
        index: u32,
    ) -> Self {
        Self {
            source: Cell::new(source.imp),
            next_use: Cell::new(None),
            prev_use: Cell::new(None),
            owner,
            index,
        }
    }

    /// Push this slot at the front of its source's use-list.
    ///
    /// # Safety
    /// `self` must be at its final address and its source must be alive.
    pub(crate) unsafe fn link(&self) {
        // SAFETY: the source result is alive by contract.
        let head = unsafe { &self.source.get().as_ref().first_use };
        let next = head.get();
        self.next_use.set(next);
        if let Some(next) = next {
            // SAFETY: list members are live operand slots.
            unsafe { next.as_ref() }
                .prev_use
                .set(Some(NonNull::from(&self.next_use)));
        }
        self.prev_use.set(Some(NonNull::from(head)));
        head.set(Some(NonNull::from(self)));
    }

    /// Remove this slot from its source's use-list.
    ///
    /// # Safety
    /// The slot must currently be linked, and its neighbours alive.
    pub(crate) unsafe fn unlink(&self) {
        let next = self.next_use.get();
        if let Some(prev) = self.prev_use.get() {
            // SAFETY: `prev` points into a live result or operand slot.
            unsafe { prev.as_ref() }.set(next);
        }
        if let Some(next) = next {
            // SAFETY: list members are live operand slots.
            unsafe { next.as_ref() }.prev_use.set(self.prev_use.get());
        }
        self.next_use.set(None);
        self.prev_use.set(None);
    }
}

/// A value produced by an operation: its `index`-th result.
#[derive(Clone, Copy)]
pub struct OpResult<'ctx> {
    imp: NonNull<OpResultImpl<'ctx>>,
    _ctx: PhantomData<&'ctx ()>,
}

impl<'ctx> OpResult<'ctx> {
    pub(crate) fn from_impl(imp: NonNull<OpResultImpl<'ctx>>) -> Self {
        Self {
            imp,
            _ctx: PhantomData,
        }
    }

    #[inline]
    fn imp(&self) -> &OpResultImpl<'ctx> {
        // SAFETY: a result view is only used while its operation is alive.
        unsafe { self.imp.as_ref() }
    }

    pub fn ty(&self) -> Type<'ctx> {
        self.imp().ty
    }

    /// The operation producing this value.
    pub fn owner(&self) -> OperationRef<'ctx> {
        OperationRef::from_ptr(self.imp().owner)
    }

    /// Position of this value among the owner's results.
    pub fn index(&self) -> u32 {
        self.imp().index
    }

    /// Returns `true` if no operand reads this value.
    pub fn use_empty(&self) -> bool {
        self.imp().use_empty()
    }

    /// Iterate over the operands reading this value, most recent first.
    pub fn uses(&self) -> UseIter<'ctx> {
        UseIter {
            next: self.imp().first_use.get(),
            _ctx: PhantomData,
        }
    }

    pub fn num_uses(&self) -> usize {
        self.uses().count()
    }

    /// Make every operand reading `self` read `other` instead.
    pub fn replace_all_uses_with(&self, other: OpResult<'ctx>) {
        if *self == other {
            return;
        }
        while let Some(first) = self.imp().first_use.get() {
            OpOperand::from_impl(first).set_source(other);
        }
    }
}

impl PartialEq for OpResult<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.imp == other.imp
    }
}

impl Eq for OpResult<'_> {}

impl Hash for OpResult<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.imp.hash(state);
    }
}

impl fmt::Debug for OpResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OpResult({}#{}: {})",
            self.owner().name(),
            self.index(),
            self.ty()
        )
    }
}

/// An input slot of an operation: reads one [`OpResult`].
#[derive(Clone, Copy)]
pub struct OpOperand<'ctx> {
    imp: NonNull<OpOperandImpl<'ctx>>,
    _ctx: PhantomData<&'ctx ()>,
}

impl<'ctx> OpOperand<'ctx> {
    pub(crate) fn from_impl(imp: NonNull<OpOperandImpl<'ctx>>) -> Self {
        Self {
            imp,
            _ctx: PhantomData,
        }
    }

    #[inline]
    fn imp(&self) -> &OpOperandImpl<'ctx> {
        // SAFETY: an operand view is only used while its operation is alive.
        unsafe { self.imp.as_ref() }
    }

    /// The value read by this operand.
    pub fn source(&self) -> OpResult<'ctx> {
        OpResult::from_impl(self.imp().source.get())
    }

    /// Read `value` instead of the current source, moving this slot between use-lists.
    pub fn set_source(&self, value: OpResult<'ctx>) {
        let imp = self.imp();
        // SAFETY: the slot is linked since construction and both sources are alive.
        unsafe {
            imp.unlink();
            imp.source.set(value.imp);
            imp.link();
        }
    }

    /// Leave the source's use-list without picking a new source.
    ///
    /// # Safety
    /// The operand must not be read again before its operation is destroyed.
    pub(crate) unsafe fn detach(&self) {
        // SAFETY: forwarded to the caller.
        unsafe { self.imp().unlink() };
    }

    /// The operation this operand belongs to.
    pub fn owner(&self) -> OperationRef<'ctx> {
        OperationRef::from_ptr(self.imp().owner)
    }

    /// Position of this operand among the owner's operands.
    pub fn index(&self) -> u32 {
        self.imp().index
    }
}

impl PartialEq for OpOperand<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.imp == other.imp
    }
}

impl Eq for OpOperand<'_> {}

impl fmt::Debug for OpOperand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OpOperand({}#{} <- {:?})",
            self.owner().name(),
            self.index(),
            self.source()
        )
    }
}

/// Iterator over the uses of an [`OpResult`].
pub struct UseIter<'ctx> {
    next: Option<NonNull<OpOperandImpl<'ctx>>>,
    _ctx: PhantomData<&'ctx ()>,
}

impl<'ctx> Iterator for UseIter<'ctx> {
    type Item = OpOperand<'ctx>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        // SAFETY: list members are live operand slots.
        self.next = unsafe { current.as_ref() }.next_use.get();
        Some(OpOperand::from_impl(current))
    }
}
