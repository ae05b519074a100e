//! Programs
//!
//! A [`Program`] is an ordered list of operations it owns. Operations record
//! their owning program through a back-reference, so programs are pinned on the
//! heap ([`Program::new`] returns a `Pin<Box<Program>>`) and mutated through
//! `Pin<&mut Program>`.
use std::{fmt, marker::PhantomPinned, pin::Pin, ptr::NonNull};

use log::debug;

use crate::{
    context::IrContext,
    fmt::IrPrinter,
    operation::OperationRef,
    utils::error::{IrError, IrResult},
};

pub struct Program<'ctx> {
    ctx: &'ctx IrContext,
    ops: Vec<OperationRef<'ctx>>,
    _pin: PhantomPinned,
}

impl<'ctx> Program<'ctx> {
    pub fn new(ctx: &'ctx IrContext) -> Pin<Box<Self>> {
        Box::pin(Self {
            ctx,
            ops: Vec::new(),
            _pin: PhantomPinned,
        })
    }

    pub fn ctx(&self) -> &'ctx IrContext {
        self.ctx
    }

    /// Append `op` and take ownership of it.
    ///
    /// Panics if `op` already belongs to a program.
    #[track_caller]
    pub fn push_back(self: Pin<&mut Self>, op: OperationRef<'ctx>) {
        if op.parent_program().is_some() {
            panic!("`{}` already belongs to a program", op.name());
        }
        // SAFETY: the program is not moved out of its pin.
        let this = unsafe { self.get_unchecked_mut() };
        op.set_parent_program(Some(NonNull::from(&*this)));
        this.ops.push(op);
    }

    /// Remove `op` from the program and destroy it.
    ///
    /// Fails with [`IrError::OperationNotInProgram`] if `op` is not owned by
    /// this program. Panics if a result of `op` is still used.
    #[track_caller]
    pub fn erase(self: Pin<&mut Self>, op: OperationRef<'ctx>) -> IrResult<()> {
        // SAFETY: the program is not moved out of its pin.
        let this = unsafe { self.get_unchecked_mut() };
        let Some(position) = this.ops.iter().position(|owned| *owned == op) else {
            return Err(IrError::OperationNotInProgram(op.name().to_string()));
        };
        // A refused erase leaves the program unchanged.
        op.assert_results_unused();

        this.ops.remove(position);
        op.set_parent_program(None);
        // SAFETY: the handle was owned by this program, which destroys each of
        // its operations exactly once.
        unsafe { op.destroy() };
        Ok(())
    }

    /// Operations in program order.
    pub fn ops(&self) -> &[OperationRef<'ctx>] {
        &self.ops
    }

    pub fn contains(&self, op: OperationRef<'ctx>) -> bool {
        self.ops.contains(&op)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Render the program using the printer options of its context.
    pub fn print(&self) -> String {
        let mut out = String::new();
        let mut printer = IrPrinter::new(&mut out, self.ctx.config().printer.clone());
        match printer.print_program(self) {
            Ok(()) => out,
            Err(_) => unreachable!("writing to a String cannot fail"),
        }
    }
}

impl Drop for Program<'_> {
    fn drop(&mut self) {
        debug!("Dropping program with {} operations", self.ops.len());
        // SAFETY: every handle is owned by this program and destroyed once
        // below. Operands are detached first so that destruction does not
        // depend on def-use order.
        unsafe {
            for op in &self.ops {
                op.detach_operands();
            }
            for op in self.ops.drain(..).rev() {
                op.destroy();
            }
        }
    }
}

impl fmt::Debug for Program<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program").field("ops", &self.ops).finish()
    }
}

impl fmt::Display for Program<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dialect::builtin::{GetParameterOp, SetParameterOp},
        op_info::Op,
        types::builtin::Float32Type,
    };

    #[test]
    fn push_back_sets_the_parent() {
        let ctx = IrContext::new();
        let mut program = Program::new(&ctx);
        let get = GetParameterOp::build(&ctx, "w", Float32Type::get(&ctx)).unwrap();
        program.as_mut().push_back(get.operation());

        let parent = get.operation().parent_program().map(|p| p as *const Program);
        assert_eq!(parent, Some(&*program as *const Program));
        assert!(program.contains(get.operation()));
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn erase_rejects_foreign_operations() {
        let ctx = IrContext::new();
        let mut program = Program::new(&ctx);
        let foreign = GetParameterOp::build(&ctx, "w", Float32Type::get(&ctx)).unwrap();

        let err = program.as_mut().erase(foreign.operation()).unwrap_err();
        assert!(err.is_operation_not_in_program());
        unsafe { foreign.operation().destroy() };
    }

    #[test]
    fn erasing_a_used_producer_keeps_it_owned() {
        let ctx = IrContext::new();
        let mut program = Program::new(&ctx);
        let get = GetParameterOp::build(&ctx, "w", Float32Type::get(&ctx)).unwrap();
        let set = SetParameterOp::build(&ctx, "w", get.result()).unwrap();
        program.as_mut().push_back(get.operation());
        program.as_mut().push_back(set.operation());

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            program.as_mut().erase(get.operation())
        }));
        assert!(outcome.is_err());
        assert_eq!(program.len(), 2);
        assert!(program.contains(get.operation()));
        assert!(get.operation().parent_program().is_some());

        program.as_mut().erase(set.operation()).unwrap();
        program.as_mut().erase(get.operation()).unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn drop_tolerates_any_def_use_order() {
        let ctx = IrContext::new();
        let mut program = Program::new(&ctx);
        let get = GetParameterOp::build(&ctx, "w", Float32Type::get(&ctx)).unwrap();
        let set = SetParameterOp::build(&ctx, "w", get.result()).unwrap();
        // Consumer first: dropping in reverse order destroys the producer first.
        program.as_mut().push_back(set.operation());
        program.as_mut().push_back(get.operation());
        drop(program);
    }
}
