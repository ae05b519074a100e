//! Textual form of operations and programs.
//!
//! ```text
//! (%2) = "pd.conv2d" (%0, %1) {strides:[1,1],groups:2} : (f32, f32) -> (f32)
//! ```
//!
//! Values are numbered `%0, %1, ...` in order of first appearance, so printing
//! the same program twice yields the same text.
use std::{collections::HashMap, fmt::Write};

use crate::{
    operation::Operation, program::Program, types::Type, utils::conf::PrinterConfig,
    value::OpResult,
};

pub struct IrPrinter<'w, 'ctx, W: Write> {
    out: &'w mut W,
    config: PrinterConfig,
    ids: HashMap<OpResult<'ctx>, usize>,
}

impl<'w, 'ctx, W: Write> IrPrinter<'w, 'ctx, W> {
    pub fn new(out: &'w mut W, config: PrinterConfig) -> Self {
        Self {
            out,
            config,
            ids: HashMap::new(),
        }
    }

    fn value_id(&mut self, value: OpResult<'ctx>) -> usize {
        let next = self.ids.len();
        *self.ids.entry(value).or_insert(next)
    }

    fn write_types(&mut self, types: impl Iterator<Item = Type<'ctx>>) -> std::fmt::Result {
        self.out.write_char('(')?;
        for (i, ty) in types.enumerate() {
            if i > 0 {
                self.out.write_str(", ")?;
            }
            write!(self.out, "{ty}")?;
        }
        self.out.write_char(')')
    }

    /// Print one operation, without a trailing newline.
    pub fn print_operation(&mut self, op: &Operation<'ctx>) -> std::fmt::Result {
        let operands: Vec<usize> = op
            .operands()
            .map(|operand| self.value_id(operand.source()))
            .collect();
        let results: Vec<usize> = op.results().map(|result| self.value_id(result)).collect();

        self.out.write_char('(')?;
        for (i, id) in results.iter().enumerate() {
            if i > 0 {
                self.out.write_str(", ")?;
            }
            write!(self.out, "%{id}")?;
        }
        write!(self.out, ") = \"{}\" (", op.name())?;
        for (i, id) in operands.iter().enumerate() {
            if i > 0 {
                self.out.write_str(", ")?;
            }
            write!(self.out, "%{id}")?;
        }
        self.out.write_str(") {")?;
        for (i, (name, attr)) in op.attributes().iter().enumerate() {
            if i > 0 {
                self.out.write_char(',')?;
            }
            write!(self.out, "{name}:{attr}")?;
        }
        self.out.write_char('}')?;

        if self.config.print_types {
            self.out.write_str(" : ")?;
            self.write_types(op.operands().map(|operand| operand.source().ty()))?;
            self.out.write_str(" -> ")?;
            self.write_types(op.results().map(|result| result.ty()))?;
        }
        Ok(())
    }

    pub fn print_program(&mut self, program: &Program<'ctx>) -> std::fmt::Result {
        self.out.write_str("{\n")?;
        for op in program.ops() {
            self.out.write_str("    ")?;
            self.print_operation(op)?;
            self.out.write_char('\n')?;
        }
        self.out.write_str("}\n")
    }
}
