//! Byte layout of an operation block.
//!
//! ```text
//! base                     base + body_offset          base + results_offset
//! | OpOperandImpl × n      | Operation                 | OpResultImpl × m      |
//! ```
//!
//! Operand slots sit at negative offsets from the body, result slots at
//! positive ones. The layout is a pure function of the two counts, so it is
//! recomputed on demand instead of being stored in the body.
use std::{alloc::Layout, mem::size_of};

use crate::{
    magic::OPERATION_ALIGN,
    operation::Operation,
    value::{OpOperandImpl, OpResultImpl},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OperationLayout {
    pub layout: Layout,
    pub body_offset: usize,
    pub results_offset: usize,
}

#[cold]
fn layout_overflow(num_operands: u32, num_results: u32) -> ! {
    panic!(
        "operation with {num_operands} operands and {num_results} results exceeds the addressable size"
    )
}

impl OperationLayout {
    pub fn new(num_operands: u32, num_results: u32) -> Self {
        let compute = || {
            let operands = Layout::array::<OpOperandImpl<'_>>(num_operands as usize).ok()?;
            let (layout, body_offset) = operands.extend(Layout::new::<Operation<'_>>()).ok()?;
            let results = Layout::array::<OpResultImpl<'_>>(num_results as usize).ok()?;
            let (layout, results_offset) = layout.extend(results).ok()?;
            let layout = layout.align_to(OPERATION_ALIGN).ok()?.pad_to_align();
            Some(Self {
                layout,
                body_offset,
                results_offset,
            })
        };

        compute().unwrap_or_else(|| layout_overflow(num_operands, num_results))
    }

    /// Offset of the `index`-th operand slot from the start of the block.
    #[inline]
    pub fn operand_offset(&self, index: u32) -> usize {
        index as usize * size_of::<OpOperandImpl<'_>>()
    }

    /// Offset of the `index`-th result slot from the start of the block.
    #[inline]
    pub fn result_offset(&self, index: u32) -> usize {
        self.results_offset + index as usize * size_of::<OpResultImpl<'_>>()
    }
}
