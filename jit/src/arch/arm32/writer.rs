use crate::arch::arm32::insn::{self, LoadStrategy};
use crate::code::buffer::CodeBuffer;
use crate::types::{Reg, RegisterList, Result};

/// Appends A32 instructions to a [`CodeBuffer`] in address order.
#[derive(Debug)]
pub struct Arm32Writer<'a> {
    buffer: &'a mut CodeBuffer,
}

impl<'a> Arm32Writer<'a> {
    pub fn new(buffer: &'a mut CodeBuffer) -> Self {
        Self { buffer }
    }

    /// Byte offset of the next instruction.
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    pub fn put_u32_raw(&mut self, insn: u32) -> Result<()> {
        self.buffer.push_word(insn)
    }

    pub fn put_push_regs(&mut self, regs: RegisterList) -> Result<()> {
        self.put_u32_raw(insn::push(regs))
    }

    pub fn put_pop_regs(&mut self, regs: RegisterList) -> Result<()> {
        self.put_u32_raw(insn::pop(regs))
    }

    pub fn put_blx_reg(&mut self, reg: Reg) -> Result<()> {
        self.put_u32_raw(insn::blx(reg))
    }

    /// Materialize `value` in `reg`. Returns the offset of the first word.
    pub fn put_load_u32(&mut self, reg: Reg, value: u32, strategy: LoadStrategy) -> Result<usize> {
        let start = self.offset();
        for word in strategy.sequence(reg, value) {
            self.put_u32_raw(word)?;
        }
        Ok(start)
    }
}
