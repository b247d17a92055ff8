pub mod insn;
pub mod writer;
