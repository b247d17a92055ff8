//! A32 instruction encodings used by the trampoline.
//!
//! Plain bit-packing with no range checks: out-of-range operands produce an
//! invalid instruction rather than an error.

use crate::types::{Reg, RegisterList};

// Operand-2 rotation field placing an 8-bit immediate in byte lane N.
pub const OP2_BYTE0: u32 = 0x0 << 8;
pub const OP2_BYTE1: u32 = 0xc << 8;
pub const OP2_BYTE2: u32 = 0x8 << 8;
pub const OP2_BYTE3: u32 = 0x4 << 8;

const OP2_LANES: [u32; 4] = [OP2_BYTE0, OP2_BYTE1, OP2_BYTE2, OP2_BYTE3];

/// `PUSH {regs}` (STMDB sp!, {regs}).
#[inline]
pub const fn push(regs: RegisterList) -> u32 {
    0xE92D_0000 | regs.bits()
}

/// `POP {regs}` (LDMIA sp!, {regs}).
#[inline]
pub const fn pop(regs: RegisterList) -> u32 {
    0xE8BD_0000 | regs.bits()
}

/// `MOVW rd, #:lower16:value`
#[inline]
pub const fn movw(rd: Reg, value: u32) -> u32 {
    0xE300_0000 | ((value << 4) & 0xF_0000) | (rd.num() << 12) | (value & 0xFFF)
}

/// `MOVT rd, #:upper16:value`
#[inline]
pub const fn movt(rd: Reg, value: u32) -> u32 {
    0xE340_0000 | ((value >> 12) & 0xF_0000) | (rd.num() << 12) | ((value >> 16) & 0xFFF)
}

/// `BLX rm`
#[inline]
pub const fn blx(rm: Reg) -> u32 {
    0xE12F_FF30 | rm.num()
}

/// `MOV rd, #op2` where `op2` is a 12-bit rotated immediate.
#[inline]
pub const fn mov_imm(rd: Reg, op2: u32) -> u32 {
    0xE3A0_0000 | (op2 & 0xFFF) | (rd.num() << 12)
}

/// `ORR rd, rd, #op2` where `op2` is a 12-bit rotated immediate.
#[inline]
pub const fn orr_imm(rd: Reg, op2: u32) -> u32 {
    0xE380_0000 | (op2 & 0xFFF) | (rd.num() << 12) | (rd.num() << 16)
}

/// Operand-2 immediate selecting byte `lane` (0 = least significant) of `value`.
#[inline]
pub const fn byte_operand(value: u32, lane: usize) -> u32 {
    OP2_LANES[lane] | ((value >> (lane * 8)) & 0xff)
}

/// How a 32-bit constant is materialized in a register.
///
/// Picked once (build feature or startup flag) and then used for both the
/// initial emission and the patch, so the patch site length never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// `MOVW` + `MOVT` (ARMv6T2 and later).
    MovwMovt,
    /// `MOV` + three `ORR`s, one byte each. Works on ARMv5.
    ByteChain,
}

impl Default for LoadStrategy {
    fn default() -> Self {
        if cfg!(feature = "armv5-compatible") {
            LoadStrategy::ByteChain
        } else {
            LoadStrategy::MovwMovt
        }
    }
}

impl LoadStrategy {
    /// Number of instruction words the sequence occupies.
    pub const fn len(self) -> usize {
        match self {
            LoadStrategy::MovwMovt => 2,
            LoadStrategy::ByteChain => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            LoadStrategy::MovwMovt => "movw-movt",
            LoadStrategy::ByteChain => "byte-chain",
        }
    }

    /// Encode `rd = value`.
    pub fn sequence(self, rd: Reg, value: u32) -> Vec<u32> {
        match self {
            LoadStrategy::MovwMovt => vec![movw(rd, value), movt(rd, value)],
            LoadStrategy::ByteChain => {
                let mut words = Vec::with_capacity(4);
                words.push(mov_imm(rd, byte_operand(value, 0)));
                for lane in 1..4 {
                    words.push(orr_imm(rd, byte_operand(value, lane)));
                }
                words
            }
        }
    }
}
