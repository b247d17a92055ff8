use thiserror::Error;

/// A32 core register number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Reg {
    /// Intra-procedure-call scratch register.
    pub const IP: Reg = Reg::R12;
    pub const LR: Reg = Reg::R14;
    pub const PC: Reg = Reg::R15;

    #[inline]
    pub const fn num(self) -> u32 {
        self as u32
    }
}

/// Register mask for PUSH/POP (LDM/STM) encodings, one bit per register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterList(u16);

impl RegisterList {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn with(self, reg: Reg) -> Self {
        Self(self.0 | (1 << reg as u16))
    }

    pub const fn contains(self, reg: Reg) -> bool {
        self.0 & (1 << reg as u16) != 0
    }

    pub const fn bits(self) -> u32 {
        self.0 as u32
    }
}

impl FromIterator<Reg> for RegisterList {
    fn from_iter<I: IntoIterator<Item = Reg>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

/// Byte span inside a code buffer, measured from the buffer base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange {
    pub offset: usize,
    pub len: usize,
}

impl CodeRange {
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub const fn end(&self) -> usize {
        self.offset.saturating_add(self.len)
    }
}

/// Location of the instruction words that a later patch overwrites.
///
/// Only a position marker: the words themselves live in the code buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSite {
    pub offset: usize,
    pub len: usize,
}

impl PatchSite {
    pub const fn range(&self) -> CodeRange {
        CodeRange::new(self.offset, self.len)
    }

    pub const fn words(&self) -> usize {
        self.len / 4
    }
}

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("could not map {size} bytes of writable, executable memory: {source}")]
    AllocationFailed {
        size: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("a {bytes}-byte code mapping does not fit in the address space")]
    CapacityTooLarge { bytes: u128 },

    #[error("code buffer full ({capacity} bytes)")]
    BufferFull { capacity: usize },

    #[error("address 0x{0:x} does not fit in a 32-bit immediate")]
    AddressOutOfRange(usize),

    #[error("patch at offset {offset} (+{len}) lies outside the {emitted} emitted bytes")]
    PatchOutOfBounds { offset: usize, len: usize, emitted: usize },

    #[error("patch must keep the site length: site holds {expected} words, got {actual}")]
    PatchLengthMismatch { expected: usize, actual: usize },

    #[error("range at offset {offset} (+{len}) exceeds the {capacity}-byte mapping")]
    RangeOutOfBounds { offset: usize, len: usize, capacity: usize },

    #[error("stage {requested} cannot run now; expected {expected}")]
    StageOutOfOrder { requested: &'static str, expected: &'static str },

    #[error("cannot execute A32 code on a {0} host")]
    ForeignHost(&'static str),
}

pub type Result<T> = std::result::Result<T, CodegenError>;
