//! The generated stub: save, load target, call, restore.
//!
//! ```text
//! push {r4, lr}
//! <load ip, #target>      ; 2 or 4 words, the patch site
//! blx  ip
//! pop  {r4, pc}
//! ```
//!
//! r4 is pushed alongside lr only to keep the stack 8-byte aligned.

use crate::arch::arm32::insn::LoadStrategy;
use crate::arch::arm32::writer::Arm32Writer;
use crate::code::buffer::CodeBuffer;
use crate::code::patcher::patch_code;
use crate::types::{CodeRange, PatchSite, Reg, RegisterList, Result};

/// Register the target address is loaded into before the call.
pub const SCRATCH: Reg = Reg::IP;

pub const SAVED: RegisterList = RegisterList::empty().with(Reg::R4).with(Reg::LR);
pub const RESTORED: RegisterList = RegisterList::empty().with(Reg::R4).with(Reg::PC);

/// Append a trampoline calling `target` and return where its load sits.
pub fn emit_trampoline(buffer: &mut CodeBuffer, target: u32, strategy: LoadStrategy) -> Result<PatchSite> {
    let mut w = Arm32Writer::new(buffer);
    w.put_push_regs(SAVED)?;
    let offset = w.put_load_u32(SCRATCH, target, strategy)?;
    let site = PatchSite {
        offset,
        len: w.offset() - offset,
    };
    w.put_blx_reg(SCRATCH)?;
    w.put_pop_regs(RESTORED)?;

    log::debug!(
        "emitted trampoline to 0x{:08x} ({}, {} bytes, patch site +0x{:x})",
        target,
        strategy.name(),
        buffer.len(),
        site.offset
    );
    Ok(site)
}

/// Re-point the trampoline at `target`. Nothing is synchronized.
pub fn retarget(buffer: &mut CodeBuffer, site: PatchSite, target: u32, strategy: LoadStrategy) -> Result<CodeRange> {
    patch_code(buffer, site, &strategy.sequence(SCRATCH, target))
}
