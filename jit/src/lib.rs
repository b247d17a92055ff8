//! clearcache-jit: emit an A32 trampoline at runtime, patch it in place, and
//! synchronize the instruction cache over exactly what changed.

pub mod arch;
pub mod code;
pub mod demo;
pub mod trampoline;
pub mod types;

// Re-exports for convenience (flattened imports)
pub use arch::arm32::insn::LoadStrategy;
pub use code::buffer::CodeBuffer;
pub use demo::{Demo, DemoConfig, Invocation, Report, Stage, StageReport, TargetPair};
pub use types::{CodeRange, CodegenError, PatchSite, Reg, RegisterList};
