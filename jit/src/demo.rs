//! The three-stage patch-and-synchronize demonstration.
//!
//! 1. [`Stage::InitialBuild`]: emit a trampoline to the first target, sync, call.
//! 2. [`Stage::UnsynchronizedPatch`]: patch it to the second target, call
//!    without syncing. On a split-cache core this may run the old load, the
//!    new one, a torn mix of both, or crash.
//! 3. [`Stage::SynchronizedPatch`]: sync exactly the patched range, call again.
//!    This always reaches the second target.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info};

use crate::arch::arm32::insn::LoadStrategy;
use crate::code::allocator::CodeAllocator;
use crate::code::buffer::CodeBuffer;
use crate::trampoline::{emit_trampoline, retarget};
use crate::types::{CodeRange, CodegenError, PatchSite, Result};

/// Room for the longest trampoline with plenty to spare.
pub const DEFAULT_CAPACITY_WORDS: usize = 16;
/// Longest trampoline: push, four-word byte-chain load, blx, pop.
pub const MIN_CAPACITY_WORDS: usize = 7;
/// Upper bound accepted from the command line (4 MiB).
pub const MAX_CAPACITY_WORDS: usize = 1 << 20;

static CALLS: [AtomicUsize; 2] = [AtomicUsize::new(0), AtomicUsize::new(0)];

/// First target: the trampoline starts out calling this.
pub extern "C" fn function_one() {
    CALLS[0].fetch_add(1, Ordering::SeqCst);
    println!("Function 1 (old).");
}

/// Second target: the patch redirects the trampoline here.
pub extern "C" fn function_two() {
    CALLS[1].fetch_add(1, Ordering::SeqCst);
    println!("Function 2 (new).");
}

/// How often each target function has run in this process.
pub fn call_counts() -> Calls {
    Calls {
        first: CALLS[0].load(Ordering::SeqCst),
        second: CALLS[1].load(Ordering::SeqCst),
    }
}

/// Per-target call counts, or the difference between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Calls {
    pub first: usize,
    pub second: usize,
}

impl Calls {
    fn since(self, before: Calls) -> Calls {
        Calls {
            first: self.first - before.first,
            second: self.second - before.second,
        }
    }

    /// `Some(target)` if exactly one call reached exactly one target.
    pub fn only(&self) -> Option<Target> {
        match (self.first, self.second) {
            (1, 0) => Some(Target::First),
            (0, 1) => Some(Target::Second),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    First,
    Second,
}

/// Entry addresses of the two functions the trampoline can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPair {
    pub first: u32,
    pub second: u32,
}

impl TargetPair {
    /// [`function_one`] and [`function_two`] of this process.
    pub fn native() -> Result<Self> {
        Ok(Self {
            first: code_address(function_one)?,
            second: code_address(function_two)?,
        })
    }
}

/// Entry address of `f` as a 32-bit immediate.
pub fn code_address(f: extern "C" fn()) -> Result<u32> {
    let addr = f as usize;
    u32::try_from(addr).map_err(|_| CodegenError::AddressOutOfRange(addr))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    InitialBuild,
    UnsynchronizedPatch,
    SynchronizedPatch,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::InitialBuild, Stage::UnsynchronizedPatch, Stage::SynchronizedPatch];

    pub fn name(self) -> &'static str {
        match self {
            Stage::InitialBuild => "initial-build",
            Stage::UnsynchronizedPatch => "unsynchronized-patch",
            Stage::SynchronizedPatch => "synchronized-patch",
        }
    }

    fn next(self) -> Option<Stage> {
        match self {
            Stage::InitialBuild => Some(Stage::UnsynchronizedPatch),
            Stage::UnsynchronizedPatch => Some(Stage::SynchronizedPatch),
            Stage::SynchronizedPatch => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether stages jump into the generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    Call,
    /// Emit, patch and sync only. Safe on any host and with any addresses.
    Skip,
}

#[derive(Debug, Clone, Copy)]
pub struct DemoConfig {
    pub strategy: LoadStrategy,
    pub capacity_words: usize,
    pub invocation: Invocation,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            strategy: LoadStrategy::default(),
            capacity_words: DEFAULT_CAPACITY_WORDS,
            invocation: Invocation::Call,
        }
    }
}

/// What one stage did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    /// Buffer contents after the stage's writes.
    pub words: Vec<u32>,
    pub patch_site: PatchSite,
    /// Range handed to the cache sync, if the stage synced.
    pub synced: Option<CodeRange>,
    /// Target calls observed while the trampoline ran, if it was invoked.
    pub calls: Option<Calls>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub initial: StageReport,
    pub unsynchronized: StageReport,
    pub synchronized: StageReport,
}

/// Drives the three stages over one code buffer, strictly in order.
#[derive(Debug)]
pub struct Demo {
    buffer: CodeBuffer,
    targets: TargetPair,
    config: DemoConfig,
    site: Option<PatchSite>,
    patched: Option<CodeRange>,
    next: Option<Stage>,
}

impl Demo {
    /// Map a fresh buffer sized for `config.capacity_words` instructions.
    pub fn new(targets: TargetPair, config: DemoConfig) -> Result<Self> {
        let bytes = config
            .capacity_words
            .checked_mul(4)
            .ok_or(CodegenError::CapacityTooLarge {
                bytes: config.capacity_words as u128 * 4,
            })?;
        let slice = CodeAllocator::new(bytes)?.alloc_rwx()?;
        Ok(Self::with_buffer(CodeBuffer::new(slice), targets, config))
    }

    pub fn with_buffer(buffer: CodeBuffer, targets: TargetPair, config: DemoConfig) -> Self {
        Self {
            buffer,
            targets,
            config,
            site: None,
            patched: None,
            next: Some(Stage::InitialBuild),
        }
    }

    /// Stage the next call to [`Demo::step`] will run.
    pub fn next_stage(&self) -> Option<Stage> {
        self.next
    }

    /// Run the next stage. Returns `None` once all three have run.
    pub fn step(&mut self) -> Result<Option<StageReport>> {
        let Some(stage) = self.next else {
            return Ok(None);
        };
        self.run_stage(stage).map(Some)
    }

    /// Run `stage`, which must be the next one due.
    pub fn run_stage(&mut self, stage: Stage) -> Result<StageReport> {
        if self.next != Some(stage) {
            return Err(CodegenError::StageOutOfOrder {
                requested: stage.name(),
                expected: self.next.map_or("none", Stage::name),
            });
        }
        info!("stage {stage}");

        let synced = match stage {
            Stage::InitialBuild => {
                let site = emit_trampoline(&mut self.buffer, self.targets.first, self.config.strategy)?;
                self.site = Some(site);
                let range = self.buffer.emitted();
                self.buffer.sync(range)?;
                Some(range)
            }
            Stage::UnsynchronizedPatch => {
                let site = self.patch_site()?;
                let range = retarget(&mut self.buffer, site, self.targets.second, self.config.strategy)?;
                self.patched = Some(range);
                None
            }
            Stage::SynchronizedPatch => {
                let range = self.patched.ok_or(CodegenError::StageOutOfOrder {
                    requested: stage.name(),
                    expected: Stage::UnsynchronizedPatch.name(),
                })?;
                self.buffer.sync(range)?;
                Some(range)
            }
        };

        let calls = match self.config.invocation {
            Invocation::Call => Some(self.invoke()?),
            Invocation::Skip => None,
        };
        if let Some(calls) = calls {
            debug!("{stage}: function_one x{}, function_two x{}", calls.first, calls.second);
        }

        self.next = stage.next();
        Ok(StageReport {
            stage,
            words: self.buffer.words().to_vec(),
            patch_site: self.patch_site()?,
            synced,
            calls,
        })
    }

    /// Run all three stages from a fresh demo.
    pub fn run(mut self) -> Result<Report> {
        let initial = self.run_stage(Stage::InitialBuild)?;
        let unsynchronized = self.run_stage(Stage::UnsynchronizedPatch)?;
        let synchronized = self.run_stage(Stage::SynchronizedPatch)?;
        Ok(Report {
            initial,
            unsynchronized,
            synchronized,
        })
    }

    fn patch_site(&self) -> Result<PatchSite> {
        self.site.ok_or(CodegenError::StageOutOfOrder {
            requested: "patch",
            expected: Stage::InitialBuild.name(),
        })
    }

    fn invoke(&self) -> Result<Calls> {
        let before = call_counts();
        // SAFETY: the buffer holds a complete trampoline emitted by this
        // driver; `call` refuses on hosts that cannot run A32.
        unsafe { self.buffer.call()? };
        Ok(call_counts().since(before))
    }
}

/// Serializes tests that read the process-wide call counters.
#[cfg(all(test, target_arch = "arm"))]
pub(crate) fn lock_call_tests() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|e| e.into_inner())
}
