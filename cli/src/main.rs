//! clearcache - watch a patched trampoline miss (and then hit) the I-cache.

mod config;
mod listing;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clearcache_jit::demo::{Calls, Target};
use clearcache_jit::{CodegenError, Demo, Invocation, Report, TargetPair};
use log::{debug, error, info, warn};

use config::{parse_address, RunArgs};

#[derive(Parser)]
#[command(name = "clearcache")]
#[command(version, about = "Patch generated A32 code with and without an I-cache sync", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, patch and call the trampoline (32-bit ARM hosts only)
    Run {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Emit, patch and sync without calling; print each stage's words
    Listing {
        /// Address the trampoline first calls
        #[arg(long, value_name = "ADDR", value_parser = parse_address)]
        first: u32,

        /// Address the patch redirects to
        #[arg(long, value_name = "ADDR", value_parser = parse_address)]
        second: u32,

        #[command(flatten)]
        args: RunArgs,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let command = cli.command.unwrap_or(Commands::Run {
        args: RunArgs::default(),
    });

    let result = match command {
        Commands::Run { args } => run(args),
        Commands::Listing { first, second, args } => listing(TargetPair { first, second }, args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if is_allocation_failure(&e) {
                println!("Could not mmap a memory buffer with the proper permissions.");
                error!("{e:#}");
                // Shells report this as 255.
                std::process::exit(-1);
            }
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn is_allocation_failure(e: &anyhow::Error) -> bool {
    e.chain()
        .any(|cause| matches!(cause.downcast_ref::<CodegenError>(), Some(CodegenError::AllocationFailed { .. })))
}

fn run(args: RunArgs) -> Result<()> {
    if !cfg!(target_arch = "arm") {
        return Err(CodegenError::ForeignHost(std::env::consts::ARCH))
            .context("use `clearcache listing` to inspect the sequence");
    }
    let config = args.demo_config(Invocation::Call);
    let targets = TargetPair::native().context("target functions are not addressable by a 32-bit immediate")?;
    debug!("function_one at 0x{:08x}, function_two at 0x{:08x}", targets.first, targets.second);

    let report = Demo::new(targets, config)?.run().context("demonstration aborted")?;
    summarize(&report);
    Ok(())
}

fn listing(targets: TargetPair, args: RunArgs) -> Result<()> {
    let config = args.demo_config(Invocation::Skip);
    info!(
        "dry run with {} loads: first=0x{:08x} second=0x{:08x}",
        config.strategy.name(),
        targets.first,
        targets.second
    );
    let report = Demo::new(targets, config)?.run()?;
    let mut out = std::io::stdout().lock();
    listing::write_report(&mut out, &report)?;
    Ok(())
}

fn summarize(report: &Report) {
    let describe = |calls: Option<Calls>| match calls.and_then(|c| c.only()) {
        Some(Target::First) => "function 1",
        Some(Target::Second) => "function 2",
        None => "no single target",
    };

    info!("{}: reached {}", report.initial.stage, describe(report.initial.calls));
    info!(
        "{}: reached {} (unpredictable on split caches)",
        report.unsynchronized.stage,
        describe(report.unsynchronized.calls)
    );
    info!("{}: reached {}", report.synchronized.stage, describe(report.synchronized.calls));

    if report.initial.calls.and_then(|c| c.only()) != Some(Target::First) {
        warn!("initial build did not reach function 1 exactly once");
    }
    if report.synchronized.calls.and_then(|c| c.only()) != Some(Target::Second) {
        warn!("synchronized patch did not reach function 2 exactly once");
    }
}
