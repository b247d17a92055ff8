//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

/// Path to the clearcache binary built for this test run.
pub fn clearcache_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_clearcache"))
}

/// Run clearcache with `args`, logging pinned to warnings so stdout/stderr stay predictable.
pub fn run_clearcache(args: &[&str]) -> Output {
    Command::new(clearcache_binary())
        .args(args)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("failed to spawn clearcache")
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Hex words listed for `stage`, in order.
pub fn stage_words(stdout: &str, stage: &str) -> Vec<String> {
    stdout
        .lines()
        .skip_while(|l| !l.starts_with(stage))
        .skip(1)
        .take_while(|l| l.starts_with("  +0x"))
        .filter_map(|l| l.split_whitespace().last().map(str::to_owned))
        .collect()
}
