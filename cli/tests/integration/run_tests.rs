use crate::common::*;

#[test]
#[cfg(not(target_arch = "arm"))]
fn run_refuses_on_foreign_host() {
    let output = run_clearcache(&["run"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("cannot execute A32 code"), "stderr: {}", stderr_of(&output));
    assert!(!stdout_of(&output).contains("Function"));
}

/// Checks stages A and C when the run completes.
///
/// Stage B executes an unsynchronized patch; on a split-cache core it may
/// take the process down. That is allowed, so a run killed by a signal only
/// has to show that stage A reached function 1 first.
#[cfg(target_arch = "arm")]
fn assert_old_then_new(output: &std::process::Output) {
    let stdout = stdout_of(output);
    let lines: Vec<&str> = stdout.lines().collect();

    if output.status.success() {
        // Stage B prints one line of either kind.
        assert_eq!(lines.len(), 3, "{lines:?}");
        assert_eq!(lines[0], "Function 1 (old).");
        assert_eq!(lines[2], "Function 2 (new).");
    } else {
        assert_eq!(output.status.code(), None, "stderr: {}", stderr_of(output));
        assert_eq!(lines.first(), Some(&"Function 1 (old)."));
    }
}

#[test]
#[cfg(target_arch = "arm")]
fn run_calls_old_then_new_function() {
    for load in ["movw-movt", "byte-chain"] {
        assert_old_then_new(&run_clearcache(&["run", "--load", load]));
    }
}

#[test]
#[cfg(target_arch = "arm")]
fn bare_invocation_runs_the_demo() {
    assert_old_then_new(&run_clearcache(&[]));
}
