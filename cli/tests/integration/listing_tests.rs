use crate::common::*;

const FIRST: &str = "0x12345678";
const SECOND: &str = "0x0badf00d";

#[test]
fn listing_shows_all_three_stages() {
    let output = run_clearcache(&["listing", "--first", FIRST, "--second", SECOND, "--load", "movw-movt"]);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);

    assert!(stdout.contains("initial-build (synced +0x00..+0x14)"), "{stdout}");
    assert!(stdout.contains("unsynchronized-patch (not synced)"), "{stdout}");
    assert!(stdout.contains("synchronized-patch (synced +0x04..+0x0c)"), "{stdout}");
}

#[test]
fn listing_movw_movt_words() {
    let output = run_clearcache(&["listing", "--first", FIRST, "--second", SECOND, "--load", "movw-movt"]);
    let stdout = stdout_of(&output);

    assert_eq!(
        stage_words(&stdout, "initial-build"),
        ["e92d4010", "e305c678", "e341c234", "e12fff3c", "e8bd8010"]
    );
    let patched = stage_words(&stdout, "unsynchronized-patch");
    assert_eq!(patched[0], "e92d4010");
    assert_eq!(&patched[3..], ["e12fff3c", "e8bd8010"]);
    assert_ne!(patched[1..3], stage_words(&stdout, "initial-build")[1..3]);
    assert_eq!(patched, stage_words(&stdout, "synchronized-patch"));
}

#[test]
fn listing_byte_chain_words() {
    let output = run_clearcache(&["listing", "--first", FIRST, "--second", SECOND, "--load", "byte-chain"]);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let stdout = stdout_of(&output);

    assert_eq!(
        &stage_words(&stdout, "initial-build")[1..5],
        ["e3a0c078", "e38ccc56", "e38cc834", "e38cc412"]
    );
    assert!(stdout.contains("synchronized-patch (synced +0x04..+0x14)"), "{stdout}");
}

#[test]
fn listing_requires_both_targets() {
    let output = run_clearcache(&["listing", "--first", FIRST]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("--second"));
}

#[test]
fn listing_rejects_out_of_range_capacity() {
    for capacity in ["4", "4611686018427387904"] {
        let output = run_clearcache(&["listing", "--first", FIRST, "--second", SECOND, "--capacity", capacity]);
        assert_eq!(output.status.code(), Some(2), "capacity {capacity}: {}", stderr_of(&output));
        assert!(stderr_of(&output).contains("--capacity"));
    }
}

#[test]
fn listing_honours_larger_capacity() {
    let output = run_clearcache(&["listing", "--first", FIRST, "--second", SECOND, "--capacity", "4096"]);
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    assert_eq!(stage_words(&stdout_of(&output), "synchronized-patch").len(), 5);
}

#[test]
fn listing_rejects_addresses_wider_than_32_bits() {
    let output = run_clearcache(&["listing", "--first", "0x100000000", "--second", SECOND]);
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("invalid 32-bit address"));
}
