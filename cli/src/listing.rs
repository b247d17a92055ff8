use std::io::Write;

use clearcache_jit::{Report, StageReport};

/// Hex dump of each stage: one word per line, patch site marked with `>`,
/// words that differ from the previous stage marked with `*`.
pub(crate) fn write_report(out: &mut impl Write, report: &Report) -> std::io::Result<()> {
    let mut previous: Option<&StageReport> = None;
    for stage in [&report.initial, &report.unsynchronized, &report.synchronized] {
        write_stage(out, stage, previous)?;
        previous = Some(stage);
    }
    Ok(())
}

fn write_stage(out: &mut impl Write, stage: &StageReport, previous: Option<&StageReport>) -> std::io::Result<()> {
    match stage.synced {
        Some(range) => writeln!(out, "{} (synced +0x{:02x}..+0x{:02x})", stage.stage, range.offset, range.end())?,
        None => writeln!(out, "{} (not synced)", stage.stage)?,
    }

    let site = stage.patch_site.range();
    for (i, word) in stage.words.iter().enumerate() {
        let offset = i * 4;
        let in_site = offset >= site.offset && offset < site.end();
        let changed = previous.is_some_and(|p| p.words.get(i) != Some(word));
        writeln!(
            out,
            "  +0x{:02x} {}{} {:08x}",
            offset,
            if in_site { '>' } else { ' ' },
            if changed { '*' } else { ' ' },
            word
        )?;
    }
    Ok(())
}
