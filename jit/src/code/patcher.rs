use crate::code::buffer::CodeBuffer;
use crate::types::{CodeRange, CodegenError, PatchSite, Result};

/// Overwrite the words at `site` with `words`.
///
/// The replacement must be exactly as long as the site. Only the data side is
/// written: the caller decides when (or whether) to synchronize the returned
/// range with instruction fetch.
pub fn patch_code(buffer: &mut CodeBuffer, site: PatchSite, words: &[u32]) -> Result<CodeRange> {
    if words.len() != site.words() {
        return Err(CodegenError::PatchLengthMismatch {
            expected: site.words(),
            actual: words.len(),
        });
    }
    if site.len == 0 {
        return Ok(site.range());
    }

    let range = buffer.overwrite(site.offset, words)?;
    log::debug!(
        "patched {} words at offset 0x{:x} (0x{:x})",
        words.len(),
        range.offset,
        buffer.entry() as usize + range.offset
    );
    Ok(range)
}
