use crate::{Result, elf::ElfSections, reader::ImageBytes};
use std::collections::BTreeSet;

/// The only section searched for unrecorded pointers.
///
/// `.rodata` must stay out of the scan: string literal tails regularly look
/// like image addresses, and rebasing them at load time corrupts the string.
pub const SCAN_SECTION: &str = ".data";

const POINTER_SIZE: usize = 8;

/// Scans [`SCAN_SECTION`] for aligned 8-byte values inside the image address
/// range and returns the addresses that hold them.
pub fn scan_pointers(elf: &ElfSections, data: &[u8]) -> Result<BTreeSet<u64>> {
    let mut offsets = BTreeSet::new();
    let Some(sec) = elf.get(SCAN_SECTION) else {
        return Ok(offsets);
    };
    let Some(range) = elf.image_range() else {
        return Ok(offsets);
    };
    log::debug!(
        "[Scan] image range [{:#x}, {:#x}), {} at {:#x} size {:#x}",
        range.lo,
        range.hi,
        sec.name,
        sec.addr,
        sec.size
    );

    let contents = elf.section_data(data, sec)?;
    for (idx, word) in contents.chunks_exact(POINTER_SIZE).enumerate() {
        let Some(value) = word.u64_at(0) else {
            continue;
        };
        if range.contains(value) {
            let Some(addr) = sec.addr.checked_add((idx * POINTER_SIZE) as u64) else {
                break;
            };
            log::trace!("[Scan] pointer {:#x} at {:#x}", value, addr);
            offsets.insert(addr);
        }
    }

    Ok(offsets)
}
