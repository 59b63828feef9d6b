//! Discovery of the image offsets that need a base relocation
//!
//! Two sources are combined:
//! * explicit `R_*_64` records in `.rela.data` / `.rela.rodata`
//! * a scan of `.data` for 8-byte values that point into the image, which
//!   catches linker-synthesized slots (GOT entries) that carry no record

mod rela;
mod scan;

use crate::{Config, Result, elf::ElfSections};
use delegate::delegate;
use std::collections::{BTreeSet, btree_set};

pub use rela::{RELA_SECTIONS, explicit_offsets};
pub use scan::{SCAN_SECTION, scan_pointers};

/// Deduplicated, ordered set of RVAs that hold a 64-bit absolute address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelocOffsets {
    offsets: BTreeSet<u64>,
    explicit: usize,
    scanned: usize,
}

impl RelocOffsets {
    /// Unions the two discovery results.
    ///
    /// `scanned` in the result counts only the offsets the explicit records
    /// did not already cover.
    pub fn merge(explicit: BTreeSet<u64>, scanned: BTreeSet<u64>) -> Self {
        let explicit_count = explicit.len();
        let mut offsets = explicit;
        offsets.extend(scanned);
        let scanned = offsets.len() - explicit_count;
        Self {
            offsets,
            explicit: explicit_count,
            scanned,
        }
    }

    /// Number of offsets that came from relocation records.
    #[inline]
    pub fn explicit(&self) -> usize {
        self.explicit
    }

    /// Number of offsets found only by the pointer scan.
    #[inline]
    pub fn scanned(&self) -> usize {
        self.scanned
    }

    delegate! {
        to self.offsets {
            /// Total number of distinct offsets.
            pub fn len(&self) -> usize;
            pub fn is_empty(&self) -> bool;
            pub fn contains(&self, rva: &u64) -> bool;
            /// Iterates the offsets in ascending order.
            pub fn iter(&self) -> btree_set::Iter<'_, u64>;
        }
    }
}

impl<'a> IntoIterator for &'a RelocOffsets {
    type Item = &'a u64;
    type IntoIter = btree_set::Iter<'a, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.offsets.iter()
    }
}

/// Collects every offset of the source image that needs a base relocation.
pub fn discover(elf: &ElfSections, data: &[u8], config: &Config) -> Result<RelocOffsets> {
    let explicit = explicit_offsets(elf, data)?;
    let scanned = if config.scan_data {
        scan_pointers(elf, data)?
    } else {
        BTreeSet::new()
    };
    let offsets = RelocOffsets::merge(explicit, scanned);
    log::debug!(
        "[Reloc] {} offsets ({} explicit, {} from scan)",
        offsets.len(),
        offsets.explicit(),
        offsets.scanned()
    );
    Ok(offsets)
}
