//! PE32+ relocation section writer
//!
//! [`reloc`] encodes a base relocation table, [`PeHeaders`] locates the header
//! fields that describe it and [`PatchPlan`] decides where the table goes and
//! writes it.

mod header;
mod patch;
pub mod reloc;

use bitflags::bitflags;
use object::pe::{
    IMAGE_FILE_RELOCS_STRIPPED, IMAGE_SCN_CNT_INITIALIZED_DATA, IMAGE_SCN_MEM_DISCARDABLE,
    IMAGE_SCN_MEM_READ,
};

pub use header::{PeHeaders, PeSection};
pub use patch::{PatchKind, PatchPlan};
pub use reloc::{RelocBlock, RelocEntry, RelocKind, RelocTable};

/// Name of the section that holds the base relocation table.
pub const RELOC_SECTION_NAME: &str = ".reloc";
/// Alignment of section raw data in the file.
pub const FILE_ALIGNMENT: u32 = 0x200;
/// Alignment of sections in memory.
pub const SECTION_ALIGNMENT: u32 = 0x1000;
/// Size of one section table entry.
pub const SECTION_HEADER_SIZE: usize = 40;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    /// Section characteristics used for the relocation section.
    pub struct SectionFlags: u32 {
        /// The section contains initialized data.
        const CNT_INITIALIZED_DATA = IMAGE_SCN_CNT_INITIALIZED_DATA;
        /// The section may be dropped once the image is loaded.
        const MEM_DISCARDABLE = IMAGE_SCN_MEM_DISCARDABLE;
        /// The section is readable.
        const MEM_READ = IMAGE_SCN_MEM_READ;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    /// COFF file header characteristics.
    pub struct FileCharacteristics: u16 {
        /// The image carries no base relocations and must load at its
        /// preferred base.
        const RELOCS_STRIPPED = IMAGE_FILE_RELOCS_STRIPPED;
    }
}

#[inline]
pub(crate) fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}
