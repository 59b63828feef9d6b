use crate::{Result, elf::SHDR_SIZE, parse_shdr_error, reader::ImageBytes};

/// A section of the source ELF image.
///
/// Only the fields needed for relocation discovery are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionDesc {
    /// Section name resolved through the section name string table.
    pub name: String,
    /// Virtual address of the section (`sh_addr`).
    pub addr: u64,
    /// File offset of the section contents (`sh_offset`).
    pub offset: u64,
    /// Size of the section in bytes (`sh_size`).
    pub size: u64,
    /// Section type (`sh_type`).
    pub sh_type: u32,
    /// Size of one table entry for table sections (`sh_entsize`).
    pub entsize: u64,
}

/// Raw section header fields before the name is resolved.
pub(crate) struct RawShdr {
    pub(crate) sh_name: u32,
    pub(crate) sh_type: u32,
    pub(crate) sh_addr: u64,
    pub(crate) sh_offset: u64,
    pub(crate) sh_size: u64,
    pub(crate) sh_entsize: u64,
}

impl RawShdr {
    /// Reads the section header starting at `base`.
    pub(crate) fn read(data: &[u8], base: usize) -> Result<Self> {
        if data.bytes_at(base, SHDR_SIZE).is_none() {
            return Err(parse_shdr_error(format!(
                "section header at {base:#x} lies outside the file"
            )));
        }
        // The whole header is in bounds, so the field reads cannot fail.
        let u32_at = |off: usize| data.u32_at(base + off).unwrap_or_default();
        let u64_at = |off: usize| data.u64_at(base + off).unwrap_or_default();
        Ok(Self {
            sh_name: u32_at(0),
            sh_type: u32_at(4),
            sh_addr: u64_at(16),
            sh_offset: u64_at(24),
            sh_size: u64_at(32),
            sh_entsize: u64_at(56),
        })
    }

    pub(crate) fn into_desc(self, name: String) -> SectionDesc {
        SectionDesc {
            name,
            addr: self.sh_addr,
            offset: self.sh_offset,
            size: self.sh_size,
            sh_type: self.sh_type,
            entsize: self.sh_entsize,
        }
    }
}

impl SectionDesc {
    /// Returns `true` if the section occupies part of the loaded image.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.addr > 0 && self.size > 0
    }

    /// One past the last virtual address covered by the section.
    #[inline]
    pub fn end(&self) -> u64 {
        self.addr.saturating_add(self.size)
    }
}
