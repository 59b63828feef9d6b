//! ELF section table reader
//!
//! Parses just enough of a 64-bit little-endian ELF image to name its
//! sections and locate their contents: the file header, the section header
//! table and the section name string table.

mod ehdr;
mod shdr;

use crate::{Result, arch::Arch, parse_shdr_error, reader::ImageBytes, reader::to_usize};
use hashbrown::HashMap;

pub use ehdr::ElfHeader;
pub use shdr::SectionDesc;
use shdr::RawShdr;

pub(crate) type Ehdr = elf::file::Elf64_Ehdr;
pub(crate) const EHDR_SIZE: usize = core::mem::size_of::<Ehdr>();
pub(crate) const SHDR_SIZE: usize = 64;

/// Half-open virtual address range `[lo, hi)` spanned by the mapped sections
/// of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageRange {
    pub lo: u64,
    pub hi: u64,
}

impl ImageRange {
    #[inline]
    pub fn contains(&self, value: u64) -> bool {
        self.lo <= value && value < self.hi
    }
}

/// The named sections of a source ELF image.
pub struct ElfSections {
    arch: Arch,
    sections: HashMap<String, SectionDesc>,
}

impl ElfSections {
    /// Parses the ELF header and section header table of `data`.
    ///
    /// Sections are keyed by name. If two sections share a name, the one that
    /// appears later in the table is kept.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let ehdr = ElfHeader::parse(data)?;
        let shnum = ehdr.e_shnum();
        let mut sections = HashMap::with_capacity(shnum);
        if shnum == 0 {
            return Ok(Self {
                arch: ehdr.arch(),
                sections,
            });
        }

        let shentsize = ehdr.e_shentsize();
        if shentsize < SHDR_SIZE {
            return Err(parse_shdr_error(format!(
                "section header entry size {shentsize} is too small"
            )));
        }
        let shoff = to_usize(ehdr.e_shoff())
            .ok_or_else(|| parse_shdr_error("section header offset out of range"))?;
        let header_at = |idx: usize| {
            idx.checked_mul(shentsize)
                .and_then(|rel| shoff.checked_add(rel))
                .ok_or_else(|| parse_shdr_error("section header offset overflow"))
                .and_then(|base| RawShdr::read(data, base))
        };

        let shstrndx = ehdr.e_shstrndx();
        if shstrndx >= shnum {
            return Err(parse_shdr_error(format!(
                "section name table index {shstrndx} out of range ({shnum} sections)"
            )));
        }
        let strtab_off = to_usize(header_at(shstrndx)?.sh_offset)
            .ok_or_else(|| parse_shdr_error("section name table offset out of range"))?;

        for idx in 0..shnum {
            let raw = header_at(idx)?;
            let name = strtab_off
                .checked_add(raw.sh_name as usize)
                .and_then(|start| data.cstr_at(start))
                .ok_or_else(|| {
                    parse_shdr_error(format!("unterminated name for section {idx}"))
                })?;
            let name = core::str::from_utf8(name)
                .map_err(|_| parse_shdr_error(format!("section {idx} name is not valid UTF-8")))?
                .to_owned();
            log::trace!(
                "[ELF] section {}: {:?} type: {} addr: {:#x} offset: {:#x} size: {:#x}",
                idx,
                name,
                raw.sh_type,
                raw.sh_addr,
                raw.sh_offset,
                raw.sh_size
            );
            sections.insert(name.clone(), raw.into_desc(name));
        }

        Ok(Self {
            arch: ehdr.arch(),
            sections,
        })
    }

    /// The architecture of the image.
    #[inline]
    pub fn arch(&self) -> Arch {
        self.arch
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&SectionDesc> {
        self.sections.get(name)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &SectionDesc> {
        self.sections.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Computes the address range covered by every section with a non-zero
    /// address and size. Returns `None` when there is no such section.
    pub fn image_range(&self) -> Option<ImageRange> {
        self.iter()
            .filter(|sec| sec.is_mapped())
            .fold(None, |range, sec| match range {
                None => Some(ImageRange {
                    lo: sec.addr,
                    hi: sec.end(),
                }),
                Some(ImageRange { lo, hi }) => Some(ImageRange {
                    lo: lo.min(sec.addr),
                    hi: hi.max(sec.end()),
                }),
            })
    }

    /// Returns the file contents of `sec`.
    pub fn section_data<'data>(&self, data: &'data [u8], sec: &SectionDesc) -> Result<&'data [u8]> {
        to_usize(sec.offset)
            .zip(to_usize(sec.size))
            .and_then(|(offset, size)| data.bytes_at(offset, size))
            .ok_or_else(|| {
                parse_shdr_error(format!(
                    "contents of section {} ({:#x}+{:#x}) lie outside the file",
                    sec.name, sec.offset, sec.size
                ))
            })
    }
}
