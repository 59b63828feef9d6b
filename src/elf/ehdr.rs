//! ELF header parsing and validation
//!
//! Only 64-bit little-endian images for the architectures in [`Arch`] are
//! accepted. The header is copied out of the file buffer field by field, so
//! the buffer does not need any particular alignment.

use crate::{
    Result,
    arch::Arch,
    elf::{EHDR_SIZE, Ehdr},
    parse_ehdr_error,
    reader::ImageBytes,
};
use core::ops::Deref;
use elf::abi::{EI_CLASS, EI_DATA, EI_NIDENT, ELFCLASS64, ELFDATA2LSB, ELFMAGIC};

/// A validated ELF header
pub struct ElfHeader {
    ehdr: Ehdr,
    arch: Arch,
}

impl Deref for ElfHeader {
    type Target = Ehdr;

    fn deref(&self) -> &Self::Target {
        &self.ehdr
    }
}

impl ElfHeader {
    /// Parses and validates the ELF header at the start of `data`.
    ///
    /// # Returns
    /// * `Ok(ElfHeader)` - The header of a 64-bit little-endian image for a
    ///   supported architecture
    /// * `Err(Error::ParseEhdr)` - If the signature, class, encoding or
    ///   machine does not match
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < EHDR_SIZE || data[0..4] != ELFMAGIC {
            return Err(parse_ehdr_error("invalid ELF magic"));
        }
        if data[EI_CLASS] != ELFCLASS64 {
            return Err(parse_ehdr_error("not a 64-bit ELF file"));
        }
        if data[EI_DATA] != ELFDATA2LSB {
            return Err(parse_ehdr_error("not a little-endian ELF file"));
        }

        let truncated = || parse_ehdr_error("truncated ELF header");
        let u16_at = |offset| data.u16_at(offset).ok_or_else(truncated);
        let u32_at = |offset| data.u32_at(offset).ok_or_else(truncated);
        let u64_at = |offset| data.u64_at(offset).ok_or_else(truncated);

        let mut e_ident = [0u8; EI_NIDENT];
        e_ident.copy_from_slice(&data[..EI_NIDENT]);
        let ehdr = Ehdr {
            e_ident,
            e_type: u16_at(16)?,
            e_machine: u16_at(18)?,
            e_version: u32_at(20)?,
            e_entry: u64_at(24)?,
            e_phoff: u64_at(32)?,
            e_shoff: u64_at(40)?,
            e_flags: u32_at(48)?,
            e_ehsize: u16_at(52)?,
            e_phentsize: u16_at(54)?,
            e_phnum: u16_at(56)?,
            e_shentsize: u16_at(58)?,
            e_shnum: u16_at(60)?,
            e_shstrndx: u16_at(62)?,
        };

        let arch = Arch::from_machine(ehdr.e_machine).ok_or_else(|| {
            parse_ehdr_error(format!("unsupported e_machine {:#x}", ehdr.e_machine))
        })?;

        log::debug!(
            "[ELF] arch: {}, shoff: {:#x}, shentsize: {}, shnum: {}, shstrndx: {}",
            arch,
            ehdr.e_shoff,
            ehdr.e_shentsize,
            ehdr.e_shnum,
            ehdr.e_shstrndx
        );
        Ok(Self { ehdr, arch })
    }

    /// The architecture recorded in `e_machine`.
    #[inline]
    pub fn arch(&self) -> Arch {
        self.arch
    }

    #[inline]
    pub(crate) fn e_shoff(&self) -> u64 {
        self.ehdr.e_shoff
    }

    #[inline]
    pub(crate) fn e_shentsize(&self) -> usize {
        self.ehdr.e_shentsize as usize
    }

    #[inline]
    pub(crate) fn e_shnum(&self) -> usize {
        self.ehdr.e_shnum as usize
    }

    #[inline]
    pub(crate) fn e_shstrndx(&self) -> usize {
        self.ehdr.e_shstrndx as usize
    }
}
