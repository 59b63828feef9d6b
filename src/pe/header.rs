use crate::{
    Result, parse_pe_error,
    pe::{RELOC_SECTION_NAME, SECTION_HEADER_SIZE},
    reader::ImageBytes,
};
use object::pe::{
    IMAGE_DIRECTORY_ENTRY_BASERELOC, IMAGE_NT_OPTIONAL_HDR32_MAGIC,
    IMAGE_NT_OPTIONAL_HDR64_MAGIC, IMAGE_NT_SIGNATURE,
};

/// Offset of `e_lfanew` in the DOS stub header.
const E_LFANEW_OFFSET: usize = 0x3C;
const COFF_HEADER_SIZE: usize = 20;
const DATA_DIRECTORY_OFFSET: usize = 112;
const DATA_DIRECTORY_SIZE: usize = 8;

/// A section header of the destination image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeSection {
    /// Position in the section table.
    pub index: usize,
    /// Name with trailing NUL padding removed.
    pub name: String,
    /// File offset of this entry in the section table.
    pub header_offset: usize,
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub raw_size: u32,
    pub raw_offset: u32,
    pub characteristics: u32,
}

impl PeSection {
    /// One past the last RVA the section may occupy.
    #[inline]
    pub fn va_end(&self) -> u64 {
        u64::from(self.virtual_address) + u64::from(self.virtual_size.max(self.raw_size))
    }
}

/// Location of every header field the patcher reads or writes.
///
/// The view only holds offsets and copies of the values; the byte buffer
/// itself stays with the caller.
#[derive(Clone, Debug)]
pub struct PeHeaders {
    /// Offset of the COFF file header (`e_lfanew + 4`).
    pub coff_offset: usize,
    /// Offset of the optional header.
    pub opt_offset: usize,
    /// Offset of the section table.
    pub section_table_offset: usize,
    pub characteristics: u16,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub sections: Vec<PeSection>,
}

impl PeHeaders {
    /// Parses the headers of a PE32+ image.
    ///
    /// # Errors
    /// `Error::ParsePe` if the `PE\0\0` signature is missing, the optional
    /// header is not PE32+, it has no base relocation directory slot, or any
    /// header lies outside the file.
    pub fn parse(pe: &[u8]) -> Result<Self> {
        let truncated = || parse_pe_error("truncated PE headers");

        let pe_sig_off = pe.u32_at(E_LFANEW_OFFSET).ok_or_else(truncated)? as usize;
        if pe.u32_at(pe_sig_off) != Some(IMAGE_NT_SIGNATURE) {
            return Err(parse_pe_error("invalid PE signature"));
        }

        let coff_offset = pe_sig_off + 4;
        let number_of_sections = pe.u16_at(coff_offset + 2).ok_or_else(truncated)? as usize;
        let opt_hdr_size = pe.u16_at(coff_offset + 16).ok_or_else(truncated)? as usize;
        let characteristics = pe.u16_at(coff_offset + 18).ok_or_else(truncated)?;

        let opt_offset = coff_offset + COFF_HEADER_SIZE;
        match pe.u16_at(opt_offset).ok_or_else(truncated)? {
            IMAGE_NT_OPTIONAL_HDR64_MAGIC => {}
            IMAGE_NT_OPTIONAL_HDR32_MAGIC => return Err(parse_pe_error("not PE32+ (found PE32)")),
            magic => {
                return Err(parse_pe_error(format!(
                    "not PE32+ (optional header magic {magic:#x})"
                )));
            }
        }
        let size_of_image = pe.u32_at(opt_offset + 56).ok_or_else(truncated)?;
        let size_of_headers = pe.u32_at(opt_offset + 60).ok_or_else(truncated)?;
        let number_of_rva_and_sizes = pe.u32_at(opt_offset + 108).ok_or_else(truncated)? as usize;

        let reloc_dir_end =
            DATA_DIRECTORY_OFFSET + (IMAGE_DIRECTORY_ENTRY_BASERELOC + 1) * DATA_DIRECTORY_SIZE;
        if number_of_rva_and_sizes <= IMAGE_DIRECTORY_ENTRY_BASERELOC || opt_hdr_size < reloc_dir_end
        {
            return Err(parse_pe_error(
                "optional header has no base relocation directory",
            ));
        }

        let section_table_offset = opt_offset + opt_hdr_size;
        let mut sections = Vec::with_capacity(number_of_sections);
        for index in 0..number_of_sections {
            let header_offset = section_table_offset + index * SECTION_HEADER_SIZE;
            let header = pe
                .bytes_at(header_offset, SECTION_HEADER_SIZE)
                .ok_or_else(|| parse_pe_error(format!("section header {index} is truncated")))?;
            let raw_name = &header[..8];
            let name_len = raw_name.iter().rposition(|&b| b != 0).map_or(0, |pos| pos + 1);
            let field = |off: usize| header.u32_at(off).unwrap_or_default();
            sections.push(PeSection {
                index,
                name: String::from_utf8_lossy(&raw_name[..name_len]).into_owned(),
                header_offset,
                virtual_size: field(8),
                virtual_address: field(12),
                raw_size: field(16),
                raw_offset: field(20),
                characteristics: field(36),
            });
        }

        log::debug!(
            "[PE] sections: {}, size of image: {:#x}, size of headers: {:#x}, section table at {:#x}",
            number_of_sections,
            size_of_image,
            size_of_headers,
            section_table_offset
        );
        Ok(Self {
            coff_offset,
            opt_offset,
            section_table_offset,
            characteristics,
            size_of_image,
            size_of_headers,
            sections,
        })
    }

    #[inline]
    pub fn number_of_sections(&self) -> usize {
        self.sections.len()
    }

    /// File offset one past the last section header.
    #[inline]
    pub fn section_table_end(&self) -> usize {
        self.section_table_offset + self.sections.len() * SECTION_HEADER_SIZE
    }

    /// The relocation section, if the image already has one. With several
    /// candidates the last one in the table wins.
    pub fn reloc_section(&self) -> Option<&PeSection> {
        self.sections
            .iter()
            .rev()
            .find(|sec| sec.name == RELOC_SECTION_NAME)
    }

    /// The section with the highest virtual address.
    pub fn last_section(&self) -> Option<&PeSection> {
        self.sections.iter().max_by_key(|sec| sec.virtual_address)
    }

    #[inline]
    pub(crate) fn number_of_sections_offset(&self) -> usize {
        self.coff_offset + 2
    }

    #[inline]
    pub(crate) fn characteristics_offset(&self) -> usize {
        self.coff_offset + 18
    }

    #[inline]
    pub(crate) fn size_of_image_offset(&self) -> usize {
        self.opt_offset + 56
    }

    /// File offset of the base relocation data directory entry.
    #[inline]
    pub fn reloc_directory_offset(&self) -> usize {
        self.opt_offset
            + DATA_DIRECTORY_OFFSET
            + IMAGE_DIRECTORY_ENTRY_BASERELOC * DATA_DIRECTORY_SIZE
    }
}
