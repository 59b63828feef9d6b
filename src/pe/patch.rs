use crate::{
    Config, Result, capacity_error, parse_pe_error,
    pe::{
        FILE_ALIGNMENT, FileCharacteristics, PeHeaders, PeSection, RELOC_SECTION_NAME,
        RelocTable, SECTION_ALIGNMENT, SECTION_HEADER_SIZE, SectionFlags, align_up,
    },
    reader::ImageBytesMut,
    relocate_error,
};

/// Which way the relocation table was written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchKind {
    /// An existing `.reloc` section was overwritten in place.
    Replaced,
    /// A new `.reloc` section was appended.
    Appended,
}

/// Where the relocation table goes. Exactly one variant is chosen before the
/// image is modified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchPlan {
    /// Overwrite the raw data of an existing, large enough `.reloc` section.
    Replace { section: PeSection },
    /// Add a new section header and append the table to the file.
    Append {
        header_offset: usize,
        virtual_address: u32,
        raw_offset: u32,
        raw_size: u32,
    },
}

impl PatchPlan {
    /// Chooses between replacing an existing `.reloc` section and appending
    /// a new one, and checks that the chosen path fits the image.
    ///
    /// An existing `.reloc` that is too small is not resized: a new section
    /// is appended and the old one stays in the image, unused.
    ///
    /// # Errors
    /// * `Error::Capacity` if a new section is needed but the header area has
    ///   no room for another section header, the section count is already at
    ///   its 16-bit limit, or the image would outgrow the 32-bit PE address
    ///   fields.
    /// * `Error::ParsePe` if an existing `.reloc` section points outside the
    ///   file.
    pub fn new(headers: &PeHeaders, file_len: usize, table_len: usize) -> Result<Self> {
        let table_len_u32 = u32::try_from(table_len)
            .map_err(|_| relocate_error("relocation table exceeds 4 GiB"))?;

        if let Some(section) = headers.reloc_section() {
            if table_len_u32 <= section.raw_size {
                let end = section.raw_offset as usize + section.raw_size as usize;
                if end > file_len {
                    return Err(parse_pe_error(format!(
                        "{} raw data {:#x}..{:#x} lies outside the file",
                        RELOC_SECTION_NAME, section.raw_offset, end
                    )));
                }
                log::debug!(
                    "[Patch] replacing {} at {:#x} (raw size {:#x}, table {:#x})",
                    RELOC_SECTION_NAME,
                    section.virtual_address,
                    section.raw_size,
                    table_len
                );
                return Ok(PatchPlan::Replace {
                    section: section.clone(),
                });
            }
            log::warn!(
                "existing {} ({:#x} bytes) is too small for {:#x} bytes; appending a new section and leaving the old one unused",
                RELOC_SECTION_NAME,
                section.raw_size,
                table_len
            );
        }

        if headers.number_of_sections() >= usize::from(u16::MAX) {
            return Err(capacity_error(format!(
                "section table already holds {} sections",
                headers.number_of_sections()
            )));
        }
        let header_offset = headers.section_table_end();
        if header_offset + SECTION_HEADER_SIZE > headers.size_of_headers as usize {
            return Err(capacity_error(format!(
                "no room in PE header area for new section (headers_end={:#x}, SizeOfHeaders={:#x})",
                header_offset, headers.size_of_headers
            )));
        }
        if header_offset + SECTION_HEADER_SIZE > file_len {
            return Err(parse_pe_error(format!(
                "header area ends at {:#x}, past the end of the file",
                header_offset + SECTION_HEADER_SIZE
            )));
        }

        let overflow = || capacity_error("new section does not fit the 32-bit image layout");
        // Never below the mapped headers, even for an image without sections.
        let last_va_end = headers
            .last_section()
            .map_or(0, PeSection::va_end)
            .max(u64::from(headers.size_of_headers));
        let virtual_address = align_up(last_va_end, u64::from(SECTION_ALIGNMENT));
        let virtual_address = u32::try_from(virtual_address).map_err(|_| overflow())?;
        let raw_offset = align_up(file_len as u64, u64::from(FILE_ALIGNMENT));
        let raw_offset = u32::try_from(raw_offset).map_err(|_| overflow())?;
        let raw_size = align_up(u64::from(table_len_u32), u64::from(FILE_ALIGNMENT));
        let raw_size = u32::try_from(raw_size).map_err(|_| overflow())?;
        raw_offset.checked_add(raw_size).ok_or_else(overflow)?;
        image_size(virtual_address, table_len_u32).ok_or_else(overflow)?;

        log::debug!(
            "[Patch] appending {} at rva {:#x}, file offset {:#x}, raw size {:#x}",
            RELOC_SECTION_NAME,
            virtual_address,
            raw_offset,
            raw_size
        );
        Ok(PatchPlan::Append {
            header_offset,
            virtual_address,
            raw_offset,
            raw_size,
        })
    }

    #[inline]
    pub fn kind(&self) -> PatchKind {
        match self {
            PatchPlan::Replace { .. } => PatchKind::Replaced,
            PatchPlan::Append { .. } => PatchKind::Appended,
        }
    }

    /// RVA at which the table will be mapped.
    #[inline]
    pub fn virtual_address(&self) -> u32 {
        match self {
            PatchPlan::Replace { section } => section.virtual_address,
            PatchPlan::Append {
                virtual_address, ..
            } => *virtual_address,
        }
    }

    /// Writes `table` into `pe` following the plan.
    ///
    /// The plan must have been made by [`PatchPlan::new`] for the same
    /// headers, buffer length and table length; every bound was checked
    /// there.
    pub fn apply(&self, pe: &mut Vec<u8>, headers: &PeHeaders, table: &RelocTable, config: &Config) {
        let data = table.as_bytes();
        let table_len = data.len() as u32;

        match self {
            PatchPlan::Replace { section } => {
                let start = section.raw_offset as usize;
                let end = start + section.raw_size as usize;
                pe[start..start + data.len()].copy_from_slice(data);
                pe[start + data.len()..end].fill(0);
                pe.put_u32(section.header_offset + 8, table_len);
            }
            PatchPlan::Append {
                header_offset,
                virtual_address,
                raw_offset,
                raw_size,
            } => {
                let mut flags = SectionFlags::CNT_INITIALIZED_DATA | SectionFlags::MEM_READ;
                if config.discardable {
                    flags |= SectionFlags::MEM_DISCARDABLE;
                }
                let header = &mut pe[*header_offset..*header_offset + SECTION_HEADER_SIZE];
                header.fill(0);
                header[..RELOC_SECTION_NAME.len()].copy_from_slice(RELOC_SECTION_NAME.as_bytes());
                header.put_u32(8, table_len);
                header.put_u32(12, *virtual_address);
                header.put_u32(16, *raw_size);
                header.put_u32(20, *raw_offset);
                header.put_u32(36, flags.bits());

                let count = headers.number_of_sections() as u16 + 1;
                pe.put_u16(headers.number_of_sections_offset(), count);
                // Checked in `PatchPlan::new`.
                let size_of_image = image_size(*virtual_address, table_len).unwrap_or(u32::MAX);
                pe.put_u32(headers.size_of_image_offset(), size_of_image);

                let raw_offset = *raw_offset as usize;
                if pe.len() < raw_offset {
                    pe.resize(raw_offset, 0);
                }
                pe.extend_from_slice(data);
                pe.resize(raw_offset + *raw_size as usize, 0);
            }
        }

        let dir = headers.reloc_directory_offset();
        pe.put_u32(dir, self.virtual_address());
        pe.put_u32(dir + 4, table_len);

        let mut characteristics = FileCharacteristics::from_bits_retain(headers.characteristics);
        characteristics.remove(FileCharacteristics::RELOCS_STRIPPED);
        pe.put_u16(headers.characteristics_offset(), characteristics.bits());
    }
}

/// `SizeOfImage` once a section of `len` bytes is mapped at `virtual_address`.
fn image_size(virtual_address: u32, len: u32) -> Option<u32> {
    let size = align_up(u64::from(len.max(1)), u64::from(SECTION_ALIGNMENT));
    u32::try_from(u64::from(virtual_address) + size).ok()
}
