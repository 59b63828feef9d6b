//! PE base relocation table encoding
//!
//! The table is a sequence of blocks, one per 4 KiB page:
//!
//! ```text
//! u32 page_rva | u32 block_size | u16 entry * n [| u16 padding]
//! ```
//!
//! Each entry holds the fix-up kind in its high nibble and the offset inside
//! the page in its low 12 bits. A block is padded with one `ABSOLUTE` (no-op)
//! entry when needed to keep its size a multiple of 4.

use crate::{Result, reader::ImageBytes, relocate_error};
use byteorder::{LittleEndian, WriteBytesExt};
use object::pe::{IMAGE_REL_BASED_ABSOLUTE, IMAGE_REL_BASED_DIR64};
use std::collections::{BTreeMap, BTreeSet};

const PAGE_SIZE: u32 = 0x1000;
const PAGE_MASK: u32 = PAGE_SIZE - 1;
const BLOCK_HEADER_SIZE: usize = 8;
const ENTRY_SIZE: usize = 2;

/// Fix-up kind stored in the high nibble of an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelocKind {
    /// No-op entry used for padding.
    Absolute,
    /// Add the load delta to the 64-bit value at the entry's address.
    Dir64,
    /// Any other kind found while decoding a foreign table.
    Other(u16),
}

impl RelocKind {
    #[inline]
    fn bits(self) -> u16 {
        match self {
            RelocKind::Absolute => IMAGE_REL_BASED_ABSOLUTE,
            RelocKind::Dir64 => IMAGE_REL_BASED_DIR64,
            RelocKind::Other(bits) => bits,
        }
    }

    #[inline]
    fn from_bits(bits: u16) -> Self {
        match bits {
            IMAGE_REL_BASED_ABSOLUTE => RelocKind::Absolute,
            IMAGE_REL_BASED_DIR64 => RelocKind::Dir64,
            other => RelocKind::Other(other),
        }
    }
}

/// One 16-bit entry of a relocation block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelocEntry {
    /// Offset inside the block's page, below 0x1000.
    pub offset: u16,
    pub kind: RelocKind,
}

impl RelocEntry {
    #[inline]
    fn encode(self) -> u16 {
        (self.kind.bits() << 12) | (self.offset & PAGE_MASK as u16)
    }

    #[inline]
    fn decode(raw: u16) -> Self {
        Self {
            offset: raw & PAGE_MASK as u16,
            kind: RelocKind::from_bits(raw >> 12),
        }
    }
}

/// The relocations of one page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelocBlock {
    /// Page address, low 12 bits zero.
    pub page_rva: u32,
    /// Entries including any padding.
    pub entries: Vec<RelocEntry>,
}

impl RelocBlock {
    /// Size of the block in bytes as stored in its header.
    #[inline]
    pub fn size(&self) -> usize {
        BLOCK_HEADER_SIZE + ENTRY_SIZE * self.entries.len()
    }

    /// RVAs of the 64-bit fix-ups in this block, padding excluded.
    pub fn rvas(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries
            .iter()
            .filter(|entry| entry.kind == RelocKind::Dir64)
            .map(|entry| u64::from(self.page_rva) + u64::from(entry.offset))
    }
}

/// A complete base relocation table together with its encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelocTable {
    blocks: Vec<RelocBlock>,
    data: Vec<u8>,
}

impl RelocTable {
    /// Builds the table for a set of RVAs.
    ///
    /// Blocks are emitted in ascending page order and entries in ascending
    /// offset order, so the same set always encodes to the same bytes.
    /// Duplicate RVAs collapse into one entry.
    ///
    /// # Errors
    /// `Error::Relocation` if an RVA does not fit in 32 bits.
    pub fn build<I>(rvas: I) -> Result<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut pages: BTreeMap<u32, BTreeSet<u16>> = BTreeMap::new();
        for rva in rvas {
            let rva = u32::try_from(rva)
                .map_err(|_| relocate_error(format!("RVA {rva:#x} does not fit a PE image")))?;
            pages
                .entry(rva & !PAGE_MASK)
                .or_default()
                .insert((rva & PAGE_MASK) as u16);
        }

        let mut blocks = Vec::with_capacity(pages.len());
        let mut data = Vec::new();
        for (page_rva, offsets) in pages {
            let mut entries: Vec<RelocEntry> = offsets
                .into_iter()
                .map(|offset| RelocEntry {
                    offset,
                    kind: RelocKind::Dir64,
                })
                .collect();
            if (BLOCK_HEADER_SIZE + ENTRY_SIZE * entries.len()) % 4 != 0 {
                entries.push(RelocEntry {
                    offset: 0,
                    kind: RelocKind::Absolute,
                });
            }
            let block = RelocBlock { page_rva, entries };

            data.write_u32::<LittleEndian>(block.page_rva)?;
            data.write_u32::<LittleEndian>(block.size() as u32)?;
            for entry in &block.entries {
                data.write_u16::<LittleEndian>(entry.encode())?;
            }
            blocks.push(block);
        }

        Ok(Self { blocks, data })
    }

    /// Decodes a serialized table, e.g. the contents of an existing `.reloc`
    /// section.
    ///
    /// # Errors
    /// `Error::Relocation` if a block header is truncated or a block size is
    /// below 8, odd, or runs past the end of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut blocks = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let (Some(page_rva), Some(size)) = (bytes.u32_at(pos), bytes.u32_at(pos + 4)) else {
                return Err(relocate_error(format!(
                    "truncated relocation block header at {pos:#x}"
                )));
            };
            let size = size as usize;
            if size < BLOCK_HEADER_SIZE || size % ENTRY_SIZE != 0 {
                return Err(relocate_error(format!(
                    "invalid relocation block size {size:#x} at {pos:#x}"
                )));
            }
            let body = bytes
                .bytes_at(pos + BLOCK_HEADER_SIZE, size - BLOCK_HEADER_SIZE)
                .ok_or_else(|| {
                    relocate_error(format!("relocation block at {pos:#x} runs past the table"))
                })?;
            let entries = body
                .chunks_exact(ENTRY_SIZE)
                .map(|raw| RelocEntry::decode(u16::from_le_bytes([raw[0], raw[1]])))
                .collect();
            blocks.push(RelocBlock { page_rva, entries });
            pos += size;
        }

        Ok(Self {
            blocks,
            data: bytes.to_vec(),
        })
    }

    #[inline]
    pub fn blocks(&self) -> &[RelocBlock] {
        &self.blocks
    }

    /// The encoded table.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Length of the encoded table in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// RVAs of every 64-bit fix-up in the table, in table order.
    pub fn rvas(&self) -> impl Iterator<Item = u64> + '_ {
        self.blocks.iter().flat_map(|block| block.rvas())
    }
}
