use crate::{
    Result,
    elf::ElfSections,
    parse_shdr_error,
    reader::{ImageBytes, to_usize},
};
use elf::abi::SHT_RELA;
use std::collections::BTreeSet;

/// Relocation sections whose records can need a load-time fix-up.
///
/// `.rela.text` is left out: code relocations on these targets are all
/// PC-relative.
pub const RELA_SECTIONS: [&str; 2] = [".rela.data", ".rela.rodata"];

const RELA_SIZE: u64 = 24;
const RELA_MIN_SIZE: u64 = 16;
const REL_MASK: u64 = 0xFFFF_FFFF;

/// Collects `r_offset` of every 64-bit absolute relocation record in
/// [`RELA_SECTIONS`].
pub fn explicit_offsets(elf: &ElfSections, data: &[u8]) -> Result<BTreeSet<u64>> {
    let abs_type = elf.arch().abs_reloc();
    let mut offsets = BTreeSet::new();

    for sec in elf.iter() {
        if sec.sh_type != SHT_RELA || !RELA_SECTIONS.contains(&sec.name.as_str()) {
            continue;
        }
        let entsize = if sec.entsize == 0 {
            RELA_SIZE
        } else {
            sec.entsize
        };
        if entsize < RELA_MIN_SIZE {
            return Err(parse_shdr_error(format!(
                "{} has entry size {entsize}, too small for a RELA record",
                sec.name
            )));
        }

        let stride = to_usize(entsize)
            .ok_or_else(|| parse_shdr_error(format!("{} entry size out of range", sec.name)))?;

        let raw = elf.section_data(data, sec)?;
        for record in raw.chunks_exact(stride) {
            let (Some(r_offset), Some(r_info)) = (record.u64_at(0), record.u64_at(8)) else {
                continue;
            };
            let r_type = (r_info & REL_MASK) as u32;
            if r_type == abs_type {
                log::trace!(
                    "[Reloc] {}: {} at {:#x}",
                    sec.name,
                    elf.arch().rel_type_to_str(r_type),
                    r_offset
                );
                offsets.insert(r_offset);
            }
        }
    }

    Ok(offsets)
}
