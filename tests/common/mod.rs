#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;

pub const EM_RISCV: u16 = 0xF3;
pub const EM_LOONGARCH: u16 = 0x102;
pub const EM_X86_64: u16 = 0x3E;

pub const SHT_PROGBITS: u32 = 1;
pub const SHT_RELA: u32 = 4;
pub const SHT_NOBITS: u32 = 8;

pub const R_ABS64: u64 = 2;
pub const R_RISCV_RELATIVE: u64 = 3;

const EHDR_SIZE: usize = 64;
const SHDR_SIZE: usize = 64;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn align(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

pub struct ElfSection {
    pub name: String,
    pub sh_type: u32,
    pub addr: u64,
    pub data: Vec<u8>,
    pub entsize: u64,
    /// Size recorded in the header, when it differs from `data.len()`.
    pub size: Option<u64>,
}

/// Hand-assembles a minimal ELF64 little-endian image with a section table.
pub struct ElfBuilder {
    pub machine: u16,
    pub class: u8,
    pub encoding: u8,
    pub sections: Vec<ElfSection>,
}

impl ElfBuilder {
    pub fn new(machine: u16) -> Self {
        Self {
            machine,
            class: 2,
            encoding: 1,
            sections: Vec::new(),
        }
    }

    pub fn section(mut self, name: &str, sh_type: u32, addr: u64, data: Vec<u8>) -> Self {
        self.sections.push(ElfSection {
            name: name.to_string(),
            sh_type,
            addr,
            data,
            entsize: 0,
            size: None,
        });
        self
    }

    /// A `.bss`-like section: occupies address space but no file bytes.
    pub fn nobits(mut self, name: &str, addr: u64, size: u64) -> Self {
        self.sections.push(ElfSection {
            name: name.to_string(),
            sh_type: SHT_NOBITS,
            addr,
            data: Vec::new(),
            entsize: 0,
            size: Some(size),
        });
        self
    }

    /// A RELA section made of `(r_offset, r_type)` records.
    pub fn rela(mut self, name: &str, records: &[(u64, u64)]) -> Self {
        let mut data = Vec::new();
        for (idx, &(r_offset, r_type)) in records.iter().enumerate() {
            let r_info = ((idx as u64 + 1) << 32) | r_type;
            data.write_u64::<LittleEndian>(r_offset).unwrap();
            data.write_u64::<LittleEndian>(r_info).unwrap();
            data.write_i64::<LittleEndian>(0).unwrap();
        }
        self.sections.push(ElfSection {
            name: name.to_string(),
            sh_type: SHT_RELA,
            addr: 0,
            data,
            entsize: 24,
            size: None,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        // Section name string table: "\0" then each name, then ".shstrtab".
        let mut shstrtab = vec![0u8];
        let mut name_offs = Vec::new();
        for sec in &self.sections {
            name_offs.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(sec.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab\0");

        let mut out = vec![0u8; EHDR_SIZE];
        let mut offsets = Vec::new();
        for sec in &self.sections {
            out.resize(align(out.len(), 8), 0);
            offsets.push(out.len() as u64);
            out.extend_from_slice(&sec.data);
        }
        let shstrtab_off = out.len() as u64;
        out.extend_from_slice(&shstrtab);
        out.resize(align(out.len(), 8), 0);
        let shoff = out.len() as u64;

        // null section
        out.extend_from_slice(&[0u8; SHDR_SIZE]);
        for (idx, sec) in self.sections.iter().enumerate() {
            let size = sec.size.unwrap_or(sec.data.len() as u64);
            write_shdr(&mut out, name_offs[idx], sec.sh_type, sec.addr, offsets[idx], size, sec.entsize);
        }
        write_shdr(&mut out, shstrtab_name, 3, 0, shstrtab_off, shstrtab.len() as u64, 0);

        let shnum = self.sections.len() as u16 + 2;
        let mut ehdr = Vec::with_capacity(EHDR_SIZE);
        ehdr.write_all(&[0x7f, b'E', b'L', b'F', self.class, self.encoding, 1, 0])
            .unwrap();
        ehdr.write_all(&[0u8; 8]).unwrap();
        ehdr.write_u16::<LittleEndian>(2).unwrap(); // ET_EXEC
        ehdr.write_u16::<LittleEndian>(self.machine).unwrap();
        ehdr.write_u32::<LittleEndian>(1).unwrap();
        ehdr.write_u64::<LittleEndian>(0).unwrap(); // e_entry
        ehdr.write_u64::<LittleEndian>(0).unwrap(); // e_phoff
        ehdr.write_u64::<LittleEndian>(shoff).unwrap();
        ehdr.write_u32::<LittleEndian>(0).unwrap(); // e_flags
        ehdr.write_u16::<LittleEndian>(EHDR_SIZE as u16).unwrap();
        ehdr.write_u16::<LittleEndian>(56).unwrap();
        ehdr.write_u16::<LittleEndian>(0).unwrap();
        ehdr.write_u16::<LittleEndian>(SHDR_SIZE as u16).unwrap();
        ehdr.write_u16::<LittleEndian>(shnum).unwrap();
        ehdr.write_u16::<LittleEndian>(shnum - 1).unwrap();
        out[..EHDR_SIZE].copy_from_slice(&ehdr);
        out
    }
}

fn write_shdr(out: &mut Vec<u8>, name: u32, sh_type: u32, addr: u64, offset: u64, size: u64, entsize: u64) {
    out.write_u32::<LittleEndian>(name).unwrap();
    out.write_u32::<LittleEndian>(sh_type).unwrap();
    out.write_u64::<LittleEndian>(0).unwrap(); // sh_flags
    out.write_u64::<LittleEndian>(addr).unwrap();
    out.write_u64::<LittleEndian>(offset).unwrap();
    out.write_u64::<LittleEndian>(size).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap(); // sh_link
    out.write_u32::<LittleEndian>(0).unwrap(); // sh_info
    out.write_u64::<LittleEndian>(8).unwrap(); // sh_addralign
    out.write_u64::<LittleEndian>(entsize).unwrap();
}

/// Little-endian encoding of a sequence of 64-bit words.
pub fn words(values: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 8);
    for &value in values {
        out.write_u64::<LittleEndian>(value).unwrap();
    }
    out
}

/// The image used by most tests: `.text` at 0x1000, `.rodata` at 0x2000,
/// `.data` at 0x3000 and `.bss` up to 0x5000.
pub fn sample_elf(data: &[u64], rela_data: &[(u64, u64)]) -> Vec<u8> {
    let mut builder = ElfBuilder::new(EM_RISCV)
        .section(".text", SHT_PROGBITS, 0x1000, vec![0x13; 0x100])
        .section(".rodata", SHT_PROGBITS, 0x2000, b"hello, world\0".to_vec())
        .section(".data", SHT_PROGBITS, 0x3000, words(data))
        .nobits(".bss", 0x4000, 0x1000);
    if !rela_data.is_empty() {
        builder = builder.rela(".rela.data", rela_data);
    }
    builder.build()
}

pub const PE_LFANEW: usize = 0x40;
pub const PE_COFF: usize = PE_LFANEW + 4;
pub const PE_OPT: usize = PE_COFF + 20;
pub const PE_OPT_SIZE: usize = 240;
pub const PE_SECTION_TABLE: usize = PE_OPT + PE_OPT_SIZE;
pub const PE_RELOC_DIR: usize = PE_OPT + 112 + 5 * 8;

pub const IMAGE_FILE_RELOCS_STRIPPED: u16 = 0x0001;
pub const IMAGE_FILE_EXECUTABLE_IMAGE: u16 = 0x0002;
pub const IMAGE_SCN_CNT_INITIALIZED_DATA: u32 = 0x0000_0040;
pub const IMAGE_SCN_MEM_DISCARDABLE: u32 = 0x0200_0000;
pub const IMAGE_SCN_MEM_READ: u32 = 0x4000_0000;

pub struct PeSectionDef {
    pub name: &'static str,
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub raw: Vec<u8>,
    /// Raw size recorded in the header; defaults to `raw.len()` rounded up
    /// to 0x200.
    pub raw_size: Option<u32>,
}

impl PeSectionDef {
    pub fn new(name: &'static str, virtual_address: u32, raw: Vec<u8>) -> Self {
        Self {
            name,
            virtual_address,
            virtual_size: raw.len() as u32,
            raw,
            raw_size: None,
        }
    }
}

/// Hand-assembles a minimal PE32+ image.
pub struct PeBuilder {
    pub magic: u16,
    pub characteristics: u16,
    pub size_of_headers: u32,
    pub sections: Vec<PeSectionDef>,
}

impl PeBuilder {
    pub fn new() -> Self {
        Self {
            magic: 0x20B,
            characteristics: IMAGE_FILE_EXECUTABLE_IMAGE | IMAGE_FILE_RELOCS_STRIPPED,
            size_of_headers: 0x400,
            sections: Vec::new(),
        }
    }

    pub fn section(mut self, def: PeSectionDef) -> Self {
        self.sections.push(def);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.size_of_headers as usize];
        out[0..2].copy_from_slice(b"MZ");
        LittleEndian::write_u32(&mut out[0x3C..], PE_LFANEW as u32);
        out[PE_LFANEW..PE_LFANEW + 4].copy_from_slice(b"PE\0\0");

        LittleEndian::write_u16(&mut out[PE_COFF..], 0x5064); // riscv64
        LittleEndian::write_u16(&mut out[PE_COFF + 2..], self.sections.len() as u16);
        LittleEndian::write_u16(&mut out[PE_COFF + 16..], PE_OPT_SIZE as u16);
        LittleEndian::write_u16(&mut out[PE_COFF + 18..], self.characteristics);

        let image_end = self
            .sections
            .iter()
            .map(|s| s.virtual_address + s.virtual_size)
            .max()
            .unwrap_or(0x1000);
        LittleEndian::write_u16(&mut out[PE_OPT..], self.magic);
        LittleEndian::write_u32(&mut out[PE_OPT + 32..], 0x1000);
        LittleEndian::write_u32(&mut out[PE_OPT + 36..], 0x200);
        LittleEndian::write_u32(&mut out[PE_OPT + 56..], align(image_end as usize, 0x1000) as u32);
        LittleEndian::write_u32(&mut out[PE_OPT + 60..], self.size_of_headers);
        LittleEndian::write_u32(&mut out[PE_OPT + 108..], 16);

        for (idx, def) in self.sections.iter().enumerate() {
            let raw_size = def
                .raw_size
                .unwrap_or(align(def.raw.len(), 0x200) as u32);
            let raw_offset = align(out.len(), 0x200);
            out.resize(raw_offset, 0);
            out.extend_from_slice(&def.raw);
            out.resize(raw_offset + raw_size as usize, 0);

            let hdr = PE_SECTION_TABLE + idx * 40;
            let mut name = [0u8; 8];
            name[..def.name.len()].copy_from_slice(def.name.as_bytes());
            out[hdr..hdr + 8].copy_from_slice(&name);
            LittleEndian::write_u32(&mut out[hdr + 8..], def.virtual_size);
            LittleEndian::write_u32(&mut out[hdr + 12..], def.virtual_address);
            LittleEndian::write_u32(&mut out[hdr + 16..], raw_size);
            LittleEndian::write_u32(&mut out[hdr + 20..], raw_offset as u32);
            LittleEndian::write_u32(
                &mut out[hdr + 36..],
                IMAGE_SCN_CNT_INITIALIZED_DATA | IMAGE_SCN_MEM_READ,
            );
        }
        out
    }
}

/// A PE image matching [`sample_elf`], without a `.reloc` section.
pub fn sample_pe() -> Vec<u8> {
    PeBuilder::new()
        .section(PeSectionDef::new(".text", 0x1000, vec![0x13; 0x100]))
        .section(PeSectionDef::new(".rodata", 0x2000, b"hello, world\0".to_vec()))
        .section(PeSectionDef::new(".data", 0x3000, vec![0; 0x40]))
        .build()
}

pub fn u16_at(data: &[u8], offset: usize) -> u16 {
    LittleEndian::read_u16(&data[offset..])
}

pub fn u32_at(data: &[u8], offset: usize) -> u32 {
    LittleEndian::read_u32(&data[offset..])
}
