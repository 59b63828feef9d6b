// https://loongson.github.io/LoongArch-Documentation/LoongArch-ELF-ABI-CN.html

const EM_LARCH: u16 = 258;
const R_LARCH_NONE: u32 = 0;
const R_LARCH_32: u32 = 1;
const R_LARCH_64: u32 = 2;
const R_LARCH_RELATIVE: u32 = 3;
const R_LARCH_COPY: u32 = 4;
const R_LARCH_JUMP_SLOT: u32 = 5;
const R_LARCH_IRELATIVE: u32 = 12;
const R_LARCH_ADD64: u32 = 50;
const R_LARCH_SUB64: u32 = 55;

pub(crate) const EM_ARCH: u16 = EM_LARCH;

pub(crate) const REL_SYMBOLIC: u32 = R_LARCH_64;

/// Map loongarch64 relocation types to human readable names
pub(crate) fn rel_type_to_str(r_type: u32) -> &'static str {
    match r_type {
        R_LARCH_NONE => "R_LARCH_NONE",
        R_LARCH_32 => "R_LARCH_32",
        R_LARCH_64 => "R_LARCH_64",
        R_LARCH_RELATIVE => "R_LARCH_RELATIVE",
        R_LARCH_COPY => "R_LARCH_COPY",
        R_LARCH_JUMP_SLOT => "R_LARCH_JUMP_SLOT",
        R_LARCH_IRELATIVE => "R_LARCH_IRELATIVE",
        R_LARCH_ADD64 => "R_LARCH_ADD64",
        R_LARCH_SUB64 => "R_LARCH_SUB64",
        _ => "R_LARCH_UNKNOWN",
    }
}
