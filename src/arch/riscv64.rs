use elf::abi::*;

pub(crate) const EM_ARCH: u16 = EM_RISCV;

pub(crate) const REL_SYMBOLIC: u32 = R_RISCV_64;

/// Map riscv64 relocation types to human readable names
pub(crate) fn rel_type_to_str(r_type: u32) -> &'static str {
    match r_type {
        R_RISCV_NONE => "R_RISCV_NONE",
        R_RISCV_32 => "R_RISCV_32",
        R_RISCV_64 => "R_RISCV_64",
        R_RISCV_RELATIVE => "R_RISCV_RELATIVE",
        R_RISCV_COPY => "R_RISCV_COPY",
        R_RISCV_JUMP_SLOT => "R_RISCV_JUMP_SLOT",
        R_RISCV_IRELATIVE => "R_RISCV_IRELATIVE",
        R_RISCV_ADD64 => "R_RISCV_ADD64",
        R_RISCV_SUB64 => "R_RISCV_SUB64",
        _ => "R_RISCV_UNKNOWN",
    }
}
