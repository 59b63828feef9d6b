//! Architectures whose ELF images can be converted.
//!
//! Only the two targets whose ELF→PE conversion drops base relocations are
//! accepted. Both encode the 64-bit absolute relocation with type code 2.

mod loongarch64;
mod riscv64;

use core::fmt::{self, Display};

/// Machine type recorded in the ELF header of the source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    Riscv64,
    Loongarch64,
}

impl Arch {
    /// Maps an `e_machine` value to a supported architecture.
    pub fn from_machine(e_machine: u16) -> Option<Self> {
        match e_machine {
            riscv64::EM_ARCH => Some(Arch::Riscv64),
            loongarch64::EM_ARCH => Some(Arch::Loongarch64),
            _ => None,
        }
    }

    /// The `e_machine` value of this architecture.
    pub fn machine(self) -> u16 {
        match self {
            Arch::Riscv64 => riscv64::EM_ARCH,
            Arch::Loongarch64 => loongarch64::EM_ARCH,
        }
    }

    /// The 64-bit absolute relocation type (`R_RISCV_64` / `R_LARCH_64`).
    pub fn abs_reloc(self) -> u32 {
        match self {
            Arch::Riscv64 => riscv64::REL_SYMBOLIC,
            Arch::Loongarch64 => loongarch64::REL_SYMBOLIC,
        }
    }

    /// Human readable name of a relocation type, used in trace output.
    pub fn rel_type_to_str(self, r_type: u32) -> &'static str {
        match self {
            Arch::Riscv64 => riscv64::rel_type_to_str(r_type),
            Arch::Loongarch64 => loongarch64::rel_type_to_str(r_type),
        }
    }
}

impl Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::Riscv64 => f.write_str("riscv64"),
            Arch::Loongarch64 => f.write_str("loongarch64"),
        }
    }
}
