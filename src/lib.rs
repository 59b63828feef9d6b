//! # elf_pe_reloc
//! Recover the absolute-address fix-ups of a RISC-V or LoongArch ELF image
//! and patch them into the PE32+ image produced from it as a `.reloc`
//! section.
//!
//! ELF→PE conversion for these targets does not emit PE base relocations,
//! which leaves the resulting UEFI image position dependent. This crate
//! rebuilds the table:
//! 1. [`ElfSections`] reads the ELF section table.
//! 2. [`relocation::discover`] collects the offsets from `R_*_64` records and
//!    from a scan of `.data` for in-image pointers.
//! 3. [`RelocTable`] encodes them as PE base relocation blocks.
//! 4. [`PatchPlan`] writes the blocks into an existing `.reloc` section or
//!    appends a new one, and updates the headers.
//!
//! ## Example
//! ```no_run
//! use elf_pe_reloc::{Config, Outcome, generate_file};
//!
//! match generate_file("kernel.elf", "kernel.efi", &Config::default()).unwrap() {
//!     Outcome::NoRelocations => println!("nothing to do"),
//!     Outcome::Patched(report) => println!("{report}"),
//! }
//! ```

pub mod arch;
mod config;
pub mod elf;
mod error;
pub mod pe;
mod reader;
pub mod relocation;

use core::fmt::{self, Display};
use std::path::Path;

pub use config::Config;
pub use elf::ElfSections;
pub use error::*;
pub use pe::{PatchKind, PatchPlan, PeHeaders, RelocTable};
pub use relocation::RelocOffsets;

pub type Result<T> = core::result::Result<T, Error>;

/// Summary of a successful patch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// Distinct relocations written.
    pub total: usize,
    /// Relocations that came from `R_*_64` records.
    pub explicit: usize,
    /// Relocations found only by the `.data` scan.
    pub scanned: usize,
    /// Size of the relocation table in bytes.
    pub table_len: usize,
    /// Whether an existing section was reused or a new one appended.
    pub kind: PatchKind,
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} relocations ({} from .rela + {} from scan), {} bytes of .reloc data",
            self.total, self.explicit, self.scanned, self.table_len
        )
    }
}

/// Result of a relocation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The ELF image holds no absolute pointers; the PE image was not touched.
    NoRelocations,
    /// The relocation table was built and (unless in dry-run mode) written.
    Patched(Report),
}

/// Builds the relocation table for `elf_data` and patches it into `pe`.
///
/// Every check runs before `pe` is modified: on error the buffer is left
/// exactly as it was. With [`Config::dry_run`] set the buffer is never
/// modified.
pub fn generate(elf_data: &[u8], pe: &mut Vec<u8>, config: &Config) -> Result<Outcome> {
    let sections = ElfSections::parse(elf_data)?;
    let offsets = relocation::discover(&sections, elf_data, config)?;
    if offsets.is_empty() {
        log::info!("no absolute relocations found");
        return Ok(Outcome::NoRelocations);
    }

    let table = RelocTable::build(offsets.iter().copied())?;
    let headers = PeHeaders::parse(pe)?;
    let plan = PatchPlan::new(&headers, pe.len(), table.len())?;
    if config.dry_run {
        log::info!("dry run, leaving the PE image untouched");
    } else {
        plan.apply(pe, &headers, &table, config);
    }

    Ok(Outcome::Patched(Report {
        total: offsets.len(),
        explicit: offsets.explicit(),
        scanned: offsets.scanned(),
        table_len: table.len(),
        kind: plan.kind(),
    }))
}

/// Reads both images, patches the PE image in memory and writes it back to
/// `pe_path` in a single write.
///
/// The destination file is only written when the patch succeeded and
/// relocations were found (and not in dry-run mode).
pub fn generate_file(
    elf_path: impl AsRef<Path>,
    pe_path: impl AsRef<Path>,
    config: &Config,
) -> Result<Outcome> {
    let (elf_path, pe_path) = (elf_path.as_ref(), pe_path.as_ref());
    let elf_data = std::fs::read(elf_path)
        .map_err(|err| io_error(format!("{}: {err}", elf_path.display())))?;
    let mut pe = std::fs::read(pe_path)
        .map_err(|err| io_error(format!("{}: {err}", pe_path.display())))?;

    let outcome = generate(&elf_data, &mut pe, config)?;
    if matches!(outcome, Outcome::Patched(_)) && !config.dry_run {
        std::fs::write(pe_path, &pe)
            .map_err(|err| io_error(format!("{}: {err}", pe_path.display())))?;
    }
    Ok(outcome)
}
