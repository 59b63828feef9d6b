use anyhow::{Context, Result};
use clap::Parser;
use elf_pe_reloc::{Config, Outcome, generate_file};
use std::path::PathBuf;

/// Generate PE base relocations from ELF absolute relocations.
///
/// Reads R_RISCV_64 / R_LARCH_64 records from .rela.data and .rela.rodata,
/// scans .data for image-internal pointers without a record, and patches the
/// PE file with a .reloc section.
#[derive(Parser)]
#[command(name = "gen-reloc", version)]
struct Args {
    /// ELF image the PE file was converted from
    elf: PathBuf,
    /// PE file to patch in place
    pe: PathBuf,
    /// Report what would be written without modifying the PE file
    #[arg(long, action = clap::ArgAction::SetTrue)]
    dry_run: bool,
    /// Do not mark a newly added .reloc section as discardable
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_discard: bool,
    /// Only use explicit relocation records, skip the .data pointer scan
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_scan: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let config = Config::default()
        .with_dry_run(args.dry_run)
        .with_discardable(!args.no_discard)
        .with_scan_data(!args.no_scan);

    let outcome = generate_file(&args.elf, &args.pe, &config).with_context(|| {
        format!(
            "failed to generate relocations for {} from {}",
            args.pe.display(),
            args.elf.display()
        )
    })?;

    match outcome {
        Outcome::NoRelocations => println!("no absolute relocations found, .reloc not needed"),
        Outcome::Patched(report) if args.dry_run => {
            println!("would patch {}: {}", args.pe.display(), report)
        }
        Outcome::Patched(report) => println!("patched {}: {}", args.pe.display(), report),
    }
    Ok(())
}
