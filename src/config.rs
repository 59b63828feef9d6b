/// Options for a relocation run.
///
/// # Example
///
/// ```
/// use elf_pe_reloc::Config;
///
/// let config = Config::default().with_discardable(false).with_dry_run(true);
/// assert!(config.scan_data);
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Mark a newly appended `.reloc` section as discardable (default: true)
    pub discardable: bool,
    /// Scan `.data` for pointers without a relocation record (default: true)
    pub scan_data: bool,
    /// Compute the table but leave the destination untouched (default: false)
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discardable: true,
            scan_data: true,
            dry_run: false,
        }
    }
}

impl Config {
    /// Set whether a new `.reloc` section carries `IMAGE_SCN_MEM_DISCARDABLE`
    pub fn with_discardable(mut self, discardable: bool) -> Self {
        self.discardable = discardable;
        self
    }

    /// Enable or disable the heuristic `.data` pointer scan
    pub fn with_scan_data(mut self, scan_data: bool) -> Self {
        self.scan_data = scan_data;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
