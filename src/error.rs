use std::borrow::Cow;
use std::fmt::Display;

/// Error types used throughout the `elf_pe_reloc` library.
/// These errors represent the failure conditions that can occur while
/// reading the source ELF image, discovering relocations and patching the
/// destination PE image.
#[derive(Debug)]
pub enum Error {
    /// An error occurred while reading or writing one of the image files.
    Io {
        /// A descriptive message about the I/O error.
        msg: Cow<'static, str>,
    },

    /// An error occurred while parsing the ELF header.
    ///
    /// This error typically indicates issues with the ELF header such as:
    /// * Invalid magic bytes
    /// * Unsupported ELF class or data encoding
    /// * Unsupported machine type
    ParseEhdr {
        /// A descriptive message about the ELF header parsing error.
        msg: Cow<'static, str>,
    },

    /// An error occurred while parsing the ELF section header table, the
    /// section name string table or a relocation section.
    ParseShdr {
        /// A descriptive message about the section parsing error.
        msg: Cow<'static, str>,
    },

    /// An error occurred while parsing the headers of the PE image.
    ///
    /// This error typically indicates issues such as:
    /// * Missing `PE\0\0` signature
    /// * A PE32 (32-bit) optional header
    /// * Header fields pointing outside the file
    ParsePe {
        /// A descriptive message about the PE parsing error.
        msg: Cow<'static, str>,
    },

    /// The PE image has no room left for the relocation section.
    ///
    /// The header area is fixed when the image is linked, so a missing slot
    /// for one more section header cannot be fixed up here.
    Capacity {
        /// A descriptive message about the capacity error.
        msg: Cow<'static, str>,
    },

    /// An error occurred while building or decoding a base relocation table.
    Relocation {
        /// A descriptive message about the relocation error.
        msg: Cow<'static, str>,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io { msg } => write!(f, "I/O error: {msg}"),
            Error::ParseEhdr { msg } => write!(f, "ELF header parsing error: {msg}"),
            Error::ParseShdr { msg } => write!(f, "ELF section parsing error: {msg}"),
            Error::ParsePe { msg } => write!(f, "PE header parsing error: {msg}"),
            Error::Capacity { msg } => write!(f, "PE capacity error: {msg}"),
            Error::Relocation { msg } => write!(f, "Relocation error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    #[cold]
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            msg: err.to_string().into(),
        }
    }
}

/// Creates an I/O error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn io_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Io { msg: msg.into() }
}

/// Creates an ELF header parsing error with the specified message.
///
/// This is a convenience function for creating `Error::ParseEhdr` variants.
#[cold]
#[inline(never)]
pub(crate) fn parse_ehdr_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParseEhdr { msg: msg.into() }
}

/// Creates an ELF section parsing error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn parse_shdr_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParseShdr { msg: msg.into() }
}

/// Creates a PE header parsing error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn parse_pe_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParsePe { msg: msg.into() }
}

/// Creates a capacity error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn capacity_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Capacity { msg: msg.into() }
}

/// Creates a relocation error with the specified message.
///
/// This is a convenience function for creating `Error::Relocation` variants.
#[cold]
#[inline(never)]
pub(crate) fn relocate_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Relocation { msg: msg.into() }
}
