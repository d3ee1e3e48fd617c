use log::debug;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Number of leading bytes needed to tell GZIP and BGZF apart.
const MAGIC_PREFIX_LEN: usize = 18;

/// Compression applied to an input file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionType {
    /// Single or multi-member GZIP without BGZF block markers
    GZIP,
    /// Blocked GZIP (the `BC` extra subfield is present)
    BGZF,
    /// Uncompressed
    NONE,
    /// Detect from the file content
    #[default]
    AUTO,
}

impl CompressionType {
    /// Parses a user-facing compression name (`gz`, `bgz`, `none`, `auto`).
    ///
    /// Returns `None` for unknown names.
    pub fn from_string(compression_type: &str) -> Option<Self> {
        match compression_type.to_lowercase().as_str() {
            "gz" | "gzip" => Some(CompressionType::GZIP),
            "bgz" | "bgzf" => Some(CompressionType::BGZF),
            "none" => Some(CompressionType::NONE),
            "auto" => Some(CompressionType::AUTO),
            _ => None,
        }
    }
}

/// Classifies a file prefix by its magic bytes.
///
/// A GZIP member whose FEXTRA block carries a `BC` subfield of length 2 is BGZF;
/// any other GZIP member is plain GZIP; everything else is uncompressed.
pub fn compression_from_magic(buffer: &[u8]) -> CompressionType {
    if buffer.len() < 4 || buffer[0] != 0x1f || buffer[1] != 0x8b {
        return CompressionType::NONE;
    }

    // FLG byte is at index 3
    if buffer.len() >= 12 && (buffer[3] & 0x04) != 0 {
        // XLEN is at index 10, little-endian
        let xlen = u16::from_le_bytes([buffer[10], buffer[11]]) as usize;
        let end = (12 + xlen).min(buffer.len());
        let mut i = 12;
        while i + 4 <= end {
            let slen = u16::from_le_bytes([buffer[i + 2], buffer[i + 3]]) as usize;
            if buffer[i] == b'B' && buffer[i + 1] == b'C' && slen == 2 {
                return CompressionType::BGZF;
            }
            i += slen + 4;
        }
    }

    CompressionType::GZIP
}

/// Reads the first bytes of a local file and detects its compression.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read
pub fn detect_compression<P: AsRef<Path>>(path: P) -> io::Result<CompressionType> {
    let mut file = File::open(path.as_ref())?;
    let mut buffer = Vec::with_capacity(MAGIC_PREFIX_LEN);
    file.by_ref()
        .take(MAGIC_PREFIX_LEN as u64)
        .read_to_end(&mut buffer)?;
    let compression = compression_from_magic(&buffer);
    debug!(
        "Detected compression {:?} for {}",
        compression,
        path.as_ref().display()
    );
    Ok(compression)
}

/// Resolves the compression of a local file, honouring an explicit choice.
///
/// `AUTO` triggers content detection; any other value is returned unchanged.
///
/// # Errors
///
/// Returns an error if detection is needed and the file cannot be read
pub fn get_compression_type<P: AsRef<Path>>(
    path: P,
    compression_type: CompressionType,
) -> io::Result<CompressionType> {
    match compression_type {
        CompressionType::AUTO => detect_compression(path),
        explicit => Ok(explicit),
    }
}
