//! Streaming export of a VCF/BCF file to Parquet.

use crate::error::{Result, VcfArrowError};
use crate::options::VcfReadOptions;
use crate::stream::VcfArrowStream;
use datafusion::parquet::arrow::ArrowWriter;
use datafusion::parquet::basic::{BrotliLevel, Compression, GzipLevel, ZstdLevel};
use datafusion::parquet::file::properties::WriterProperties;
use log::{info, warn};
use std::fs::{self, File};
use std::path::Path;
use std::str::FromStr;

/// Parquet codec used for every column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParquetCompression {
    /// No compression
    Uncompressed,
    /// Snappy
    Snappy,
    /// GZIP at the default level
    Gzip,
    /// Zstandard at the default level
    #[default]
    Zstd,
    /// LZ4 (raw block format)
    Lz4,
    /// Brotli at the default level
    Brotli,
}

impl ParquetCompression {
    /// Parses a codec name, case-insensitively.
    ///
    /// Accepts `none`/`uncompressed`, `snappy`, `gzip`, `zstd`, `lz4` and `brotli`.
    ///
    /// # Errors
    ///
    /// Returns [`VcfArrowError::InvalidOption`] for an unknown name
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(ParquetCompression::Uncompressed),
            "snappy" => Ok(ParquetCompression::Snappy),
            "gzip" => Ok(ParquetCompression::Gzip),
            "zstd" => Ok(ParquetCompression::Zstd),
            "lz4" => Ok(ParquetCompression::Lz4),
            "brotli" => Ok(ParquetCompression::Brotli),
            other => Err(VcfArrowError::InvalidOption(format!(
                "unknown Parquet compression: {other}"
            ))),
        }
    }

    fn codec(self) -> Compression {
        match self {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Lz4 => Compression::LZ4_RAW,
            ParquetCompression::Brotli => Compression::BROTLI(BrotliLevel::default()),
        }
    }
}

impl FromStr for ParquetCompression {
    type Err = VcfArrowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Converts a VCF/BCF file to Parquet.
///
/// Batches are written as they are read, so memory stays bounded by the batch
/// size. The Arrow schema, including its `bio.vcf.*` metadata, is stored in
/// the Parquet footer. On failure the partial output file is removed.
///
/// ```rust,no_run
/// use datafusion_vcf_arrow::{ParquetCompression, VcfReadOptions, vcf_to_parquet};
///
/// # fn example() -> datafusion_vcf_arrow::Result<()> {
/// let rows = vcf_to_parquet(
///     "data/variants.vcf.gz",
///     "variants.parquet",
///     VcfReadOptions::default(),
///     ParquetCompression::Zstd,
/// )?;
/// println!("wrote {rows} rows");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`VcfArrowError::Materialization`] wrapping the cause
pub fn vcf_to_parquet<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: VcfReadOptions,
    compression: ParquetCompression,
) -> Result<u64> {
    let input = input.as_ref();
    let output = output.as_ref();
    let mut stream =
        VcfArrowStream::open(input, options).map_err(VcfArrowError::materialization)?;
    // Only a file this call created is removed on failure.
    let file = File::create(output).map_err(|e| VcfArrowError::materialization(e.into()))?;

    match write_parquet(&mut stream, file, compression) {
        Ok(rows) => {
            info!(
                "Wrote {} rows from {} to {} ({:?}, {} records skipped)",
                rows,
                input.display(),
                output.display(),
                compression,
                stream.skipped_records()
            );
            Ok(rows)
        }
        Err(e) => {
            stream.close();
            if let Err(remove_error) = fs::remove_file(output) {
                warn!(
                    "Failed to remove partial output {}: {}",
                    output.display(),
                    remove_error
                );
            }
            Err(VcfArrowError::materialization(e))
        }
    }
}

fn write_parquet(
    stream: &mut VcfArrowStream,
    file: File,
    compression: ParquetCompression,
) -> Result<u64> {
    let props = WriterProperties::builder()
        .set_compression(compression.codec())
        .build();
    let mut writer = ArrowWriter::try_new(file, stream.schema(), Some(props))?;

    let mut rows = 0u64;
    while let Some(batch) = stream.next_batch()? {
        rows += batch.num_rows() as u64;
        writer.write(&batch)?;
    }
    writer.close()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_names() {
        assert_eq!(
            ParquetCompression::from_name("ZSTD").unwrap(),
            ParquetCompression::Zstd
        );
        assert_eq!(
            ParquetCompression::from_name("none").unwrap(),
            ParquetCompression::Uncompressed
        );
        assert_eq!(
            "uncompressed".parse::<ParquetCompression>().unwrap(),
            ParquetCompression::Uncompressed
        );
        assert_eq!(
            ParquetCompression::from_name(" snappy ").unwrap(),
            ParquetCompression::Snappy
        );
        assert!(matches!(
            ParquetCompression::from_name("lzo"),
            Err(VcfArrowError::InvalidOption(_))
        ));
    }
}
