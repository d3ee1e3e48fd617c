//! Streaming VCF/BCF to Apache Arrow conversion
//!
//! This crate decodes VCF and BCF files into Arrow record batches with a fixed,
//! header-derived schema, without reading the whole file into memory. On top of
//! the stream it offers whole-file materialization, Parquet export and SQL via
//! DataFusion.
//!
//! # Features
//!
//! - Pull-based [`VcfArrowStream`] with a configurable batch size
//! - Plain, GZIP, BGZF and BCF input, detected from file content
//! - Multithreaded BGZF decompression
//! - INFO/FORMAT field and sample selection
//! - Region queries through TBI/CSI indexes, or a streaming filter without one
//! - VEP/bcftools csq/SnpEff annotations parsed into a nested column
//! - Parquet export with a choice of codec
//! - SQL over a file registered as the relation `vcf`
//!
//! # Schema
//!
//! **Fixed Columns:** `CHROM`, `POS` (1-based), `ID`, `REF`, `ALT` (list), `QUAL`,
//! `FILTER` (list)
//!
//! **INFO Columns:** one per INFO field, named by its header ID (`DP`, `AF`, ...)
//!
//! **Sample Columns:** one struct per sample, named by the sample, with one child
//! per FORMAT field (`GT`, `AD`, `DP`, ...)
//!
//! **Annotation Column:** `VEP`, a list of transcript structs, when enabled
//!
//! # Example
//!
//! ```rust,no_run
//! use datafusion_vcf_arrow::{VcfArrowStream, VcfReadOptions, vcf_query};
//!
//! # fn example() -> datafusion_vcf_arrow::Result<()> {
//! let options = VcfReadOptions::default().with_batch_size(50_000);
//! let mut stream = VcfArrowStream::open("data/variants.vcf.gz", options)?;
//! while let Some(batch) = stream.next_batch()? {
//!     println!("{} rows", batch.num_rows());
//! }
//!
//! let counts = vcf_query(
//!     "data/variants.vcf.gz",
//!     "SELECT CHROM, COUNT(*) AS n FROM vcf GROUP BY CHROM",
//!     VcfReadOptions::default(),
//! )?;
//! println!("{} contigs", counts.num_rows());
//! # Ok(())
//! # }
//! ```
//!
//! # Important Notes
//!
//! - INFO and FORMAT field names are case-sensitive; SQL sessions created by this
//!   crate do not normalize identifiers
//! - Records that cannot be decoded are skipped and reported, not fatal

#![warn(missing_docs)]

/// Column builders for one batch.
pub mod builder;
/// Decoding of records into typed row values.
pub mod decoder;
/// Error types.
pub mod error;
/// Whole-file conversion to a single RecordBatch.
pub mod materialize;
/// Read options.
pub mod options;
/// Streaming Parquet export.
pub mod parquet_writer;
/// Physical execution plan implementation for VCF queries.
mod physical_exec;
/// SQL query facade.
pub mod query;
/// Genomic region parsing and overlap tests.
pub mod region;
/// Schema derivation from the VCF header.
pub mod schema;
/// Storage layer and file I/O utilities for VCF and BCF.
///
/// This module opens local files in any supported compression and reads their
/// headers and records.
pub mod storage;
/// Pull-based stream of record batches.
pub mod stream;
/// DataFusion table provider implementation for VCF files.
pub mod table_provider;
/// VEP-style annotation parsing.
pub mod vep;

pub use error::{RecordDecodeError, Result, VcfArrowError};
pub use materialize::vcf_to_arrow;
pub use options::{TranscriptMode, VcfReadOptions, VepOptions};
pub use parquet_writer::{ParquetCompression, vcf_to_parquet};
pub use query::{VCF_TABLE_NAME, register_vcf, vcf_query, vcf_query_async};
pub use storage::describe_vcf;
pub use stream::VcfArrowStream;
pub use table_provider::VcfTableProvider;
