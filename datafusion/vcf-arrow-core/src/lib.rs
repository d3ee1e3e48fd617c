//! Core utilities for the VCF/BCF to Arrow converter
//!
//! This crate holds the format-agnostic pieces shared by the converter and its
//! DataFusion integration:
//!
//! - **Column Builders**: [`table_utils::OptionalField`], a closed set of nullable Arrow
//!   builders (scalars, lists, structs and lists of structs) driven by [`table_utils::CellValue`]
//! - **Compression Support**: detection of plain, GZIP and BGZF input from magic bytes
//! - **Schema Metadata**: `bio.vcf.*` metadata keys and JSON helpers used to carry
//!   header information inside Arrow schemas
//!
//! ## Usage
//!
//! ### Example: Compression Detection
//!
//! ```rust,no_run
//! use datafusion_vcf_arrow_core::compression::{CompressionType, detect_compression};
//!
//! # fn example() -> std::io::Result<()> {
//! let compression = detect_compression("data/sample.vcf.gz")?;
//! assert_eq!(compression, CompressionType::BGZF);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`compression`]: Magic-byte compression sniffing
//! - [`metadata`]: Schema metadata keys and serialization helpers
//! - [`table_utils`]: Nullable Arrow column builders

#![warn(missing_docs)]

/// Bioinformatics metadata key constants and utilities
pub mod metadata;

pub use metadata::{
    ContigMetadata, FilterMetadata, VCF_CONTIGS_KEY, VCF_FIELD_DESCRIPTION_KEY,
    VCF_FIELD_FIELD_TYPE_KEY, VCF_FIELD_NUMBER_KEY, VCF_FIELD_TYPE_KEY, VCF_FILE_FORMAT_KEY,
    VCF_FILTERS_KEY, VCF_SAMPLE_NAMES_KEY, VcfFieldMetadata, from_json_string, to_json_string,
};
/// Compression detection for local input files
pub mod compression;
/// Table utilities for building Arrow columns
pub mod table_utils;
