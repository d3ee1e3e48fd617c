//! Metadata handling for Arrow schemas derived from VCF/BCF headers
//!
//! Header information that has no column of its own (file format, FILTER and
//! contig definitions, sample order, INFO/FORMAT descriptions) is carried in
//! Arrow schema and field metadata under `bio.vcf.*` keys so that it survives
//! Parquet export.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Schema-level Metadata Keys
// ============================================================================

/// VCF file format version (e.g., "VCFv4.3") stored in schema metadata
pub const VCF_FILE_FORMAT_KEY: &str = "bio.vcf.file_format";

/// VCF FILTER definitions stored as JSON array of FilterMetadata
pub const VCF_FILTERS_KEY: &str = "bio.vcf.filters";

/// VCF CONTIG definitions stored as JSON array of ContigMetadata
pub const VCF_CONTIGS_KEY: &str = "bio.vcf.contigs";

/// VCF sample names stored as JSON array of strings, in column order
pub const VCF_SAMPLE_NAMES_KEY: &str = "bio.vcf.samples";

/// Name of the INFO tag the annotation column was parsed from (e.g., "CSQ")
pub const VCF_ANNOTATION_TAG_KEY: &str = "bio.vcf.annotation_tag";

// ============================================================================
// Field-level Metadata Keys
// ============================================================================

/// VCF field description stored in field metadata
pub const VCF_FIELD_DESCRIPTION_KEY: &str = "bio.vcf.field.description";

/// VCF field type (Integer, Float, String, Character, Flag) stored in field metadata
pub const VCF_FIELD_TYPE_KEY: &str = "bio.vcf.field.type";

/// VCF field number (1, A, R, G, .) stored in field metadata
pub const VCF_FIELD_NUMBER_KEY: &str = "bio.vcf.field.number";

/// VCF field category (INFO or FORMAT) stored in field metadata
pub const VCF_FIELD_FIELD_TYPE_KEY: &str = "bio.vcf.field.field_type";

/// Original header ID of a column renamed to avoid a collision
pub const VCF_FIELD_ID_KEY: &str = "bio.vcf.field.id";

// ============================================================================
// Shared Metadata Structures
// ============================================================================

/// FILTER definition from the header
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FilterMetadata {
    /// Filter ID (e.g., "PASS", "LowQual")
    pub id: String,
    /// Filter description
    pub description: String,
}

/// Contig definition from the header
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContigMetadata {
    /// Contig/chromosome ID (e.g., "chr1", "1")
    pub id: String,
    /// Contig length in base pairs (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
}

/// INFO/FORMAT declaration as it appears in the header
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VcfFieldMetadata {
    /// VCF Number value (e.g., "1", "A", "R", "G", ".")
    pub number: String,
    /// VCF Type value (e.g., "Integer", "Float", "String", "Flag")
    #[serde(rename = "type")]
    pub field_type: String,
    /// Header description text
    pub description: String,
}

impl VcfFieldMetadata {
    /// Builds the Arrow field metadata map for an INFO or FORMAT column.
    pub fn to_field_metadata(&self, category: &str, id: &str) -> HashMap<String, String> {
        HashMap::from([
            (
                VCF_FIELD_DESCRIPTION_KEY.to_string(),
                self.description.clone(),
            ),
            (VCF_FIELD_TYPE_KEY.to_string(), self.field_type.clone()),
            (VCF_FIELD_NUMBER_KEY.to_string(), self.number.clone()),
            (VCF_FIELD_FIELD_TYPE_KEY.to_string(), category.to_string()),
            (VCF_FIELD_ID_KEY.to_string(), id.to_string()),
        ])
    }

    /// Reads a declaration back from Arrow field metadata.
    ///
    /// Returns `None` if any of the number/type/description keys is missing.
    pub fn from_field_metadata(metadata: &HashMap<String, String>) -> Option<Self> {
        Some(Self {
            number: metadata.get(VCF_FIELD_NUMBER_KEY)?.clone(),
            field_type: metadata.get(VCF_FIELD_TYPE_KEY)?.clone(),
            description: metadata.get(VCF_FIELD_DESCRIPTION_KEY)?.clone(),
        })
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Serialize a value to JSON string, returning empty string on failure
pub fn to_json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| String::new())
}

/// Deserialize from JSON string, returning None on failure
pub fn from_json_string<'a, T: Deserialize<'a>>(json: &'a str) -> Option<T> {
    serde_json::from_str(json).ok()
}
