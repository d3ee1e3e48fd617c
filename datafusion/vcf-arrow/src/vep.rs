//! Parsing of VEP, bcftools csq and SnpEff annotation strings into nested columns.
//!
//! The annotation INFO tag carries one comma-separated entry per transcript; each
//! entry is a `|`-separated tuple whose field names are listed in the tag's header
//! Description after `Format:`.

use crate::error::{Result, VcfArrowError};
use crate::options::{TranscriptMode, VepOptions};
use datafusion::arrow::datatypes::{DataType, Field, Fields};
use datafusion_vcf_arrow_core::table_utils::CellValue;
use log::{debug, warn};
use noodles::vcf::Header;
use std::sync::Arc;

/// Annotation tags tried in order when none is named.
pub const ANNOTATION_TAGS: [&str; 3] = ["CSQ", "BCSQ", "ANN"];

const INTEGER_FIELDS: [&str; 12] = [
    "DISTANCE",
    "STRAND",
    "TSL",
    "GENE_PHENO",
    "HGVS_OFFSET",
    "MOTIF_POS",
    "existing_InFrame_oORFs",
    "existing_OutOfFrame_oORFs",
    "existing_uORFs",
    "ALLELE_NUM",
    "PICK",
    "CANONICAL",
];

const FLOAT_FIELDS: [&str; 2] = ["AF", "MOTIF_SCORE_CHANGE"];

/// Fields holding `&`-joined value lists.
const LIST_FIELDS: [&str; 3] = ["Consequence", "FLAGS", "CLIN_SIG"];

/// Value type of one annotation sub-field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    /// Int32
    Integer,
    /// Float32
    Float,
    /// Utf8
    String,
    /// List of Utf8, split on `&`
    StringList,
}

impl AnnotationKind {
    /// Infers the type of a sub-field from its name.
    pub fn infer(name: &str) -> Self {
        if LIST_FIELDS.contains(&name) {
            return AnnotationKind::StringList;
        }
        if INTEGER_FIELDS.contains(&name) {
            return AnnotationKind::Integer;
        }
        if FLOAT_FIELDS.contains(&name) {
            return AnnotationKind::Float;
        }
        if name.ends_with("_POPS") {
            AnnotationKind::String
        } else if name.ends_with("_AF") || name.starts_with("MAX_AF_") {
            AnnotationKind::Float
        } else if name.starts_with("SpliceAI_pred_DP_") {
            AnnotationKind::Integer
        } else if name.starts_with("SpliceAI_pred_DS_") {
            AnnotationKind::Float
        } else {
            AnnotationKind::String
        }
    }

    fn data_type(self) -> DataType {
        match self {
            AnnotationKind::Integer => DataType::Int32,
            AnnotationKind::Float => DataType::Float32,
            AnnotationKind::String => DataType::Utf8,
            AnnotationKind::StringList => {
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
            }
        }
    }
}

/// One selected annotation sub-field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationField {
    /// Sub-field name from the header
    pub name: String,
    /// Inferred type
    pub kind: AnnotationKind,
    /// Position within the `|`-separated tuple
    pub index: usize,
}

/// Parser for one annotation tag, derived from the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSpec {
    /// INFO tag holding the annotation
    pub tag: String,
    /// Selected sub-fields, in header order
    pub fields: Vec<AnnotationField>,
    /// Transcript selection
    pub transcripts: TranscriptMode,
}

/// Extracts the `|`-separated field names from an annotation Description.
pub fn parse_format_description(description: &str) -> Option<Vec<String>> {
    let start = ["Format: ", "Format:", "fields: "]
        .iter()
        .find_map(|marker| description.find(marker).map(|i| i + marker.len()))?;
    let list = description[start..]
        .split(['"', '\n', '>'])
        .next()
        .unwrap_or_default()
        .trim();
    if list.is_empty() {
        return None;
    }
    let names: Vec<String> = list
        .split('|')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    (!names.is_empty()).then_some(names)
}

/// Parses one sub-field value; unparseable numbers become null.
fn parse_cell(field: &AnnotationField, raw: &str) -> Option<CellValue> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "." {
        return None;
    }
    match field.kind {
        AnnotationKind::Integer => match raw.parse() {
            Ok(v) => Some(CellValue::Int32(v)),
            Err(_) => {
                warn!("{} value {raw:?} is not an integer; set to null", field.name);
                None
            }
        },
        AnnotationKind::Float => match raw.parse() {
            Ok(v) => Some(CellValue::Float32(v)),
            Err(_) => {
                warn!("{} value {raw:?} is not a number; set to null", field.name);
                None
            }
        },
        AnnotationKind::String => Some(CellValue::Utf8(raw.to_string())),
        AnnotationKind::StringList => Some(CellValue::Utf8List(
            raw.split('&')
                .map(|item| match item.trim() {
                    "" | "." => None,
                    item => Some(item.to_string()),
                })
                .collect(),
        )),
    }
}

impl AnnotationSpec {
    /// Builds the parser for the annotation tag of a header.
    ///
    /// Returns `Ok(None)` when no tag was named and none of [`ANNOTATION_TAGS`]
    /// is declared.
    ///
    /// # Errors
    ///
    /// Returns [`VcfArrowError::Schema`] when a named tag is missing, its
    /// Description has no field list, or a requested sub-field does not exist
    pub fn from_header(header: &Header, options: &VepOptions) -> Result<Option<Self>> {
        let infos = header.infos();
        let tag = match &options.tag {
            Some(tag) => {
                if !infos.contains_key(tag.as_str()) {
                    return Err(VcfArrowError::Schema(format!(
                        "annotation tag {tag} is not declared in the header"
                    )));
                }
                tag.clone()
            }
            None => match ANNOTATION_TAGS.iter().find(|t| infos.contains_key(**t)) {
                Some(tag) => tag.to_string(),
                None => {
                    warn!("No CSQ, BCSQ or ANN annotation declared; annotation column skipped");
                    return Ok(None);
                }
            },
        };

        let description = infos
            .get(tag.as_str())
            .map(|info| info.description())
            .unwrap_or_default();
        let names = parse_format_description(description).ok_or_else(|| {
            VcfArrowError::Schema(format!("annotation tag {tag} has no field list"))
        })?;

        if let Some(columns) = &options.columns {
            if let Some(missing) = columns.iter().find(|c| !names.contains(*c)) {
                return Err(VcfArrowError::Schema(format!(
                    "annotation field {missing} is not part of {tag}"
                )));
            }
        }

        let fields: Vec<AnnotationField> = names
            .iter()
            .enumerate()
            .filter(|(_, name)| {
                options
                    .columns
                    .as_ref()
                    .is_none_or(|columns| columns.iter().any(|c| c == *name))
            })
            .map(|(index, name)| AnnotationField {
                name: name.clone(),
                kind: AnnotationKind::infer(name),
                index,
            })
            .collect();
        if fields.is_empty() {
            return Err(VcfArrowError::Schema(format!(
                "no annotation fields selected from {tag}"
            )));
        }

        debug!("Parsing {} with {} fields", tag, fields.len());
        Ok(Some(Self {
            tag,
            fields,
            transcripts: options.transcripts,
        }))
    }

    /// Arrow fields of one transcript struct.
    pub fn struct_fields(&self) -> Fields {
        self.fields
            .iter()
            .map(|f| Field::new(f.name.clone(), f.kind.data_type(), true))
            .collect()
    }

    /// Type of the annotation column: a list of transcript structs.
    pub fn data_type(&self) -> DataType {
        DataType::List(Arc::new(Field::new(
            "item",
            DataType::Struct(self.struct_fields()),
            true,
        )))
    }

    /// Parses the transcripts of one record.
    ///
    /// Each entry of `transcripts` may itself hold several comma-separated
    /// transcripts. Missing trailing sub-fields are null; extra ones are ignored.
    /// A numeric sub-field that does not parse is null and the record is kept.
    pub fn parse<S: AsRef<str>>(&self, transcripts: &[S]) -> Vec<Vec<Option<CellValue>>> {
        let mut out = Vec::new();
        for transcript in transcripts.iter().flat_map(|t| t.as_ref().split(',')) {
            let parts: Vec<&str> = transcript.split('|').collect();
            let row = self
                .fields
                .iter()
                .map(|field| {
                    parts
                        .get(field.index)
                        .and_then(|raw| parse_cell(field, raw))
                })
                .collect();
            out.push(row);
            if self.transcripts == TranscriptMode::First {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "##fileformat=VCFv4.2\n\
##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations from Ensembl VEP. Format: Allele|Consequence|IMPACT|SYMBOL|DISTANCE|gnomAD_AF|MAX_AF_POPS\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

    fn header() -> Header {
        HEADER.parse().unwrap()
    }

    #[test]
    fn test_infer_types() {
        assert_eq!(AnnotationKind::infer("DISTANCE"), AnnotationKind::Integer);
        assert_eq!(AnnotationKind::infer("AF"), AnnotationKind::Float);
        assert_eq!(AnnotationKind::infer("gnomADe_AF"), AnnotationKind::Float);
        assert_eq!(AnnotationKind::infer("MAX_AF_POPS"), AnnotationKind::String);
        assert_eq!(
            AnnotationKind::infer("SpliceAI_pred_DP_AG"),
            AnnotationKind::Integer
        );
        assert_eq!(
            AnnotationKind::infer("SpliceAI_pred_DS_AG"),
            AnnotationKind::Float
        );
        assert_eq!(
            AnnotationKind::infer("Consequence"),
            AnnotationKind::StringList
        );
        assert_eq!(AnnotationKind::infer("SYMBOL"), AnnotationKind::String);
    }

    #[test]
    fn test_parse_format_description() {
        let names = parse_format_description("Functional annotations: 'Allele | Annotation'")
            .unwrap_or_default();
        assert!(names.is_empty());

        let names = parse_format_description("Format: Allele|Consequence | IMPACT").unwrap();
        assert_eq!(names, vec!["Allele", "Consequence", "IMPACT"]);

        let names =
            parse_format_description("Functional annotations from SnpEff fields: A|B").unwrap();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_detect_and_parse() {
        let spec = AnnotationSpec::from_header(&header(), &VepOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(spec.tag, "CSQ");
        assert_eq!(spec.fields.len(), 7);

        let rows = spec
            .parse(&["A|missense_variant&splice_region_variant|MODERATE|GENE1|.|0.25|gnomAD_AFR,A|intron_variant|MODIFIER"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0][1],
            Some(CellValue::Utf8List(vec![
                Some("missense_variant".to_string()),
                Some("splice_region_variant".to_string())
            ]))
        );
        assert_eq!(rows[0][4], None);
        assert_eq!(rows[0][5], Some(CellValue::Float32(0.25)));
        assert_eq!(rows[0][6], Some(CellValue::Utf8("gnomAD_AFR".to_string())));
        assert_eq!(rows[1][3], None);
        assert_eq!(rows[1][6], None);
    }

    #[test]
    fn test_first_transcript_and_columns() {
        let options = VepOptions {
            tag: Some("CSQ".to_string()),
            columns: Some(vec!["SYMBOL".to_string(), "Allele".to_string()]),
            transcripts: TranscriptMode::First,
        };
        let spec = AnnotationSpec::from_header(&header(), &options)
            .unwrap()
            .unwrap();
        let names: Vec<&str> = spec.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Allele", "SYMBOL"]);

        let rows = spec.parse(&["A|x|HIGH|G1", "C|y|LOW|G2"]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], Some(CellValue::Utf8("G1".to_string())));
    }

    #[test]
    fn test_errors() {
        let options = VepOptions {
            tag: Some("ANN".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            AnnotationSpec::from_header(&header(), &options),
            Err(VcfArrowError::Schema(_))
        ));
    }

    #[test]
    fn test_unparseable_numbers_are_null() {
        let spec = AnnotationSpec::from_header(&header(), &VepOptions::default())
            .unwrap()
            .unwrap();
        let rows = spec.parse(&["A|x|HIGH|G1|far|0.1&0.2|AFR"]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][3], Some(CellValue::Utf8("G1".to_string())));
        assert_eq!(rows[0][4], None);
        assert_eq!(rows[0][5], None);
        assert_eq!(rows[0][6], Some(CellValue::Utf8("AFR".to_string())));
    }

    #[test]
    fn test_no_annotation_tag() {
        let header: Header = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n"
            .parse()
            .unwrap();
        assert!(
            AnnotationSpec::from_header(&header, &VepOptions::default())
                .unwrap()
                .is_none()
        );
    }
}
