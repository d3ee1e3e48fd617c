//! Derivation of the fixed Arrow schema of a stream from the VCF/BCF header.

use crate::error::{Result, VcfArrowError};
use crate::options::VcfReadOptions;
use crate::vep::AnnotationSpec;
use datafusion::arrow::datatypes::{DataType, Field, Fields, Schema, SchemaRef};
use datafusion_vcf_arrow_core::metadata::{
    ContigMetadata, FilterMetadata, VCF_ANNOTATION_TAG_KEY, VCF_CONTIGS_KEY,
    VCF_FIELD_FIELD_TYPE_KEY, VCF_FIELD_ID_KEY, VCF_FILE_FORMAT_KEY, VCF_FILTERS_KEY,
    VCF_SAMPLE_NAMES_KEY, VcfFieldMetadata, to_json_string,
};
use log::debug;
use noodles::vcf::Header;
use noodles::vcf::header::record::value::map::format::{
    Number as FormatNumber, Type as FormatType,
};
use noodles::vcf::header::record::value::map::info::{Number, Type as InfoType};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Fixed leading columns, in order.
pub const FIXED_COLUMNS: [&str; 7] = ["CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER"];

/// Preferred name of the parsed annotation column.
pub const ANNOTATION_COLUMN: &str = "VEP";

const GENOTYPE_KEY: &str = "GT";

/// Base value type of an INFO/FORMAT field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Int32
    Integer,
    /// Float32
    Float,
    /// Utf8 (String and Character)
    String,
    /// Boolean presence flag
    Flag,
}

impl ValueKind {
    fn data_type(self) -> DataType {
        match self {
            ValueKind::Integer => DataType::Int32,
            ValueKind::Float => DataType::Float32,
            ValueKind::String => DataType::Utf8,
            ValueKind::Flag => DataType::Boolean,
        }
    }
}

/// Shape of an INFO/FORMAT column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// One value per row
    Scalar(ValueKind),
    /// Variable-length list of nullable values
    List(ValueKind),
    /// FORMAT `GT`, rendered as text (`0/1`, `1|0`, `./.`)
    Genotype,
}

impl FieldKind {
    /// Arrow type of the column.
    pub fn data_type(&self) -> DataType {
        match self {
            FieldKind::Scalar(kind) => kind.data_type(),
            FieldKind::List(kind) => {
                DataType::List(Arc::new(Field::new("item", kind.data_type(), true)))
            }
            FieldKind::Genotype => DataType::Utf8,
        }
    }
}

/// A selected INFO or FORMAT field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Header ID
    pub id: String,
    /// Column shape
    pub kind: FieldKind,
}

/// A selected sample and its position in the header's sample list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSpec {
    /// Sample name
    pub name: String,
    /// Index into the record's samples
    pub header_index: usize,
}

/// The column layout of a stream, derived once from the header.
#[derive(Debug, Clone)]
pub struct VcfSchema {
    schema: SchemaRef,
    info_fields: Vec<FieldSpec>,
    format_fields: Vec<FieldSpec>,
    samples: Vec<SampleSpec>,
    annotation: Option<AnnotationSpec>,
}

/// Maps an INFO declaration to its column shape.
pub fn info_field_kind(number: Number, ty: InfoType) -> FieldKind {
    let inner = match ty {
        InfoType::Integer => ValueKind::Integer,
        InfoType::Float => ValueKind::Float,
        InfoType::String | InfoType::Character => ValueKind::String,
        InfoType::Flag => return FieldKind::Scalar(ValueKind::Flag),
    };
    match number {
        Number::Count(0) | Number::Count(1) => FieldKind::Scalar(inner),
        _ => FieldKind::List(inner),
    }
}

/// Maps a FORMAT declaration to its column shape. `GT` is always text.
pub fn format_field_kind(id: &str, number: FormatNumber, ty: FormatType) -> FieldKind {
    if id == GENOTYPE_KEY {
        return FieldKind::Genotype;
    }
    let inner = match ty {
        FormatType::Integer => ValueKind::Integer,
        FormatType::Float => ValueKind::Float,
        FormatType::String | FormatType::Character => ValueKind::String,
    };
    match number {
        FormatNumber::Count(0) | FormatNumber::Count(1) => FieldKind::Scalar(inner),
        _ => FieldKind::List(inner),
    }
}

/// Converts INFO Number enum to VCF string representation
pub(crate) fn info_number_to_string(number: Number) -> String {
    match number {
        Number::Count(n) => n.to_string(),
        Number::AlternateBases => "A".to_string(),
        Number::ReferenceAlternateBases => "R".to_string(),
        Number::Samples => "G".to_string(),
        Number::Unknown => ".".to_string(),
    }
}

/// Converts INFO Type enum to VCF string representation
pub(crate) fn info_type_to_string(ty: &InfoType) -> String {
    match ty {
        InfoType::Integer => "Integer".to_string(),
        InfoType::Float => "Float".to_string(),
        InfoType::Flag => "Flag".to_string(),
        InfoType::Character => "Character".to_string(),
        InfoType::String => "String".to_string(),
    }
}

/// Converts FORMAT Number enum to VCF string representation
pub(crate) fn format_number_to_string(number: FormatNumber) -> String {
    #[allow(unreachable_patterns)]
    match number {
        FormatNumber::Count(n) => n.to_string(),
        FormatNumber::AlternateBases => "A".to_string(),
        FormatNumber::ReferenceAlternateBases => "R".to_string(),
        FormatNumber::Samples => "G".to_string(),
        FormatNumber::Unknown => ".".to_string(),
        _ => ".".to_string(),
    }
}

/// Converts FORMAT Type enum to VCF string representation
pub(crate) fn format_type_to_string(ty: &FormatType) -> String {
    match ty {
        FormatType::Integer => "Integer".to_string(),
        FormatType::Float => "Float".to_string(),
        FormatType::Character => "Character".to_string(),
        FormatType::String => "String".to_string(),
    }
}

/// Picks a column name, prefixing it once if the preferred name is taken.
fn claim_name(used: &mut HashSet<String>, preferred: &str, prefix: &str) -> Result<String> {
    let name = if used.contains(preferred) {
        format!("{prefix}_{preferred}")
    } else {
        preferred.to_string()
    };
    if !used.insert(name.clone()) {
        return Err(VcfArrowError::Schema(format!(
            "column name {preferred} collides with an existing column"
        )));
    }
    if name != preferred {
        debug!("Column {} renamed to {} to avoid a collision", preferred, name);
    }
    Ok(name)
}

/// Resolves a field selection against the declared IDs, keeping header order.
fn select_fields<'a>(
    category: &str,
    declared: impl Iterator<Item = &'a String>,
    requested: &Option<Vec<String>>,
) -> Result<Vec<String>> {
    let declared: Vec<&String> = declared.collect();
    let Some(requested) = requested else {
        return Ok(declared.into_iter().cloned().collect());
    };

    let mut seen = HashSet::new();
    for id in requested {
        if !seen.insert(id.as_str()) {
            return Err(VcfArrowError::Schema(format!(
                "{category} field {id} requested twice"
            )));
        }
        let is_genotype = category == "FORMAT" && id == GENOTYPE_KEY;
        if !declared.contains(&id) && !is_genotype {
            return Err(VcfArrowError::Schema(format!(
                "{category} field {id} is not declared in the header"
            )));
        }
    }

    let mut selected: Vec<String> = declared
        .into_iter()
        .filter(|id| seen.contains(id.as_str()))
        .cloned()
        .collect();
    // An undeclared GT is still rendered from the genotype column.
    if category == "FORMAT"
        && seen.contains(GENOTYPE_KEY)
        && !selected.iter().any(|id| id == GENOTYPE_KEY)
    {
        selected.push(GENOTYPE_KEY.to_string());
    }
    Ok(selected)
}

impl VcfSchema {
    /// Derives the column layout from a header and the read options.
    ///
    /// # Errors
    ///
    /// Returns [`VcfArrowError::Schema`] if a requested INFO/FORMAT field or
    /// sample is not in the header, or column names cannot be made unique
    pub fn from_header(header: &Header, options: &VcfReadOptions) -> Result<Self> {
        let header_infos = header.infos();
        let header_formats = header.formats();
        let mut used: HashSet<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();

        let file_format = header.file_format();
        let filters: Vec<FilterMetadata> = header
            .filters()
            .iter()
            .map(|(id, filter)| FilterMetadata {
                id: id.to_string(),
                description: filter.description().to_string(),
            })
            .collect();
        let contigs: Vec<ContigMetadata> = header
            .contigs()
            .iter()
            .map(|(id, contig)| ContigMetadata {
                id: id.to_string(),
                length: contig.length().map(|l| l as u64),
            })
            .collect();

        let mut fields = vec![
            Field::new("CHROM", DataType::Utf8, false),
            Field::new("POS", DataType::Int64, false),
            Field::new("ID", DataType::Utf8, true),
            Field::new("REF", DataType::Utf8, false),
            Field::new(
                "ALT",
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
                false,
            ),
            Field::new("QUAL", DataType::Float64, true),
            Field::new(
                "FILTER",
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
                true,
            ),
        ];

        let mut info_fields = Vec::new();
        for id in select_fields("INFO", header_infos.keys(), &options.info_fields)? {
            let Some(info) = header_infos.get(&id) else {
                continue;
            };
            let kind = info_field_kind(info.number(), info.ty());
            let metadata = VcfFieldMetadata {
                number: info_number_to_string(info.number()),
                field_type: info_type_to_string(&info.ty()),
                description: info.description().to_string(),
            };
            let name = claim_name(&mut used, &id, "INFO")?;
            let nullable = !matches!(kind, FieldKind::Scalar(ValueKind::Flag));
            fields.push(
                Field::new(name, kind.data_type(), nullable)
                    .with_metadata(metadata.to_field_metadata("INFO", &id)),
            );
            info_fields.push(FieldSpec { id, kind });
        }

        let mut format_ids =
            select_fields("FORMAT", header_formats.keys(), &options.format_fields)?;
        if options.format_fields.is_none() && format_ids.is_empty() {
            format_ids.push(GENOTYPE_KEY.to_string());
        }

        let mut format_fields = Vec::new();
        let mut format_children = Vec::new();
        for id in format_ids {
            let (kind, metadata) = match header_formats.get(&id) {
                Some(format) => (
                    format_field_kind(&id, format.number(), format.ty()),
                    VcfFieldMetadata {
                        number: format_number_to_string(format.number()),
                        field_type: format_type_to_string(&format.ty()),
                        description: format.description().to_string(),
                    },
                ),
                None => (
                    FieldKind::Genotype,
                    VcfFieldMetadata {
                        number: "1".to_string(),
                        field_type: "String".to_string(),
                        description: "Genotype".to_string(),
                    },
                ),
            };
            format_children.push(
                Field::new(id.clone(), kind.data_type(), true)
                    .with_metadata(metadata.to_field_metadata("FORMAT", &id)),
            );
            format_fields.push(FieldSpec { id, kind });
        }

        let header_samples = header.sample_names();
        let sample_names: Vec<String> = match &options.samples {
            Some(requested) => requested.clone(),
            None => header_samples.iter().cloned().collect(),
        };
        let mut samples = Vec::new();
        if !format_fields.is_empty() {
            let struct_type = DataType::Struct(Fields::from(format_children));
            for name in &sample_names {
                let header_index = header_samples.get_index_of(name).ok_or_else(|| {
                    VcfArrowError::Schema(format!("sample {name} is not in the header"))
                })?;
                if samples.iter().any(|s: &SampleSpec| s.header_index == header_index) {
                    return Err(VcfArrowError::Schema(format!(
                        "sample {name} requested twice"
                    )));
                }
                let column = claim_name(&mut used, name, "SAMPLE")?;
                fields.push(
                    Field::new(column, struct_type.clone(), true).with_metadata(HashMap::from([
                        (VCF_FIELD_FIELD_TYPE_KEY.to_string(), "SAMPLE".to_string()),
                        (VCF_FIELD_ID_KEY.to_string(), name.clone()),
                    ])),
                );
                samples.push(SampleSpec {
                    name: name.clone(),
                    header_index,
                });
            }
        } else if let Some(requested) = &options.samples {
            for name in requested {
                if header_samples.get_index_of(name).is_none() {
                    return Err(VcfArrowError::Schema(format!(
                        "sample {name} is not in the header"
                    )));
                }
            }
        }

        let mut metadata = HashMap::from([
            (
                VCF_FILE_FORMAT_KEY.to_string(),
                format!("VCFv{}.{}", file_format.major(), file_format.minor()),
            ),
            (VCF_FILTERS_KEY.to_string(), to_json_string(&filters)),
            (VCF_CONTIGS_KEY.to_string(), to_json_string(&contigs)),
            (
                VCF_SAMPLE_NAMES_KEY.to_string(),
                to_json_string(&samples.iter().map(|s| &s.name).collect::<Vec<_>>()),
            ),
        ]);

        let annotation = match &options.vep {
            Some(vep) => AnnotationSpec::from_header(header, vep)?,
            None => None,
        };
        if let Some(spec) = &annotation {
            let column = claim_name(&mut used, ANNOTATION_COLUMN, "ANNOTATION")?;
            fields.push(Field::new(column, spec.data_type(), true));
            metadata.insert(VCF_ANNOTATION_TAG_KEY.to_string(), spec.tag.clone());
        }

        debug!(
            "Derived schema with {} INFO fields, {} FORMAT fields, {} samples",
            info_fields.len(),
            format_fields.len(),
            samples.len()
        );

        Ok(Self {
            schema: Arc::new(Schema::new_with_metadata(fields, metadata)),
            info_fields,
            format_fields,
            samples,
            annotation,
        })
    }

    /// The Arrow schema shared by every batch of the stream.
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Selected INFO fields, in column order.
    pub fn info_fields(&self) -> &[FieldSpec] {
        &self.info_fields
    }

    /// Selected FORMAT fields, in child order of every sample struct.
    pub fn format_fields(&self) -> &[FieldSpec] {
        &self.format_fields
    }

    /// Selected samples, in column order.
    pub fn samples(&self) -> &[SampleSpec] {
        &self.samples
    }

    /// Annotation parser, if an annotation column is part of the schema.
    pub fn annotation(&self) -> Option<&AnnotationSpec> {
        self.annotation.as_ref()
    }
}
