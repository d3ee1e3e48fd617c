//! Decoding of one VCF/BCF record into typed row values.
//!
//! A record is decoded completely before anything is appended to the batch
//! builders, so a record that fails half-way leaves no partial row behind.

use crate::error::RecordDecodeError;
use crate::schema::{FieldKind, ValueKind, VcfSchema};
use crate::vep::AnnotationSpec;
use datafusion_vcf_arrow_core::table_utils::CellValue;
use noodles::vcf::Header;
use noodles::vcf::variant::Record;
use noodles::vcf::variant::record::info::field::{Value, value::Array as ValueArray};
use noodles::vcf::variant::record::samples::Sample;
use noodles::vcf::variant::record::samples::series::Value as SV;
use noodles::vcf::variant::record::samples::series::value::Array as SamplesArray;
use noodles::vcf::variant::record::samples::series::value::genotype::Phasing;
use noodles::vcf::variant::record::{AlternateBases, Filters, Ids, Info, ReferenceBases, Samples};
use std::collections::HashMap;
use std::fmt::Write;
use std::io;

type DecodeResult<T> = std::result::Result<T, String>;

/// Values of one sample: one slot per selected FORMAT field, or `None` when no
/// FORMAT value is set for the sample.
pub type SampleValues = Option<Vec<Option<CellValue>>>;

/// A fully decoded record, ready to be appended to a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    /// Reference sequence name
    pub chrom: String,
    /// 1-based position
    pub pos: i64,
    /// Last reference base covered by the record, 1-based
    pub end: i64,
    /// IDs joined with `;`, `None` for `.`
    pub id: Option<String>,
    /// Reference allele
    pub reference: String,
    /// Alternate alleles, empty for `.`
    pub alternates: Vec<String>,
    /// Phred-scaled quality
    pub quality: Option<f64>,
    /// Filter names, `None` for `.`
    pub filters: Option<Vec<String>>,
    /// One slot per selected INFO field
    pub info: Vec<Option<CellValue>>,
    /// One entry per selected sample
    pub samples: Vec<SampleValues>,
    /// Parsed annotation transcripts, `None` when the tag is absent
    pub annotation: Option<Vec<Vec<Option<CellValue>>>>,
}

/// Values as read from the record, before shaping to the column type.
enum RawValue {
    Integer(Vec<Option<i32>>),
    Float(Vec<Option<f32>>),
    String(Vec<Option<String>>),
    Flag,
}

fn io_message(field: &str, e: io::Error) -> String {
    format!("invalid {field}: {e}")
}

/// Shapes raw values to a column kind.
///
/// A scalar column accepts at most one value; list columns keep missing items.
fn shape(id: &str, kind: FieldKind, raw: RawValue) -> DecodeResult<Option<CellValue>> {
    fn single<T>(id: &str, mut values: Vec<Option<T>>) -> DecodeResult<Option<T>> {
        if values.len() > 1 {
            return Err(format!("{id} declares one value but has {}", values.len()));
        }
        Ok(values.pop().flatten())
    }

    let cell = match (kind, raw) {
        (FieldKind::Scalar(ValueKind::Flag), RawValue::Flag) => Some(CellValue::Boolean(true)),
        (FieldKind::Scalar(ValueKind::Integer), RawValue::Integer(v)) => {
            single(id, v)?.map(CellValue::Int32)
        }
        (FieldKind::Scalar(ValueKind::Float), RawValue::Float(v)) => {
            single(id, v)?.map(CellValue::Float32)
        }
        (FieldKind::Scalar(ValueKind::String) | FieldKind::Genotype, RawValue::String(v)) => {
            single(id, v)?.map(CellValue::Utf8)
        }
        (FieldKind::List(ValueKind::Integer), RawValue::Integer(v)) => {
            Some(CellValue::Int32List(v))
        }
        (FieldKind::List(ValueKind::Float), RawValue::Float(v)) => {
            Some(CellValue::Float32List(v))
        }
        (FieldKind::List(ValueKind::String), RawValue::String(v)) => {
            Some(CellValue::Utf8List(v))
        }
        (kind, _) => {
            return Err(format!(
                "{id} value does not match its declared type {}",
                kind.data_type()
            ));
        }
    };
    Ok(cell)
}

fn info_raw(value: Value<'_>) -> DecodeResult<RawValue> {
    let raw = match value {
        Value::Integer(v) => RawValue::Integer(vec![Some(v)]),
        Value::Float(v) => RawValue::Float(vec![Some(v)]),
        Value::Flag => RawValue::Flag,
        Value::Character(c) => RawValue::String(vec![Some(c.to_string())]),
        Value::String(s) => RawValue::String(vec![Some(s.to_string())]),
        Value::Array(ValueArray::Integer(values)) => RawValue::Integer(
            values
                .iter()
                .collect::<io::Result<_>>()
                .map_err(|e| e.to_string())?,
        ),
        Value::Array(ValueArray::Float(values)) => RawValue::Float(
            values
                .iter()
                .collect::<io::Result<_>>()
                .map_err(|e| e.to_string())?,
        ),
        Value::Array(ValueArray::Character(values)) => RawValue::String(
            values
                .iter()
                .map(|v| v.map(|c| c.map(|c| c.to_string())))
                .collect::<io::Result<_>>()
                .map_err(|e| e.to_string())?,
        ),
        Value::Array(ValueArray::String(values)) => RawValue::String(
            values
                .iter()
                .map(|v| v.map(|s| s.map(|s| s.to_string())))
                .collect::<io::Result<_>>()
                .map_err(|e| e.to_string())?,
        ),
    };
    Ok(raw)
}

fn sample_raw(value: SV<'_>) -> DecodeResult<RawValue> {
    let raw = match value {
        SV::Integer(v) => RawValue::Integer(vec![Some(v)]),
        SV::Float(v) => RawValue::Float(vec![Some(v)]),
        SV::Character(c) => RawValue::String(vec![Some(c.to_string())]),
        SV::String(s) => RawValue::String(vec![Some(s.to_string())]),
        SV::Genotype(_) => return Err("unexpected genotype value".to_string()),
        SV::Array(SamplesArray::Integer(values)) => RawValue::Integer(
            values
                .iter()
                .collect::<io::Result<_>>()
                .map_err(|e| e.to_string())?,
        ),
        SV::Array(SamplesArray::Float(values)) => RawValue::Float(
            values
                .iter()
                .collect::<io::Result<_>>()
                .map_err(|e| e.to_string())?,
        ),
        SV::Array(SamplesArray::Character(values)) => RawValue::String(
            values
                .iter()
                .map(|v| v.map(|c| c.map(|c| c.to_string())))
                .collect::<io::Result<_>>()
                .map_err(|e| e.to_string())?,
        ),
        SV::Array(SamplesArray::String(values)) => RawValue::String(
            values
                .iter()
                .map(|v| v.map(|s| s.map(|s| s.to_string())))
                .collect::<io::Result<_>>()
                .map_err(|e| e.to_string())?,
        ),
    };
    Ok(raw)
}

/// Renders a genotype as `0/1`, `1|0`, `./.`.
///
/// Returns the text and whether any allele is called.
fn render_genotype(value: SV<'_>) -> DecodeResult<(String, bool)> {
    let genotype = match value {
        SV::Genotype(genotype) => genotype,
        other => {
            return match shape("GT", FieldKind::Genotype, sample_raw(other)?)? {
                Some(CellValue::Utf8(text)) => {
                    let called = text.bytes().any(|b| b.is_ascii_digit());
                    Ok((text, called))
                }
                _ => Ok((String::new(), false)),
            };
        }
    };

    let mut text = String::new();
    let mut called = false;
    for (i, result) in genotype.iter().enumerate() {
        let (allele, phasing) = result.map_err(|e| io_message("GT", e))?;
        if i > 0 {
            text.push(match phasing {
                Phasing::Phased => '|',
                Phasing::Unphased => '/',
            });
        }
        match allele {
            Some(a) => {
                called = true;
                let _ = write!(text, "{a}");
            }
            None => text.push('.'),
        }
    }
    Ok((text, called))
}

/// Decodes records against a derived schema.
#[derive(Debug, Clone)]
pub struct RecordDecoder {
    info_kinds: Vec<(String, FieldKind)>,
    info_index: HashMap<String, usize>,
    format_kinds: Vec<(String, FieldKind)>,
    format_index: HashMap<String, usize>,
    /// Output slot of each header sample, `None` when not selected
    sample_slots: Vec<Option<usize>>,
    num_samples: usize,
    annotation: Option<AnnotationSpec>,
}

impl RecordDecoder {
    /// Creates a decoder for the columns of `schema`.
    pub fn new(schema: &VcfSchema, header: &Header) -> Self {
        let info_kinds: Vec<(String, FieldKind)> = schema
            .info_fields()
            .iter()
            .map(|f| (f.id.clone(), f.kind))
            .collect();
        let format_kinds: Vec<(String, FieldKind)> = schema
            .format_fields()
            .iter()
            .map(|f| (f.id.clone(), f.kind))
            .collect();
        let mut sample_slots = vec![None; header.sample_names().len()];
        for (slot, sample) in schema.samples().iter().enumerate() {
            if let Some(entry) = sample_slots.get_mut(sample.header_index) {
                *entry = Some(slot);
            }
        }

        Self {
            info_index: info_kinds
                .iter()
                .enumerate()
                .map(|(i, (id, _))| (id.clone(), i))
                .collect(),
            info_kinds,
            format_index: format_kinds
                .iter()
                .enumerate()
                .map(|(i, (id, _))| (id.clone(), i))
                .collect(),
            format_kinds,
            sample_slots,
            num_samples: schema.samples().len(),
            annotation: schema.annotation().cloned(),
        }
    }

    /// Decodes one record.
    ///
    /// # Errors
    ///
    /// Returns a [`RecordDecodeError`] if any field cannot be read or does not
    /// fit its declared type
    pub fn decode(
        &self,
        record: &dyn Record,
        header: &Header,
        record_number: u64,
    ) -> Result<DecodedRecord, RecordDecodeError> {
        let mut locus = "?".to_string();
        let fail = |locus: &str, message: String| RecordDecodeError {
            record_number,
            locus: locus.to_string(),
            message,
        };

        let chrom = record
            .reference_sequence_name(header)
            .map_err(|e| fail(&locus, io_message("CHROM", e)))?
            .to_string();
        let pos = match record.variant_start() {
            Some(Ok(position)) => position.get() as i64,
            Some(Err(e)) => return Err(fail(&chrom, io_message("POS", e))),
            // Telomeric records sit at position 0.
            None => 0,
        };
        locus = format!("{chrom}:{pos}");

        self.decode_fields(record, header, chrom, pos)
            .map_err(|message| fail(&locus, message))
    }

    fn decode_fields(
        &self,
        record: &dyn Record,
        header: &Header,
        chrom: String,
        pos: i64,
    ) -> DecodeResult<DecodedRecord> {
        let reference_bases = record
            .reference_bases()
            .iter()
            .collect::<io::Result<Vec<u8>>>()
            .map_err(|e| io_message("REF", e))?;
        let reference =
            String::from_utf8(reference_bases).map_err(|e| format!("invalid REF: {e}"))?;
        let end = pos + (reference.len().max(1) as i64) - 1;

        let alternates = record
            .alternate_bases()
            .iter()
            .map(|alt| alt.map(String::from))
            .collect::<io::Result<Vec<_>>>()
            .map_err(|e| io_message("ALT", e))?;

        let record_ids = record.ids();
        let ids: Vec<&str> = record_ids.iter().collect();
        let id = (!ids.is_empty()).then(|| ids.join(";"));

        let quality = record
            .quality_score()
            .transpose()
            .map_err(|e| io_message("QUAL", e))?
            .map(f64::from);

        let record_filters = record.filters();
        let filters = if record_filters.is_empty() {
            None
        } else {
            Some(
                record_filters
                    .iter(header)
                    .map(|f| f.map(String::from))
                    .collect::<io::Result<Vec<_>>>()
                    .map_err(|e| io_message("FILTER", e))?,
            )
        };

        let (info, annotation) = self.decode_info(record, header)?;
        let samples = self.decode_samples(record, header)?;

        Ok(DecodedRecord {
            chrom,
            pos,
            end,
            id,
            reference,
            alternates,
            quality,
            filters,
            info,
            samples,
            annotation,
        })
    }

    #[allow(clippy::type_complexity)]
    fn decode_info(
        &self,
        record: &dyn Record,
        header: &Header,
    ) -> DecodeResult<(Vec<Option<CellValue>>, Option<Vec<Vec<Option<CellValue>>>>)> {
        let mut values: Vec<Option<CellValue>> = vec![None; self.info_kinds.len()];
        let mut transcripts: Option<Vec<String>> = None;
        let annotation_tag = self.annotation.as_ref().map(|a| a.tag.as_str());

        if !self.info_kinds.is_empty() || annotation_tag.is_some() {
            let info = record.info();
            for result in info.iter(header) {
                let (key, value) = result.map_err(|e| io_message("INFO", e))?;
                let Some(value) = value else {
                    continue;
                };
                let raw = info_raw(value).map_err(|e| format!("invalid INFO {key}: {e}"))?;

                if annotation_tag == Some(key) {
                    if let RawValue::String(items) = &raw {
                        transcripts = Some(items.iter().flatten().cloned().collect());
                    }
                }
                if let Some(&idx) = self.info_index.get(key) {
                    let (id, kind) = &self.info_kinds[idx];
                    values[idx] = shape(id, *kind, raw)?;
                }
            }
        }

        // Absent flags are false.
        for ((_, kind), value) in self.info_kinds.iter().zip(values.iter_mut()) {
            if *kind == FieldKind::Scalar(ValueKind::Flag) && value.is_none() {
                *value = Some(CellValue::Boolean(false));
            }
        }

        let annotation = match (&self.annotation, transcripts) {
            (Some(spec), Some(transcripts)) if !transcripts.is_empty() => {
                Some(spec.parse(&transcripts))
            }
            _ => None,
        };

        Ok((values, annotation))
    }

    fn decode_samples(
        &self,
        record: &dyn Record,
        header: &Header,
    ) -> DecodeResult<Vec<SampleValues>> {
        let mut out: Vec<SampleValues> = vec![None; self.num_samples];
        if self.num_samples == 0 {
            return Ok(out);
        }

        let samples = record.samples().map_err(|e| io_message("FORMAT", e))?;
        for (header_index, sample) in samples.iter().enumerate() {
            let Some(Some(slot)) = self.sample_slots.get(header_index) else {
                continue;
            };

            let mut cells: Vec<Option<CellValue>> = vec![None; self.format_kinds.len()];
            let mut any_set = false;
            for result in sample.iter(header) {
                let (key, value) = result.map_err(|e| io_message("FORMAT", e))?;
                let Some(&idx) = self.format_index.get(key) else {
                    continue;
                };
                let Some(value) = value else {
                    continue;
                };
                let (id, kind) = &self.format_kinds[idx];
                if *kind == FieldKind::Genotype {
                    let (text, called) = render_genotype(value)?;
                    any_set |= called;
                    if !text.is_empty() {
                        cells[idx] = Some(CellValue::Utf8(text));
                    }
                    continue;
                }
                let raw = sample_raw(value).map_err(|e| format!("invalid FORMAT {key}: {e}"))?;
                let cell = shape(id, *kind, raw)?;
                any_set |= cell.as_ref().is_some_and(|c| !is_all_missing(c));
                cells[idx] = cell;
            }

            if any_set {
                out[*slot] = Some(cells);
            }
        }
        Ok(out)
    }
}

fn is_all_missing(cell: &CellValue) -> bool {
    match cell {
        CellValue::Int32List(v) => v.iter().all(Option::is_none),
        CellValue::Float32List(v) => v.iter().all(Option::is_none),
        CellValue::Utf8List(v) => v.iter().all(Option::is_none),
        _ => false,
    }
}
