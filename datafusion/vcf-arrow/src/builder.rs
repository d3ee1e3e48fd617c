use crate::decoder::DecodedRecord;
use crate::schema::{FIXED_COLUMNS, VcfSchema};
use datafusion::arrow::array::{
    ArrayRef, Float64Builder, Int64Builder, ListBuilder, RecordBatch, StringBuilder,
};
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::error::ArrowError;
use datafusion_vcf_arrow_core::table_utils::{OptionalField, builders_to_arrays};
use std::sync::Arc;

/// Column builders for one batch, in schema order.
///
/// Builders are reset by [`BatchBuilder::finish`] and reused for the next batch.
#[derive(Debug)]
pub struct BatchBuilder {
    schema: SchemaRef,
    chroms: StringBuilder,
    positions: Int64Builder,
    ids: StringBuilder,
    references: StringBuilder,
    alternates: ListBuilder<StringBuilder>,
    qualities: Float64Builder,
    filters: ListBuilder<StringBuilder>,
    info: Vec<OptionalField>,
    samples: Vec<OptionalField>,
    annotation: Option<OptionalField>,
    rows: usize,
}

impl BatchBuilder {
    /// Creates builders for every column of `schema`.
    ///
    /// # Errors
    ///
    /// Returns an error if a column type has no builder
    pub fn new(schema: &VcfSchema, capacity: usize) -> Result<Self, ArrowError> {
        let arrow_schema = schema.schema();
        let fields = arrow_schema.fields();
        let num_info = schema.info_fields().len();
        let num_samples = schema.samples().len();
        let info_start = FIXED_COLUMNS.len();
        let sample_start = info_start + num_info;

        let info = fields[info_start..sample_start]
            .iter()
            .map(|f| OptionalField::new(f.data_type(), capacity))
            .collect::<Result<Vec<_>, _>>()?;
        let samples = fields[sample_start..sample_start + num_samples]
            .iter()
            .map(|f| OptionalField::new(f.data_type(), capacity))
            .collect::<Result<Vec<_>, _>>()?;
        let annotation = match schema.annotation() {
            Some(spec) => Some(OptionalField::new(&spec.data_type(), capacity)?),
            None => None,
        };

        Ok(Self {
            schema: arrow_schema.clone(),
            chroms: StringBuilder::with_capacity(capacity, capacity * 4),
            positions: Int64Builder::with_capacity(capacity),
            ids: StringBuilder::with_capacity(capacity, capacity * 8),
            references: StringBuilder::with_capacity(capacity, capacity * 2),
            alternates: ListBuilder::with_capacity(StringBuilder::new(), capacity),
            qualities: Float64Builder::with_capacity(capacity),
            filters: ListBuilder::with_capacity(StringBuilder::new(), capacity),
            info,
            samples,
            annotation,
            rows: 0,
        })
    }

    /// Number of rows appended since the last finish.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Returns true if no rows are pending.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Appends one decoded record as a row.
    ///
    /// # Errors
    ///
    /// Returns an error if a value does not fit its column builder
    pub fn append(&mut self, record: &DecodedRecord) -> Result<(), ArrowError> {
        self.chroms.append_value(&record.chrom);
        self.positions.append_value(record.pos);
        self.ids.append_option(record.id.as_deref());
        self.references.append_value(&record.reference);
        for alt in &record.alternates {
            self.alternates.values().append_value(alt);
        }
        self.alternates.append(true);
        self.qualities.append_option(record.quality);
        match &record.filters {
            Some(filters) => {
                for filter in filters {
                    self.filters.values().append_value(filter);
                }
                self.filters.append(true);
            }
            None => self.filters.append(false),
        }

        for (builder, value) in self.info.iter_mut().zip(&record.info) {
            builder.append_cell(value.as_ref())?;
        }
        for (builder, sample) in self.samples.iter_mut().zip(&record.samples) {
            builder.append_struct(sample.as_deref())?;
        }
        if let Some(builder) = self.annotation.as_mut() {
            builder.append_struct_list(record.annotation.as_deref())?;
        }

        self.rows += 1;
        Ok(())
    }

    /// Builds a RecordBatch from the pending rows and resets the builders.
    ///
    /// # Errors
    ///
    /// Returns an error if the arrays do not match the schema
    pub fn finish(&mut self) -> Result<RecordBatch, ArrowError> {
        let mut arrays: Vec<ArrayRef> = vec![
            Arc::new(self.chroms.finish()),
            Arc::new(self.positions.finish()),
            Arc::new(self.ids.finish()),
            Arc::new(self.references.finish()),
            Arc::new(self.alternates.finish()),
            Arc::new(self.qualities.finish()),
            Arc::new(self.filters.finish()),
        ];
        arrays.extend(builders_to_arrays(&mut self.info)?);
        arrays.extend(builders_to_arrays(&mut self.samples)?);
        if let Some(builder) = self.annotation.as_mut() {
            arrays.push(builder.finish()?);
        }
        self.rows = 0;
        RecordBatch::try_new(self.schema.clone(), arrays)
    }
}
