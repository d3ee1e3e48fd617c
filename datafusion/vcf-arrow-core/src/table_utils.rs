use datafusion::arrow::array::{
    Array, ArrayRef, BooleanBuilder, Float32Builder, Int32Builder, ListArray, ListBuilder,
    StringBuilder, StructArray,
};
use datafusion::arrow::buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};
use datafusion::arrow::datatypes::{DataType, FieldRef, Fields};
use datafusion::arrow::error::ArrowError;
use std::sync::Arc;

/// A decoded cell ready to be appended to an [`OptionalField`].
///
/// List variants keep per-item presence so that `10,.` stays `[10, null]`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Int32 scalar
    Int32(i32),
    /// Float32 scalar
    Float32(f32),
    /// Boolean scalar
    Boolean(bool),
    /// UTF8 scalar
    Utf8(String),
    /// List of nullable Int32
    Int32List(Vec<Option<i32>>),
    /// List of nullable Float32
    Float32List(Vec<Option<f32>>),
    /// List of nullable UTF8
    Utf8List(Vec<Option<String>>),
}

impl CellValue {
    /// Short name of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            CellValue::Int32(_) => "Int32",
            CellValue::Float32(_) => "Float32",
            CellValue::Boolean(_) => "Boolean",
            CellValue::Utf8(_) => "Utf8",
            CellValue::Int32List(_) => "List<Int32>",
            CellValue::Float32List(_) => "List<Float32>",
            CellValue::Utf8List(_) => "List<Utf8>",
        }
    }
}

/// Builder wrapper for optional fields in Arrow record batches
///
/// Covers the closed set of column kinds produced from VCF headers: scalars,
/// lists of scalars, structs of named columns and lists of such structs.
#[derive(Debug)]
pub enum OptionalField {
    /// Builder for Int32 scalar values
    Int32Builder(Int32Builder),
    /// Builder for Int32 array values
    ArrayInt32Builder(ListBuilder<Int32Builder>),
    /// Builder for Float32 scalar values
    Float32Builder(Float32Builder),
    /// Builder for Float32 array values
    ArrayFloat32Builder(ListBuilder<Float32Builder>),
    /// Builder for Boolean scalar values
    BooleanBuilder(BooleanBuilder),
    /// Builder for UTF8 string scalar values
    Utf8Builder(StringBuilder),
    /// Builder for UTF8 string array values
    ArrayUtf8Builder(ListBuilder<StringBuilder>),
    /// Builder for a struct of named nullable columns
    StructBuilder(StructColumn),
    /// Builder for a list of structs
    ArrayStructBuilder(ListStructColumn),
}

impl OptionalField {
    /// Creates a new OptionalField builder for the specified data type
    ///
    /// # Arguments
    ///
    /// * `data_type` - Arrow data type to build
    /// * `batch_size` - Initial capacity for the builder
    ///
    /// # Errors
    ///
    /// Returns an error if the data type is not supported
    pub fn new(data_type: &DataType, batch_size: usize) -> Result<OptionalField, ArrowError> {
        match data_type {
            DataType::Int32 => Ok(OptionalField::Int32Builder(Int32Builder::with_capacity(
                batch_size,
            ))),
            DataType::Float32 => Ok(OptionalField::Float32Builder(
                Float32Builder::with_capacity(batch_size),
            )),
            DataType::Utf8 => Ok(OptionalField::Utf8Builder(StringBuilder::with_capacity(
                batch_size,
                batch_size * 10,
            ))),
            DataType::Boolean => Ok(OptionalField::BooleanBuilder(
                BooleanBuilder::with_capacity(batch_size),
            )),
            DataType::Struct(fields) => Ok(OptionalField::StructBuilder(StructColumn::new(
                fields.clone(),
                batch_size,
            )?)),

            DataType::List(f) => match f.data_type() {
                DataType::Int32 => Ok(OptionalField::ArrayInt32Builder(
                    ListBuilder::with_capacity(Int32Builder::with_capacity(batch_size), batch_size),
                )),
                DataType::Float32 => Ok(OptionalField::ArrayFloat32Builder(
                    ListBuilder::with_capacity(
                        Float32Builder::with_capacity(batch_size),
                        batch_size,
                    ),
                )),
                DataType::Utf8 => Ok(OptionalField::ArrayUtf8Builder(ListBuilder::with_capacity(
                    StringBuilder::with_capacity(batch_size, batch_size * 10),
                    batch_size,
                ))),
                DataType::Struct(_) => Ok(OptionalField::ArrayStructBuilder(
                    ListStructColumn::new(f.clone(), batch_size)?,
                )),
                other => Err(ArrowError::SchemaError(format!(
                    "Unsupported list inner data type: {other}"
                ))),
            },

            other => Err(ArrowError::SchemaError(format!(
                "Unsupported data type: {other}"
            ))),
        }
    }

    /// Appends one cell, or a null when `value` is `None`.
    ///
    /// A scalar appended to a list builder becomes a one-element list.
    ///
    /// # Errors
    ///
    /// Returns an error if the value kind does not match the builder
    pub fn append_cell(&mut self, value: Option<&CellValue>) -> Result<(), ArrowError> {
        let Some(value) = value else {
            return self.append_null();
        };
        match value {
            CellValue::Int32(v) => self.append_int(*v),
            CellValue::Float32(v) => self.append_float(*v),
            CellValue::Boolean(v) => self.append_boolean(*v),
            CellValue::Utf8(v) => self.append_string(v),
            CellValue::Int32List(values) => self.append_array_int_nullable(values),
            CellValue::Float32List(values) => self.append_array_float_nullable(values),
            CellValue::Utf8List(values) => self.append_array_string_nullable(values),
        }
    }

    /// Appends an integer value to the builder
    ///
    /// # Errors
    ///
    /// Returns an error if this is not an Int32Builder or ArrayInt32Builder
    pub fn append_int(&mut self, value: i32) -> Result<(), ArrowError> {
        match self {
            OptionalField::Int32Builder(builder) => {
                builder.append_value(value);
                Ok(())
            }
            OptionalField::ArrayInt32Builder(builder) => {
                builder.values().append_value(value);
                builder.append(true);
                Ok(())
            }
            other => Err(ArrowError::InvalidArgumentError(format!(
                "Expected Int32Builder, found {}",
                other.kind()
            ))),
        }
    }

    /// Appends a boolean value to the builder
    ///
    /// # Errors
    ///
    /// Returns an error if this is not a BooleanBuilder
    pub fn append_boolean(&mut self, value: bool) -> Result<(), ArrowError> {
        match self {
            OptionalField::BooleanBuilder(builder) => {
                builder.append_value(value);
                Ok(())
            }
            other => Err(ArrowError::InvalidArgumentError(format!(
                "Expected BooleanBuilder, found {}",
                other.kind()
            ))),
        }
    }

    /// Appends a vector of nullable integers as an array element
    ///
    /// Preserves null entries in the array (e.g., for VCF AD=10,. -> [10, null])
    ///
    /// # Errors
    ///
    /// Returns an error if this is not an ArrayInt32Builder
    pub fn append_array_int_nullable(&mut self, value: &[Option<i32>]) -> Result<(), ArrowError> {
        match self {
            OptionalField::ArrayInt32Builder(builder) => {
                for v in value {
                    builder.values().append_option(*v);
                }
                builder.append(true);
                Ok(())
            }
            other => Err(ArrowError::InvalidArgumentError(format!(
                "Expected ArrayInt32Builder, found {}",
                other.kind()
            ))),
        }
    }

    /// Appends a float value to the builder
    ///
    /// # Errors
    ///
    /// Returns an error if this is not a Float32Builder or ArrayFloat32Builder
    pub fn append_float(&mut self, value: f32) -> Result<(), ArrowError> {
        match self {
            OptionalField::Float32Builder(builder) => {
                builder.append_value(value);
                Ok(())
            }
            OptionalField::ArrayFloat32Builder(builder) => {
                builder.values().append_value(value);
                builder.append(true);
                Ok(())
            }
            other => Err(ArrowError::InvalidArgumentError(format!(
                "Expected Float32Builder, found {}",
                other.kind()
            ))),
        }
    }

    /// Appends a vector of nullable floats as an array element
    ///
    /// Preserves null entries in the array (e.g., for VCF AF=0.5,. -> [0.5, null])
    ///
    /// # Errors
    ///
    /// Returns an error if this is not an ArrayFloat32Builder
    pub fn append_array_float_nullable(
        &mut self,
        value: &[Option<f32>],
    ) -> Result<(), ArrowError> {
        match self {
            OptionalField::ArrayFloat32Builder(builder) => {
                for v in value {
                    builder.values().append_option(*v);
                }
                builder.append(true);
                Ok(())
            }
            other => Err(ArrowError::InvalidArgumentError(format!(
                "Expected ArrayFloat32Builder, found {}",
                other.kind()
            ))),
        }
    }

    /// Appends a string value to the builder
    ///
    /// # Errors
    ///
    /// Returns an error if this is not a Utf8Builder or ArrayUtf8Builder
    pub fn append_string(&mut self, value: &str) -> Result<(), ArrowError> {
        match self {
            OptionalField::Utf8Builder(builder) => {
                builder.append_value(value);
                Ok(())
            }
            OptionalField::ArrayUtf8Builder(builder) => {
                builder.values().append_value(value);
                builder.append(true);
                Ok(())
            }
            other => Err(ArrowError::InvalidArgumentError(format!(
                "Expected Utf8Builder, found {}",
                other.kind()
            ))),
        }
    }

    /// Appends a vector of nullable strings as an array element
    ///
    /// # Errors
    ///
    /// Returns an error if this is not an ArrayUtf8Builder
    pub fn append_array_string_nullable(
        &mut self,
        value: &[Option<String>],
    ) -> Result<(), ArrowError> {
        match self {
            OptionalField::ArrayUtf8Builder(builder) => {
                for v in value {
                    builder.values().append_option(v.as_deref());
                }
                builder.append(true);
                Ok(())
            }
            other => Err(ArrowError::InvalidArgumentError(format!(
                "Expected ArrayUtf8Builder, found {}",
                other.kind()
            ))),
        }
    }

    /// Appends one struct slot; `None` makes the whole struct null.
    ///
    /// # Errors
    ///
    /// Returns an error if this is not a StructBuilder or a child rejects its value
    pub fn append_struct(&mut self, values: Option<&[Option<CellValue>]>) -> Result<(), ArrowError> {
        match self {
            OptionalField::StructBuilder(column) => column.append(values),
            other => Err(ArrowError::InvalidArgumentError(format!(
                "Expected StructBuilder, found {}",
                other.kind()
            ))),
        }
    }

    /// Appends one list of structs; `None` makes the list null.
    ///
    /// # Errors
    ///
    /// Returns an error if this is not an ArrayStructBuilder or a child rejects its value
    pub fn append_struct_list(
        &mut self,
        items: Option<&[Vec<Option<CellValue>>]>,
    ) -> Result<(), ArrowError> {
        match self {
            OptionalField::ArrayStructBuilder(column) => column.append(items),
            other => Err(ArrowError::InvalidArgumentError(format!(
                "Expected ArrayStructBuilder, found {}",
                other.kind()
            ))),
        }
    }

    /// Appends a null value to the builder
    ///
    /// # Errors
    ///
    /// Only nested builders can fail, when a child rejects the null
    pub fn append_null(&mut self) -> Result<(), ArrowError> {
        match self {
            OptionalField::Int32Builder(builder) => builder.append_null(),
            OptionalField::ArrayInt32Builder(builder) => builder.append_null(),
            OptionalField::Float32Builder(builder) => builder.append_null(),
            OptionalField::ArrayFloat32Builder(builder) => builder.append_null(),
            OptionalField::BooleanBuilder(builder) => builder.append_null(),
            OptionalField::Utf8Builder(builder) => builder.append_null(),
            OptionalField::ArrayUtf8Builder(builder) => builder.append_null(),
            OptionalField::StructBuilder(column) => return column.append(None),
            OptionalField::ArrayStructBuilder(column) => return column.append(None),
        }
        Ok(())
    }

    /// Finalizes the builder and returns the built Arrow array
    ///
    /// The builder is reset and can be reused for the next batch.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested array fails validation
    pub fn finish(&mut self) -> Result<ArrayRef, ArrowError> {
        match self {
            OptionalField::Int32Builder(builder) => Ok(Arc::new(builder.finish())),
            OptionalField::ArrayInt32Builder(builder) => Ok(Arc::new(builder.finish())),
            OptionalField::Float32Builder(builder) => Ok(Arc::new(builder.finish())),
            OptionalField::ArrayFloat32Builder(builder) => Ok(Arc::new(builder.finish())),
            OptionalField::BooleanBuilder(builder) => Ok(Arc::new(builder.finish())),
            OptionalField::Utf8Builder(builder) => Ok(Arc::new(builder.finish())),
            OptionalField::ArrayUtf8Builder(builder) => Ok(Arc::new(builder.finish())),
            OptionalField::StructBuilder(column) => Ok(Arc::new(column.finish()?)),
            OptionalField::ArrayStructBuilder(column) => Ok(Arc::new(column.finish()?)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            OptionalField::Int32Builder(_) => "Int32Builder",
            OptionalField::ArrayInt32Builder(_) => "ArrayInt32Builder",
            OptionalField::Float32Builder(_) => "Float32Builder",
            OptionalField::ArrayFloat32Builder(_) => "ArrayFloat32Builder",
            OptionalField::BooleanBuilder(_) => "BooleanBuilder",
            OptionalField::Utf8Builder(_) => "Utf8Builder",
            OptionalField::ArrayUtf8Builder(_) => "ArrayUtf8Builder",
            OptionalField::StructBuilder(_) => "StructBuilder",
            OptionalField::ArrayStructBuilder(_) => "ArrayStructBuilder",
        }
    }
}

/// A struct of named nullable columns with its own validity.
///
/// A null struct slot still appends a null to every child so that child
/// lengths always match the struct length.
#[derive(Debug)]
pub struct StructColumn {
    fields: Fields,
    children: Vec<OptionalField>,
    validity: Vec<bool>,
}

impl StructColumn {
    /// Creates a struct builder with one child builder per field.
    ///
    /// # Errors
    ///
    /// Returns an error if `fields` is empty or a child type is unsupported
    pub fn new(fields: Fields, capacity: usize) -> Result<Self, ArrowError> {
        if fields.is_empty() {
            return Err(ArrowError::SchemaError(
                "Struct columns need at least one field".into(),
            ));
        }
        let children = fields
            .iter()
            .map(|f| OptionalField::new(f.data_type(), capacity))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            fields,
            children,
            validity: Vec::with_capacity(capacity),
        })
    }

    /// Appends one struct slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the value count differs from the field count or a
    /// child rejects its value
    pub fn append(&mut self, values: Option<&[Option<CellValue>]>) -> Result<(), ArrowError> {
        match values {
            Some(values) => {
                if values.len() != self.children.len() {
                    return Err(ArrowError::InvalidArgumentError(format!(
                        "Struct expects {} values, got {}",
                        self.children.len(),
                        values.len()
                    )));
                }
                for (child, value) in self.children.iter_mut().zip(values) {
                    child.append_cell(value.as_ref())?;
                }
                self.validity.push(true);
            }
            None => {
                for child in self.children.iter_mut() {
                    child.append_null()?;
                }
                self.validity.push(false);
            }
        }
        Ok(())
    }

    /// Builds the struct array and resets the builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the children fail struct validation
    pub fn finish(&mut self) -> Result<StructArray, ArrowError> {
        let arrays = builders_to_arrays(&mut self.children)?;
        let validity = std::mem::take(&mut self.validity);
        let nulls = if validity.iter().all(|v| *v) {
            None
        } else {
            Some(NullBuffer::from(validity))
        };
        StructArray::try_new(self.fields.clone(), arrays, nulls)
    }
}

/// A nullable list whose items are structs.
#[derive(Debug)]
pub struct ListStructColumn {
    item_field: FieldRef,
    values: StructColumn,
    offsets: Vec<i32>,
    validity: Vec<bool>,
}

impl ListStructColumn {
    /// Creates a list-of-struct builder for the given item field.
    ///
    /// # Errors
    ///
    /// Returns an error if the item field is not a non-empty struct
    pub fn new(item_field: FieldRef, capacity: usize) -> Result<Self, ArrowError> {
        let DataType::Struct(fields) = item_field.data_type() else {
            return Err(ArrowError::SchemaError(format!(
                "List item {} is not a struct",
                item_field.name()
            )));
        };
        let values = StructColumn::new(fields.clone(), capacity)?;
        let mut offsets = Vec::with_capacity(capacity + 1);
        offsets.push(0);
        Ok(Self {
            item_field,
            values,
            offsets,
            validity: Vec::with_capacity(capacity),
        })
    }

    /// Appends one list of struct items.
    ///
    /// # Errors
    ///
    /// Returns an error if an item does not fit the struct fields or the
    /// list grows past `i32` offsets
    pub fn append(&mut self, items: Option<&[Vec<Option<CellValue>>]>) -> Result<(), ArrowError> {
        let last = self.offsets.last().copied().unwrap_or(0);
        match items {
            Some(items) => {
                for item in items {
                    self.values.append(Some(item))?;
                }
                let len = i32::try_from(items.len())
                    .ok()
                    .and_then(|len| last.checked_add(len))
                    .ok_or_else(|| {
                        ArrowError::ComputeError("List offset overflow".to_string())
                    })?;
                self.offsets.push(len);
                self.validity.push(true);
            }
            None => {
                self.offsets.push(last);
                self.validity.push(false);
            }
        }
        Ok(())
    }

    /// Builds the list array and resets the builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the list fails validation
    pub fn finish(&mut self) -> Result<ListArray, ArrowError> {
        let values = self.values.finish()?;
        let offsets = std::mem::replace(&mut self.offsets, vec![0]);
        let validity = std::mem::take(&mut self.validity);
        let nulls = if validity.iter().all(|v| *v) {
            None
        } else {
            Some(NullBuffer::from(validity))
        };
        ListArray::try_new(
            self.item_field.clone(),
            OffsetBuffer::new(ScalarBuffer::from(offsets)),
            Arc::new(values),
            nulls,
        )
    }
}

/// Converts a vector of OptionalField builders to a vector of Arrow arrays
///
/// # Errors
///
/// Returns the first error raised by a builder
pub fn builders_to_arrays(
    builders: &mut [OptionalField],
) -> Result<Vec<Arc<dyn Array>>, ArrowError> {
    builders.iter_mut().map(|f| f.finish()).collect()
}
