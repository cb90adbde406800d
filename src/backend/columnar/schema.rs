//! Columnar table schema and row staging
//!
//! A `ColumnarSchema` wraps an Arrow schema plus the declared primary key.
//! The backend only stores fixed-width numeric columns and a single Int64
//! key, and it refuses to build a schema whose key was never declared.

use crate::schema::FieldValue;
use crate::{Error, Result};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Column types the columnar backend can store.
pub fn is_supported_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int16 | DataType::Int32 | DataType::Int64 | DataType::Float64
    )
}

fn accepts(data_type: &DataType, value: &FieldValue) -> bool {
    matches!(
        (data_type, value),
        (DataType::Int16, FieldValue::SmallInt(_))
            | (DataType::Int32, FieldValue::Int(_))
            | (DataType::Int64, FieldValue::BigInt(_))
            | (DataType::Float64, FieldValue::Double(_))
    )
}

/// Schema of a columnar table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnarSchema {
    arrow: SchemaRef,
    primary_key: String,
    key_index: usize,
}

impl ColumnarSchema {
    pub fn builder() -> ColumnarSchemaBuilder {
        ColumnarSchemaBuilder::default()
    }

    pub fn arrow_schema(&self) -> SchemaRef {
        self.arrow.clone()
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Position of the key column.
    pub fn key_index(&self) -> usize {
        self.key_index
    }

    pub fn num_columns(&self) -> usize {
        self.arrow.fields().len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.arrow.fields().iter().map(|f| f.name().as_str()).collect()
    }

    pub(crate) fn to_manifest(&self) -> Vec<ColumnManifest> {
        self.arrow
            .fields()
            .iter()
            .map(|f| ColumnManifest {
                name: f.name().clone(),
                data_type: type_tag(f.data_type()).to_string(),
                nullable: f.is_nullable(),
            })
            .collect()
    }

    pub(crate) fn from_manifest(columns: &[ColumnManifest], primary_key: &str) -> Result<Self> {
        let mut builder = Self::builder();
        for column in columns {
            builder = builder.add_column(&column.name, parse_type_tag(&column.data_type)?, column.nullable);
        }
        builder.set_primary_key(primary_key).build()
    }
}

/// Serialized column entry of a table manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ColumnManifest {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

fn type_tag(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Int16 => "int16",
        DataType::Int32 => "int32",
        DataType::Int64 => "int64",
        DataType::Float64 => "float64",
        _ => "unsupported",
    }
}

fn parse_type_tag(tag: &str) -> Result<DataType> {
    match tag {
        "int16" => Ok(DataType::Int16),
        "int32" => Ok(DataType::Int32),
        "int64" => Ok(DataType::Int64),
        "float64" => Ok(DataType::Float64),
        other => Err(Error::InvalidSchema(format!(
            "unknown column type '{}' in table manifest",
            other
        ))),
    }
}

/// Builder for ColumnarSchema
#[derive(Debug, Default)]
pub struct ColumnarSchemaBuilder {
    fields: Vec<Field>,
    primary_key: Option<String>,
}

impl ColumnarSchemaBuilder {
    pub fn add_column(mut self, name: &str, data_type: DataType, nullable: bool) -> Self {
        self.fields.push(Field::new(name, data_type, nullable));
        self
    }

    pub fn set_primary_key(mut self, column: &str) -> Self {
        self.primary_key = Some(column.to_string());
        self
    }

    pub fn build(self) -> Result<ColumnarSchema> {
        let primary_key = self.primary_key.ok_or_else(|| {
            Error::InvalidSchema("columnar schema requires an explicit primary key".into())
        })?;

        for field in &self.fields {
            if !is_supported_type(field.data_type()) {
                return Err(Error::InvalidSchema(format!(
                    "column '{}' has unsupported type {}",
                    field.name(),
                    field.data_type()
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name().as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column '{}'",
                    field.name()
                )));
            }
        }

        let key_index = self
            .fields
            .iter()
            .position(|f| f.name() == &primary_key)
            .ok_or_else(|| {
                Error::InvalidSchema(format!("primary key column '{}' not found", primary_key))
            })?;
        let key_field = &self.fields[key_index];
        if key_field.data_type() != &DataType::Int64 || key_field.is_nullable() {
            return Err(Error::InvalidSchema(format!(
                "primary key column '{}' must be a non-null Int64",
                primary_key
            )));
        }

        Ok(ColumnarSchema {
            arrow: Arc::new(Schema::new(self.fields)),
            primary_key,
            key_index,
        })
    }
}

/// A row being assembled for insertion.
///
/// Setters check the column exists and the value matches its type.
#[derive(Debug, Clone)]
pub struct PartialRow {
    schema: SchemaRef,
    values: Vec<Option<FieldValue>>,
}

impl PartialRow {
    pub fn new(schema: SchemaRef) -> Self {
        let width = schema.fields().len();
        Self {
            schema,
            values: vec![None; width],
        }
    }

    pub fn set_value(&mut self, column: &str, value: FieldValue) -> Result<()> {
        let idx = self.schema.index_of(column).map_err(|_| Error::FieldType {
            column: column.to_string(),
            reason: "no such column".into(),
        })?;
        let data_type = self.schema.field(idx).data_type();
        if !accepts(data_type, &value) {
            return Err(Error::FieldType {
                column: column.to_string(),
                reason: format!(
                    "column is {} but value is {}",
                    data_type,
                    value.logical_type()
                ),
            });
        }
        self.values[idx] = Some(value);
        Ok(())
    }

    pub fn set_i16(&mut self, column: &str, value: i16) -> Result<()> {
        self.set_value(column, FieldValue::SmallInt(value))
    }

    pub fn set_i32(&mut self, column: &str, value: i32) -> Result<()> {
        self.set_value(column, FieldValue::Int(value))
    }

    pub fn set_i64(&mut self, column: &str, value: i64) -> Result<()> {
        self.set_value(column, FieldValue::BigInt(value))
    }

    pub fn set_f64(&mut self, column: &str, value: f64) -> Result<()> {
        self.set_value(column, FieldValue::Double(value))
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        let idx = self.schema.index_of(column).ok()?;
        self.values[idx].as_ref()
    }

    /// Fail if a non-null column was never set.
    pub(crate) fn check_complete(&self) -> Result<()> {
        for (field, value) in self.schema.fields().iter().zip(&self.values) {
            if value.is_none() && !field.is_nullable() {
                return Err(Error::FieldType {
                    column: field.name().clone(),
                    reason: "non-null column was not set".into(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn key(&self, key_index: usize) -> Option<i64> {
        match self.values.get(key_index)? {
            Some(FieldValue::BigInt(key)) => Some(*key),
            _ => None,
        }
    }

    pub(crate) fn into_values(self) -> Vec<Option<FieldValue>> {
        self.values
    }
}
