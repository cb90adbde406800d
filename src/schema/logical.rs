//! Logical schema of the wide table's aggregate metrics
//!
//! An `AimSchema` is the ordered list of metric fields that every subscriber
//! row carries. It knows nothing about storage backends; the translators
//! turn it into physical tables.

use super::types::ValueType;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Logical column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalType {
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Text,
}

impl LogicalType {
    /// SQL spelling used in DDL and logs.
    pub fn sql_name(&self) -> &'static str {
        match self {
            LogicalType::SmallInt => "SMALLINT",
            LogicalType::Int => "INT",
            LogicalType::BigInt => "BIGINT",
            LogicalType::Float => "FLOAT",
            LogicalType::Double => "DOUBLE",
            LogicalType::Text => "TEXT",
        }
    }

    /// Storage value domain for a metric of this type.
    ///
    /// Only BIGINT, INT and DOUBLE metrics have a storage domain; anything
    /// else is a precondition violation.
    pub fn value_type(&self) -> Result<ValueType> {
        match self {
            LogicalType::BigInt => Ok(ValueType::ULong),
            LogicalType::Int => Ok(ValueType::Int),
            LogicalType::Double => Ok(ValueType::Double),
            LogicalType::SmallInt | LogicalType::Float | LogicalType::Text => {
                Err(Error::Precondition(format!(
                    "{} has no metric storage domain",
                    self.sql_name()
                )))
            }
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Text(String),
}

impl FieldValue {
    pub fn logical_type(&self) -> LogicalType {
        match self {
            FieldValue::SmallInt(_) => LogicalType::SmallInt,
            FieldValue::Int(_) => LogicalType::Int,
            FieldValue::BigInt(_) => LogicalType::BigInt,
            FieldValue::Float(_) => LogicalType::Float,
            FieldValue::Double(_) => LogicalType::Double,
            FieldValue::Text(_) => LogicalType::Text,
        }
    }

    /// Zero value of a logical type.
    pub fn zero(ty: LogicalType) -> Self {
        match ty {
            LogicalType::SmallInt => FieldValue::SmallInt(0),
            LogicalType::Int => FieldValue::Int(0),
            LogicalType::BigInt => FieldValue::BigInt(0),
            LogicalType::Float => FieldValue::Float(0.0),
            LogicalType::Double => FieldValue::Double(0.0),
            LogicalType::Text => FieldValue::Text(String::new()),
        }
    }

    /// Largest value of a numeric logical type (start state for running minimums).
    pub fn max_of(ty: LogicalType) -> Self {
        match ty {
            LogicalType::SmallInt => FieldValue::SmallInt(i16::MAX),
            LogicalType::Int => FieldValue::Int(i32::MAX),
            LogicalType::BigInt => FieldValue::BigInt(i64::MAX),
            LogicalType::Float => FieldValue::Float(f32::MAX),
            LogicalType::Double => FieldValue::Double(f64::MAX),
            LogicalType::Text => FieldValue::Text(String::new()),
        }
    }
}

/// A single metric column in the logical schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalField {
    pub name: String,
    pub ty: LogicalType,
    pub nullable: bool,
    /// Value every freshly populated row starts with
    pub initial: FieldValue,
}

impl LogicalField {
    /// Non-null field starting at zero.
    pub fn new(name: impl Into<String>, ty: LogicalType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            initial: FieldValue::zero(ty),
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn initial(mut self, value: FieldValue) -> Self {
        self.initial = value;
        self
    }
}

/// Ordered set of aggregate metric fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AimSchema {
    fields: Vec<LogicalField>,
}

impl AimSchema {
    pub fn builder() -> AimSchemaBuilder {
        AimSchemaBuilder::new()
    }

    pub fn fields(&self) -> &[LogicalField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&LogicalField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Standard telecom metric catalog.
    ///
    /// windows {day, week} x scopes {local, distant, all} x
    /// {calls count, duration sum/min/max, cost sum/min/max}
    pub fn telecom() -> Self {
        const WINDOWS: [&str; 2] = ["day", "week"];
        const SCOPES: [&str; 3] = ["local", "distant", "all"];
        const AGGREGATES: [(&str, &str, LogicalType); 7] = [
            ("calls", "sum", LogicalType::BigInt),
            ("duration", "sum", LogicalType::BigInt),
            ("duration", "min", LogicalType::Int),
            ("duration", "max", LogicalType::Int),
            ("cost", "sum", LogicalType::Double),
            ("cost", "min", LogicalType::Double),
            ("cost", "max", LogicalType::Double),
        ];

        let mut fields = Vec::with_capacity(WINDOWS.len() * SCOPES.len() * AGGREGATES.len());
        for window in WINDOWS {
            for scope in SCOPES {
                for (measure, agg, ty) in AGGREGATES {
                    let name = format!("{}_{}_{}_{}", measure, agg, scope, window);
                    let initial = if agg == "min" {
                        FieldValue::max_of(ty)
                    } else {
                        FieldValue::zero(ty)
                    };
                    fields.push(LogicalField::new(name, ty).initial(initial));
                }
            }
        }

        Self { fields }
    }
}

/// Builder for AimSchema
#[derive(Debug, Default)]
pub struct AimSchemaBuilder {
    fields: Vec<LogicalField>,
}

impl AimSchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: LogicalField) -> Self {
        self.fields.push(field);
        self
    }

    /// Build the schema, rejecting duplicate names and mistyped initial values.
    pub fn build(self) -> Result<AimSchema> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(Error::InvalidSchema("metric field with empty name".into()));
            }
            if super::columns::is_reserved_column(&field.name) {
                return Err(Error::InvalidSchema(format!(
                    "metric field '{}' collides with a fixed wide-table column",
                    field.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate metric field '{}'",
                    field.name
                )));
            }
            if field.initial.logical_type() != field.ty {
                return Err(Error::InvalidSchema(format!(
                    "metric '{}' is {} but its initial value is {}",
                    field.name,
                    field.ty,
                    field.initial.logical_type()
                )));
            }
        }
        Ok(AimSchema {
            fields: self.fields,
        })
    }
}
