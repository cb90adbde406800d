//! Value-domain descriptors
//!
//! A `TypeDescriptor` pairs a storage value type with its physical width.
//! It is used when sizing rows for partitioning and when validating that a
//! metric can be stored by a backend.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Closed set of storage value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValueType {
    Int,
    UInt,
    ULong,
    Double,
}

impl ValueType {
    pub const ALL: [ValueType; 4] = [
        ValueType::Int,
        ValueType::UInt,
        ValueType::ULong,
        ValueType::Double,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Int => "INT",
            ValueType::UInt => "UINT",
            ValueType::ULong => "ULONG",
            ValueType::Double => "DOUBLE",
        }
    }

    /// Wire tag used in configuration files and run reports.
    pub fn tag(&self) -> u8 {
        match self {
            ValueType::Int => 0,
            ValueType::UInt => 1,
            ValueType::ULong => 2,
            ValueType::Double => 3,
        }
    }
}

impl TryFrom<u8> for ValueType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(ValueType::Int),
            1 => Ok(ValueType::UInt),
            2 => Ok(ValueType::ULong),
            3 => Ok(ValueType::Double),
            other => Err(Error::Precondition(format!(
                "unknown value type tag {}",
                other
            ))),
        }
    }
}

impl FromStr for ValueType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INT" => Ok(ValueType::Int),
            "UINT" => Ok(ValueType::UInt),
            "ULONG" => Ok(ValueType::ULong),
            "DOUBLE" => Ok(ValueType::Double),
            other => Err(Error::Precondition(format!(
                "unknown value type '{}'; expected one of INT, UINT, ULONG, DOUBLE",
                other
            ))),
        }
    }
}

/// A value type together with its storage width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub ty: ValueType,
    pub size_in_bytes: usize,
}

impl TypeDescriptor {
    /// Describe a value type. Pure and total over the closed enum.
    pub const fn describe(ty: ValueType) -> Self {
        let size_in_bytes = match ty {
            ValueType::Int => 4,
            ValueType::UInt => 4,
            ValueType::ULong => 8,
            ValueType::Double => 8,
        };
        Self { ty, size_in_bytes }
    }

    /// Describe a raw tag. Unknown tags are a precondition violation.
    pub fn describe_tag(tag: u8) -> Result<Self> {
        ValueType::try_from(tag).map(Self::describe)
    }
}
