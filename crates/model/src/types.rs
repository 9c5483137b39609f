use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Globally unique shape identifier: a namespace plus a local name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShapeId {
    /// Namespace (e.g., "com.example.weather")
    pub namespace: String,

    /// Local name within the namespace (e.g., "GetForecastInput")
    pub name: String,
}

impl ShapeId {
    /// Create a shape id from namespace and local name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a shape id from `namespace#Name` text
    pub fn parse(text: &str) -> Result<Self> {
        let (namespace, name) = text
            .split_once('#')
            .ok_or_else(|| ModelError::invalid_id(text))?;
        if namespace.is_empty() || name.is_empty() || name.contains('#') {
            return Err(ModelError::invalid_id(text));
        }
        Ok(Self::new(namespace, name))
    }

    /// Full `namespace#Name` form
    pub fn absolute_name(&self) -> String {
        format!("{}#{}", self.namespace, self.name)
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.name)
    }
}

/// Kind of a shape in the type graph
///
/// Members are not a kind of their own: they are `Member` entries owned by
/// their container shape, so kind dispatch stays a closed enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
    String,
    Enum,
    IntEnum,
    Blob,
    Document,
    Timestamp,
    List,
    Map,
    Structure,
    Union,
    Operation,
    Service,
}

impl ShapeKind {
    /// Check if this is a simple (non-aggregate, non-container) kind
    pub const fn is_simple(self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::Byte
                | Self::Short
                | Self::Integer
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::BigInteger
                | Self::BigDecimal
                | Self::String
                | Self::Enum
                | Self::IntEnum
                | Self::Blob
                | Self::Document
                | Self::Timestamp
        )
    }

    /// Check if this is a numeric kind
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::Short
                | Self::Integer
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::IntEnum
        )
    }

    /// Check if this is a structure-like aggregate (named member slots)
    pub const fn is_aggregate(self) -> bool {
        matches!(self, Self::Structure | Self::Union)
    }

    /// Check if this is a container of a single element target
    pub const fn is_container(self) -> bool {
        matches!(self, Self::List | Self::Map)
    }

    /// Get kind name as string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::BigInteger => "bigInteger",
            Self::BigDecimal => "bigDecimal",
            Self::String => "string",
            Self::Enum => "enum",
            Self::IntEnum => "intEnum",
            Self::Blob => "blob",
            Self::Document => "document",
            Self::Timestamp => "timestamp",
            Self::List => "list",
            Self::Map => "map",
            Self::Structure => "structure",
            Self::Union => "union",
            Self::Operation => "operation",
            Self::Service => "service",
        }
    }
}

/// Timestamp serialization format variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// No explicit format tag; protocol default applies at runtime
    Unspecified,
    /// RFC 3339 date-time
    DateTime,
    /// RFC 7231 http-date
    HttpDate,
    /// Seconds since the Unix epoch
    EpochSeconds,
}

impl TimestampFormat {
    /// Parse from the `timestampFormat` tag value text
    pub fn from_tag_text(text: &str) -> Self {
        match text {
            "date-time" => Self::DateTime,
            "http-date" => Self::HttpDate,
            "epoch-seconds" => Self::EpochSeconds,
            _ => Self::Unspecified,
        }
    }
}
