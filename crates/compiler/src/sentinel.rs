//! Fixed numeric sentinels for simple shapes and one-level containers.
//!
//! Every simple kind maps to a reserved small integer. A list or map of a
//! simple shape composes a container modifier bit with the element's
//! sentinel via bitwise OR instead of allocating a full descriptor; this
//! is the primary compaction mechanism. The composition is valid for one
//! container level only: a sentinel that already carries a modifier bit
//! cannot be composed again.

use schema_model::{tags, Shape, ShapeKind, TimestampFormat};

pub const STRING: u8 = 0b0000_0000;
pub const NUMERIC: u8 = 0b0000_0001;
pub const BOOLEAN: u8 = 0b0000_0010;
pub const TIMESTAMP_DEFAULT: u8 = 0b0000_0100;
pub const TIMESTAMP_DATE_TIME: u8 = 0b0000_0101;
pub const TIMESTAMP_HTTP_DATE: u8 = 0b0000_0110;
pub const TIMESTAMP_EPOCH_SECONDS: u8 = 0b0000_0111;
pub const DOCUMENT: u8 = 0b0000_1111;
pub const BIG_INTEGER: u8 = 0b0001_0001;
pub const BIG_DECIMAL: u8 = 0b0001_0011;
pub const BLOB: u8 = 0b0001_0101;
pub const STREAMING_BLOB: u8 = 0b0010_1010;

/// Container modifier bits
pub const LIST_MODIFIER: u8 = 0b0100_0000;
pub const MAP_MODIFIER: u8 = 0b1000_0000;

/// Sentinel for a simple shape, `None` for aggregate/container kinds
///
/// Enum folds into the string family and IntEnum into the numeric family;
/// a streaming-tagged blob gets its own code; timestamp formats map to
/// distinct codes.
pub fn simple_sentinel(shape: &Shape) -> Option<u8> {
    match shape.kind {
        ShapeKind::Boolean => Some(BOOLEAN),
        ShapeKind::Byte
        | ShapeKind::Short
        | ShapeKind::Integer
        | ShapeKind::Long
        | ShapeKind::Float
        | ShapeKind::Double
        | ShapeKind::IntEnum => Some(NUMERIC),
        ShapeKind::BigInteger => Some(BIG_INTEGER),
        ShapeKind::BigDecimal => Some(BIG_DECIMAL),
        ShapeKind::String | ShapeKind::Enum => Some(STRING),
        ShapeKind::Blob => {
            if shape.has_tag(tags::STREAMING) {
                Some(STREAMING_BLOB)
            } else {
                Some(BLOB)
            }
        }
        ShapeKind::Document => Some(DOCUMENT),
        ShapeKind::Timestamp => Some(match shape.timestamp_format() {
            TimestampFormat::Unspecified => TIMESTAMP_DEFAULT,
            TimestampFormat::DateTime => TIMESTAMP_DATE_TIME,
            TimestampFormat::HttpDate => TIMESTAMP_HTTP_DATE,
            TimestampFormat::EpochSeconds => TIMESTAMP_EPOCH_SECONDS,
        }),
        ShapeKind::List
        | ShapeKind::Map
        | ShapeKind::Structure
        | ShapeKind::Union
        | ShapeKind::Operation
        | ShapeKind::Service => None,
    }
}

/// Check whether an element sentinel can take another container modifier
pub const fn can_compose(element: u8) -> bool {
    element & (LIST_MODIFIER | MAP_MODIFIER) == 0
}

/// Compose a list of the given element sentinel
pub const fn compose_list(element: u8) -> u8 {
    LIST_MODIFIER | element
}

/// Compose a map of the given value sentinel
pub const fn compose_map(value: u8) -> u8 {
    MAP_MODIFIER | value
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_model::{ShapeId, TagValue};

    fn shape(kind: ShapeKind) -> Shape {
        Shape::simple(ShapeId::new("ns", "S"), kind)
    }

    #[test]
    fn test_family_sentinels() {
        assert_eq!(simple_sentinel(&shape(ShapeKind::String)), Some(STRING));
        assert_eq!(simple_sentinel(&shape(ShapeKind::Enum)), Some(STRING));
        assert_eq!(simple_sentinel(&shape(ShapeKind::Integer)), Some(NUMERIC));
        assert_eq!(simple_sentinel(&shape(ShapeKind::IntEnum)), Some(NUMERIC));
        assert_eq!(simple_sentinel(&shape(ShapeKind::Boolean)), Some(BOOLEAN));
        assert_eq!(simple_sentinel(&shape(ShapeKind::Document)), Some(DOCUMENT));
        assert_eq!(simple_sentinel(&shape(ShapeKind::Structure)), None);
        assert_eq!(simple_sentinel(&shape(ShapeKind::List)), None);
    }

    #[test]
    fn test_streaming_blob() {
        assert_eq!(simple_sentinel(&shape(ShapeKind::Blob)), Some(BLOB));
        let streaming = shape(ShapeKind::Blob).annotation(tags::STREAMING);
        assert_eq!(simple_sentinel(&streaming), Some(STREAMING_BLOB));
    }

    #[test]
    fn test_timestamp_formats_are_distinct() {
        let default = shape(ShapeKind::Timestamp);
        let epoch = shape(ShapeKind::Timestamp)
            .tag(tags::TIMESTAMP_FORMAT, TagValue::Str("epoch-seconds".into()));
        let http = shape(ShapeKind::Timestamp)
            .tag(tags::TIMESTAMP_FORMAT, TagValue::Str("http-date".into()));

        assert_eq!(simple_sentinel(&default), Some(TIMESTAMP_DEFAULT));
        assert_eq!(simple_sentinel(&epoch), Some(TIMESTAMP_EPOCH_SECONDS));
        assert_eq!(simple_sentinel(&http), Some(TIMESTAMP_HTTP_DATE));
    }

    #[test]
    fn test_one_level_composition() {
        assert_eq!(compose_list(STRING), 64);
        assert_eq!(compose_map(NUMERIC), 129);
        assert!(can_compose(STRING));
        assert!(!can_compose(compose_list(STRING)));
        assert!(!can_compose(compose_map(STRING)));
    }
}
