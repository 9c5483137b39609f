use crate::intern::{StringInterner, StringRef};
use schema_model::{tags, TagId, TagMap, TagRegistry, TagValue};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;

/// Encoded form of one tag value inside a full trait map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedTagValue {
    /// Presence-only annotation; renders as the constant `1`
    Flag,

    /// Interned string-table reference
    Str(StringRef),

    /// Integer value
    Int(i64),

    /// Fixed-arity tuple (e.g., HTTP method/uri/code)
    Tuple(Vec<EncodedTagValue>),

    /// A tag with no known encoding rule; kept as an explicit marker so a
    /// reviewer notices it instead of the data being dropped
    Unhandled,
}

impl Serialize for EncodedTagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Flag => serializer.serialize_u8(1),
            Self::Str(reference) => reference.serialize(serializer),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Unhandled => serializer.serialize_str("<unhandled>"),
        }
    }
}

/// Compiled trait set of a shape or member: a compact bit-vector when
/// every relevant tag is compressible, otherwise a full key/value map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraitEncoding {
    /// Bit *i* is set iff the shape carries compressible tag *i*
    Bits(u32),

    /// Full tag-id to encoded-value map
    Map(BTreeMap<TagId, EncodedTagValue>),
}

impl TraitEncoding {
    /// The encoding of an untagged shape
    pub const fn empty() -> Self {
        Self::Bits(0)
    }

    /// Check whether no relevant tags were recorded
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bits(bits) => *bits == 0,
            Self::Map(map) => map.is_empty(),
        }
    }
}

impl Serialize for TraitEncoding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bits(bits) => serializer.serialize_u32(*bits),
            Self::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (tag, value) in map {
                    out.serialize_entry(tag, value)?;
                }
                out.end()
            }
        }
    }
}

/// Encodes relevant tag sets into their compact descriptor form
pub struct TraitEncoder<'a> {
    registry: &'a TagRegistry,
}

impl<'a> TraitEncoder<'a> {
    pub fn new(registry: &'a TagRegistry) -> Self {
        Self { registry }
    }

    /// Encode the relevant subset of a tag map
    ///
    /// Irrelevant tags never reach the output. The bit-vector form is
    /// chosen when every relevant tag present is a presence-only tag from
    /// the compressible list; the overwhelming majority of shapes qualify.
    pub fn encode(&self, tag_map: &TagMap, interner: &mut StringInterner) -> TraitEncoding {
        let relevant: Vec<(&TagId, &TagValue)> = tag_map
            .iter()
            .filter(|(tag, _)| self.registry.is_relevant(tag))
            .collect();

        let mut bits: u32 = 0;
        let mut compressible = true;
        for (tag, value) in &relevant {
            match (self.registry.compressible_index(tag), value) {
                (Some(slot), TagValue::Annotation) => bits |= 1 << slot,
                _ => {
                    compressible = false;
                    break;
                }
            }
        }
        if compressible {
            return TraitEncoding::Bits(bits);
        }

        let mut map = BTreeMap::new();
        for (tag, value) in relevant {
            map.insert(tag.clone(), self.encode_value(tag, value, interner));
        }
        TraitEncoding::Map(map)
    }

    fn encode_value(
        &self,
        tag: &TagId,
        value: &TagValue,
        interner: &mut StringInterner,
    ) -> EncodedTagValue {
        match value {
            TagValue::Annotation => EncodedTagValue::Flag,
            TagValue::Str(text) => EncodedTagValue::Str(interner.intern(text)),
            TagValue::Int(number) => EncodedTagValue::Int(*number),
            TagValue::Record(fields) if tag.as_str() == tags::HTTP => {
                self.encode_http(fields, interner)
            }
            TagValue::Record(_) => EncodedTagValue::Unhandled,
        }
    }

    /// The HTTP binding record encodes to a fixed [method, uri, code]
    /// tuple
    fn encode_http(
        &self,
        fields: &BTreeMap<String, TagValue>,
        interner: &mut StringInterner,
    ) -> EncodedTagValue {
        let method = fields.get("method").and_then(TagValue::as_str);
        let uri = fields.get("uri").and_then(TagValue::as_str);
        let (Some(method), Some(uri)) = (method, uri) else {
            return EncodedTagValue::Unhandled;
        };
        let code = fields
            .get("code")
            .and_then(TagValue::as_int)
            .unwrap_or(200);
        EncodedTagValue::Tuple(vec![
            EncodedTagValue::Str(interner.intern(method)),
            EncodedTagValue::Str(interner.intern(uri)),
            EncodedTagValue::Int(code),
        ])
    }
}
