use crate::error::{ModelError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// Well-known tag names.
//
// Nullability / presence
pub const REQUIRED: &str = "required";
pub const SPARSE: &str = "sparse";
pub const CLIENT_OPTIONAL: &str = "clientOptional";
// Wire position
pub const HTTP_LABEL: &str = "httpLabel";
pub const HTTP_QUERY: &str = "httpQuery";
pub const HTTP_QUERY_PARAMS: &str = "httpQueryParams";
pub const HTTP_HEADER: &str = "httpHeader";
pub const HTTP_PREFIX_HEADERS: &str = "httpPrefixHeaders";
pub const HTTP_PAYLOAD: &str = "httpPayload";
pub const HTTP_RESPONSE_CODE: &str = "httpResponseCode";
pub const HOST_LABEL: &str = "hostLabel";
// Naming overrides
pub const JSON_NAME: &str = "jsonName";
pub const XML_NAME: &str = "xmlName";
pub const XML_NAMESPACE: &str = "xmlNamespace";
pub const XML_FLATTENED: &str = "xmlFlattened";
pub const XML_ATTRIBUTE: &str = "xmlAttribute";
// Value formats
pub const TIMESTAMP_FORMAT: &str = "timestampFormat";
pub const MEDIA_TYPE: &str = "mediaType";
// Streaming / events
pub const STREAMING: &str = "streaming";
pub const REQUIRES_LENGTH: &str = "requiresLength";
pub const EVENT_HEADER: &str = "eventHeader";
pub const EVENT_PAYLOAD: &str = "eventPayload";
// Behavior markers
pub const SENSITIVE: &str = "sensitive";
pub const IDEMPOTENT: &str = "idempotent";
pub const IDEMPOTENCY_TOKEN: &str = "idempotencyToken";
pub const ERROR: &str = "error";
pub const HTTP: &str = "http";
pub const ENDPOINT: &str = "endpoint";
// Documentation-only markers (known, never relevant)
pub const ENUM: &str = "enum";
pub const DOCUMENTATION: &str = "documentation";

/// Maximum number of compressible slots (bit width of the vector encoding)
pub const MAX_COMPRESSIBLE: usize = 32;

/// Identifier of a metadata tag attached to a shape or member
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagId(String);

impl TagId {
    /// Create a tag id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the tag name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TagId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value carried by a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagValue {
    /// Presence-only annotation with no value
    Annotation,

    /// String-valued tag (e.g., a naming override)
    Str(String),

    /// Integer-valued tag (e.g., a response code)
    Int(i64),

    /// Small structured tag (e.g., an HTTP method/uri/code record)
    Record(BTreeMap<String, TagValue>),
}

impl TagValue {
    /// Get the string value, if this is a string tag
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer value, if this is an integer tag
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Ordered map of tags on a shape or member
pub type TagMap = BTreeMap<TagId, TagValue>;

/// Default allow-list of tags that affect runtime (de)serialization
static DEFAULT_RELEVANT: Lazy<BTreeSet<TagId>> = Lazy::new(|| {
    [
        REQUIRED,
        SPARSE,
        CLIENT_OPTIONAL,
        HTTP_LABEL,
        HTTP_QUERY,
        HTTP_QUERY_PARAMS,
        HTTP_HEADER,
        HTTP_PREFIX_HEADERS,
        HTTP_PAYLOAD,
        HTTP_RESPONSE_CODE,
        HOST_LABEL,
        JSON_NAME,
        XML_NAME,
        XML_NAMESPACE,
        XML_FLATTENED,
        XML_ATTRIBUTE,
        TIMESTAMP_FORMAT,
        MEDIA_TYPE,
        STREAMING,
        REQUIRES_LENGTH,
        EVENT_HEADER,
        EVENT_PAYLOAD,
        SENSITIVE,
        IDEMPOTENT,
        IDEMPOTENCY_TOKEN,
        ERROR,
        HTTP,
        ENDPOINT,
    ]
    .into_iter()
    .map(TagId::from)
    .collect()
});

/// Default ordered compressible subset: presence-only tags whose bit slot
/// is their position in this list (bit 0 first)
const DEFAULT_COMPRESSIBLE: [&str; 7] = [
    HTTP_LABEL,
    IDEMPOTENT,
    IDEMPOTENCY_TOKEN,
    SENSITIVE,
    HTTP_PAYLOAD,
    REQUIRES_LENGTH,
    SPARSE,
];

/// Caller-configurable allow-lists: which tags are runtime-relevant and
/// which of those are eligible for the bit-vector encoding
#[derive(Debug, Clone)]
pub struct TagRegistry {
    relevant: BTreeSet<TagId>,
    compressible: Vec<TagId>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self {
            relevant: DEFAULT_RELEVANT.clone(),
            compressible: DEFAULT_COMPRESSIBLE.iter().map(|t| TagId::from(*t)).collect(),
        }
    }
}

impl TagRegistry {
    /// Create an empty registry (no tags relevant)
    pub fn empty() -> Self {
        Self {
            relevant: BTreeSet::new(),
            compressible: Vec::new(),
        }
    }

    /// Check whether a tag affects runtime behavior
    pub fn is_relevant(&self, tag: &TagId) -> bool {
        self.relevant.contains(tag)
    }

    /// Bit slot of a compressible tag, if it has one
    pub fn compressible_index(&self, tag: &TagId) -> Option<usize> {
        self.compressible.iter().position(|t| t == tag)
    }

    /// Number of registered compressible slots
    pub fn compressible_len(&self) -> usize {
        self.compressible.len()
    }

    /// Ordered compressible tags
    pub fn compressible_tags(&self) -> &[TagId] {
        &self.compressible
    }

    /// Register an additional runtime-relevant tag
    pub fn register_relevant(&mut self, tag: TagId) {
        self.relevant.insert(tag);
    }

    /// Register an additional compressible tag; compressible tags are
    /// always also relevant
    pub fn register_compressible(&mut self, tag: TagId) -> Result<()> {
        if self.compressible.len() >= MAX_COMPRESSIBLE {
            return Err(ModelError::RegistryCapacity(format!(
                "compressible slots are limited to {MAX_COMPRESSIBLE}"
            )));
        }
        if self.compressible_index(&tag).is_none() {
            self.relevant.insert(tag.clone());
            self.compressible.push(tag);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_relevance() {
        let registry = TagRegistry::default();
        assert!(registry.is_relevant(&TagId::from(REQUIRED)));
        assert!(registry.is_relevant(&TagId::from(HTTP_LABEL)));
        assert!(!registry.is_relevant(&TagId::from(DOCUMENTATION)));
        assert!(!registry.is_relevant(&TagId::from(ENUM)));
    }

    #[test]
    fn test_compressible_slots_are_ordered() {
        let registry = TagRegistry::default();
        assert_eq!(registry.compressible_len(), 7);
        assert_eq!(registry.compressible_index(&TagId::from(HTTP_LABEL)), Some(0));
        assert_eq!(registry.compressible_index(&TagId::from(SPARSE)), Some(6));
        assert_eq!(registry.compressible_index(&TagId::from(REQUIRED)), None);
    }

    #[test]
    fn test_register_compressible_implies_relevant() {
        let mut registry = TagRegistry::empty();
        registry.register_compressible(TagId::from("custom")).unwrap();
        assert!(registry.is_relevant(&TagId::from("custom")));
        assert_eq!(registry.compressible_index(&TagId::from("custom")), Some(0));
    }

    #[test]
    fn test_register_compressible_capacity() {
        let mut registry = TagRegistry::empty();
        for i in 0..MAX_COMPRESSIBLE {
            registry
                .register_compressible(TagId::new(format!("tag{i}")))
                .unwrap();
        }
        assert!(registry.register_compressible(TagId::from("overflow")).is_err());
    }

    #[test]
    fn test_register_compressible_is_idempotent() {
        let mut registry = TagRegistry::empty();
        registry.register_compressible(TagId::from("custom")).unwrap();
        registry.register_compressible(TagId::from("custom")).unwrap();
        assert_eq!(registry.compressible_len(), 1);
    }
}
