use crate::error::{ModelError, Result};
use crate::tags::{self, TagId, TagMap, TagValue};
use crate::types::{ShapeId, ShapeKind, TimestampFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conventional member names for containers
pub const LIST_MEMBER: &str = "member";
pub const MAP_KEY: &str = "key";
pub const MAP_VALUE: &str = "value";

/// Named member slot of an aggregate or container shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member name
    pub name: String,

    /// Target shape id
    pub target: ShapeId,

    /// Tags attached to the member itself (not its target)
    pub tags: TagMap,
}

impl Member {
    /// Create an untagged member
    pub fn new(name: impl Into<String>, target: ShapeId) -> Self {
        Self {
            name: name.into(),
            target,
            tags: TagMap::new(),
        }
    }
}

/// Input/output/error wiring of an operation shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationInfo {
    /// Input shape; `None` means the no-payload unit sentinel
    pub input: Option<ShapeId>,

    /// Output shape; `None` means the no-payload unit sentinel
    pub output: Option<ShapeId>,

    /// Error shapes this operation can return
    pub errors: Vec<ShapeId>,
}

/// Immutable node in the type graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// Globally unique id
    pub id: ShapeId,

    /// Kind discriminator
    pub kind: ShapeKind,

    /// Ordered member slots (empty for simple kinds)
    pub members: Vec<Member>,

    /// Tags attached to the shape
    pub tags: TagMap,

    /// Operation wiring, present only for `ShapeKind::Operation`
    pub operation: Option<OperationInfo>,
}

impl Shape {
    /// Create a shape of the given kind with no members or tags
    pub fn new(id: ShapeId, kind: ShapeKind) -> Self {
        Self {
            id,
            kind,
            members: Vec::new(),
            tags: TagMap::new(),
            operation: if kind == ShapeKind::Operation {
                Some(OperationInfo::default())
            } else {
                None
            },
        }
    }

    /// Create a simple shape
    pub fn simple(id: ShapeId, kind: ShapeKind) -> Self {
        Self::new(id, kind)
    }

    /// Create a structure shape
    pub fn structure(id: ShapeId) -> Self {
        Self::new(id, ShapeKind::Structure)
    }

    /// Create a union shape
    pub fn union(id: ShapeId) -> Self {
        Self::new(id, ShapeKind::Union)
    }

    /// Create an operation shape
    pub fn operation(id: ShapeId) -> Self {
        Self::new(id, ShapeKind::Operation)
    }

    /// Create a list shape with the conventional element member
    pub fn list(id: ShapeId, element: ShapeId) -> Self {
        Self::new(id, ShapeKind::List).member(LIST_MEMBER, element)
    }

    /// Create a map shape with the conventional key/value members
    pub fn map(id: ShapeId, key: ShapeId, value: ShapeId) -> Self {
        Self::new(id, ShapeKind::Map)
            .member(MAP_KEY, key)
            .member(MAP_VALUE, value)
    }

    /// Builder: add a member
    #[must_use]
    pub fn member(mut self, name: impl Into<String>, target: ShapeId) -> Self {
        self.members.push(Member::new(name, target));
        self
    }

    /// Builder: add a member carrying its own tags
    #[must_use]
    pub fn tagged_member(mut self, name: impl Into<String>, target: ShapeId, tags: TagMap) -> Self {
        self.members.push(Member {
            name: name.into(),
            target,
            tags,
        });
        self
    }

    /// Builder: attach a tag with a value
    #[must_use]
    pub fn tag(mut self, id: impl Into<String>, value: TagValue) -> Self {
        self.tags.insert(TagId::new(id), value);
        self
    }

    /// Builder: attach a presence-only annotation tag
    #[must_use]
    pub fn annotation(self, id: impl Into<String>) -> Self {
        self.tag(id, TagValue::Annotation)
    }

    /// Builder: set operation input
    #[must_use]
    pub fn input(mut self, target: ShapeId) -> Self {
        self.operation.get_or_insert_with(OperationInfo::default).input = Some(target);
        self
    }

    /// Builder: set operation output
    #[must_use]
    pub fn output(mut self, target: ShapeId) -> Self {
        self.operation.get_or_insert_with(OperationInfo::default).output = Some(target);
        self
    }

    /// Builder: add an operation error
    #[must_use]
    pub fn error(mut self, target: ShapeId) -> Self {
        self.operation
            .get_or_insert_with(OperationInfo::default)
            .errors
            .push(target);
        self
    }

    /// Element member of a list shape
    pub fn list_member(&self) -> Option<&Member> {
        self.members.iter().find(|m| m.name == LIST_MEMBER)
    }

    /// Key member of a map shape
    pub fn map_key(&self) -> Option<&Member> {
        self.members.iter().find(|m| m.name == MAP_KEY)
    }

    /// Value member of a map shape
    pub fn map_value(&self) -> Option<&Member> {
        self.members.iter().find(|m| m.name == MAP_VALUE)
    }

    /// Check for a tag by name
    pub fn has_tag(&self, id: &str) -> bool {
        self.tags.contains_key(&TagId::from(id))
    }

    /// Look up a tag value by name
    pub fn tag_value(&self, id: &str) -> Option<&TagValue> {
        self.tags.get(&TagId::from(id))
    }

    /// Check if this is an error-tagged aggregate
    pub fn is_error(&self) -> bool {
        self.kind.is_aggregate() && self.has_tag(tags::ERROR)
    }

    /// Check if this shape is enum-like: an enum kind, or a shape carrying
    /// the legacy enum tag
    pub fn is_enum_like(&self) -> bool {
        matches!(self.kind, ShapeKind::Enum | ShapeKind::IntEnum) || self.has_tag(tags::ENUM)
    }

    /// Timestamp format from the `timestampFormat` tag, for timestamp shapes
    pub fn timestamp_format(&self) -> TimestampFormat {
        self.tag_value(tags::TIMESTAMP_FORMAT)
            .and_then(TagValue::as_str)
            .map(TimestampFormat::from_tag_text)
            .unwrap_or(TimestampFormat::Unspecified)
    }
}

/// Service root: a set of operations to compile a closure for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Service shape id
    pub id: ShapeId,

    /// Operations contained in the service
    pub operations: Vec<ShapeId>,
}

impl Service {
    /// Create a service root
    pub fn new(id: ShapeId, operations: Vec<ShapeId>) -> Self {
        Self { id, operations }
    }
}

/// The borrowed, immutable shape arena plus its service roots
///
/// Shapes are stored in an id-indexed table and reference each other by id,
/// never by owned value, so cyclic graphs are representable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeGraph {
    shapes: BTreeMap<ShapeId, Shape>,
    services: Vec<Service>,
}

impl ShapeGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph pre-seeded with the `core` namespace prelude shapes
    pub fn with_prelude() -> Self {
        let mut graph = Self::new();
        for (name, kind) in prelude::SIMPLE_SHAPES {
            graph.add_shape(Shape::simple(ShapeId::new(prelude::NAMESPACE, *name), *kind));
        }
        graph.add_shape(Shape::structure(prelude::unit()));
        graph
    }

    /// Insert a shape, replacing any previous shape with the same id
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.insert(shape.id.clone(), shape);
    }

    /// Register a service root
    pub fn add_service(&mut self, service: Service) {
        self.services.push(service);
    }

    /// Look up a shape
    pub fn get(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    /// Look up a shape, failing fast when it is missing
    pub fn expect(&self, id: &ShapeId) -> Result<&Shape> {
        self.get(id).ok_or_else(|| ModelError::unknown(id))
    }

    /// Resolve a member target, failing fast with the owning shape and
    /// member named in the error
    pub fn expect_target(&self, owner: &Shape, member: &Member) -> Result<&Shape> {
        self.get(&member.target).ok_or_else(|| ModelError::DanglingMember {
            shape: owner.id.to_string(),
            member: member.name.clone(),
            target: member.target.to_string(),
        })
    }

    /// Kind of a shape, if present
    pub fn kind(&self, id: &ShapeId) -> Option<ShapeKind> {
        self.get(id).map(|s| s.kind)
    }

    /// Members of a shape; empty for missing or simple shapes
    pub fn members(&self, id: &ShapeId) -> &[Member] {
        self.get(id).map(|s| s.members.as_slice()).unwrap_or(&[])
    }

    /// Tags of a shape, if present
    pub fn tags(&self, id: &ShapeId) -> Option<&TagMap> {
        self.get(id).map(|s| &s.tags)
    }

    /// Value of one tag on a shape
    pub fn tag_value(&self, id: &ShapeId, tag: &TagId) -> Option<&TagValue> {
        self.get(id).and_then(|s| s.tags.get(tag))
    }

    /// Service roots
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// All shapes in deterministic id order
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    /// Number of shapes
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Check if the graph holds no shapes
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// The `core` namespace prelude: primitive shapes callers can target
/// without defining them
pub mod prelude {
    use super::{ShapeId, ShapeKind};

    /// Prelude namespace
    pub const NAMESPACE: &str = "core";

    /// Simple prelude shapes seeded by [`super::ShapeGraph::with_prelude`]
    pub const SIMPLE_SHAPES: &[(&str, ShapeKind)] = &[
        ("Boolean", ShapeKind::Boolean),
        ("Byte", ShapeKind::Byte),
        ("Short", ShapeKind::Short),
        ("Integer", ShapeKind::Integer),
        ("Long", ShapeKind::Long),
        ("Float", ShapeKind::Float),
        ("Double", ShapeKind::Double),
        ("BigInteger", ShapeKind::BigInteger),
        ("BigDecimal", ShapeKind::BigDecimal),
        ("String", ShapeKind::String),
        ("Blob", ShapeKind::Blob),
        ("Document", ShapeKind::Document),
        ("Timestamp", ShapeKind::Timestamp),
    ];

    /// The no-payload unit structure
    pub fn unit() -> ShapeId {
        ShapeId::new(NAMESPACE, "Unit")
    }

    pub fn string() -> ShapeId {
        ShapeId::new(NAMESPACE, "String")
    }

    pub fn boolean() -> ShapeId {
        ShapeId::new(NAMESPACE, "Boolean")
    }

    pub fn integer() -> ShapeId {
        ShapeId::new(NAMESPACE, "Integer")
    }

    pub fn long() -> ShapeId {
        ShapeId::new(NAMESPACE, "Long")
    }

    pub fn blob() -> ShapeId {
        ShapeId::new(NAMESPACE, "Blob")
    }

    pub fn timestamp() -> ShapeId {
        ShapeId::new(NAMESPACE, "Timestamp")
    }
}
