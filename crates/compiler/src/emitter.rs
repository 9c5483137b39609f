use crate::closure::ServiceClosure;
use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::intern::{StringInterner, StringRef};
use crate::reference::ReferenceClassifier;
use crate::relevance::TraitRelevanceFilter;
use crate::sentinel;
use crate::traits::{TraitEncoder, TraitEncoding};
use schema_model::{prelude, Shape, ShapeGraph, ShapeId, ShapeKind, TagRegistry};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Small integer discriminators for out-of-line descriptors
pub mod kind_tag {
    pub const STRUCTURE: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const UNION: u8 = 2;
    pub const LIST: u8 = 3;
    pub const MAP: u8 = 4;
    pub const OPERATION: u8 = 5;
    pub const SIMPLE: u8 = 6;
}

/// Resolved representation of a shape at a use site
///
/// `Ref` is resolved by name at load time, not eagerly during emission;
/// that deferral is what lets self-referential shapes compile without
/// infinite expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaRef {
    /// Inline numeric sentinel, possibly container-composed
    Sentinel(u8),

    /// The fixed no-payload constant
    Unit,

    /// Lazy reference to a named descriptor
    Ref(String),
}

impl SchemaRef {
    /// Check whether this resolution needs no out-of-line descriptor
    pub const fn is_inline(&self) -> bool {
        matches!(self, Self::Sentinel(_) | Self::Unit)
    }
}

impl Serialize for SchemaRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Sentinel(code) => serializer.serialize_u8(*code),
            Self::Unit => serializer.serialize_str("unit"),
            Self::Ref(variable) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("ref", variable)?;
                map.end()
            }
        }
    }
}

/// One member slot of an emitted descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberDescriptor {
    pub name: StringRef,
    pub schema: SchemaRef,
    pub traits: TraitEncoding,
}

/// Compiled output for one shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    /// Deconflicted stable name
    pub variable_id: String,

    /// Kind discriminator (see [`kind_tag`])
    pub kind_tag: u8,

    /// Interned namespace token
    pub namespace: StringRef,

    /// Interned local-name token
    pub name: StringRef,

    /// Encoded relevant traits
    pub traits: TraitEncoding,

    /// Underlying numeric code, present only for trait-bearing simple
    /// shapes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentinel: Option<u8>,

    /// Ordered member slots; union members are the mutually exclusive
    /// variants
    pub members: Vec<MemberDescriptor>,

    /// Operation input, lazily referenced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<SchemaRef>,

    /// Operation output, lazily referenced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<SchemaRef>,
}

/// Everything the emitter produces for one compilation
#[derive(Debug)]
pub struct EmitOutput {
    /// Descriptors in deterministic emission order
    pub descriptors: Vec<Descriptor>,

    /// Final resolution of every closure shape at its use sites
    pub resolutions: BTreeMap<ShapeId, SchemaRef>,

    /// Namespace -> error descriptor variable ids
    pub error_registry: BTreeMap<String, Vec<String>>,

    /// Interned literal table in id order
    pub strings: Vec<String>,
}

/// Assigns identifiers and emits descriptors for every shape that needs
/// one
pub struct DescriptorEmitter<'a> {
    graph: &'a ShapeGraph,
    config: &'a CompilerConfig,
    references: ReferenceClassifier<'a>,
    relevance: TraitRelevanceFilter<'a>,
    encoder: TraitEncoder<'a>,
    interner: StringInterner,
    variable_ids: BTreeMap<ShapeId, String>,
}

impl<'a> DescriptorEmitter<'a> {
    pub fn new(graph: &'a ShapeGraph, config: &'a CompilerConfig, registry: &'a TagRegistry) -> Self {
        Self {
            graph,
            config,
            references: ReferenceClassifier::new(graph, config.container_depth_limit),
            relevance: TraitRelevanceFilter::new(graph, registry, config.relevance_depth_limit),
            encoder: TraitEncoder::new(registry),
            interner: StringInterner::new(),
            variable_ids: BTreeMap::new(),
        }
    }

    /// Emit descriptors for a collected closure
    pub fn emit(mut self, closure: &ServiceClosure) -> Result<EmitOutput> {
        let emitted = self.select_emitted(closure);
        self.assign_identifiers(&emitted);

        let mut descriptors = Vec::with_capacity(emitted.len());
        let mut error_registry: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for id in &emitted {
            let shape = self.graph.expect(id)?;
            let descriptor = self.emit_shape(shape)?;
            if shape.is_error() {
                error_registry
                    .entry(shape.id.namespace.clone())
                    .or_default()
                    .push(descriptor.variable_id.clone());
            }
            descriptors.push(descriptor);
        }

        let mut resolutions = BTreeMap::new();
        for id in closure.all_shapes() {
            let resolved = self.resolve_ref(&id)?;
            resolutions.insert(id, resolved);
        }

        log::info!(
            "Emitted {} descriptors ({} shapes elided), {} interned literals",
            descriptors.len(),
            closure.len().saturating_sub(descriptors.len()),
            self.interner.len()
        );

        Ok(EmitOutput {
            descriptors,
            resolutions,
            error_registry,
            strings: self.interner.into_literals(),
        })
    }

    /// A shape gets a descriptor when it is a reference shape, carries or
    /// reaches relevant traits, or is a container that cannot be
    /// flattened into a one-level sentinel composition
    fn select_emitted(&mut self, closure: &ServiceClosure) -> BTreeSet<ShapeId> {
        let mut emitted = BTreeSet::new();
        for id in closure.all_shapes() {
            if id == prelude::unit() {
                continue;
            }
            let needs = self.references.is_reference(&id)
                || self.relevance.has_relevant_tags(&id)
                || self.needs_container_descriptor(&id);
            if needs {
                emitted.insert(id);
            }
        }
        emitted
    }

    fn needs_container_descriptor(&self, id: &ShapeId) -> bool {
        match self.graph.kind(id) {
            Some(ShapeKind::List | ShapeKind::Map) => self.flat_sentinel(id, 0).is_none(),
            _ => false,
        }
    }

    /// One-level sentinel composition: `None` when the shape cannot be
    /// expressed without a descriptor (aggregates, nested containers, or
    /// a depth-exhausted container chain)
    fn flat_sentinel(&self, id: &ShapeId, depth: usize) -> Option<u8> {
        if depth >= self.config.container_depth_limit {
            return None;
        }
        let shape = self.graph.get(id)?;
        match shape.kind {
            kind if kind.is_simple() => sentinel::simple_sentinel(shape),
            ShapeKind::List => {
                let element = self.flat_sentinel(&shape.list_member()?.target, depth + 1)?;
                sentinel::can_compose(element).then(|| sentinel::compose_list(element))
            }
            ShapeKind::Map => {
                let value = self.flat_sentinel(&shape.map_value()?.target, depth + 1)?;
                sentinel::can_compose(value).then(|| sentinel::compose_map(value))
            }
            _ => None,
        }
    }

    /// Two-pass identifier assignment: collect emitted shapes by local
    /// name, then deconflict collisions by suffixing the namespace.
    /// Assignment is total and stable before any descriptor is
    /// materialized.
    fn assign_identifiers(&mut self, emitted: &BTreeSet<ShapeId>) {
        let mut by_name: BTreeMap<&str, Vec<&ShapeId>> = BTreeMap::new();
        for id in emitted {
            by_name.entry(id.name.as_str()).or_default().push(id);
        }

        let mut used: BTreeSet<String> = BTreeSet::new();
        for (name, ids) in by_name {
            for (position, id) in ids.iter().enumerate() {
                let mut variable = if position == 0 {
                    name.to_string()
                } else {
                    format!("{}_{}", name, sanitize_namespace(&id.namespace))
                };
                let mut counter = 2;
                while used.contains(&variable) {
                    variable = format!("{}_{}", name, counter);
                    counter += 1;
                }
                used.insert(variable.clone());
                self.variable_ids.insert((*id).clone(), variable);
            }
        }
    }

    fn emit_shape(&mut self, shape: &Shape) -> Result<Descriptor> {
        let variable_id = self.variable_ids[&shape.id].clone();
        let namespace = self.interner.intern(&shape.id.namespace);
        let name = self.interner.intern(&shape.id.name);
        let traits = self.encoder.encode(&shape.tags, &mut self.interner);

        let mut descriptor = Descriptor {
            variable_id,
            kind_tag: kind_tag::STRUCTURE,
            namespace,
            name,
            traits,
            sentinel: None,
            members: Vec::new(),
            input: None,
            output: None,
        };

        match shape.kind {
            ShapeKind::Structure | ShapeKind::Union => {
                descriptor.kind_tag = if shape.is_error() {
                    kind_tag::ERROR
                } else if shape.kind == ShapeKind::Union {
                    kind_tag::UNION
                } else {
                    kind_tag::STRUCTURE
                };
                for member in &shape.members {
                    let slot = self.emit_member(&member.name, &member.target, &member.tags)?;
                    descriptor.members.push(slot);
                }
            }
            ShapeKind::List => {
                descriptor.kind_tag = kind_tag::LIST;
                let member = shape.list_member().ok_or_else(|| {
                    CompileError::Other(format!("list shape {} has no element member", shape.id))
                })?;
                let slot = self.emit_member(&member.name, &member.target, &member.tags)?;
                descriptor.members.push(slot);
            }
            ShapeKind::Map => {
                descriptor.kind_tag = kind_tag::MAP;
                for member in [shape.map_key(), shape.map_value()] {
                    let member = member.ok_or_else(|| {
                        CompileError::Other(format!(
                            "map shape {} is missing a key or value member",
                            shape.id
                        ))
                    })?;
                    let slot = self.emit_member(&member.name, &member.target, &member.tags)?;
                    descriptor.members.push(slot);
                }
            }
            ShapeKind::Operation => {
                descriptor.kind_tag = kind_tag::OPERATION;
                let info = shape.operation.clone().unwrap_or_default();
                let input = info.input.unwrap_or_else(prelude::unit);
                let output = info.output.unwrap_or_else(prelude::unit);
                descriptor.input = Some(self.resolve_ref(&input)?);
                descriptor.output = Some(self.resolve_ref(&output)?);
            }
            kind if kind.is_simple() => {
                descriptor.kind_tag = kind_tag::SIMPLE;
                descriptor.sentinel = sentinel::simple_sentinel(shape);
            }
            kind => {
                return Err(CompileError::unexpected_kind(&shape.id, kind, "emit"));
            }
        }

        Ok(descriptor)
    }

    fn emit_member(
        &mut self,
        name: &str,
        target: &ShapeId,
        tags: &schema_model::TagMap,
    ) -> Result<MemberDescriptor> {
        let member_name = self.interner.intern(name);
        let schema = self.resolve_ref(target)?;
        let traits = self.encoder.encode(tags, &mut self.interner);
        Ok(MemberDescriptor {
            name: member_name,
            schema,
            traits,
        })
    }

    /// Resolution of a shape at a use site: the unit constant, a lazy
    /// reference to its emitted descriptor, or its flat sentinel
    fn resolve_ref(&mut self, id: &ShapeId) -> Result<SchemaRef> {
        if *id == prelude::unit() {
            return Ok(SchemaRef::Unit);
        }
        if let Some(variable) = self.variable_ids.get(id) {
            return Ok(SchemaRef::Ref(variable.clone()));
        }
        match self.flat_sentinel(id, 0) {
            Some(code) => Ok(SchemaRef::Sentinel(code)),
            None => match self.graph.kind(id) {
                Some(kind) => Err(CompileError::unexpected_kind(id, kind, "resolve")),
                None => Err(schema_model::ModelError::unknown(id).into()),
            },
        }
    }
}

fn sanitize_namespace(namespace: &str) -> String {
    namespace
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
