use crate::closure::{ClosureCollector, DependencyGraph, ServiceClosure};
use crate::config::CompilerConfig;
use crate::emitter::{Descriptor, DescriptorEmitter, SchemaRef};
use crate::error::Result;
use crate::group::{Group, GroupAssignment, GroupPartitioner};
use schema_model::{ShapeGraph, ShapeId, TagRegistry};
use serde::Serialize;
use std::collections::BTreeMap;

/// Compiles shape graphs into descriptor sets
///
/// A `Compiler` holds only configuration; every `compile` call constructs
/// its own memoization caches and interner, so repeated or concurrent
/// compilations against distinct graphs share no mutable state.
pub struct Compiler {
    config: CompilerConfig,
    registry: TagRegistry,
}

impl Compiler {
    /// Create a compiler, validating the configuration up front
    pub fn new(config: CompilerConfig, registry: TagRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, registry })
    }

    /// Create a compiler with default configuration and tag allow-lists
    pub fn with_defaults() -> Self {
        Self {
            config: CompilerConfig::default(),
            registry: TagRegistry::default(),
        }
    }

    /// Current configuration
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Tag registry, mutable so callers can register additional tags
    /// before compilation starts
    pub fn registry_mut(&mut self) -> &mut TagRegistry {
        &mut self.registry
    }

    /// Compile every service root in a shape graph
    pub fn compile(&self, graph: &ShapeGraph) -> Result<Compilation> {
        let (closure, dependencies) = ClosureCollector::new(graph).collect()?;
        let output = DescriptorEmitter::new(graph, &self.config, &self.registry).emit(&closure)?;
        let groups = GroupPartitioner::new(&self.config).partition(&closure.visit_order, &closure.usage);

        log::info!(
            "Compiled {} shapes into {} descriptors across {} groups",
            closure.len(),
            output.descriptors.len(),
            groups.len()
        );

        Ok(Compilation {
            closure,
            dependencies,
            descriptors: output.descriptors,
            resolutions: output.resolutions,
            strings: output.strings,
            error_registry: output.error_registry,
            groups,
        })
    }
}

/// Complete, internally consistent output of one compilation
#[derive(Debug)]
pub struct Compilation {
    /// Classified shape closure
    pub closure: ServiceClosure,

    /// Derived shape-dependency graph
    pub dependencies: DependencyGraph,

    /// Descriptors in deterministic emission order
    pub descriptors: Vec<Descriptor>,

    /// Final resolution of every closure shape at its use sites
    pub resolutions: BTreeMap<ShapeId, SchemaRef>,

    /// Interned literal table in id order
    pub strings: Vec<String>,

    /// Namespace -> error descriptor variable ids
    pub error_registry: BTreeMap<String, Vec<String>>,

    /// Shape-to-group assignment
    pub groups: GroupAssignment,
}

/// Serializable view of the artifacts downstream renderers consume
#[derive(Serialize)]
struct Snapshot<'a> {
    descriptors: &'a [Descriptor],
    resolutions: BTreeMap<String, &'a SchemaRef>,
    strings: &'a [String],
    error_registry: &'a BTreeMap<String, Vec<String>>,
    groups: &'a [Group],
}

impl Compilation {
    /// Resolution of one shape at its use sites
    pub fn resolution_of(&self, id: &ShapeId) -> Option<&SchemaRef> {
        self.resolutions.get(id)
    }

    /// Descriptor emitted for a shape, if it was not elided
    pub fn descriptor_of(&self, id: &ShapeId) -> Option<&Descriptor> {
        match self.resolutions.get(id)? {
            SchemaRef::Ref(variable) => self
                .descriptors
                .iter()
                .find(|descriptor| &descriptor.variable_id == variable),
            _ => None,
        }
    }

    /// Deterministic JSON snapshot of the serializable artifacts; two
    /// compilations of the same graph produce byte-identical snapshots
    pub fn snapshot(&self) -> serde_json::Result<String> {
        let view = Snapshot {
            descriptors: &self.descriptors,
            resolutions: self
                .resolutions
                .iter()
                .map(|(id, resolved)| (id.to_string(), resolved))
                .collect(),
            strings: &self.strings,
            error_registry: &self.error_registry,
            groups: self.groups.groups(),
        };
        serde_json::to_string_pretty(&view)
    }
}
