use crate::error::{CompileError, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use schema_model::{prelude, Shape, ShapeGraph, ShapeId, ShapeKind};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// Role of an edge in the dependency graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Operation -> input shape
    Input,
    /// Operation -> output shape
    Output,
    /// Operation -> error shape
    Error,
    /// Structure/union -> member target
    Member,
    /// List -> element target
    ListMember,
    /// Map -> key target
    MapKey,
    /// Map -> value target
    MapValue,
}

/// Derived shape-dependency graph
///
/// Shapes are nodes, wiring and member relations are edges. Built once per
/// compilation during the closure walk and reused by later passes for
/// reachability queries.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Directed graph (shape -> shape it references)
    pub graph: DiGraph<ShapeId, EdgeKind>,

    /// Shape id -> NodeIndex mapping for fast lookup
    pub shape_index: HashMap<ShapeId, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            shape_index: HashMap::new(),
        }
    }

    /// Get or create the node for a shape id
    fn ensure_node(&mut self, id: &ShapeId) -> NodeIndex {
        if let Some(&idx) = self.shape_index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.shape_index.insert(id.clone(), idx);
        idx
    }

    /// Add an edge between two shapes
    fn link(&mut self, from: &ShapeId, to: &ShapeId, kind: EdgeKind) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        self.graph.add_edge(from_idx, to_idx, kind);
    }

    /// Find node by shape id
    pub fn find_node(&self, id: &ShapeId) -> Option<NodeIndex> {
        self.shape_index.get(id).copied()
    }

    /// All shape ids reachable from a start shape, including the start
    pub fn reachable_from(&self, start: &ShapeId) -> BTreeSet<ShapeId> {
        let mut reached = BTreeSet::new();
        let Some(start_idx) = self.find_node(start) else {
            return reached;
        };

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([start_idx]);
        while let Some(idx) = queue.pop_front() {
            if !visited.insert(idx) {
                continue;
            }
            reached.insert(self.graph[idx].clone());
            for neighbor in self.graph.neighbors(idx) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        reached
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Primary classification bucket of a closure shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Operation,
    Error,
    Structure,
    Union,
    List,
    Map,
    Simple,
}

/// Transitive shape closure of a set of service roots, classified into
/// disjoint buckets
///
/// The `enums` bucket is an overlay: an enum-like shape is recorded there
/// in addition to its primary bucket.
#[derive(Debug, Default)]
pub struct ServiceClosure {
    /// Operations in walk order
    pub operations: Vec<ShapeId>,

    /// Error-tagged structures and unions
    pub errors: BTreeSet<ShapeId>,

    /// Structures (excluding error-tagged ones)
    pub structures: BTreeSet<ShapeId>,

    /// Unions (excluding error-tagged ones)
    pub unions: BTreeSet<ShapeId>,

    /// List shapes
    pub lists: BTreeSet<ShapeId>,

    /// Map shapes
    pub maps: BTreeSet<ShapeId>,

    /// Simple shapes
    pub simple: BTreeSet<ShapeId>,

    /// Overlay: enum kinds plus shapes carrying an enum-like tag
    pub enums: BTreeSet<ShapeId>,

    /// Shape -> set of operations that reach it (operations reach
    /// themselves)
    pub usage: BTreeMap<ShapeId, BTreeSet<ShapeId>>,

    /// Shapes in the order the walk first visited them; operations come
    /// first, then the expansion frontier
    pub visit_order: Vec<ShapeId>,
}

impl ServiceClosure {
    /// Primary bucket of a shape, if it is in the closure
    pub fn bucket_of(&self, id: &ShapeId) -> Option<Bucket> {
        if self.operations.contains(id) {
            Some(Bucket::Operation)
        } else if self.errors.contains(id) {
            Some(Bucket::Error)
        } else if self.structures.contains(id) {
            Some(Bucket::Structure)
        } else if self.unions.contains(id) {
            Some(Bucket::Union)
        } else if self.lists.contains(id) {
            Some(Bucket::List)
        } else if self.maps.contains(id) {
            Some(Bucket::Map)
        } else if self.simple.contains(id) {
            Some(Bucket::Simple)
        } else {
            None
        }
    }

    /// Structures and unions together (the structural view), errors
    /// excluded
    pub fn structural(&self) -> BTreeSet<ShapeId> {
        self.structures.union(&self.unions).cloned().collect()
    }

    /// Lists and maps together (the collection view)
    pub fn collections(&self) -> BTreeSet<ShapeId> {
        self.lists.union(&self.maps).cloned().collect()
    }

    /// Every shape in the closure, in deterministic order
    pub fn all_shapes(&self) -> BTreeSet<ShapeId> {
        let mut all: BTreeSet<ShapeId> = self.operations.iter().cloned().collect();
        for bucket in [
            &self.errors,
            &self.structures,
            &self.unions,
            &self.lists,
            &self.maps,
            &self.simple,
        ] {
            all.extend(bucket.iter().cloned());
        }
        all
    }

    /// Number of shapes across the primary buckets
    pub fn len(&self) -> usize {
        self.operations.len()
            + self.errors.len()
            + self.structures.len()
            + self.unions.len()
            + self.lists.len()
            + self.maps.len()
            + self.simple.len()
    }

    /// Check if the closure is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Walks service operations and gathers the transitive shape closure
pub struct ClosureCollector<'g> {
    graph: &'g ShapeGraph,
}

impl<'g> ClosureCollector<'g> {
    pub fn new(graph: &'g ShapeGraph) -> Self {
        Self { graph }
    }

    /// Collect the closure of every service root in the graph
    ///
    /// The walk is idempotent on shared sub-graphs and safe on cycles:
    /// each shape is expanded at most once, and classification depends
    /// only on the shape's kind, not on the path that reached it.
    pub fn collect(&self) -> Result<(ServiceClosure, DependencyGraph)> {
        let mut closure = ServiceClosure::default();
        let mut dep = DependencyGraph::new();
        let mut visited: HashSet<ShapeId> = HashSet::new();
        let mut queue: VecDeque<ShapeId> = VecDeque::new();

        // Phase 1: seed the walk from every service root's operations
        for service in self.graph.services() {
            if service.operations.is_empty() {
                return Err(CompileError::empty_service(&service.id));
            }
            for op_id in &service.operations {
                let op = self.graph.expect(op_id)?;
                if op.kind != ShapeKind::Operation {
                    return Err(CompileError::unexpected_kind(op_id, op.kind, "closure"));
                }
                if !visited.insert(op_id.clone()) {
                    continue;
                }
                closure.operations.push(op_id.clone());
                closure.visit_order.push(op_id.clone());

                let info = op.operation.clone().unwrap_or_default();
                let input = info.input.unwrap_or_else(prelude::unit);
                let output = info.output.unwrap_or_else(prelude::unit);
                dep.link(op_id, &input, EdgeKind::Input);
                dep.link(op_id, &output, EdgeKind::Output);
                queue.push_back(input);
                queue.push_back(output);
                for err_id in info.errors {
                    dep.link(op_id, &err_id, EdgeKind::Error);
                    queue.push_back(err_id);
                }
            }
        }

        // Phase 2: expand the frontier until the closure is complete
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id.clone()) {
                continue;
            }

            closure.visit_order.push(id.clone());

            let shape = match self.graph.get(&id) {
                Some(shape) => shape,
                // The no-payload unit may be substituted without being
                // declared in the graph
                None if id == prelude::unit() => {
                    closure.structures.insert(id);
                    continue;
                }
                None => return Err(schema_model::ModelError::unknown(&id).into()),
            };

            self.classify(shape, &mut closure);

            match shape.kind {
                ShapeKind::Structure | ShapeKind::Union => {
                    for member in &shape.members {
                        self.graph.expect_target(shape, member)?;
                        dep.link(&id, &member.target, EdgeKind::Member);
                        queue.push_back(member.target.clone());
                    }
                }
                ShapeKind::List => {
                    let member = shape.list_member().ok_or_else(|| {
                        CompileError::Other(format!("list shape {id} has no element member"))
                    })?;
                    self.graph.expect_target(shape, member)?;
                    dep.link(&id, &member.target, EdgeKind::ListMember);
                    queue.push_back(member.target.clone());
                }
                ShapeKind::Map => {
                    let key = shape.map_key().ok_or_else(|| {
                        CompileError::Other(format!("map shape {id} has no key member"))
                    })?;
                    let value = shape.map_value().ok_or_else(|| {
                        CompileError::Other(format!("map shape {id} has no value member"))
                    })?;
                    self.graph.expect_target(shape, key)?;
                    self.graph.expect_target(shape, value)?;
                    dep.link(&id, &key.target, EdgeKind::MapKey);
                    dep.link(&id, &value.target, EdgeKind::MapValue);
                    queue.push_back(key.target.clone());
                    queue.push_back(value.target.clone());
                }
                ShapeKind::Service | ShapeKind::Operation => {
                    return Err(CompileError::unexpected_kind(&id, shape.kind, "closure"));
                }
                _ => {}
            }
        }

        // Phase 3: per-operation reachability feeds the usage sets
        for op_id in &closure.operations {
            for reached in dep.reachable_from(op_id) {
                closure
                    .usage
                    .entry(reached)
                    .or_default()
                    .insert(op_id.clone());
            }
        }

        log::info!(
            "Collected closure: {} operations, {} shapes, {} edges",
            closure.operations.len(),
            closure.len(),
            dep.edge_count()
        );

        Ok((closure, dep))
    }

    /// Classify a non-operation shape by its kind alone
    fn classify(&self, shape: &Shape, closure: &mut ServiceClosure) {
        if shape.is_enum_like() {
            closure.enums.insert(shape.id.clone());
        }

        match shape.kind {
            ShapeKind::Structure | ShapeKind::Union if shape.is_error() => {
                closure.errors.insert(shape.id.clone());
            }
            ShapeKind::Structure => {
                closure.structures.insert(shape.id.clone());
            }
            ShapeKind::Union => {
                closure.unions.insert(shape.id.clone());
            }
            ShapeKind::List => {
                closure.lists.insert(shape.id.clone());
            }
            ShapeKind::Map => {
                closure.maps.insert(shape.id.clone());
            }
            kind if kind.is_simple() => {
                closure.simple.insert(shape.id.clone());
            }
            // Operations and services never reach classify
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_model::{tags, Service, Shape};

    fn id(text: &str) -> ShapeId {
        ShapeId::parse(text).unwrap()
    }

    /// One service, one operation, a struct input referencing a list of
    /// strings
    fn sample_graph() -> ShapeGraph {
        let mut graph = ShapeGraph::with_prelude();
        graph.add_shape(Shape::list(id("ns#Names"), prelude::string()));
        graph.add_shape(
            Shape::structure(id("ns#GetThingInput"))
                .member("names", id("ns#Names"))
                .member("count", prelude::integer()),
        );
        graph.add_shape(
            Shape::structure(id("ns#NotFound")).annotation(tags::ERROR),
        );
        graph.add_shape(
            Shape::operation(id("ns#GetThing"))
                .input(id("ns#GetThingInput"))
                .error(id("ns#NotFound")),
        );
        graph.add_service(Service::new(id("ns#Things"), vec![id("ns#GetThing")]));
        graph
    }

    #[test]
    fn test_buckets_are_disjoint_and_total() {
        let graph = sample_graph();
        let (closure, _) = ClosureCollector::new(&graph).collect().unwrap();

        assert_eq!(closure.operations, vec![id("ns#GetThing")]);
        assert!(closure.structures.contains(&id("ns#GetThingInput")));
        assert!(closure.errors.contains(&id("ns#NotFound")));
        assert!(!closure.structures.contains(&id("ns#NotFound")));
        assert!(closure.lists.contains(&id("ns#Names")));
        assert!(closure.simple.contains(&prelude::string()));
        assert!(closure.simple.contains(&prelude::integer()));

        // every closure shape has exactly one primary bucket
        for shape in closure.all_shapes() {
            assert!(closure.bucket_of(&shape).is_some(), "unclassified: {shape}");
        }
        // output defaulted to unit
        assert!(closure.structures.contains(&prelude::unit()));
    }

    #[test]
    fn test_usage_sets_record_reaching_operations() {
        let graph = sample_graph();
        let (closure, _) = ClosureCollector::new(&graph).collect().unwrap();

        let op = id("ns#GetThing");
        assert_eq!(closure.usage[&op], BTreeSet::from([op.clone()]));
        assert_eq!(closure.usage[&id("ns#Names")], BTreeSet::from([op.clone()]));
        assert_eq!(closure.usage[&prelude::string()], BTreeSet::from([op]));
    }

    #[test]
    fn test_cycle_is_expanded_once() {
        let mut graph = ShapeGraph::with_prelude();
        graph.add_shape(Shape::structure(id("ns#Tree")).member("next", id("ns#Tree")));
        graph.add_shape(Shape::operation(id("ns#GetTree")).output(id("ns#Tree")));
        graph.add_service(Service::new(id("ns#Svc"), vec![id("ns#GetTree")]));

        let (closure, dep) = ClosureCollector::new(&graph).collect().unwrap();
        assert!(closure.structures.contains(&id("ns#Tree")));
        // self edge present, node created once
        assert_eq!(dep.find_node(&id("ns#Tree")).iter().count(), 1);
        assert_eq!(closure.usage[&id("ns#Tree")].len(), 1);
    }

    #[test]
    fn test_shared_subgraph_is_idempotent() {
        let mut graph = ShapeGraph::with_prelude();
        graph.add_shape(Shape::structure(id("ns#Shared")).member("s", prelude::string()));
        graph.add_shape(Shape::operation(id("ns#A")).input(id("ns#Shared")));
        graph.add_shape(Shape::operation(id("ns#B")).input(id("ns#Shared")));
        graph.add_service(Service::new(id("ns#Svc"), vec![id("ns#A"), id("ns#B")]));

        let (closure, _) = ClosureCollector::new(&graph).collect().unwrap();
        assert_eq!(
            closure.usage[&id("ns#Shared")],
            BTreeSet::from([id("ns#A"), id("ns#B")])
        );
    }

    #[test]
    fn test_empty_service_fails_fast() {
        let mut graph = ShapeGraph::with_prelude();
        graph.add_service(Service::new(id("ns#Svc"), vec![]));
        let err = ClosureCollector::new(&graph).collect().unwrap_err();
        assert!(matches!(err, CompileError::EmptyService(_)));
    }

    #[test]
    fn test_dangling_member_fails_fast() {
        let mut graph = ShapeGraph::with_prelude();
        graph.add_shape(Shape::structure(id("ns#Broken")).member("gone", id("ns#Missing")));
        graph.add_shape(Shape::operation(id("ns#Op")).input(id("ns#Broken")));
        graph.add_service(Service::new(id("ns#Svc"), vec![id("ns#Op")]));

        let err = ClosureCollector::new(&graph).collect().unwrap_err();
        assert!(err.to_string().contains("ns#Missing"));
    }

    #[test]
    fn test_enum_overlay_bucket() {
        let mut graph = ShapeGraph::with_prelude();
        graph.add_shape(Shape::simple(id("ns#Color"), ShapeKind::Enum));
        graph.add_shape(
            Shape::simple(id("ns#Legacy"), ShapeKind::String).annotation(tags::ENUM),
        );
        graph.add_shape(
            Shape::structure(id("ns#In"))
                .member("color", id("ns#Color"))
                .member("legacy", id("ns#Legacy")),
        );
        graph.add_shape(Shape::operation(id("ns#Op")).input(id("ns#In")));
        graph.add_service(Service::new(id("ns#Svc"), vec![id("ns#Op")]));

        let (closure, _) = ClosureCollector::new(&graph).collect().unwrap();
        // both are simple shapes, both are overlaid into enums
        assert!(closure.simple.contains(&id("ns#Color")));
        assert!(closure.simple.contains(&id("ns#Legacy")));
        assert!(closure.enums.contains(&id("ns#Color")));
        assert!(closure.enums.contains(&id("ns#Legacy")));
    }
}
