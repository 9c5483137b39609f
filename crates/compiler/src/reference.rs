use schema_model::{ShapeGraph, ShapeId, ShapeKind};
use std::collections::HashMap;

/// Decides whether a shape needs an out-of-line, lazily-resolved
/// descriptor or can be described purely by an inline numeric code
///
/// Structures, unions, operations, and containers of reference shapes are
/// reference shapes; primitives and containers of primitives are not.
/// Classification is a pure function of shape kinds; results are memoized
/// per compilation. Exceeding the recursion bound yields the conservative
/// answer (needs reference), which matters for container self-cycles like
/// `list Chain { member: Chain }`.
pub struct ReferenceClassifier<'g> {
    graph: &'g ShapeGraph,
    depth_limit: usize,
    cache: HashMap<ShapeId, bool>,
}

impl<'g> ReferenceClassifier<'g> {
    pub fn new(graph: &'g ShapeGraph, depth_limit: usize) -> Self {
        Self {
            graph,
            depth_limit,
            cache: HashMap::new(),
        }
    }

    /// Check whether a shape is a reference shape
    pub fn is_reference(&mut self, id: &ShapeId) -> bool {
        self.check(id, 0).0
    }

    /// Returns (is_reference, hit_depth_limit); depth-clamped results are
    /// not cached so they cannot leak into shallower queries
    fn check(&mut self, id: &ShapeId, depth: usize) -> (bool, bool) {
        if let Some(&cached) = self.cache.get(id) {
            return (cached, false);
        }
        if depth >= self.depth_limit {
            log::debug!("reference classification depth exhausted at {id}");
            return (true, true);
        }

        let Some(shape) = self.graph.get(id) else {
            // missing shapes are a contract violation reported by the
            // closure walk; classify conservatively here
            return (true, false);
        };

        let (value, clamped) = match shape.kind {
            ShapeKind::Structure
            | ShapeKind::Union
            | ShapeKind::Operation
            | ShapeKind::Service => (true, false),
            ShapeKind::List => match shape.list_member() {
                Some(member) => self.check(&member.target, depth + 1),
                None => (true, false),
            },
            ShapeKind::Map => match shape.map_value() {
                Some(member) => self.check(&member.target, depth + 1),
                None => (true, false),
            },
            kind if kind.is_simple() => (false, false),
            _ => (true, false),
        };

        if !clamped {
            self.cache.insert(id.clone(), value);
        }
        (value, clamped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_model::{prelude, Shape};

    fn id(text: &str) -> ShapeId {
        ShapeId::parse(text).unwrap()
    }

    #[test]
    fn test_simple_shapes_are_not_references() {
        let graph = ShapeGraph::with_prelude();
        let mut classifier = ReferenceClassifier::new(&graph, 10);

        assert!(!classifier.is_reference(&prelude::string()));
        assert!(!classifier.is_reference(&prelude::boolean()));
        assert!(!classifier.is_reference(&prelude::timestamp()));
    }

    #[test]
    fn test_aggregates_are_references() {
        let mut graph = ShapeGraph::with_prelude();
        graph.add_shape(Shape::structure(id("ns#Point")));
        graph.add_shape(Shape::union(id("ns#Choice")));
        graph.add_shape(Shape::operation(id("ns#Op")));

        let mut classifier = ReferenceClassifier::new(&graph, 10);
        assert!(classifier.is_reference(&id("ns#Point")));
        assert!(classifier.is_reference(&id("ns#Choice")));
        assert!(classifier.is_reference(&id("ns#Op")));
    }

    #[test]
    fn test_containers_follow_their_element() {
        let mut graph = ShapeGraph::with_prelude();
        graph.add_shape(Shape::structure(id("ns#Point")));
        graph.add_shape(Shape::list(id("ns#Strings"), prelude::string()));
        graph.add_shape(Shape::list(id("ns#Points"), id("ns#Point")));
        graph.add_shape(Shape::map(
            id("ns#ByName"),
            prelude::string(),
            id("ns#Point"),
        ));
        graph.add_shape(Shape::map(
            id("ns#Counts"),
            prelude::string(),
            prelude::integer(),
        ));

        let mut classifier = ReferenceClassifier::new(&graph, 10);
        assert!(!classifier.is_reference(&id("ns#Strings")));
        assert!(classifier.is_reference(&id("ns#Points")));
        assert!(classifier.is_reference(&id("ns#ByName")));
        assert!(!classifier.is_reference(&id("ns#Counts")));
    }

    #[test]
    fn test_container_self_cycle_degrades_to_reference() {
        let mut graph = ShapeGraph::with_prelude();
        graph.add_shape(Shape::list(id("ns#Chain"), id("ns#Chain")));

        let mut classifier = ReferenceClassifier::new(&graph, 10);
        // terminates and answers conservatively
        assert!(classifier.is_reference(&id("ns#Chain")));
    }

    #[test]
    fn test_results_are_memoized() {
        let mut graph = ShapeGraph::with_prelude();
        graph.add_shape(Shape::list(id("ns#Strings"), prelude::string()));

        let mut classifier = ReferenceClassifier::new(&graph, 10);
        assert!(!classifier.is_reference(&id("ns#Strings")));
        assert_eq!(classifier.cache.get(&id("ns#Strings")), Some(&false));
        assert!(!classifier.is_reference(&id("ns#Strings")));
    }
}
