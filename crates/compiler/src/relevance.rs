use schema_model::{ShapeGraph, ShapeId, TagMap, TagRegistry};
use std::collections::HashMap;

/// Decides whether any runtime-relevant tag is attached to a shape or
/// reachable through its members
///
/// A shape is relevant if it directly carries a relevant tag, any of its
/// members carries one, or a member's target shape is itself relevant.
/// Results are memoized per compilation. Before recursing, the cache
/// entry for the shape is primed to `false`, so a cycle resolves to
/// "false unless an independent relevant tag is found on the cycle"
/// rather than recursing forever. Exceeding the depth bound is the
/// conservative "not relevant" for the remaining subtree only.
pub struct TraitRelevanceFilter<'a> {
    graph: &'a ShapeGraph,
    registry: &'a TagRegistry,
    depth_limit: usize,
    cache: HashMap<ShapeId, bool>,
}

impl<'a> TraitRelevanceFilter<'a> {
    pub fn new(graph: &'a ShapeGraph, registry: &'a TagRegistry, depth_limit: usize) -> Self {
        Self {
            graph,
            registry,
            depth_limit,
            cache: HashMap::new(),
        }
    }

    /// Check whether a shape carries or reaches any relevant tag
    pub fn has_relevant_tags(&mut self, id: &ShapeId) -> bool {
        self.check(id, 0)
    }

    fn check(&mut self, id: &ShapeId, depth: usize) -> bool {
        if let Some(&cached) = self.cache.get(id) {
            return cached;
        }
        if depth >= self.depth_limit {
            log::debug!("trait relevance depth exhausted at {id}");
            return false;
        }

        // prime before recursing so cycles terminate on the cached false
        self.cache.insert(id.clone(), false);

        let Some(shape) = self.graph.get(id) else {
            return false;
        };

        let mut relevant = self.any_relevant(&shape.tags);
        if !relevant {
            for member in &shape.members {
                if self.any_relevant(&member.tags) || self.check(&member.target, depth + 1) {
                    relevant = true;
                    break;
                }
            }
        }

        if relevant {
            self.cache.insert(id.clone(), true);
        }
        relevant
    }

    fn any_relevant(&self, tags: &TagMap) -> bool {
        tags.keys().any(|tag| self.registry.is_relevant(tag))
    }
}
