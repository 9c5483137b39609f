//! # Schema Compiler
//!
//! Compiles typed shape graphs into compact, deterministic, runtime-loadable
//! descriptors, partitioned into bounded-size groups for lazy loading.
//!
//! ## Architecture
//!
//! ```text
//! ShapeGraph + service roots
//!     │
//!     ├──> Closure Collector
//!     │      ├─ walk operations, inputs, outputs, errors
//!     │      ├─ classify shapes into disjoint buckets
//!     │      └─ build dependency graph + operation-usage sets
//!     │
//!     ├──> Descriptor Emitter
//!     │      ├─ reference classification (out-of-line vs inline numeric)
//!     │      ├─ trait relevance (memoized, depth-bounded)
//!     │      ├─ trait encoding (bit-vector or key/value map)
//!     │      ├─ identifier assignment (two-pass, deconflicted)
//!     │      └─ sentinel composition, elision, lazy references
//!     │
//!     └──> Group Partitioner
//!            ├─ usage-set groups bounded by the operation cap
//!            └─ common-phrase group naming
//! ```
//!
//! Compilation is pure, synchronous computation over a borrowed, immutable
//! graph; all memoization lives in per-compilation state, so concurrent
//! compilations of distinct graphs share nothing mutable.
//!
//! ## Example
//!
//! ```rust
//! use schema_compiler::Compiler;
//! use schema_model::{prelude, Service, Shape, ShapeGraph, ShapeId};
//!
//! let mut graph = ShapeGraph::with_prelude();
//! let input = ShapeId::new("example", "GetForecastInput");
//! let op = ShapeId::new("example", "GetForecast");
//! graph.add_shape(Shape::structure(input.clone()).member("city", prelude::string()));
//! graph.add_shape(Shape::operation(op.clone()).input(input));
//! graph.add_service(Service::new(ShapeId::new("example", "Weather"), vec![op]));
//!
//! let compilation = Compiler::with_defaults().compile(&graph).unwrap();
//! assert_eq!(compilation.descriptors.len(), 2);
//! ```

mod closure;
mod config;
mod context;
mod emitter;
mod error;
mod group;
mod intern;
mod reference;
mod relevance;
pub mod sentinel;
mod traits;

pub use closure::{Bucket, ClosureCollector, DependencyGraph, EdgeKind, ServiceClosure};
pub use config::CompilerConfig;
pub use context::{Compilation, Compiler};
pub use emitter::{kind_tag, Descriptor, DescriptorEmitter, EmitOutput, MemberDescriptor, SchemaRef};
pub use error::{CompileError, Result};
pub use group::{Group, GroupAssignment, GroupPartitioner, BASE_GROUP_NAME};
pub use intern::{StringInterner, StringRef};
pub use reference::ReferenceClassifier;
pub use relevance::TraitRelevanceFilter;
pub use traits::{EncodedTagValue, TraitEncoder, TraitEncoding};
