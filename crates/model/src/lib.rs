//! # Schema Model
//!
//! The input side of the schema-descriptor compiler: typed shape graphs.
//!
//! A shape graph is an immutable, id-indexed arena of typed nodes
//! (structures, unions, lists, maps, enums, primitives, operations)
//! annotated with metadata tags, plus the service roots whose operation
//! closures get compiled. Shapes reference each other by id, never by
//! owned value, so recursive and mutually recursive types are ordinary
//! graphs rather than a special case.
//!
//! ## Architecture
//!
//! ```text
//! ShapeGraph
//!     ├── shapes: id -> Shape { kind, members, tags, operation }
//!     │       └── Member { name, target id, tags }
//!     ├── services: Service { id, operations }
//!     └── prelude: core#String, core#Integer, ..., core#Unit
//!
//! TagRegistry
//!     ├── relevant: tags that affect runtime (de)serialization
//!     └── compressible: ordered bit-vector-eligible subset
//! ```

mod error;
mod graph;
pub mod tags;
mod types;

pub use error::{ModelError, Result};
pub use graph::{prelude, Member, OperationInfo, Service, Shape, ShapeGraph, LIST_MEMBER, MAP_KEY, MAP_VALUE};
pub use tags::{TagId, TagMap, TagRegistry, TagValue, MAX_COMPRESSIBLE};
pub use types::{ShapeId, ShapeKind, TimestampFormat};
