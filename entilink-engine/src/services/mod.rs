//! Resolution services
//!
//! Leaves first: the normalizer and scorer are pure; the resolvers and
//! linker talk to storage; the type cache sits between them and the
//! reference tables.

pub mod batch;
pub mod linker;
pub mod normalizer;
pub mod resolver;
pub mod similarity;
pub mod type_cache;

pub use batch::BatchResolver;
pub use linker::{RelationLinker, RelationPair};
pub use normalizer::{normalize, slugify, Locale};
pub use resolver::{MatchResolver, ResolveOptions};
pub use similarity::{NoopScorer, SimilarityScorer, StrsimScorer};
pub use type_cache::{EntityTypeCache, TtlCache};
