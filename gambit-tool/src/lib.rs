#![deny(missing_docs)]
//! # gambit-tool — tool registry, decorator pipeline, retrieval helpers
//!
//! Tools reach the model wrapped in a deterministic decorator pipeline that
//! adds process binding, failure suppression, output transformation, event
//! publication, observability, and group metadata — in that wrapping order,
//! outermost first. The pipeline is the axum-`from_fn` pattern: each
//! middleware receives a [`Next`] it can call to continue the chain.
//!
//! Control-flow signals ([`gambit_types::ToolError::Signal`]) pass through
//! every layer untouched; everything else a tool throws is converted to a
//! result the model can see.

pub mod builtin;
pub mod decorators;
pub mod middleware;
pub mod rag;
pub mod registry;
pub mod scheduler;

pub use builtin::{RequestReplanTool, WaitForUserInputTool};
pub use decorators::{DecorationConfig, OutputTransformer, TruncatingTransformer, decorate_tool};
pub use middleware::{DecoratedTool, Next, ToolMiddleware, tool_middleware_fn};
pub use rag::{
    MetadataFilter, PostFilteringSearch, ScoredDocument, SearchRequest, TopKInflation, VectorStore,
};
pub use registry::ToolRegistry;
pub use scheduler::{FixedDelay, NoDelay, OperationScheduler};
