//! Batching, cache-coalescing data loader for GraphQL resolvers.
//!
//! Field resolvers ask a [DataLoader] for one key at a time. Keys requested
//! during the same scheduler tick reach the [Loader] as a single batch, and
//! repeated keys share one [LoadFuture].

mod data_loader;

pub use data_loader::*;
