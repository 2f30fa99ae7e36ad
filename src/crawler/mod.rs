//! Crawl orchestration
//!
//! This module contains the breadth-first, depth-bounded crawl loop,
//! including:
//! - Frontier management and enqueue-time deduplication
//! - Bounded-concurrency scheduling of fetch-and-sanitize tasks
//! - Conditional revalidation against the previous crawl's snapshot
//! - Aggregate and incremental (streamed) result emission

mod resolver;

pub use resolver::{
    NodeStream, Resolved, Resolver, ResolverConfig, DEFAULT_CONCURRENCY, DEFAULT_MAX_DEPTH,
};
