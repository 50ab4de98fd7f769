//! Failover router: composes the provider clients in `quotron-providers`,
//! wrapped by the middleware stack in `quotron-middleware`, into the two
//! chains spec.md §4.1 defines.

#![warn(missing_docs)]

mod builder;
mod router;

pub use builder::{build_chains, Chains};
pub use router::FailoverChain;
