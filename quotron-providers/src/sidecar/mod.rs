//! Process lifecycle for the local Python sidecars (spec.md §4.2, component C2).

mod supervisor;

pub use supervisor::{SidecarSupervisor, SidecarSupervisorConfig};
