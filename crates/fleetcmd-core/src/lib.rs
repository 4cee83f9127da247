//! fleetcmd-core: shared types for fleet command dispatch.
//!
//! Everything here is plain data: the immutable values built once at
//! startup (`Session`, `Job`, `Target`, `TagFilter`, `DispatchSettings`)
//! and the values that flow between discovery, batching, and dispatch
//! (`InstanceId`, `Batch`, `InvocationStatus`).

pub mod config;
pub mod error;
pub mod job;
pub mod tags;
pub mod types;

pub use config::{DispatchSettings, FleetConfig};
pub use error::{ConfigError, ConfigResult};
pub use job::{Job, Target};
pub use tags::TagFilter;
pub use types::*;
