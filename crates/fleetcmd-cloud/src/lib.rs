//! fleetcmd-cloud: the remote collaborators of a fleet command run.
//!
//! The dispatch core only sees two seams:
//!
//! - **`CommandApi`**: instance listing, command submission, and
//!   invocation result queries
//! - **`RoleCredentialSource`**: temporary credentials by RAM role name
//!
//! This crate defines both seams and ships their production
//! implementations for Alibaba Cloud ECS.
//!
//! # Architecture
//!
//! ```text
//! resolve_session()
//!   ├── RoleCredentialSource (MetadataClient → 100.100.100.200)
//!   └── CredentialInputs (environment / flags)
//!         ↓ Session
//! EcsClient: CommandApi
//!   └── signer::sign() → ACS3-HMAC-SHA256 Authorization header
//! ```

pub mod api;
pub mod credentials;
pub mod ecs;
pub mod error;
pub mod metadata;
pub mod signer;

pub use api::{
    ApiFuture, CommandApi, DescribeInstancesRequest, InvocationRecord, InvocationResultsRequest,
    RunCommandRequest,
};
pub use credentials::{CredentialInputs, RoleCredentialSource, RoleCredentials, resolve_session};
pub use ecs::EcsClient;
pub use error::{ApiError, ApiResult, CredentialError};
pub use metadata::MetadataClient;
