//! Dispatch and run error types.

use std::time::Duration;

use fleetcmd_cloud::ApiError;
use thiserror::Error;

/// A single batch could not be driven to a terminal status.
///
/// Contained at the worker boundary: it is logged and recorded in the
/// run report, never propagated out of the run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("command submission failed: {0}")]
    Submit(#[source] ApiError),

    #[error("polling invocation {invoke_id} failed: {source}")]
    Poll {
        invoke_id: String,
        #[source]
        source: ApiError,
    },

    #[error("invocation {invoke_id} still in progress after {elapsed:?}")]
    Deadline { invoke_id: String, elapsed: Duration },

    #[error("batch worker aborted: {0}")]
    Worker(String),
}

/// The run as a whole failed before any batch was dispatched.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("instance discovery failed: {0}")]
    Discovery(#[source] ApiError),

    #[error("no running instances in {region} match tags [{tags}]")]
    NoInstances { region: String, tags: String },
}
