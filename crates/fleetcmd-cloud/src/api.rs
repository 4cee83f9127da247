//! The command API seam.
//!
//! [`CommandApi`] is object-safe so the dispatch core can hold an
//! `Arc<dyn CommandApi>` shared by every worker, and tests can inject an
//! in-memory fake instead of [`crate::EcsClient`].

use std::future::Future;
use std::pin::Pin;

use fleetcmd_core::{InstanceId, InvocationStatus, TagFilter};

use crate::error::ApiError;

/// Boxed future returned by the remote API seams.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Instance status filter used for discovery.
pub const INSTANCE_STATUS_RUNNING: &str = "Running";
/// Command type for Linux shell scripts.
pub const COMMAND_TYPE_SHELL: &str = "RunShellScript";
/// Execute once, immediately.
pub const REPEAT_MODE_ONCE: &str = "Once";
/// Command content is sent verbatim.
pub const CONTENT_ENCODING_PLAIN: &str = "PlainText";

/// One page of the instance listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeInstancesRequest {
    pub region: String,
    pub status: String,
    /// One-based page number.
    pub page_number: u32,
    pub page_size: u32,
    /// `None` sends no tag constraint at all.
    pub tags: Option<TagFilter>,
}

/// Submission of a script to a list of instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCommandRequest {
    pub region: String,
    pub instance_ids: Vec<InstanceId>,
    pub command_type: &'static str,
    pub content: String,
    pub timeout_secs: u64,
    pub repeat_mode: &'static str,
    /// Keep the command definition after it has run.
    pub keep_command: bool,
    pub content_encoding: &'static str,
}

impl RunCommandRequest {
    /// A run-once, plain-text shell script submission that is not retained.
    pub fn shell_script(
        region: &str,
        instance_ids: Vec<InstanceId>,
        content: &str,
        timeout_secs: u64,
    ) -> Self {
        Self {
            region: region.to_string(),
            instance_ids,
            command_type: COMMAND_TYPE_SHELL,
            content: content.to_string(),
            timeout_secs,
            repeat_mode: REPEAT_MODE_ONCE,
            keep_command: false,
            content_encoding: CONTENT_ENCODING_PLAIN,
        }
    }
}

/// Query of the per-instance result records of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResultsRequest {
    pub region: String,
    pub invoke_id: String,
    /// Records returned per call.
    pub page_size: u32,
}

/// Execution record of an invocation on one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRecord {
    pub instance_id: InstanceId,
    pub status: InvocationStatus,
    pub exit_code: Option<i64>,
    pub error_code: Option<String>,
}

impl InvocationRecord {
    pub fn new(instance_id: impl Into<InstanceId>, status: InvocationStatus) -> Self {
        Self {
            instance_id: instance_id.into(),
            status,
            exit_code: None,
            error_code: None,
        }
    }
}

/// Remote command-invocation API.
pub trait CommandApi: Send + Sync {
    /// Fetch one page of instance ids matching the request filter.
    fn describe_instances<'a>(
        &'a self,
        request: &'a DescribeInstancesRequest,
    ) -> ApiFuture<'a, Vec<InstanceId>>;

    /// Submit a command invocation and return its invoke id.
    fn run_command<'a>(&'a self, request: &'a RunCommandRequest) -> ApiFuture<'a, String>;

    /// Fetch the result records of an invocation. An empty list means the
    /// invocation is not visible yet.
    fn describe_invocation_results<'a>(
        &'a self,
        request: &'a InvocationResultsRequest,
    ) -> ApiFuture<'a, Vec<InvocationRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_script_request_uses_fixed_execution_parameters() {
        let req = RunCommandRequest::shell_script(
            "cn-hangzhou",
            vec![InstanceId::from("i-1"), InstanceId::from("i-2")],
            "echo hi",
            600,
        );
        assert_eq!(req.command_type, "RunShellScript");
        assert_eq!(req.repeat_mode, "Once");
        assert_eq!(req.content_encoding, "PlainText");
        assert!(!req.keep_command);
        assert_eq!(req.timeout_secs, 600);
        assert_eq!(req.instance_ids.len(), 2);
    }
}
