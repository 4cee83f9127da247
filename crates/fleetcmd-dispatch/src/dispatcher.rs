//! Command dispatcher: one invocation per batch, polled to completion.
//!
//! ```text
//! RunCommand ──► settle delay ──► DescribeInvocationResults ─┐
//!                                   ▲                        │
//!                                   └── poll interval ◄──────┤ no records / in progress
//!                                                            └─► terminal → InvocationOutcome
//! ```
//!
//! A poll *request* error ends the dispatch immediately. A terminal
//! *status*, including `Failed`, is an outcome and not an error.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use fleetcmd_cloud::{CommandApi, InvocationRecord, InvocationResultsRequest, RunCommandRequest};
use fleetcmd_core::{Batch, DispatchSettings, InstanceId, InvocationStatus};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::DispatchError;

/// Terminal classification of a batch's invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStatus {
    Finished,
    Stopped,
    PartialFailed,
    Failed,
    /// A status value this build does not recognise.
    Unrecognized(String),
}

impl TerminalStatus {
    /// `None` for statuses that keep the batch polling.
    pub fn from_status(status: &InvocationStatus) -> Option<Self> {
        match status {
            InvocationStatus::Pending | InvocationStatus::Running | InvocationStatus::Stopping => {
                None
            }
            InvocationStatus::Finished => Some(Self::Finished),
            InvocationStatus::Stopped => Some(Self::Stopped),
            InvocationStatus::PartialFailed => Some(Self::PartialFailed),
            InvocationStatus::Failed => Some(Self::Failed),
            InvocationStatus::Other(s) => Some(Self::Unrecognized(s.clone())),
        }
    }

    // Worst-case-wins ordering used to fold per-instance records.
    fn severity(&self) -> u8 {
        match self {
            Self::Finished => 0,
            Self::Stopped => 1,
            Self::Unrecognized(_) => 2,
            Self::PartialFailed => 3,
            Self::Failed => 4,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Self::Finished
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Finished => "Finished",
            Self::Stopped => "Stopped",
            Self::PartialFailed => "PartialFailed",
            Self::Failed => "Failed",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a batch whose invocation reached a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutcome {
    pub invoke_id: String,
    pub status: TerminalStatus,
    /// Instances whose record ended in anything other than `Finished`.
    pub failed_instances: Vec<InstanceId>,
    /// Result queries issued, including the one that observed the
    /// terminal status.
    pub polls: u32,
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// What one poll observed.
#[derive(Debug, PartialEq, Eq)]
enum PollState {
    /// No records yet; the invocation is not visible.
    NotVisible,
    /// `missing` counts batch instances with no record yet.
    InProgress {
        pending: usize,
        stopping: usize,
        missing: usize,
    },
    Terminal {
        status: TerminalStatus,
        failed_instances: Vec<InstanceId>,
    },
}

/// Fold the per-instance records of one invocation against the batch it
/// was submitted to.
///
/// Any record still in flight, or any batch instance without a record,
/// keeps the batch polling. Once every instance has a terminal record,
/// the most severe status wins.
fn classify(records: &[InvocationRecord], instance_ids: &[InstanceId]) -> PollState {
    if records.is_empty() {
        return PollState::NotVisible;
    }

    let reported: HashSet<&InstanceId> = records.iter().map(|r| &r.instance_id).collect();
    let missing = instance_ids
        .iter()
        .filter(|id| !reported.contains(id))
        .count();

    let mut pending = 0;
    let mut stopping = 0;
    let mut worst: Option<TerminalStatus> = None;
    let mut failed_instances = Vec::new();

    for record in records {
        match TerminalStatus::from_status(&record.status) {
            None => {
                pending += 1;
                if record.status == InvocationStatus::Stopping {
                    stopping += 1;
                }
            }
            Some(status) => {
                if !status.is_success() {
                    failed_instances.push(record.instance_id.clone());
                }
                if worst.as_ref().is_none_or(|w| status.severity() > w.severity()) {
                    worst = Some(status);
                }
            }
        }
    }

    match worst {
        Some(status) if pending == 0 && missing == 0 => PollState::Terminal {
            status,
            failed_instances,
        },
        _ => PollState::InProgress {
            pending,
            stopping,
            missing,
        },
    }
}

/// Submits a script to one batch at a time and polls the invocation.
///
/// Cheap to clone; every field is shared read-only across workers.
#[derive(Clone)]
pub struct Dispatcher {
    api: Arc<dyn CommandApi>,
    region: Arc<str>,
    script: Arc<str>,
    settings: Arc<DispatchSettings>,
}

impl Dispatcher {
    pub fn new(
        api: Arc<dyn CommandApi>,
        region: &str,
        script: &str,
        settings: Arc<DispatchSettings>,
    ) -> Self {
        Self {
            api,
            region: Arc::from(region),
            script: Arc::from(script),
            settings,
        }
    }

    /// Run the script on `batch` and wait for a terminal status.
    pub async fn dispatch(&self, batch: &Batch) -> Result<InvocationOutcome, DispatchError> {
        let request = RunCommandRequest::shell_script(
            &self.region,
            batch.instance_ids.clone(),
            &self.script,
            self.settings.command_timeout_secs,
        );
        let submitted_at = Instant::now();
        let invoke_id = self
            .api
            .run_command(&request)
            .await
            .map_err(DispatchError::Submit)?;

        info!(
            batch = batch.index,
            instances = batch.len(),
            %invoke_id,
            "command submitted"
        );

        tokio::time::sleep(self.settings.settle_delay()).await;
        self.poll(batch, invoke_id, submitted_at).await
    }

    async fn poll(
        &self,
        batch: &Batch,
        invoke_id: String,
        submitted_at: Instant,
    ) -> Result<InvocationOutcome, DispatchError> {
        let query = InvocationResultsRequest {
            region: self.region.to_string(),
            invoke_id: invoke_id.clone(),
            page_size: u32::try_from(batch.len()).unwrap_or(u32::MAX).max(1),
        };
        let mut polls = 0u32;

        loop {
            polls += 1;
            let records = self
                .api
                .describe_invocation_results(&query)
                .await
                .map_err(|source| DispatchError::Poll {
                    invoke_id: invoke_id.clone(),
                    source,
                })?;

            match classify(&records, &batch.instance_ids) {
                PollState::NotVisible => {
                    debug!(batch = batch.index, %invoke_id, polls, "invocation not visible yet");
                }
                PollState::InProgress {
                    pending,
                    stopping,
                    missing,
                } => {
                    if stopping > 0 {
                        info!(batch = batch.index, %invoke_id, stopping, "invocation stopping");
                    }
                    debug!(
                        batch = batch.index,
                        %invoke_id,
                        pending,
                        missing,
                        polls,
                        "invocation in progress"
                    );
                }
                PollState::Terminal {
                    status,
                    failed_instances,
                } => {
                    log_terminal(batch, &invoke_id, &status, &failed_instances);
                    return Ok(InvocationOutcome {
                        invoke_id,
                        status,
                        failed_instances,
                        polls,
                    });
                }
            }

            if let Some(deadline) = self.settings.poll_deadline() {
                let elapsed = submitted_at.elapsed();
                if elapsed >= deadline {
                    return Err(DispatchError::Deadline { invoke_id, elapsed });
                }
            }

            tokio::time::sleep(self.settings.poll_interval()).await;
        }
    }
}

fn log_terminal(
    batch: &Batch,
    invoke_id: &str,
    status: &TerminalStatus,
    failed_instances: &[InstanceId],
) {
    let failed = failed_instances.len();
    match status {
        TerminalStatus::Finished => {
            info!(batch = batch.index, %invoke_id, "invocation finished");
        }
        TerminalStatus::Failed => {
            warn!(batch = batch.index, %invoke_id, failed, "invocation failed");
        }
        TerminalStatus::PartialFailed => {
            warn!(batch = batch.index, %invoke_id, failed, "invocation partially failed");
        }
        TerminalStatus::Stopped => {
            warn!(batch = batch.index, %invoke_id, failed, "invocation stopped");
        }
        TerminalStatus::Unrecognized(raw) => {
            warn!(batch = batch.index, %invoke_id, status = %raw, "invocation ended with unrecognized status");
        }
    }
}
