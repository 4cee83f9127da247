//! Orchestrator: discovery, batching, and concurrent dispatch.
//!
//! One tokio task per batch, all launched at once, joined before the run
//! returns. Workers share only read-only state and report back through
//! their join handles; a failing or panicking worker never cancels its
//! siblings.

use std::sync::Arc;

use fleetcmd_cloud::CommandApi;
use fleetcmd_core::{DispatchSettings, InstanceId, Job, TagFilter};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::batcher::chunk;
use crate::discovery::discover_instances;
use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, RunError};
use crate::report::{BatchReport, RunReport};

pub struct Orchestrator {
    api: Arc<dyn CommandApi>,
    settings: Arc<DispatchSettings>,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn CommandApi>, settings: DispatchSettings) -> Self {
        Self {
            api,
            settings: Arc::new(settings),
        }
    }

    /// List the running instances in `region` matching `tags`.
    pub async fn discover(
        &self,
        region: &str,
        tags: &TagFilter,
    ) -> Result<Vec<InstanceId>, RunError> {
        discover_instances(self.api.as_ref(), region, tags, self.settings.page_size)
            .await
            .map_err(RunError::Discovery)
    }

    /// Run `job` across every matching instance.
    ///
    /// Only discovery failures and an empty fleet are errors. Per-batch
    /// failures are logged and returned inside the [`RunReport`].
    pub async fn run(&self, job: &Job) -> Result<RunReport, RunError> {
        let ids = self.discover(&job.region, &job.tags).await?;
        if ids.is_empty() {
            return Err(RunError::NoInstances {
                region: job.region.clone(),
                tags: job.tags.to_string(),
            });
        }

        let batches = chunk(&ids, self.settings.batch_size);
        info!(
            instances = ids.len(),
            batches = batches.len(),
            batch_size = self.settings.batch_size.get(),
            "dispatching script"
        );

        let dispatcher = Dispatcher::new(
            self.api.clone(),
            &job.region,
            &job.script,
            self.settings.clone(),
        );

        let workers: Vec<(usize, usize, JoinHandle<BatchReport>)> = batches
            .into_iter()
            .map(|batch| {
                let dispatcher = dispatcher.clone();
                let (index, count) = (batch.index, batch.len());
                let handle = tokio::spawn(async move {
                    let result = dispatcher.dispatch(&batch).await;
                    if let Err(e) = &result {
                        warn!(batch = batch.index, error = %e, "batch dispatch failed");
                    }
                    BatchReport {
                        index: batch.index,
                        instance_count: batch.len(),
                        result,
                    }
                });
                (index, count, handle)
            })
            .collect();

        let mut reports = Vec::with_capacity(workers.len());
        for (index, instance_count, handle) in workers {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(batch = index, error = %e, "batch worker aborted");
                    reports.push(BatchReport {
                        index,
                        instance_count,
                        result: Err(DispatchError::Worker(e.to_string())),
                    });
                }
            }
        }

        let report = RunReport::new(reports);
        info!(
            batches = report.batches.len(),
            instances = report.total_instances(),
            succeeded = report.succeeded(),
            unsuccessful = report.unsuccessful(),
            errored = report.errored(),
            "fleet run complete"
        );
        Ok(report)
    }
}
