use fleetcmd_core::Job;
use fleetcmd_dispatch::{Orchestrator, RunReport};

use crate::{ScriptArgs, TargetArgs};

pub async fn run(target: &TargetArgs, script: &ScriptArgs) -> anyhow::Result<()> {
    // Inputs are validated before any network call.
    let settings = super::load_settings(target.config.as_deref())?;
    let script = script.body()?;
    let job = Job::new(
        target.region.as_deref(),
        target.tags.as_deref(),
        script.as_deref(),
    )?;

    let api = super::connect(target, &job.region).await?;
    let report = Orchestrator::new(api, settings).run(&job).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    for batch in &report.batches {
        match &batch.result {
            Ok(outcome) if outcome.is_success() => {
                println!(
                    "✓ batch {} ({} instances): {} Finished",
                    batch.index, batch.instance_count, outcome.invoke_id
                );
            }
            Ok(outcome) => {
                println!(
                    "✗ batch {} ({} instances): {} {}, {} instance(s) not finished",
                    batch.index,
                    batch.instance_count,
                    outcome.invoke_id,
                    outcome.status,
                    outcome.failed_instances.len()
                );
            }
            Err(e) => {
                println!(
                    "✗ batch {} ({} instances): {e}",
                    batch.index, batch.instance_count
                );
            }
        }
    }
    println!(
        "{} instances in {} batches: {} succeeded, {} unsuccessful, {} errored",
        report.total_instances(),
        report.batches.len(),
        report.succeeded(),
        report.unsuccessful(),
        report.errored()
    );
}
