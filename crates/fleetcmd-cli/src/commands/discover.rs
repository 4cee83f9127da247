use fleetcmd_core::Target;
use fleetcmd_dispatch::Orchestrator;

use crate::TargetArgs;

pub async fn discover(args: &TargetArgs) -> anyhow::Result<()> {
    let settings = super::load_settings(args.config.as_deref())?;
    let target = Target::new(args.region.as_deref(), args.tags.as_deref())?;

    let api = super::connect(args, &target.region).await?;
    let ids = Orchestrator::new(api, settings)
        .discover(&target.region, &target.tags)
        .await?;

    for id in &ids {
        println!("{id}");
    }
    Ok(())
}
