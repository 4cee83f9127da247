//! Instance discovery.

use fleetcmd_cloud::api::INSTANCE_STATUS_RUNNING;
use fleetcmd_cloud::{ApiResult, CommandApi, DescribeInstancesRequest};
use fleetcmd_core::{InstanceId, TagFilter};
use tracing::{debug, info};

/// Collect the ids of all running instances in `region` matching `tags`.
///
/// Pages are requested until one comes back shorter than `page_size`; a
/// full page always triggers another request, and total-count fields are
/// ignored. Any page error aborts with no partial result. An empty tag
/// filter sends no tag constraint. Zero matches is an empty `Vec`, not an
/// error.
pub async fn discover_instances(
    api: &dyn CommandApi,
    region: &str,
    tags: &TagFilter,
    page_size: u32,
) -> ApiResult<Vec<InstanceId>> {
    let page_size = page_size.max(1);
    let tag_filter = (!tags.is_empty()).then(|| tags.clone());
    let mut ids = Vec::new();
    let mut page_number = 1;

    loop {
        let request = DescribeInstancesRequest {
            region: region.to_string(),
            status: INSTANCE_STATUS_RUNNING.to_string(),
            page_number,
            page_size,
            tags: tag_filter.clone(),
        };
        let page = api.describe_instances(&request).await?;
        let count = page.len();
        debug!(page = page_number, count, "fetched instance page");
        ids.extend(page);

        if count < page_size as usize {
            break;
        }
        page_number += 1;
    }

    info!(%region, tags = %tags, instances = ids.len(), pages = page_number, "discovery complete");
    Ok(ids)
}
