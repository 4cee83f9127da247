//! The immutable description of one fleet command run.

use crate::error::{ConfigError, ConfigResult};
use crate::tags::TagFilter;

/// Which instances to address: a region and a tag filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub region: String,
    pub tags: TagFilter,
}

impl Target {
    /// Region is required; the tag filter is optional and parsed with
    /// [`TagFilter::parse`].
    pub fn new(region: Option<&str>, tags: Option<&str>) -> ConfigResult<Self> {
        let region = region
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(ConfigError::Missing("region"))?;
        let tags = TagFilter::parse(tags.unwrap_or_default())?;
        Ok(Self {
            region: region.to_string(),
            tags,
        })
    }
}

/// What to run and where: region, tag filter, and script body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub region: String,
    pub tags: TagFilter,
    pub script: String,
}

impl Job {
    /// Validate raw inputs. Region and script are required.
    pub fn new(
        region: Option<&str>,
        tags: Option<&str>,
        script: Option<&str>,
    ) -> ConfigResult<Self> {
        let Target { region, tags } = Target::new(region, tags)?;
        let script = script
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("script"))?;

        Ok(Self {
            region,
            tags,
            script: script.to_string(),
        })
    }
}
