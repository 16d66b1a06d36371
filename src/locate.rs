//! Find the newest compose that actually carries artifacts for an
//! architecture.

use reqwest::Url;
use tracing::{debug, info, warn};

use crate::http::Probe;
use crate::index::{listing_url, ArtifactFilter, ArtifactRef, Listing};
use crate::variant::url_variants;
use crate::Result;

/// How far back to look for a published compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_days_back: u32,
    /// Probe only the given URL.
    pub no_retry: bool,
}

/// Result of locating artifacts for one architecture.
#[derive(Debug, Clone, Default)]
pub struct Located {
    /// Listing the artifacts came from; `None` when nothing was found.
    pub listing_url: Option<Url>,
    pub artifacts: Vec<ArtifactRef>,
    /// Number of listings requested.
    pub probes: usize,
}

impl Located {
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Probe `base_url` and, unless retry is disabled, its older date variants
/// in newest-first order.  The first listing with matching artifacts wins.
///
/// Missing or empty listings move on to the next variant; any other error
/// stops the search.  Running out of variants yields an empty [`Located`].
pub async fn locate<L: Listing + ?Sized>(
    listing: &L,
    base_url: &str,
    filter: &ArtifactFilter,
    policy: RetryPolicy,
) -> Result<Located> {
    let candidates = if policy.no_retry {
        vec![base_url.to_string()]
    } else {
        url_variants(base_url, policy.max_days_back)?
    };

    let mut located = Located::default();
    for candidate in &candidates {
        let url = listing_url(candidate, &filter.arch)?;
        located.probes += 1;

        match listing.list(&url, filter).await? {
            Probe::Found(artifacts) if !artifacts.is_empty() => {
                info!(
                    arch = %filter.arch,
                    %url,
                    count = artifacts.len(),
                    "found artifacts",
                );
                located.listing_url = Some(url);
                located.artifacts = artifacts;
                return Ok(located);
            }
            Probe::Found(_) => debug!(arch = %filter.arch, %url, "no matching artifacts"),
            Probe::NotFound => debug!(arch = %filter.arch, %url, "listing missing"),
        }
    }

    warn!(
        arch = %filter.arch,
        probes = located.probes,
        "no artifacts found for this architecture",
    );
    Ok(located)
}
