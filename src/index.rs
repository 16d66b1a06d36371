//! Compose directory listings and artifact selection.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::debug;

use crate::http::{self, Probe};
use crate::{Error, Result};

/// Suffix of the compressed image artifacts published per architecture.
pub const ARTIFACT_SUFFIX: &str = ".tar.xz";

/// A downloadable artifact discovered in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub arch: String,
    /// Absolute URL of the artifact.
    pub url: Url,
    /// Path relative to the output directory: `<arch>/<file name>`.
    pub destination: PathBuf,
}

/// Which image family to pick from a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    /// `Fedora-Container-Base-*`, excluding the minimal image.
    #[default]
    Base,
    /// `Fedora-Container-Minimal-Base-*` only.
    Minimal,
}

/// Link selection rules for one architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFilter {
    pub arch: String,
    pub suffix: String,
    pub flavor: Flavor,
}

impl ArtifactFilter {
    pub fn new(arch: impl Into<String>, flavor: Flavor) -> Self {
        Self {
            arch: arch.into(),
            suffix: ARTIFACT_SUFFIX.to_string(),
            flavor,
        }
    }

    /// Case-sensitive match on the link target.
    pub fn matches(&self, href: &str) -> bool {
        if !href.ends_with(&self.suffix) || !href.contains(&self.arch) {
            return false;
        }
        if !href.contains("Base") {
            return false;
        }
        match self.flavor {
            Flavor::Base => !href.contains("Minimal"),
            Flavor::Minimal => href.contains("Minimal"),
        }
    }

    /// Keep the matching links, dropping repeats, in listing order.
    pub fn filter_links<S: AsRef<str>>(&self, links: &[S]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for link in links {
            let href: &str = link.as_ref();
            if self.matches(href) && seen.insert(href) {
                kept.push(href.to_string());
            }
        }
        kept
    }
}

/// Pull every `<a href>` target out of an HTML page.
pub fn parse_links(html: &str) -> Result<Vec<String>> {
    let selector =
        Selector::parse("a[href]").map_err(|e| Error::Html(format!("bad selector: {}", e)))?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect())
}

/// Resolve matching links against the listing URL.
pub fn artifact_refs(
    listing_url: &Url,
    links: &[String],
    filter: &ArtifactFilter,
) -> Result<Vec<ArtifactRef>> {
    filter
        .filter_links(links)
        .into_iter()
        .map(|href| {
            let url = listing_url.join(&href).map_err(|e| {
                Error::Html(format!("bad link '{}' in {}: {}", href, listing_url, e))
            })?;
            let file_name = url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|name| !name.is_empty())
                .ok_or_else(|| Error::Html(format!("link '{}' has no file name", href)))?
                .to_string();
            Ok(ArtifactRef {
                arch: filter.arch.clone(),
                url,
                destination: PathBuf::from(&filter.arch).join(file_name),
            })
        })
        .collect()
}

/// URL of the per-architecture image listing below a compose URL.
pub fn listing_url(compose_url: &str, arch: &str) -> Result<Url> {
    let mut base = compose_url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)
        .and_then(|u| u.join(&format!("{}/images/", arch)))
        .map_err(|e| Error::Config(format!("invalid compose URL {}: {}", compose_url, e)))
}

/// A source of directory listings.  The HTTP implementation is
/// [`IndexFetcher`]; tests substitute in-memory listings.
#[async_trait]
pub trait Listing: Send + Sync {
    /// List the artifacts at `url` that pass `filter`.  A missing directory
    /// is `Probe::NotFound`; an existing directory with no matches is
    /// `Probe::Found` with an empty list.
    async fn list(&self, url: &Url, filter: &ArtifactFilter) -> Result<Probe<Vec<ArtifactRef>>>;
}

/// Fetches listings over HTTP with the run's client.
pub struct IndexFetcher<'c> {
    client: &'c Client,
}

impl<'c> IndexFetcher<'c> {
    pub fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// Like [`Listing::list`], but a missing directory is an empty list.
    pub async fn list_artifacts(
        &self,
        url: &Url,
        filter: &ArtifactFilter,
    ) -> Result<Vec<ArtifactRef>> {
        Ok(self.list(url, filter).await?.found().unwrap_or_default())
    }
}

#[async_trait]
impl Listing for IndexFetcher<'_> {
    async fn list(&self, url: &Url, filter: &ArtifactFilter) -> Result<Probe<Vec<ArtifactRef>>> {
        let resp = match http::get(self.client, url.as_str()).await? {
            Probe::Found(resp) => resp,
            Probe::NotFound => {
                debug!(%url, "listing not found");
                return Ok(Probe::NotFound);
            }
        };

        let body = resp
            .text()
            .await
            .map_err(|e| Error::transport(url, e))?;
        let links = parse_links(&body)?;
        let artifacts = artifact_refs(url, &links, filter)?;
        debug!(
            %url,
            links = links.len(),
            artifacts = artifacts.len(),
            "parsed listing",
        );
        Ok(Probe::Found(artifacts))
    }
}
