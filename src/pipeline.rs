//! One end-to-end run: locate, download, extract.
//!
//! Architectures are located one after another, then every artifact is
//! downloaded through the bounded scheduler, and only once all downloads
//! have settled are the successful ones extracted, again one at a time.
//! Failures are recorded in the [`RunReport`] and never stop sibling
//! architectures or artifacts.

use std::path::PathBuf;
use std::sync::Arc;

use fedorafetch_oci::unpack::is_compressed_archive;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::FetchConfig;
use crate::download::{DownloadOutcome, DownloadTask, Scheduler};
use crate::extract::{ExtractedArtifact, Extractor};
use crate::http::build_client;
use crate::index::{ArtifactFilter, IndexFetcher};
use crate::locate::locate;
use crate::render::BuildTemplate;
use crate::Result;

/// What happened for one architecture during discovery.
#[derive(Debug, Clone, Serialize)]
pub struct ArchReport {
    pub arch: String,
    /// Listing the artifacts were taken from.
    pub listing_url: Option<String>,
    pub probes: usize,
    pub artifacts: usize,
    /// Discovery aborted with this error.
    pub error: Option<String>,
}

/// What happened to one artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReport {
    pub arch: String,
    pub url: String,
    pub destination: PathBuf,
    pub downloaded_bytes: Option<u64>,
    pub download_error: Option<String>,
    pub layer: Option<PathBuf>,
    pub build_file: Option<PathBuf>,
    pub extraction_error: Option<String>,
}

/// Summary of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub version: String,
    pub run_date: String,
    pub architectures: Vec<ArchReport>,
    pub artifacts: Vec<ArtifactReport>,
}

impl RunReport {
    /// `true` when any discovery, download or extraction failed.
    /// Architectures that simply had no artifacts do not count.
    pub fn has_fatal(&self) -> bool {
        self.architectures.iter().any(|a| a.error.is_some())
            || self
                .artifacts
                .iter()
                .any(|a| a.download_error.is_some() || a.extraction_error.is_some())
    }

    /// Architectures for which no artifacts were found.
    pub fn empty_architectures(&self) -> impl Iterator<Item = &str> {
        self.architectures
            .iter()
            .filter(|a| a.error.is_none() && a.artifacts == 0)
            .map(|a| a.arch.as_str())
    }

    pub fn extracted(&self) -> impl Iterator<Item = &ArtifactReport> {
        self.artifacts.iter().filter(|a| a.build_file.is_some())
    }

    /// Pretty-printed JSON form of the report.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Owns the HTTP client and settings for one run.
pub struct Pipeline {
    config: FetchConfig,
    client: Client,
    extractor: Arc<Extractor>,
}

impl Pipeline {
    pub fn new(config: FetchConfig) -> Result<Self> {
        config.validate()?;
        let template = match &config.template {
            Some(path) => BuildTemplate::load(path)?,
            None => BuildTemplate::builtin(),
        };
        let extractor = Extractor::new(config.version.clone(), config.run_date, template);
        Ok(Self {
            client: build_client()?,
            extractor: Arc::new(extractor),
            config,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub async fn run(&self) -> RunReport {
        info!(
            version = %self.config.version,
            base_url = %self.config.base_url,
            run_date = %self.config.run_date,
            "starting run",
        );

        let (architectures, tasks) = self.discover().await;

        let tasks = Scheduler::new(&self.client, self.config.workers)
            .show_progress(self.config.show_progress)
            .fetch_all(tasks)
            .await;

        let mut artifacts = Vec::with_capacity(tasks.len());
        for task in tasks {
            artifacts.push(self.finish(task).await);
        }

        RunReport {
            version: self.config.version.to_string(),
            run_date: self.config.run_date.to_string(),
            architectures,
            artifacts,
        }
    }

    async fn discover(&self) -> (Vec<ArchReport>, Vec<DownloadTask>) {
        let fetcher = IndexFetcher::new(&self.client);
        let mut reports = Vec::with_capacity(self.config.architectures.len());
        let mut tasks = Vec::new();

        for arch in &self.config.architectures {
            let filter = ArtifactFilter::new(arch.clone(), self.config.flavor);
            let mut report = ArchReport {
                arch: arch.clone(),
                listing_url: None,
                probes: 0,
                artifacts: 0,
                error: None,
            };

            match locate(&fetcher, &self.config.base_url, &filter, self.config.retry).await {
                Ok(located) => {
                    report.listing_url = located.listing_url.as_ref().map(|u| u.to_string());
                    report.probes = located.probes;
                    report.artifacts = located.artifacts.len();
                    tasks.extend(
                        located
                            .artifacts
                            .into_iter()
                            .map(|a| DownloadTask::new(a, &self.config.output_dir)),
                    );
                }
                Err(e) => {
                    error!(arch = %arch, error = %e, "artifact discovery failed");
                    report.error = Some(e.to_string());
                }
            }
            reports.push(report);
        }
        (reports, tasks)
    }

    async fn finish(&self, task: DownloadTask) -> ArtifactReport {
        let mut report = ArtifactReport {
            arch: task.artifact.arch.clone(),
            url: task.artifact.url.to_string(),
            destination: task.destination.clone(),
            downloaded_bytes: None,
            download_error: None,
            layer: None,
            build_file: None,
            extraction_error: None,
        };

        match &task.outcome {
            DownloadOutcome::Success { bytes } => report.downloaded_bytes = Some(*bytes),
            DownloadOutcome::Failure(e) => {
                report.download_error = Some(e.clone());
                return report;
            }
            DownloadOutcome::Pending => {
                report.download_error = Some("download never ran".to_string());
                return report;
            }
        }

        if !is_compressed_archive(&task.destination) {
            warn!(path = %task.destination.display(), "not a compressed archive; left as is");
            return report;
        }

        match self.extract(task.destination.clone()).await {
            Ok(extracted) => {
                report.layer = Some(extracted.layer);
                report.build_file = Some(extracted.build_file);
            }
            Err(e) => {
                error!(path = %task.destination.display(), error = %e, "extraction failed");
                report.extraction_error = Some(e.to_string());
            }
        }
        report
    }

    /// Extract off the async executor; a panicking extraction surfaces as
    /// [`Error::Join`](crate::Error::Join).
    async fn extract(&self, artifact: PathBuf) -> Result<ExtractedArtifact> {
        let extractor = self.extractor.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&artifact)).await?
    }
}

/// Build a pipeline for `config` and run it.
pub async fn run(config: FetchConfig) -> Result<RunReport> {
    Ok(Pipeline::new(config)?.run().await)
}
