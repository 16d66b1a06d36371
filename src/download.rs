//! Bounded-concurrency artifact downloads.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, Url};
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::http::{self, Probe};
use crate::index::ArtifactRef;
use crate::{Error, Result};

/// State of one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Pending,
    /// Bytes written to the destination.
    Success { bytes: u64 },
    Failure(String),
}

/// One artifact to fetch into one destination path.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub artifact: ArtifactRef,
    /// Absolute destination path.
    pub destination: PathBuf,
    pub outcome: DownloadOutcome,
}

impl DownloadTask {
    pub fn new(artifact: ArtifactRef, output_dir: &Path) -> Self {
        let destination = output_dir.join(&artifact.destination);
        Self {
            artifact,
            destination,
            outcome: DownloadOutcome::Pending,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, DownloadOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            DownloadOutcome::Failure(e) => Some(e),
            _ => None,
        }
    }
}

/// Runs downloads with at most `workers` in flight.
pub struct Scheduler<'c> {
    client: &'c Client,
    workers: usize,
    show_progress: bool,
}

impl<'c> Scheduler<'c> {
    pub fn new(client: &'c Client, workers: usize) -> Self {
        Self {
            client,
            workers: workers.max(1),
            show_progress: false,
        }
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Download every task and return them all, each with its final
    /// outcome, sorted by destination.  A failed task never affects its
    /// siblings; the call returns once every task has finished.
    pub async fn fetch_all(&self, tasks: Vec<DownloadTask>) -> Vec<DownloadTask> {
        let mut tasks = tasks;
        let progress = self.progress_bar(tasks.len() as u64);
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut join_set = JoinSet::new();
        let mut claimed = HashSet::new();

        for (slot, task) in tasks.iter_mut().enumerate() {
            if !claimed.insert(task.destination.clone()) {
                task.outcome = DownloadOutcome::Failure(format!(
                    "destination {} already claimed by another task",
                    task.destination.display()
                ));
                progress.inc(1);
                continue;
            }

            let client = self.client.clone();
            let permits = permits.clone();
            let url = task.artifact.url.clone();
            let destination = task.destination.clone();
            let progress = progress.clone();
            join_set.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => download_to(&client, &url, &destination).await,
                    Err(e) => Err(Error::Config(format!("download pool closed: {}", e))),
                };
                progress.inc(1);
                (slot, result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((slot, Ok(bytes))) => {
                    let task = &mut tasks[slot];
                    info!(path = %task.destination.display(), bytes, "downloaded");
                    task.outcome = DownloadOutcome::Success { bytes };
                }
                Ok((slot, Err(e))) => {
                    let task = &mut tasks[slot];
                    error!(
                        url = %task.artifact.url,
                        path = %task.destination.display(),
                        error = %e,
                        "download failed",
                    );
                    task.outcome = DownloadOutcome::Failure(e.to_string());
                }
                Err(e) => error!(error = %e, "download task did not complete"),
            }
        }
        progress.finish_and_clear();

        for task in tasks.iter_mut() {
            if task.outcome == DownloadOutcome::Pending {
                task.outcome = DownloadOutcome::Failure("download task aborted".to_string());
            }
        }
        tasks.sort_by(|a, b| a.destination.cmp(&b.destination));
        tasks
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} downloading [{bar:30}] {pos}/{len} {elapsed}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}

/// Stream `url` into `destination`, creating parent directories.  A partial
/// file is removed on failure.
pub async fn download_to(client: &Client, url: &Url, destination: &Path) -> Result<u64> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    debug!(%url, path = %destination.display(), "starting download");
    let result = stream_body(client, url, destination).await;
    if result.is_err() && destination.exists() {
        let _ = tokio::fs::remove_file(destination).await;
    }
    result
}

async fn stream_body(client: &Client, url: &Url, destination: &Path) -> Result<u64> {
    let resp = match http::get(client, url.as_str()).await? {
        Probe::Found(resp) => resp,
        Probe::NotFound => return Err(Error::NotFound(url.to_string())),
    };

    let mut file = tokio::fs::File::create(destination).await?;
    let mut body = resp.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| Error::transport(url, e))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(arch: &str, name: &str) -> ArtifactRef {
        ArtifactRef {
            arch: arch.to_string(),
            url: Url::parse(&format!("http://127.0.0.1:9/{}/{}", arch, name)).unwrap(),
            destination: PathBuf::from(arch).join(name),
        }
    }

    #[test]
    fn task_destination_is_under_output_dir() {
        let task = DownloadTask::new(artifact("s390x", "a.tar.xz"), Path::new("/out"));
        assert_eq!(task.destination, PathBuf::from("/out/s390x/a.tar.xz"));
        assert_eq!(task.outcome, DownloadOutcome::Pending);
        assert!(!task.succeeded());
    }

    #[tokio::test]
    async fn duplicate_destinations_fail_without_touching_the_first() {
        let tmp = tempfile::tempdir().unwrap();
        let client = Client::new();
        let first = DownloadTask::new(artifact("x86_64", "a.tar.xz"), tmp.path());
        let mut dup = first.clone();
        dup.artifact.url = Url::parse("http://127.0.0.1:9/other/a.tar.xz").unwrap();

        let done = Scheduler::new(&client, 2).fetch_all(vec![first, dup]).await;
        assert_eq!(done.len(), 2);
        let claimed: Vec<_> = done
            .iter()
            .filter_map(|t| t.error())
            .filter(|e| e.contains("already claimed"))
            .collect();
        assert_eq!(claimed.len(), 1);
        assert!(done.iter().all(|t| t.outcome != DownloadOutcome::Pending));
    }

    #[tokio::test]
    async fn empty_submission_is_fine() {
        let client = Client::new();
        assert!(Scheduler::new(&client, 3).fetch_all(Vec::new()).await.is_empty());
    }
}
