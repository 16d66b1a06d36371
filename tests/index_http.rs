//! Listing, locating and downloading against a mock compose server.

mod common;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use httpmock::prelude::*;
use reqwest::Url;

use fedora_fetch::download::{DownloadOutcome, DownloadTask, Scheduler};
use fedora_fetch::http::{build_client, Probe};
use fedora_fetch::index::{ArtifactFilter, ArtifactRef, Flavor, IndexFetcher, Listing};
use fedora_fetch::locate::{locate, RetryPolicy};
use fedora_fetch::Error;

use common::{artifact_name, images_path, listing_html, serve_arch, COMPOSE_PATH};

#[tokio::test]
async fn listing_yields_resolved_artifacts() {
    let server = MockServer::start_async().await;
    let html = listing_html(&[
        artifact_name("x86_64"),
        "Fedora-Container-Minimal-Base.x86_64-40-1.14.oci.tar.xz".to_string(),
        "Fedora-Container-Base-Generic.x86_64-40-1.14.oci.tar.xz.sha256".to_string(),
    ]);
    let path = images_path("20240101", "x86_64");
    server
        .mock_async(|when, then| {
            when.method(GET).path(path.clone());
            then.status(200).body(html);
        })
        .await;

    let client = build_client().unwrap();
    let fetcher = IndexFetcher::new(&client);
    let url = Url::parse(&server.url(&path)).unwrap();
    let refs = fetcher
        .list_artifacts(&url, &ArtifactFilter::new("x86_64", Flavor::Base))
        .await
        .unwrap();

    assert_eq!(refs.len(), 1);
    assert_eq!(
        refs[0].url.as_str(),
        server.url(format!("{}{}", path, artifact_name("x86_64")))
    );
    assert_eq!(
        refs[0].destination,
        PathBuf::from("x86_64").join(artifact_name("x86_64"))
    );
}

#[tokio::test]
async fn missing_listing_is_not_found_not_error() {
    let server = MockServer::start_async().await;
    let client = build_client().unwrap();
    let fetcher = IndexFetcher::new(&client);
    let url = Url::parse(&server.url(images_path("20240101", "s390x"))).unwrap();
    let filter = ArtifactFilter::new("s390x", Flavor::Base);

    let probe = fetcher.list(&url, &filter).await.unwrap();
    assert!(matches!(probe, Probe::NotFound));
    assert!(fetcher.list_artifacts(&url, &filter).await.unwrap().is_empty());
}

#[tokio::test]
async fn server_error_is_fatal() {
    let server = MockServer::start_async().await;
    let path = images_path("20240101", "ppc64le");
    server
        .mock_async(|when, then| {
            when.method(GET).path(path.clone());
            then.status(503);
        })
        .await;

    let client = build_client().unwrap();
    let fetcher = IndexFetcher::new(&client);
    let url = Url::parse(&server.url(&path)).unwrap();
    let err = fetcher
        .list_artifacts(&url, &ArtifactFilter::new("ppc64le", Flavor::Base))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Status { .. }), "{err}");
}

#[tokio::test]
async fn locate_falls_back_to_older_compose() {
    let server = MockServer::start_async().await;
    // 20240101 and 20231231 are absent; 20231230 has the artifact.
    serve_arch(&server, "20231230", "aarch64", b"OLDER").await;

    let client = build_client().unwrap();
    let fetcher = IndexFetcher::new(&client);
    let policy = RetryPolicy {
        max_days_back: 3,
        no_retry: false,
    };
    let located = locate(
        &fetcher,
        &server.url(COMPOSE_PATH),
        &ArtifactFilter::new("aarch64", Flavor::Base),
        policy,
    )
    .await
    .unwrap();

    assert_eq!(located.probes, 3);
    assert_eq!(located.artifacts.len(), 1);
    assert_eq!(
        located.listing_url.unwrap().as_str(),
        server.url(images_path("20231230", "aarch64"))
    );
}

#[tokio::test]
async fn locate_without_retry_stops_after_one_probe() {
    let server = MockServer::start_async().await;
    serve_arch(&server, "20231231", "x86_64", b"YESTERDAY").await;

    let client = build_client().unwrap();
    let fetcher = IndexFetcher::new(&client);
    let policy = RetryPolicy {
        max_days_back: 5,
        no_retry: true,
    };
    let located = locate(
        &fetcher,
        &server.url(COMPOSE_PATH),
        &ArtifactFilter::new("x86_64", Flavor::Base),
        policy,
    )
    .await
    .unwrap();

    assert!(located.is_empty());
    assert_eq!(located.probes, 1);
}

#[tokio::test]
async fn one_failed_download_does_not_affect_the_others() {
    let server = MockServer::start_async().await;
    for name in ["a.tar.xz", "b.tar.xz", "c.tar.xz"] {
        let path = format!("/files/{}", name);
        let broken = name == "b.tar.xz";
        server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                if broken {
                    then.status(500);
                } else {
                    then.status(200).body(format!("payload of {}", name));
                }
            })
            .await;
    }

    let tmp = tempfile::tempdir().unwrap();
    let tasks: Vec<DownloadTask> = ["a.tar.xz", "b.tar.xz", "c.tar.xz"]
        .iter()
        .map(|name| {
            let artifact = ArtifactRef {
                arch: "x86_64".to_string(),
                url: Url::parse(&server.url(format!("/files/{}", name))).unwrap(),
                destination: PathBuf::from("x86_64").join(name),
            };
            DownloadTask::new(artifact, tmp.path())
        })
        .collect();

    let client = build_client().unwrap();
    let done = Scheduler::new(&client, 2).fetch_all(tasks).await;

    assert_eq!(done.len(), 3);
    let by_name = |n: &str| {
        done.iter()
            .find(|t| t.destination.ends_with(n))
            .unwrap()
            .clone()
    };

    let a = by_name("a.tar.xz");
    assert_eq!(
        a.outcome,
        DownloadOutcome::Success {
            bytes: "payload of a.tar.xz".len() as u64
        }
    );
    assert_eq!(
        std::fs::read_to_string(&a.destination).unwrap(),
        "payload of a.tar.xz"
    );

    let b = by_name("b.tar.xz");
    assert!(b.error().unwrap().contains("500"), "{:?}", b.outcome);
    assert!(!b.destination.exists());

    let c = by_name("c.tar.xz");
    assert!(c.succeeded());
    assert!(tmp.path().join("x86_64/c.tar.xz").is_file());
}

#[tokio::test]
async fn missing_artifact_is_a_failed_task() {
    let server = MockServer::start_async().await;
    let tmp = tempfile::tempdir().unwrap();
    let artifact = ArtifactRef {
        arch: "s390x".to_string(),
        url: Url::parse(&server.url("/gone.tar.xz")).unwrap(),
        destination: PathBuf::from("s390x/gone.tar.xz"),
    };

    let client = build_client().unwrap();
    let done = Scheduler::new(&client, 1)
        .fetch_all(vec![DownloadTask::new(artifact, tmp.path())])
        .await;
    assert!(!done[0].succeeded());
    assert!(done[0].error().unwrap().contains("Not found"));
}

/// Time four downloads that each take `DELAY` on the server.
async fn timed_downloads(server: &MockServer, workers: usize) -> Duration {
    let tmp = tempfile::tempdir().unwrap();
    let tasks: Vec<DownloadTask> = ["a", "b", "c", "d"]
        .iter()
        .map(|name| {
            let artifact = ArtifactRef {
                arch: "aarch64".to_string(),
                url: Url::parse(&server.url(format!("/slow/{}.tar.xz", name))).unwrap(),
                destination: PathBuf::from("aarch64").join(format!("{}.tar.xz", name)),
            };
            DownloadTask::new(artifact, tmp.path())
        })
        .collect();

    let client = build_client().unwrap();
    let started = Instant::now();
    let done = Scheduler::new(&client, workers).fetch_all(tasks).await;
    let elapsed = started.elapsed();
    assert!(done.iter().all(|t| t.succeeded()), "{done:#?}");
    elapsed
}

const DELAY: Duration = Duration::from_millis(250);

#[tokio::test]
async fn downloads_never_exceed_the_worker_count() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_prefix("/slow/");
            then.status(200).delay(DELAY).body("payload");
        })
        .await;

    // One worker serializes all four; two workers need two rounds.
    assert!(timed_downloads(&server, 1).await >= DELAY * 4);
    assert!(timed_downloads(&server, 2).await >= DELAY * 2);

    // Four workers run them side by side.
    assert!(timed_downloads(&server, 4).await < DELAY * 4);
}
