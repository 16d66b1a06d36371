//! Command-line options and the validated run configuration.

use std::path::PathBuf;

use clap::Parser;
use reqwest::Url;

use crate::date::DateStamp;
use crate::index::Flavor;
use crate::locate::RetryPolicy;
use crate::variant::find_date_token;
use crate::version::VersionLabel;
use crate::{Error, Result};

/// Compose server the default base URL points at.
pub const DEFAULT_COMPOSE_HOST: &str = "https://kojipkgs.fedoraproject.org/compose";

/// Architectures Fedora publishes container images for.
pub const DEFAULT_ARCHITECTURES: [&str; 4] = ["aarch64", "ppc64le", "s390x", "x86_64"];

/// Download Fedora container base-image artifacts and turn each into a
/// layer tarball plus a Dockerfile.
#[derive(Debug, Parser)]
#[command(name = "fedora-fetch", version, about)]
pub struct Args {
    /// Fedora release to fetch, e.g. `40` or `rawhide`.
    #[arg(id = "release", value_name = "VERSION", env = "FEDORA_FETCH_VERSION")]
    pub version: String,

    /// Directory where artifacts are downloaded and extracted.
    #[arg(long, default_value = ".", env = "FEDORA_FETCH_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Number of concurrent downloads.
    #[arg(long, default_value_t = 5, env = "FEDORA_FETCH_WORKERS")]
    pub workers: usize,

    /// How many days before the compose date to look for older composes.
    #[arg(long, default_value_t = 3, env = "FEDORA_FETCH_MAX_DAYS_BACK")]
    pub max_days_back: u32,

    /// Only probe the base URL; never fall back to older composes.
    #[arg(long, env = "FEDORA_FETCH_NO_RETRY")]
    pub no_retry: bool,

    /// Fetch the minimal base image instead of the full base image.
    #[arg(long, env = "FEDORA_FETCH_MINI")]
    pub mini: bool,

    /// Architecture to fetch; repeat for several.  Defaults to all.
    #[arg(long = "arch", value_name = "ARCH")]
    pub architectures: Vec<String>,

    /// Compose URL to start from.  By default rawhide starts from today's
    /// nightly compose and steps back from there; numbered releases use
    /// the `latest-Fedora-<N>` compose as is, without stepping back.
    #[arg(long, env = "FEDORA_FETCH_BASE_URL")]
    pub base_url: Option<String>,

    /// Dockerfile template with `{{ version }}` and `{{ tar_name }}`.
    #[arg(long, env = "FEDORA_FETCH_TEMPLATE")]
    pub template: Option<PathBuf>,

    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    pub verbose: bool,

    /// Hide the progress bar.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Validate the options into a [`FetchConfig`] for a run on `today`.
    pub fn into_config(self, today: DateStamp) -> Result<FetchConfig> {
        let version = VersionLabel::new(self.version);
        if version.as_str().is_empty() {
            return Err(Error::Config("version must not be empty".to_string()));
        }

        let (base_url, no_retry) = match self.base_url {
            Some(url) => (url, self.no_retry),
            // The `latest-` alias has no date to step back from.
            None => (
                default_base_url(&version, today),
                self.no_retry || !version.is_rawhide(),
            ),
        };
        let architectures = if self.architectures.is_empty() {
            DEFAULT_ARCHITECTURES.iter().map(|a| a.to_string()).collect()
        } else {
            self.architectures
        };

        let config = FetchConfig {
            version,
            run_date: today,
            output_dir: self.output_dir,
            workers: self.workers,
            retry: RetryPolicy {
                max_days_back: self.max_days_back,
                no_retry,
            },
            flavor: if self.mini { Flavor::Minimal } else { Flavor::Base },
            architectures,
            base_url,
            template: self.template,
            show_progress: !self.quiet,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub version: VersionLabel,
    /// Date stamped into every layer file name of the run.
    pub run_date: DateStamp,
    pub output_dir: PathBuf,
    pub workers: usize,
    pub retry: RetryPolicy,
    pub flavor: Flavor,
    pub architectures: Vec<String>,
    pub base_url: String,
    pub template: Option<PathBuf>,
    pub show_progress: bool,
}

impl FetchConfig {
    /// Reject settings that would fail or misbehave once the run starts.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if self.architectures.iter().any(|a| a.trim().is_empty()) {
            return Err(Error::Config("architecture must not be empty".to_string()));
        }
        if self
            .architectures
            .iter()
            .any(|a| a.contains('/') || a.contains(".."))
        {
            return Err(Error::Config(
                "architecture must be a single path component".to_string(),
            ));
        }

        let url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid base URL {}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }

        if !self.retry.no_retry && find_date_token(&self.base_url)?.is_none() {
            return Err(Error::Config(format!(
                "base URL has no compose date to step back from; pass --no-retry to use it as is: {}",
                self.base_url
            )));
        }
        Ok(())
    }
}

/// Default compose URL for `version`: today's nightly for rawhide, the
/// `latest-` alias for a numbered release.
pub fn default_base_url(version: &VersionLabel, date: DateStamp) -> String {
    if version.is_rawhide() {
        format!(
            "{}/{}/Fedora-{}-{}.n.0/compose/Container/",
            DEFAULT_COMPOSE_HOST,
            version.compose_dir(),
            version.compose_name(),
            date
        )
    } else {
        format!(
            "{}/{}/latest-Fedora-{}/compose/Container/",
            DEFAULT_COMPOSE_HOST,
            version.compose_dir(),
            version.compose_name()
        )
    }
}
