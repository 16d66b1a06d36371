//! # fedora-fetch
//!
//! Fetches the Fedora container base-image artifacts published on the
//! compose server, one per architecture, and turns each into a single
//! filesystem layer tarball plus a Dockerfile that adds it.
//!
//! A run goes through these stages:
//!
//! 1. **Locate**: for each architecture, list the compose's image
//!    directory.  When the compose for the expected date is missing or
//!    empty, step back one day at a time ([`variant`], [`locate`]).
//! 2. **Download**: fetch every discovered artifact with bounded
//!    concurrency; one failure never cancels the others ([`download`]).
//! 3. **Extract**: decompress each artifact (following nested archives),
//!    copy the first layer of the first manifest out of the OCI layout and
//!    render the Dockerfile next to it ([`extract`], [`render`]).
//!
//! ```no_run
//! use fedora_fetch::config::Args;
//! use fedora_fetch::date::DateStamp;
//! use fedora_fetch::pipeline;
//! use clap::Parser;
//!
//! # async fn demo() -> fedora_fetch::Result<()> {
//! let config = Args::parse_from(["fedora-fetch", "40", "--arch", "x86_64"])
//!     .into_config(DateStamp::today())?;
//! let report = pipeline::run(config).await?;
//! assert!(!report.has_fatal());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod date;
pub mod download;
pub mod error;
pub mod extract;
pub mod http;
pub mod index;
pub mod locate;
pub mod pipeline;
pub mod render;
pub mod variant;
pub mod version;

pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunReport};
