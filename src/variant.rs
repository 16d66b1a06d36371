//! Date-shifted variants of a compose URL.
//!
//! Compose directories carry their build date in the name:
//!
//! - nightly:  `Fedora-Rawhide-20240101.n.0`
//! - snapshot: `Fedora-40-20240101.0`
//!
//! When the newest compose has not been published yet, older ones are
//! tried by rewriting that date.

use std::ops::Range;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::date::DateStamp;
use crate::{Error, Result};

static NIGHTLY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d{8})\.n\.\d+").expect("nightly token regex"));

static SNAPSHOT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d{8})\.\d+").expect("snapshot token regex"));

/// Which naming scheme the date token was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPattern {
    Nightly,
    Snapshot,
}

/// The build date embedded in a compose URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateToken {
    pub pattern: TokenPattern,
    pub date: DateStamp,
    /// The eight digits exactly as they appear in the URL.
    pub text: String,
    /// Byte range of the digits within the URL.
    pub span: Range<usize>,
}

impl DateToken {
    /// `url` with only this token's digits replaced by `date`.
    pub fn substitute(&self, url: &str, date: DateStamp) -> String {
        let mut out = String::with_capacity(url.len());
        out.push_str(&url[..self.span.start]);
        out.push_str(&date.to_string());
        out.push_str(&url[self.span.end..]);
        out
    }
}

/// Locate the build-date token in `url`.  The nightly pattern wins over
/// the snapshot pattern; within a pattern the first match is used.
pub fn find_date_token(url: &str) -> Result<Option<DateToken>> {
    for (pattern, regex) in [
        (TokenPattern::Nightly, &*NIGHTLY_TOKEN),
        (TokenPattern::Snapshot, &*SNAPSHOT_TOKEN),
    ] {
        if let Some(digits) = regex.captures(url).and_then(|c| c.get(1)) {
            let text = digits.as_str().to_string();
            let date = text.parse::<DateStamp>()?;
            return Ok(Some(DateToken {
                pattern,
                date,
                text,
                span: digits.range(),
            }));
        }
    }
    Ok(None)
}

/// Produce `max_days_back + 1` URLs, newest first: `base` itself, then
/// `base` with its date token moved back one day at a time.
///
/// A `base` without a recognisable date token is rejected rather than
/// probed repeatedly.
pub fn url_variants(base: &str, max_days_back: u32) -> Result<Vec<String>> {
    let token = find_date_token(base)?.ok_or_else(|| {
        Error::Config(format!(
            "URL has no compose date token (expected -YYYYMMDD.n.N or -YYYYMMDD.N): {}",
            base
        ))
    })?;

    let mut variants = Vec::with_capacity(max_days_back as usize + 1);
    variants.push(base.to_string());
    for days_back in 1..=max_days_back {
        let Some(date) = token.date.shift(days_back) else {
            break;
        };
        variants.push(token.substitute(base, date));
    }
    Ok(variants)
}
