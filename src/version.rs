//! Fedora release identifiers.

use std::fmt;

/// Prefix that marks a numbered release branch, as in `f40`.
pub const RELEASE_PREFIX: char = 'f';

const RAWHIDE: &str = "rawhide";

/// A release as given on the command line, e.g. `40` or `Rawhide`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLabel(String);

impl VersionLabel {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_rawhide(&self) -> bool {
        self.0.eq_ignore_ascii_case(RAWHIDE)
    }

    /// Label used inside the build file: `rawhide`, or the release number
    /// with [`RELEASE_PREFIX`] (`40` becomes `f40`).
    pub fn normalized(&self) -> String {
        if self.is_rawhide() {
            RAWHIDE.to_string()
        } else {
            format!("{}{}", RELEASE_PREFIX, self.0)
        }
    }

    /// Directory component of the compose server (`rawhide`, `40`).
    pub fn compose_dir(&self) -> String {
        if self.is_rawhide() {
            RAWHIDE.to_string()
        } else {
            self.0.clone()
        }
    }

    /// Release part of a compose name (`Rawhide`, `40`).
    pub fn compose_name(&self) -> String {
        if self.is_rawhide() {
            "Rawhide".to_string()
        } else {
            self.0.clone()
        }
    }
}

impl fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
