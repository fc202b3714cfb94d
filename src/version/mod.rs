// src/version/mod.rs

//! Runtime versions and partial-version matching.
//!
//! [`Version`] models the subset of PEP 440 that interpreters actually
//! report: a numeric release tuple plus optional pre/post/dev/local
//! qualifiers. [`matcher`] answers "which of these discovered versions does
//! the user mean by `3.9`?".

pub mod matcher;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub use matcher::{matches, version_match};

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v?(?P<release>\d+(?:\.\d+)*)(?:[-_.]?(?P<pre_l>alpha|beta|preview|pre|rc|a|b|c)[-_.]?(?P<pre_n>\d+)?)?(?:-(?P<post_implicit>\d+)|[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n>\d+)?)?(?:[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>\d+)?)?(?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?$",
    )
    .expect("version regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version: {0:?}")]
pub struct InvalidVersion(pub String);

/// Kind of a pre-release qualifier, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreKind {
    Alpha,
    Beta,
    Rc,
}

impl PreKind {
    fn as_str(self) -> &'static str {
        match self {
            PreKind::Alpha => "a",
            PreKind::Beta => "b",
            PreKind::Rc => "rc",
        }
    }
}

/// A pre-release qualifier such as `b1` or `rc2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreRelease {
    pub kind: PreKind,
    pub number: u64,
}

/// An interpreter version.
///
/// Ordering compares the release tuple first, then the qualifiers, where a
/// final release ranks above any of its pre-releases or dev builds
/// (`3.9.0b1 < 3.9.0`). Release tuples compare element-wise without zero
/// padding, so `3.9 < 3.9.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    release: Vec<u64>,
    pre: Option<PreRelease>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<String>,
}

impl Version {
    /// Build a final release from its numeric segments.
    ///
    /// # Panics
    ///
    /// Panics if `release` is empty.
    pub fn from_release(release: impl Into<Vec<u64>>) -> Self {
        let release = release.into();
        assert!(!release.is_empty(), "a version needs at least one segment");
        Self {
            release,
            pre: None,
            post: None,
            dev: None,
            local: None,
        }
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn major(&self) -> u64 {
        self.release[0]
    }

    pub fn minor(&self) -> Option<u64> {
        self.release.get(1).copied()
    }

    pub fn pre(&self) -> Option<PreRelease> {
        self.pre
    }

    pub fn post(&self) -> Option<u64> {
        self.post
    }

    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    pub fn local(&self) -> Option<&str> {
        self.local.as_deref()
    }

    /// True for alpha/beta/rc and dev builds.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// True if any pre/post/dev/local qualifier is present.
    pub fn has_qualifier(&self) -> bool {
        self.pre.is_some() || self.post.is_some() || self.dev.is_some() || self.local.is_some()
    }
}

impl FromStr for Version {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let invalid = || InvalidVersion(s.to_string());
        let caps = VERSION_RE.captures(&normalized).ok_or_else(invalid)?;

        let release = caps["release"]
            .split('.')
            .map(|seg| seg.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;

        let number = |name: &str| -> Result<Option<u64>, InvalidVersion> {
            caps.name(name)
                .map(|m| m.as_str().parse::<u64>().map_err(|_| invalid()))
                .transpose()
        };

        let pre = match caps.name("pre_l") {
            Some(label) => {
                let kind = match label.as_str() {
                    "a" | "alpha" => PreKind::Alpha,
                    "b" | "beta" => PreKind::Beta,
                    _ => PreKind::Rc,
                };
                Some(PreRelease {
                    kind,
                    number: number("pre_n")?.unwrap_or(0),
                })
            }
            None => None,
        };

        let post = if caps.name("post_implicit").is_some() {
            number("post_implicit")?
        } else if caps.name("post_l").is_some() {
            Some(number("post_n")?.unwrap_or(0))
        } else {
            None
        };

        let dev = if caps.name("dev_l").is_some() {
            Some(number("dev_n")?.unwrap_or(0))
        } else {
            None
        };

        let local = caps
            .name("local")
            .map(|m| m.as_str().replace(['-', '_'], "."));

        Ok(Self {
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.release {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
            first = false;
        }
        if let Some(pre) = self.pre {
            write!(f, "{}{}", pre.kind.as_str(), pre.number)?;
        }
        if let Some(post) = self.post {
            write!(f, ".post{post}")?;
        }
        if let Some(dev) = self.dev {
            write!(f, ".dev{dev}")?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{local}")?;
        }
        Ok(())
    }
}

/// `None` sorts after every `Some`: final releases beat pre/dev builds.
fn final_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release
            .cmp(&other.release)
            .then_with(|| final_last(&self.pre, &other.pre))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| final_last(&self.dev, &other.dev))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
