//! License identity, the built-in catalog, and the detection pipeline.
//!
//! - [`catalog`]: the static table of supported licenses with their
//!   compatibility relations and reference texts.
//! - [`vectorizer`]: n-gram count features over a fixed vocabulary.
//! - [`model`]: classifier models (built-in centroid model, pretrained linear model).
//! - [`classifier`]: confidence-gated text classifier over a model.
//! - [`similarity`]: Sørensen–Dice token-set fallback matcher.
//! - [`detection`]: orchestration of the stages plus license-file name matching.

pub mod catalog;
pub mod classifier;
pub mod detection;
pub mod model;
pub mod similarity;
pub mod vectorizer;

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub use catalog::{LicensePriority, SupportedLicense};

/// A license that was named somewhere (upstream metadata, a POM) but has no
/// catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsupportedLicense {
    pub name: String,
    pub url: Option<String>,
    pub html_url: Option<String>,
    pub spdx_id: Option<String>,
}

impl UnsupportedLicense {
    pub fn from_name(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            url: None,
            html_url: None,
            spdx_id: None,
        }
    }
}

/// Any license value attached to a module or dependency.
///
/// Identity is the SPDX id when one is known, otherwise the lowercased name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum License {
    Supported(SupportedLicense),
    Unsupported(UnsupportedLicense),
}

impl License {
    pub fn name(&self) -> &str {
        match self {
            License::Supported(l) => l.name(),
            License::Unsupported(l) => &l.name,
        }
    }

    pub fn spdx_id(&self) -> Option<&str> {
        match self {
            License::Supported(l) => Some(l.spdx_id()),
            License::Unsupported(l) => l.spdx_id.as_deref(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            License::Supported(l) => Some(l.url()),
            License::Unsupported(l) => l.url.as_deref(),
        }
    }

    pub fn html_url(&self) -> Option<&str> {
        match self {
            License::Supported(l) => Some(l.html_url()),
            License::Unsupported(l) => l.html_url.as_deref(),
        }
    }

    /// The catalog entry, if this license has one.
    pub fn as_supported(&self) -> Option<SupportedLicense> {
        match self {
            License::Supported(l) => Some(*l),
            License::Unsupported(_) => None,
        }
    }

    /// A catalog license other than the `NoLicense` sentinel.
    pub fn as_known(&self) -> Option<SupportedLicense> {
        self.as_supported().filter(|l| *l != SupportedLicense::NoLicense)
    }

    pub fn is_no_license(&self) -> bool {
        matches!(self, License::Supported(SupportedLicense::NoLicense))
    }

    fn identity(&self) -> String {
        match self.spdx_id() {
            Some(id) => id.to_lowercase(),
            None => self.name().to_lowercase(),
        }
    }
}

impl PartialEq for License {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for License {}

impl Hash for License {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl From<SupportedLicense> for License {
    fn from(license: SupportedLicense) -> Self {
        License::Supported(license)
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
