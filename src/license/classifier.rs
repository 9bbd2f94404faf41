use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::DetectionConfig;
use crate::license::model::{to_floats, CentroidModel, ClassifierModel, LinearModel};
use crate::license::vectorizer::normalize;
use crate::license::{License, SupportedLicense, UnsupportedLicense};

static VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(\.\d+)*").expect("valid version regex"));

/// Confidence-gated license classifier over a [`ClassifierModel`].
#[derive(Clone)]
pub struct TextClassifier {
    model: Arc<dyn ClassifierModel>,
    confidence: f32,
}

impl TextClassifier {
    pub fn new(model: Arc<dyn ClassifierModel>, confidence: f32) -> Self {
        Self { model, confidence }
    }

    /// Classifier over the model trained from the built-in catalog.
    pub fn builtin(confidence: f32) -> Self {
        Self::new(Arc::new(CentroidModel::from_catalog()), confidence)
    }

    /// Use the pretrained model from `model_path` when it loads, the built-in one otherwise.
    pub fn from_config(config: &DetectionConfig) -> Self {
        if let Some(path) = &config.model_path {
            match LinearModel::load(path) {
                Ok(model) => {
                    debug!(
                        path = %path.display(),
                        classes = model.classes().len(),
                        "loaded license model"
                    );
                    return Self::new(Arc::new(model), config.classifier_confidence);
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "falling back to built-in license model"
                    );
                }
            }
        }
        Self::builtin(config.classifier_confidence)
    }

    /// `NoLicense` unless the model is confident about a catalog license.
    pub fn detect_by_full_text(&self, text: &str) -> SupportedLicense {
        self.classify(text).unwrap_or(SupportedLicense::NoLicense)
    }

    /// Like [`detect_by_full_text`](Self::detect_by_full_text), but an
    /// unconfident result keeps the raw name as an [`UnsupportedLicense`].
    ///
    /// A name naming a different version than the predicted license (say
    /// "Eclipse Public License 1.0" against EPL-2.0) is not a match.
    pub fn detect_by_short_name(&self, name: &str) -> License {
        match self.classify(name) {
            Some(license) if !version_conflict(name, license) => License::Supported(license),
            Some(license) => {
                debug!(name, predicted = %license, "name carries a different license version");
                License::Unsupported(UnsupportedLicense::from_name(name))
            }
            None => License::Unsupported(UnsupportedLicense::from_name(name)),
        }
    }

    fn classify(&self, text: &str) -> Option<SupportedLicense> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return None;
        }

        let features = to_floats(&self.model.vectorizer().vectorize_with_length(&normalized));
        let prediction = self.model.predict(&features);
        if prediction.confidence() < self.confidence {
            debug!(
                confidence = prediction.confidence(),
                threshold = self.confidence,
                "classifier rejected prediction"
            );
            return None;
        }

        let short_name = self.model.classes().get(prediction.class)?;
        let license = license_for_class(short_name);
        if license.is_none() {
            warn!(class = %short_name, "model predicted a class outside the catalog");
        }
        license.filter(|l| *l != SupportedLicense::NoLicense)
    }
}

fn license_for_class(short_name: &str) -> Option<SupportedLicense> {
    SupportedLicense::from_spdx_id(short_name)
        .or_else(|| SupportedLicense::known().find(|l| l.matches_name(short_name)))
}

/// Version numbers in `text`, with trailing `.0` parts dropped; years are skipped.
fn versions(text: &str) -> Vec<String> {
    VERSION
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|v| v.split('.').next().is_some_and(|major| major.len() <= 2))
        .map(|v| {
            let mut parts: Vec<&str> = v.split('.').collect();
            while parts.len() > 1 && parts.last().is_some_and(|p| p.chars().all(|c| c == '0')) {
                parts.pop();
            }
            parts.join(".")
        })
        .collect()
}

/// The catalog license's own version, for licenses whose SPDX id carries one.
fn catalog_version(license: SupportedLicense) -> Option<String> {
    VERSION
        .find(license.spdx_id())
        .filter(|m| m.as_str().contains('.'))
        .and_then(|m| versions(m.as_str()).into_iter().next())
}

fn version_conflict(name: &str, license: SupportedLicense) -> bool {
    let Some(expected) = catalog_version(license) else {
        return false;
    };
    let named = versions(name);
    !named.is_empty() && !named.contains(&expected)
}
