use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::config::DetectionConfig;
use crate::license::classifier::TextClassifier;
use crate::license::similarity::SimilarityDetector;
use crate::license::{License, SupportedLicense};

static LICENSE_FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(license|legal|copying|copyleft|copyright|unlicense|mit|bsd|gpl|lgpl|apache)")
        .expect("valid license file regex")
});

/// Source, build and editor files that happen to share a license prefix.
static NOT_A_LICENSE_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\.(rs|java|kt|kts|groovy|scala|class|jar|xml|gradle|json|ya?ml|toml|properties",
        r"|bak|orig|swp)$",
    ))
    .expect("valid excluded extension regex")
});

/// Which stage produced a full-text detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStage {
    Classifier,
    Similarity,
    None,
}

impl fmt::Display for DetectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionStage::Classifier => write!(f, "classifier"),
            DetectionStage::Similarity => write!(f, "similarity"),
            DetectionStage::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub license: SupportedLicense,
    pub stage: DetectionStage,
}

/// Runs the classifier, then the similarity fallback.
#[derive(Clone)]
pub struct DetectionManager {
    classifier: TextClassifier,
    similarity: SimilarityDetector,
}

impl DetectionManager {
    pub fn new(classifier: TextClassifier, similarity: SimilarityDetector) -> Self {
        Self {
            classifier,
            similarity,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            TextClassifier::from_config(config),
            SimilarityDetector::new(config.similarity_threshold),
        )
    }

    pub fn detect_full_text(&self, text: &str) -> SupportedLicense {
        self.detect_full_text_with_stage(text).license
    }

    pub fn detect_full_text_with_stage(&self, text: &str) -> Detection {
        let license = self.classifier.detect_by_full_text(text);
        if license != SupportedLicense::NoLicense {
            return Detection {
                license,
                stage: DetectionStage::Classifier,
            };
        }

        if let Some(license) = self.similarity.detect(text) {
            debug!(license = %license, "matched by token similarity");
            return Detection {
                license,
                stage: DetectionStage::Similarity,
            };
        }

        Detection {
            license: SupportedLicense::NoLicense,
            stage: DetectionStage::None,
        }
    }

    /// Resolve a declared license name or SPDX id.
    ///
    /// Blank names carry no information and resolve to `NoLicense`; names no
    /// stage recognises are kept as an [`UnsupportedLicense`](crate::license::UnsupportedLicense).
    pub fn detect_by_name_or_spdx(&self, name: &str) -> License {
        if name.trim().is_empty() {
            return License::Supported(SupportedLicense::NoLicense);
        }

        let detected = self.classifier.detect_by_short_name(name);
        if detected.as_known().is_some() {
            return detected;
        }

        match SupportedLicense::known().find(|l| l.matches_name(name)) {
            Some(license) => License::Supported(license),
            None => detected,
        }
    }
}

/// Whether a file name marks a license candidate (`LICENSE`, `COPYING.md`, ...).
pub fn is_license_file(file_name: &str) -> bool {
    LICENSE_FILE_NAME.is_match(file_name) && !NOT_A_LICENSE_FILE.is_match(file_name)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::license::model::{ClassifierModel, Prediction};
    use crate::license::vectorizer::Vectorizer;

    /// A model that is never confident.
    struct Undecided {
        vectorizer: Vectorizer,
        classes: Vec<String>,
    }

    impl ClassifierModel for Undecided {
        fn classes(&self) -> &[String] {
            &self.classes
        }

        fn vectorizer(&self) -> &Vectorizer {
            &self.vectorizer
        }

        fn predict(&self, _features: &[f32]) -> Prediction {
            Prediction {
                class: 0,
                probabilities: vec![0.5, 0.5],
            }
        }
    }

    fn undecided_manager() -> DetectionManager {
        let model = Undecided {
            vectorizer: Vectorizer::new(vec!["mit".to_string()]),
            classes: vec!["MIT".to_string(), "Apache-2.0".to_string()],
        };
        DetectionManager::new(
            TextClassifier::new(Arc::new(model), 0.8),
            SimilarityDetector::new(0.95),
        )
    }

    fn manager() -> DetectionManager {
        DetectionManager::from_config(&DetectionConfig::default())
    }

    #[test]
    fn test_modified_mit_falls_back_to_similarity() {
        let text = SupportedLicense::Mit
            .full_text()
            .replace("Copyright (c) <year> <copyright holders>", "Copyright (c) 2024 Jane Doe");
        assert_ne!(text, SupportedLicense::Mit.full_text());

        let detection = undecided_manager().detect_full_text_with_stage(&text);
        assert_eq!(detection.license, SupportedLicense::Mit);
        assert_eq!(detection.stage, DetectionStage::Similarity);
    }

    #[test]
    fn test_classifier_stage_wins_when_confident() {
        let detection =
            manager().detect_full_text_with_stage(SupportedLicense::Apache2.full_text());
        assert_eq!(detection.license, SupportedLicense::Apache2);
        assert_eq!(detection.stage, DetectionStage::Classifier);
    }

    #[test]
    fn test_close_relatives_resolved_by_similarity() {
        // GPL and AGPL share most of their text; the classifier alone cannot separate them.
        let m = manager();
        assert_eq!(
            m.detect_full_text(SupportedLicense::Gpl3Only.full_text()),
            SupportedLicense::Gpl3Only
        );
        assert_eq!(
            m.detect_full_text(SupportedLicense::Agpl3Only.full_text()),
            SupportedLicense::Agpl3Only
        );
    }

    #[test]
    fn test_no_stage_matches() {
        let detection = manager().detect_full_text_with_stage("This project has no license yet.");
        assert_eq!(detection.license, SupportedLicense::NoLicense);
        assert_eq!(detection.stage, DetectionStage::None);
    }

    #[test]
    fn test_name_resolution() {
        let m = manager();
        assert_eq!(
            m.detect_by_name_or_spdx("Apache-2.0"),
            License::Supported(SupportedLicense::Apache2)
        );
        assert!(m.detect_by_name_or_spdx("  ").is_no_license());
        let custom = m.detect_by_name_or_spdx("Acme Proprietary Terms");
        assert!(matches!(custom, License::Unsupported(_)));
    }

    #[test]
    fn test_other_versions_stay_unsupported() {
        let m = manager();
        for name in [
            "GNU General Public License v2.0",
            "Eclipse Public License 1.0",
            "Apache License 1.1",
            "Mozilla Public License 1.1",
            "EPL-1.0",
        ] {
            let license = m.detect_by_name_or_spdx(name);
            assert!(
                matches!(&license, License::Unsupported(u) if u.name == name),
                "{name} -> {license:?}"
            );
        }
        assert_eq!(
            m.detect_by_name_or_spdx("Eclipse Public License - v 2.0"),
            License::Supported(SupportedLicense::Epl2)
        );
    }

    #[test]
    fn test_name_regex_fallback() {
        let m = undecided_manager();
        assert_eq!(
            m.detect_by_name_or_spdx("The Apache Software License, Version 2.0"),
            License::Supported(SupportedLicense::Apache2)
        );
        assert!(matches!(
            m.detect_by_name_or_spdx("Something else"),
            License::Unsupported(_)
        ));
    }

    #[test]
    fn test_license_file_names() {
        for name in [
            "LICENSE",
            "license.txt",
            "LICENSE-MIT",
            "COPYING.md",
            "Apache-LICENSE.html",
            "UNLICENSE",
            "COPYING.LESSER",
            "LICENSE.Apache-2.0",
            "LICENSE.MIT",
            "license.v2.txt",
        ] {
            assert!(is_license_file(name), "{name}");
        }
        for name in ["README.md", "license.rs", "LICENSE.txt.bak", "src"] {
            assert!(!is_license_file(name), "{name}");
        }
    }
}
