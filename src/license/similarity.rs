use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::license::vectorizer::normalize;
use crate::license::SupportedLicense;

/// Token sets of every catalog reference text, normalized like candidates are.
static REFERENCE_TOKENS: Lazy<Vec<(SupportedLicense, HashSet<String>)>> = Lazy::new(|| {
    SupportedLicense::known()
        .map(|license| (license, tokens(license.full_text())))
        .collect()
});

/// Token-overlap matcher used when the classifier is not confident.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityDetector {
    threshold: f64,
}

impl SimilarityDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Best-scoring catalog license, if its score is strictly above the threshold.
    pub fn detect(&self, text: &str) -> Option<SupportedLicense> {
        self.best_match(text)
            .filter(|(_, score)| *score > self.threshold)
            .map(|(license, _)| license)
    }

    /// Highest Sørensen–Dice score over the catalog. Ties keep catalog order.
    pub fn best_match(&self, text: &str) -> Option<(SupportedLicense, f64)> {
        let candidate = tokens(text);
        if candidate.is_empty() {
            return None;
        }
        REFERENCE_TOKENS
            .iter()
            .map(|(license, reference)| (*license, sorensen_dice(reference, &candidate)))
            .fold(None, |best: Option<(SupportedLicense, f64)>, current| match best {
                Some(b) if b.1 >= current.1 => Some(b),
                _ => Some(current),
            })
    }
}

pub fn tokens(text: &str) -> HashSet<String> {
    normalize(text).split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
}

/// `2·|A∩B| / (|A|+|B|)`; two empty sets score 0.
pub fn sorensen_dice(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    let common = a.intersection(b).count();
    2.0 * common as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> HashSet<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sorensen_dice() {
        assert_eq!(sorensen_dice(&set(&["a", "b"]), &set(&["a", "b"])), 1.0);
        assert_eq!(sorensen_dice(&set(&["a", "b"]), &set(&["c"])), 0.0);
        assert!((sorensen_dice(&set(&["a", "b"]), &set(&["a", "c"])) - 0.5).abs() < 1e-9);
        assert_eq!(sorensen_dice(&set(&[]), &set(&[])), 0.0);
    }

    #[test]
    fn test_every_reference_text_matches_itself() {
        let detector = SimilarityDetector::new(0.95);
        for license in SupportedLicense::known() {
            let (best, score) = detector.best_match(license.full_text()).unwrap();
            assert_eq!(best, license);
            assert_eq!(score, 1.0);
            assert_eq!(detector.detect(license.full_text()), Some(license));
        }
    }

    #[test]
    fn test_case_and_layout_do_not_matter() {
        let detector = SimilarityDetector::new(0.95);
        let shouted = SupportedLicense::Isc.full_text().to_uppercase().replace('\n', "  ");
        assert_eq!(detector.detect(&shouted), Some(SupportedLicense::Isc));
    }

    #[test]
    fn test_threshold_is_strict() {
        let detector = SimilarityDetector::new(1.0);
        assert_eq!(detector.detect(SupportedLicense::Mit.full_text()), None);
    }

    #[test]
    fn test_unrelated_text() {
        let detector = SimilarityDetector::new(0.95);
        assert_eq!(detector.detect("just a readme"), None);
        assert_eq!(detector.detect(""), None);
    }
}
