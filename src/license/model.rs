//! Multi-class models behind the text classifier.
//!
//! Both models consume the `vectorize_with_length` layout: one count per
//! vocabulary entry followed by the character length of the input.

use std::path::Path;

use serde::Deserialize;

use crate::error::ModelError;
use crate::license::vectorizer::{normalize, Vectorizer};
use crate::license::SupportedLicense;

/// Output of one model call.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class: usize,
    pub probabilities: Vec<f32>,
}

impl Prediction {
    fn from_scores(scores: &[f32]) -> Self {
        let probabilities = softmax(scores);
        let class = probabilities
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| if *p > probabilities[best] { i } else { best });
        Self {
            class,
            probabilities,
        }
    }

    pub fn confidence(&self) -> f32 {
        self.probabilities.get(self.class).copied().unwrap_or(0.0)
    }
}

pub trait ClassifierModel: Send + Sync {
    /// Class short names, in the order the model emits them.
    fn classes(&self) -> &[String];

    /// Feature layout the model was trained on.
    fn vectorizer(&self) -> &Vectorizer;

    fn predict(&self, features: &[f32]) -> Prediction;
}

/// Nearest-prototype model trained from the embedded catalog texts.
///
/// Each class has one prototype per reference string (the full text, and the
/// name together with the SPDX id). The class score is the best cosine
/// similarity against its prototypes, scaled by `temperature` before softmax.
pub struct CentroidModel {
    vectorizer: Vectorizer,
    classes: Vec<String>,
    prototypes: Vec<Vec<Vec<f32>>>,
    temperature: f32,
}

impl CentroidModel {
    pub const DEFAULT_TEMPERATURE: f32 = 50.0;

    pub fn from_catalog() -> Self {
        let references: Vec<(SupportedLicense, Vec<String>)> = SupportedLicense::known()
            .map(|license| {
                let names = format!("{} {}", license.name(), license.spdx_id());
                (
                    license,
                    vec![normalize(license.full_text()), normalize(&names)],
                )
            })
            .collect();

        let vectorizer = Vectorizer::from_corpus(
            references
                .iter()
                .flat_map(|(_, texts)| texts.iter().map(String::as_str)),
            2,
        );

        let prototypes = references
            .iter()
            .map(|(_, texts)| {
                texts
                    .iter()
                    .map(|t| unit(&to_floats(&vectorizer.vectorize(t))))
                    .collect()
            })
            .collect();

        Self {
            classes: references
                .iter()
                .map(|(l, _)| l.spdx_id().to_string())
                .collect(),
            vectorizer,
            prototypes,
            temperature: Self::DEFAULT_TEMPERATURE,
        }
    }

}

impl ClassifierModel for CentroidModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    fn predict(&self, features: &[f32]) -> Prediction {
        // Trailing length component is not part of the prototypes.
        let counts = &features[..features.len().min(self.vectorizer.len())];
        let query = unit(counts);
        let scores: Vec<f32> = self
            .prototypes
            .iter()
            .map(|class| {
                class
                    .iter()
                    .map(|p| dot(&query, p))
                    .fold(0.0f32, f32::max)
                    * self.temperature
            })
            .collect();
        Prediction::from_scores(&scores)
    }
}

/// Serialized form of a pretrained multinomial logistic regression.
#[derive(Debug, Deserialize)]
struct LinearModelFile {
    vocabulary: Vec<String>,
    classes: Vec<String>,
    /// One row per class, `vocabulary.len() + 1` columns.
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

pub struct LinearModel {
    vectorizer: Vectorizer,
    classes: Vec<String>,
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl LinearModel {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let file: LinearModelFile = serde_json::from_str(json)?;
        let width = file.vocabulary.len() + 1;

        if file.classes.is_empty() {
            return Err(ModelError::Shape("model has no classes".to_string()));
        }
        if file.weights.len() != file.classes.len() || file.bias.len() != file.classes.len() {
            return Err(ModelError::Shape(format!(
                "{} classes but {} weight rows and {} biases",
                file.classes.len(),
                file.weights.len(),
                file.bias.len()
            )));
        }
        if let Some(row) = file.weights.iter().find(|row| row.len() != width) {
            return Err(ModelError::Shape(format!(
                "weight row has {} columns, expected {}",
                row.len(),
                width
            )));
        }

        Ok(Self {
            vectorizer: Vectorizer::new(file.vocabulary),
            classes: file.classes,
            weights: file.weights,
            bias: file.bias,
        })
    }
}

impl ClassifierModel for LinearModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    fn predict(&self, features: &[f32]) -> Prediction {
        let scores: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| dot(row, features) + b)
            .collect();
        Prediction::from_scores(&scores)
    }
}

pub fn to_floats(counts: &[u32]) -> Vec<f32> {
    counts.iter().map(|&c| c as f32).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn unit(v: &[f32]) -> Vec<f32> {
    let norm = dot(v, v).sqrt();
    if norm == 0.0 {
        return vec![0.0; v.len()];
    }
    v.iter().map(|x| x / norm).collect()
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn test_zero_vector_is_uniform() {
        let model = CentroidModel::from_catalog();
        let features = vec![0.0; model.vectorizer().len() + 1];
        let prediction = model.predict(&features);
        let expected = 1.0 / model.classes().len() as f32;
        assert!((prediction.confidence() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_centroid_model_recognises_reference_text() {
        let model = CentroidModel::from_catalog();
        let text = normalize(SupportedLicense::Apache2.full_text());
        let features = to_floats(&model.vectorizer().vectorize_with_length(&text));
        let prediction = model.predict(&features);
        assert_eq!(model.classes()[prediction.class], "Apache-2.0");
        assert!(prediction.confidence() > 0.9);
    }

    #[test]
    fn test_linear_model_from_json() {
        let json = r#"{
            "vocabulary": ["mit", "apache"],
            "classes": ["MIT", "Apache-2.0"],
            "weights": [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0]],
            "bias": [0.0, 0.0]
        }"#;
        let model = LinearModel::from_json(json).unwrap();
        let features = to_floats(&model.vectorizer().vectorize_with_length("apache"));
        let prediction = model.predict(&features);
        assert_eq!(prediction.class, 1);
        assert!(prediction.confidence() > 0.99);
    }

    #[test]
    fn test_linear_model_rejects_bad_shape() {
        let json = r#"{
            "vocabulary": ["mit"],
            "classes": ["MIT"],
            "weights": [[1.0]],
            "bias": [0.0]
        }"#;
        assert!(matches!(
            LinearModel::from_json(json),
            Err(ModelError::Shape(_))
        ));
    }
}
