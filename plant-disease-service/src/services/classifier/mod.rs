//! Image classifier abstraction.
//!
//! The loaded model sits behind [`ImageClassifier`] so the HTTP layer never
//! touches the runtime directly and tests can substitute a fixed-output mock.

pub mod mock;
pub mod onnx;

use super::labels::{label_for, NUM_CLASSES};
use super::preprocess::ImageTensor;
use std::path::PathBuf;
use thiserror::Error;

/// Slack allowed around `[0, 1]` before scores are read as logits.
const PROBABILITY_TOLERANCE: f32 = 1e-4;

/// Error type for classifier operations.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unexpected model output: expected {expected} scores, got {actual}")]
    OutputShape { expected: usize, actual: usize },
}

impl ClassifierError {
    /// Short label used for failure metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierError::ModelNotFound(_) | ClassifierError::ModelLoad(_) => "model",
            ClassifierError::Decode(_) => "decode",
            ClassifierError::Inference(_) => "inference",
            ClassifierError::OutputShape { .. } => "output_shape",
        }
    }
}

/// A loaded classification model.
///
/// Implementations are synchronous; callers run them on the blocking pool.
pub trait ImageClassifier: Send + Sync {
    /// Human-readable model identifier (for logs and readiness).
    fn name(&self) -> &str;

    /// Edge length of the square input the model expects.
    fn input_size(&self) -> u32;

    /// Whether the model is loaded and able to serve.
    fn is_ready(&self) -> bool {
        true
    }

    /// Run one forward pass, returning one score per class.
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, ClassifierError>;
}

/// Winning class of a forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub index: usize,
    pub label: &'static str,
    pub confidence: f32,
}

impl Classification {
    /// Arg-max over `scores`, first occurrence winning ties.
    ///
    /// Scores within rounding error of `[0, 1]` are clamped and used as
    /// probabilities. Anything further out is treated as logits and passed
    /// through softmax so confidence stays within `[0, 1]`.
    pub fn from_scores(scores: &[f32]) -> Result<Self, ClassifierError> {
        if scores.len() != NUM_CLASSES {
            return Err(ClassifierError::OutputShape {
                expected: NUM_CLASSES,
                actual: scores.len(),
            });
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(ClassifierError::Inference(
                "model produced non-finite scores".to_string(),
            ));
        }

        let lower = -PROBABILITY_TOLERANCE;
        let upper = 1.0 + PROBABILITY_TOLERANCE;
        let probabilities = if scores.iter().all(|s| (lower..=upper).contains(s)) {
            scores.iter().map(|s| s.clamp(0.0, 1.0)).collect()
        } else {
            softmax(scores)
        };

        let (index, confidence) = argmax(&probabilities).ok_or_else(|| {
            ClassifierError::Inference("model produced no scores".to_string())
        })?;
        let label = label_for(index).ok_or(ClassifierError::OutputShape {
            expected: NUM_CLASSES,
            actual: index + 1,
        })?;

        Ok(Classification {
            index,
            label,
            confidence,
        })
    }
}

/// Index and value of the largest element; the first one wins on ties.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
