//! Mock classifier for testing.

use super::{ClassifierError, ImageClassifier};
use crate::services::labels::NUM_CLASSES;
use crate::services::preprocess::ImageTensor;

enum Behaviour {
    Fixed(Vec<f32>),
    Brightness,
    Fail,
}

/// Mock classifier that never loads a model file.
pub struct MockClassifier {
    behaviour: Behaviour,
    ready: bool,
    input_size: u32,
}

impl MockClassifier {
    /// Always return `scores`, whatever the image.
    pub fn fixed(scores: Vec<f32>) -> Self {
        Self {
            behaviour: Behaviour::Fixed(scores),
            ready: true,
            input_size: 128,
        }
    }

    /// Pick the class from the mean pixel intensity, so different images map
    /// to different (but repeatable) classes.
    pub fn by_brightness() -> Self {
        Self {
            behaviour: Behaviour::Brightness,
            ready: true,
            input_size: 128,
        }
    }

    /// Fail every forward pass with an inference error.
    pub fn failing() -> Self {
        Self {
            behaviour: Behaviour::Fail,
            ready: true,
            input_size: 128,
        }
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }
}

impl ImageClassifier for MockClassifier {
    fn name(&self) -> &str {
        "mock"
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        match &self.behaviour {
            Behaviour::Fixed(scores) => Ok(scores.clone()),
            Behaviour::Brightness => {
                let mean = input.data.iter().sum::<f32>() / input.data.len().max(1) as f32;
                let index = ((mean / 256.0) * NUM_CLASSES as f32) as usize;
                let mut scores = vec![0.2 / (NUM_CLASSES - 1) as f32; NUM_CLASSES];
                scores[index.min(NUM_CLASSES - 1)] = 0.8;
                Ok(scores)
            }
            Behaviour::Fail => Err(ClassifierError::Inference(
                "mock forward pass failed".to_string(),
            )),
        }
    }
}
