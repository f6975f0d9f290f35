//! ONNX Runtime backed classifier.
//!
//! Expects the Keras model exported to ONNX with a single NHWC float input of
//! shape `[1, size, size, 3]` and a single `[1, 38]` probability output. Both
//! are checked when the model loads.

use super::{ClassifierError, ImageClassifier};
use crate::config::ModelConfig;
use crate::services::labels::NUM_CLASSES;
use crate::services::preprocess::{ImageTensor, CHANNELS};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::tensor::TensorElementType;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;

pub struct OnnxClassifier {
    // `Session::run` needs exclusive access; the lock is held for one pass.
    session: Mutex<Session>,
    input_name: String,
    name: String,
    input_size: u32,
}

impl OnnxClassifier {
    /// Load the model from disk. Any failure here is fatal for startup.
    pub fn load(config: &ModelConfig) -> Result<Self, ClassifierError> {
        let path = Path::new(&config.path);
        if !path.is_file() {
            return Err(ClassifierError::ModelNotFound(path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(load_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_err)?
            .with_intra_threads(config.intra_threads)
            .map_err(load_err)?
            .commit_from_file(path)
            .map_err(load_err)?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| ClassifierError::ModelLoad("model declares no inputs".to_string()))?;
        let output = session.outputs.first().ok_or_else(|| {
            ClassifierError::ModelLoad("model declares no outputs".to_string())
        })?;

        check_signature(
            input.input_type.tensor_type(),
            input.input_type.tensor_shape().map(|shape| &shape[..]),
            output.output_type.tensor_shape().map(|shape| &shape[..]),
            config.input_size,
        )?;
        let input_name = input.name.clone();

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("model")
            .to_string();

        tracing::info!(
            model = %name,
            input = %input_name,
            input_size = config.input_size,
            intra_threads = config.intra_threads,
            "Loaded ONNX model"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            name,
            input_size: config.input_size,
        })
    }
}

impl ImageClassifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        let tensor = Tensor::from_array((input.shape, input.data.clone()))
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::Inference("model session poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        Ok(scores.to_vec())
    }
}

fn load_err<E: std::fmt::Display>(e: E) -> ClassifierError {
    ClassifierError::ModelLoad(e.to_string())
}

/// Reject models whose declared I/O cannot take an NHWC f32 image of
/// `size` x `size` or does not end in one score per class.
///
/// Dynamic dimensions (`-1`) match anything.
fn check_signature(
    input_type: Option<TensorElementType>,
    input_shape: Option<&[i64]>,
    output_shape: Option<&[i64]>,
    size: u32,
) -> Result<(), ClassifierError> {
    if input_type != Some(TensorElementType::Float32) {
        return Err(ClassifierError::ModelLoad(format!(
            "model input must be a float32 tensor, found {:?}",
            input_type
        )));
    }

    let expected_input = [-1, size as i64, size as i64, CHANNELS as i64];
    let input_shape = input_shape.unwrap_or_default();
    if !dims_match(input_shape, &expected_input) {
        return Err(ClassifierError::ModelLoad(format!(
            "model input shape {:?} does not accept [1, {}, {}, {}]",
            input_shape, size, size, CHANNELS
        )));
    }

    let output_shape = output_shape.unwrap_or_default();
    match output_shape.last() {
        Some(&dim) if dim == -1 || dim == NUM_CLASSES as i64 => Ok(()),
        _ => Err(ClassifierError::ModelLoad(format!(
            "model output shape {:?} does not end in {} classes",
            output_shape, NUM_CLASSES
        ))),
    }
}

fn dims_match(declared: &[i64], expected: &[i64]) -> bool {
    declared.len() == expected.len()
        && declared
            .iter()
            .zip(expected)
            .all(|(&d, &e)| d == -1 || e == -1 || d == e)
}
