use crate::services::Classification;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f32,
}

impl From<Classification> for PredictionResponse {
    fn from(result: Classification) -> Self {
        Self {
            class_name: result.label.to_string(),
            confidence: result.confidence,
        }
    }
}
