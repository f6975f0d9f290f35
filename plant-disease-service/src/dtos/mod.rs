pub mod chat;
pub mod prediction;

pub use chat::{ChatRequest, ChatResponse};
pub use prediction::PredictionResponse;
