//! Mapping of domain failures onto HTTP errors with client-safe messages.

use crate::services::providers::ProviderError;
use crate::services::ClassifierError;
use service_core::error::AppError;

impl From<ClassifierError> for AppError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Decode(reason) => {
                tracing::warn!(%reason, "Rejected undecodable image");
                AppError::UnprocessableEntity(anyhow::anyhow!("Unable to decode image"))
            }
            ClassifierError::ModelNotFound(_) | ClassifierError::ModelLoad(_) => {
                tracing::error!(error = %err, "Model unavailable");
                AppError::ServiceUnavailable
            }
            ClassifierError::Inference(_) | ClassifierError::OutputShape { .. } => {
                AppError::InternalError(anyhow::Error::new(err))
            }
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        tracing::error!(error = %err, kind = err.kind(), "Chat provider failed");
        match err {
            ProviderError::RateLimited | ProviderError::NotConfigured(_) => {
                AppError::ServiceUnavailable
            }
            ProviderError::Timeout => {
                AppError::GatewayTimeout("upstream chat service timed out".to_string())
            }
            ProviderError::ApiError { .. } => {
                AppError::BadGateway("upstream chat service error".to_string())
            }
            ProviderError::NetworkError(_) => {
                AppError::BadGateway("upstream chat service unreachable".to_string())
            }
            ProviderError::MalformedResponse(_) => {
                AppError::BadGateway("malformed upstream response".to_string())
            }
        }
    }
}
