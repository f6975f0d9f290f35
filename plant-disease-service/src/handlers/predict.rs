use crate::dtos::PredictionResponse;
use crate::services::{prepare_image, Classification};
use crate::startup::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Extension, Json,
};
use service_core::error::AppError;
use service_core::middleware::RequestId;
use std::time::Instant;

/// Multipart field carrying the image.
const FILE_FIELD: &str = "file";

struct ImageUpload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

pub async fn predict(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    let multipart = multipart.map_err(|rejection| {
        AppError::BadRequest(anyhow::anyhow!(
            "Expected a multipart form: {}",
            rejection.body_text()
        ))
    })?;
    let upload = read_image_upload(multipart).await?;

    if !state.classifier.is_ready() {
        return Err(AppError::ServiceUnavailable);
    }

    tracing::info!(
        request_id = %request_id.0,
        file_name = %upload.file_name,
        content_type = %upload.content_type,
        size = upload.bytes.len(),
        "Classifying upload"
    );

    let classifier = state.classifier.clone();
    let start = Instant::now();
    let outcome = tokio::task::spawn_blocking(move || {
        let tensor = prepare_image(&upload.bytes, classifier.input_size())?;
        let scores = classifier.predict(&tensor)?;
        Classification::from_scores(&scores)
    })
    .await
    .map_err(|e| AppError::InternalError(anyhow::anyhow!("classification task failed: {}", e)))?;

    metrics::histogram!("prediction_duration_seconds").record(start.elapsed().as_secs_f64());

    let result = outcome.inspect_err(|e| {
        metrics::counter!("prediction_failures_total", "kind" => e.kind()).increment(1);
    })?;

    metrics::counter!("predictions_total", "class" => result.label).increment(1);
    tracing::info!(
        request_id = %request_id.0,
        class = result.label,
        confidence = result.confidence,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Prediction complete"
    );

    Ok(Json(PredictionResponse::from(result)))
}

/// Pull the `file` field out of the form and check it claims to be an image.
async fn read_image_upload(mut multipart: Multipart) -> Result<ImageUpload, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !is_image_content_type(&content_type) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "File provided is not an image"
            )));
        }

        let file_name = field.file_name().unwrap_or("unnamed").to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();

        return Ok(ImageUpload {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(AppError::BadRequest(anyhow::anyhow!("No file uploaded")))
}

fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload exceeds the size limit".to_string())
    } else {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart form: {}", err.body_text()))
    }
}
