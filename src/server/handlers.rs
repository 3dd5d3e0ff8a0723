use crate::dispatcher::{BatchRequest, TranslationRequest};
use crate::error::{PolyglotError, Result};
use crate::language::AUTO;
use crate::server::types::*;
use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

const SERVICE_NAME: &str = "polyglot";

fn status_for(error: &PolyglotError) -> StatusCode {
    match error {
        PolyglotError::Validation(_) => StatusCode::BAD_REQUEST,
        // Backend failures are reported in the body, not the status line.
        _ => StatusCode::OK,
    }
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Multi-backend translation API with rate limiting, retries and fallback",
        "endpoints": {
            "translate": "POST /translate",
            "batch": "POST /translate_batch",
            "languages": "GET /languages[?backend=id]",
            "services": "GET /services",
            "health": "GET /health",
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        enabled_backends: state
            .dispatcher
            .enabled_backends()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

pub async fn languages(
    State(state): State<AppState>,
    Query(query): Query<LanguagesQuery>,
) -> std::result::Result<Json<LanguagesResponse>, (StatusCode, Json<ErrorResponse>)> {
    let languages = state
        .dispatcher
        .supported_languages(query.backend.as_deref())
        .map_err(|e| (status_for(&e), Json(ErrorResponse::from(&e))))?;

    let names: Vec<&'static str> = std::iter::once(AUTO)
        .chain(languages.iter().map(|l| l.name))
        .collect();

    Ok(Json(LanguagesResponse {
        count: names.len(),
        languages: names,
    }))
}

pub async fn services(State(state): State<AppState>) -> Json<ServicesResponse> {
    let services = state
        .config
        .backends
        .iter()
        .map(|backend| {
            let rate_status = state.dispatcher.rate_status(&backend.id);
            ServiceInfo {
                id: backend.id.clone(),
                kind: backend.kind.to_string(),
                category: backend.kind.category(),
                priority: backend.priority,
                enabled: rate_status.is_some(),
                max_text_length: backend.max_text_length(),
                rate_limits: backend.rate_limits(),
                rate_status,
            }
        })
        .collect();

    Json(ServicesResponse { services })
}

fn build_request(body: TranslateBody) -> Result<TranslationRequest> {
    let request = TranslationRequest::new(body.text, &body.source_lang, &body.target_lang)?;
    Ok(match body.backend {
        Some(id) => request.with_backend(id),
        None => request,
    })
}

pub async fn translate(
    State(state): State<AppState>,
    Json(body): Json<TranslateBody>,
) -> (StatusCode, Json<TranslateResponse>) {
    let source_lang = body.source_lang.clone();
    let target_lang = body.target_lang.clone();

    let outcome = match build_request(body) {
        Ok(request) => state.dispatcher.translate(&request).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(result) => (
            StatusCode::OK,
            Json(TranslateResponse::success(result, &source_lang, &target_lang)),
        ),
        Err(e) => {
            warn!("Translation request failed: {}", e);
            (
                status_for(&e),
                Json(TranslateResponse::failure(&e, &source_lang, &target_lang)),
            )
        }
    }
}

pub async fn translate_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchBody>,
) -> (StatusCode, Json<BatchResponse>) {
    let total_texts = body.texts.len();
    let batch = BatchRequest::new(
        body.texts,
        &body.source_lang,
        &body.target_lang,
        state.config.max_batch_size,
    )
    .map(|batch| match body.backend {
        Some(id) => batch.with_backend(id),
        None => batch,
    });

    let batch = match batch {
        Ok(batch) => batch,
        Err(e) => {
            warn!("Rejected batch of {} texts: {}", total_texts, e);
            return (
                status_for(&e),
                Json(BatchResponse {
                    success: false,
                    translations: Vec::new(),
                    total_texts,
                    successful_translations: 0,
                    message: Some(e.to_string()),
                }),
            );
        }
    };

    let translations: Vec<TranslateResponse> = state
        .dispatcher
        .translate_batch(&batch)
        .await
        .into_iter()
        .map(|outcome| match outcome {
            Ok(result) => TranslateResponse::success(result, &body.source_lang, &body.target_lang),
            Err(e) => TranslateResponse::failure(&e, &body.source_lang, &body.target_lang),
        })
        .collect();

    let successful_translations = translations.iter().filter(|t| t.success).count();
    info!(
        "Batch request: {}/{} texts translated",
        successful_translations, total_texts
    );

    (
        StatusCode::OK,
        Json(BatchResponse {
            success: successful_translations > 0,
            translations,
            total_texts,
            successful_translations,
            message: None,
        }),
    )
}
