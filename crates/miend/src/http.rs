//! HTTP surface: the page routes, the JSON API, and multipart handling.

use crate::engine::EngineError;
use crate::page::{self, DetectedFace, RecognitionView};
use crate::state::AppState;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use mien_core::UNKNOWN_LABEL;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Build the daemon router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/enroll", post(enroll))
        .route("/recognize", post(recognize))
        .route("/healthz", get(healthz))
        .route("/api/status", get(api_status))
        .route("/api/people", get(api_people))
        .route("/api/people/{name}", delete(api_remove_person))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[derive(Deserialize)]
struct IndexParams {
    notice: Option<String>,
}

async fn index(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IndexParams>,
) -> Html<String> {
    let names = state.gallery.names().await;
    Html(page::render(&names, params.notice.as_deref(), None))
}

/// The form fields the page posts.
struct UploadForm {
    name: Option<String>,
    image: Option<Vec<u8>>,
}

async fn read_form(mut multipart: Multipart) -> UploadForm {
    let mut form = UploadForm {
        name: None,
        image: None,
    };

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let field_name = field.name().map(str::to_string);
                match field_name.as_deref() {
                    Some("name") => {
                        if let Ok(text) = field.text().await {
                            form.name = Some(text);
                        }
                    }
                    Some("image") => {
                        if let Ok(bytes) = field.bytes().await {
                            // Browsers send an empty part when no file was picked.
                            if !bytes.is_empty() {
                                form.image = Some(bytes.to_vec());
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, "malformed multipart upload");
                break;
            }
        }
    }

    form
}

async fn enroll(State(state): State<Arc<AppState>>, multipart: Multipart) -> Redirect {
    let form = read_form(multipart).await;

    let Some(name) = form
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
    else {
        return Redirect::to("/?notice=missing_name");
    };
    let Some(image) = form.image else {
        return Redirect::to("/?notice=missing_image");
    };

    match state.engine.enroll(image).await {
        Ok(outcome) => {
            let replaced = state.gallery.enroll(&name, outcome.embedding).await;
            tracing::info!(
                name = %name,
                confidence = outcome.confidence,
                faces_found = outcome.faces_found,
                replaced,
                "person enrolled"
            );
            Redirect::to(if replaced {
                "/?notice=replaced"
            } else {
                "/?notice=enrolled"
            })
        }
        Err(EngineError::NoFaceDetected) => Redirect::to("/?notice=no_face"),
        Err(EngineError::Image(err)) => {
            tracing::warn!(error = %err, "enroll: upload is not a decodable image");
            Redirect::to("/?notice=bad_image")
        }
        Err(err) => {
            tracing::error!(error = %err, "enroll failed");
            Redirect::to("/?notice=error")
        }
    }
}

async fn recognize(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let form = read_form(multipart).await;

    let Some(image) = form.image else {
        return Redirect::to("/?notice=missing_image").into_response();
    };

    let gallery = state.gallery.snapshot().await;
    let threshold = state.config.similarity_threshold;

    match state.engine.recognize(image, gallery, threshold).await {
        Ok(outcome) => {
            let view = RecognitionView {
                image_data_uri: format!(
                    "data:image/jpeg;base64,{}",
                    BASE64.encode(&outcome.image_jpeg)
                ),
                faces: outcome
                    .faces
                    .iter()
                    .map(|f| DetectedFace {
                        label: f
                            .name
                            .clone()
                            .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
                        similarity: f.name.is_some().then_some(f.similarity),
                    })
                    .collect(),
            };
            let names = state.gallery.names().await;
            Html(page::render(&names, None, Some(&view))).into_response()
        }
        Err(EngineError::Image(err)) => {
            tracing::warn!(error = %err, "recognize: upload is not a decodable image");
            Redirect::to("/?notice=bad_image").into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "recognize failed");
            Redirect::to("/?notice=error").into_response()
        }
    }
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn api_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started.elapsed().as_secs(),
        "people_enrolled": state.gallery.count().await,
        "similarity_threshold": state.config.similarity_threshold,
        "detector": format!("scrfd {}", mien_core::SCRFD_MODEL_VERSION),
        "recognizer": format!("arcface {}", mien_core::ARCFACE_MODEL_VERSION),
    }))
}

async fn api_people(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let people: Vec<_> = state
        .gallery
        .snapshot()
        .await
        .into_iter()
        .map(|p| {
            json!({
                "name": p.name,
                "enrolled_at": p.enrolled_at,
                "model_version": p.embedding.model_version,
            })
        })
        .collect();
    Json(json!(people))
}

async fn api_remove_person(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    if state.gallery.remove(&name).await {
        tracing::info!(name = %name, "person removed");
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no such person", "name": name })),
        )
            .into_response()
    }
}
