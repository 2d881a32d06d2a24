use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::gateway::DataGateway;

use super::domain::{ApplicationId, ProviderId};
use super::service::{ProviderApprovalService, ProviderWorkflowError};

/// Reviewer input for rejections; missing notes are stored as an empty string.
#[derive(Debug, Default, Deserialize)]
pub struct RejectionRequest {
    #[serde(default)]
    pub notes: String,
}

/// Router exposing the application review queue and live provider administration.
pub fn provider_router<G>(service: Arc<ProviderApprovalService<G>>) -> Router
where
    G: DataGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/providers/applications",
            get(pending_applications_handler::<G>),
        )
        .route(
            "/api/v1/providers/applications/review",
            get(review_queue_handler::<G>),
        )
        .route(
            "/api/v1/providers/applications/:application_id/approve",
            post(approve_application_handler::<G>),
        )
        .route(
            "/api/v1/providers/applications/:application_id/reject",
            post(reject_application_handler::<G>),
        )
        .route("/api/v1/providers", get(providers_handler::<G>))
        .route("/api/v1/providers/stats", get(stats_handler::<G>))
        .route(
            "/api/v1/providers/:provider_id/approve",
            post(approve_provider_handler::<G>),
        )
        .route(
            "/api/v1/providers/:provider_id/reject",
            post(reject_provider_handler::<G>),
        )
        .with_state(service)
}

pub(crate) fn error_response(error: ProviderWorkflowError) -> Response {
    let status = match &error {
        ProviderWorkflowError::ApplicationNotFound(_)
        | ProviderWorkflowError::ProviderNotFound(_) => StatusCode::NOT_FOUND,
        ProviderWorkflowError::InvalidTransition { .. } => StatusCode::CONFLICT,
        ProviderWorkflowError::ProductSeller(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ProviderWorkflowError::Gateway(_) => StatusCode::BAD_GATEWAY,
        ProviderWorkflowError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn pending_applications_handler<G>(
    State(service): State<Arc<ProviderApprovalService<G>>>,
) -> Response
where
    G: DataGateway + 'static,
{
    match service.pending_applications().await {
        Ok(applications) => (StatusCode::OK, axum::Json(applications)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn review_queue_handler<G>(
    State(service): State<Arc<ProviderApprovalService<G>>>,
) -> Response
where
    G: DataGateway + 'static,
{
    match service.review_queue().await {
        Ok(queue) => (StatusCode::OK, axum::Json(queue.as_slice())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_application_handler<G>(
    State(service): State<Arc<ProviderApprovalService<G>>>,
    Path(application_id): Path<String>,
) -> Response
where
    G: DataGateway + 'static,
{
    let id = ApplicationId(application_id);
    match service.approve_by_id(&id).await {
        Ok(profile) => {
            let payload = json!({
                "application_id": id,
                "status": "approved",
                "provider": profile,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reject_application_handler<G>(
    State(service): State<Arc<ProviderApprovalService<G>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<RejectionRequest>,
) -> Response
where
    G: DataGateway + 'static,
{
    let id = ApplicationId(application_id);
    match service.reject_by_id(&id, &request.notes).await {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn providers_handler<G>(
    State(service): State<Arc<ProviderApprovalService<G>>>,
) -> Response
where
    G: DataGateway + 'static,
{
    match service.provider_listing().await {
        Ok(listing) => (StatusCode::OK, axum::Json(listing)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn stats_handler<G>(
    State(service): State<Arc<ProviderApprovalService<G>>>,
) -> Response
where
    G: DataGateway + 'static,
{
    match service.provider_stats().await {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_provider_handler<G>(
    State(service): State<Arc<ProviderApprovalService<G>>>,
    Path(provider_id): Path<String>,
) -> Response
where
    G: DataGateway + 'static,
{
    match service.approve_provider(&ProviderId(provider_id)).await {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reject_provider_handler<G>(
    State(service): State<Arc<ProviderApprovalService<G>>>,
    Path(provider_id): Path<String>,
    axum::Json(request): axum::Json<RejectionRequest>,
) -> Response
where
    G: DataGateway + 'static,
{
    match service
        .reject_provider(&ProviderId(provider_id), &request.notes)
        .await
    {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}
