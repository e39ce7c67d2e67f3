use std::sync::Arc;

use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use bugtrack_store::{
    Bug, BugFields, BugFilter, BugQuery, BugStore, Comment, CustomerFields, SortField, SortOrder,
    StoreError,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{Environment, ServerConfig};
use crate::envelope::ApiResponse;
use crate::error::{ApiError, ErrorDetail, SERVER_ERROR_MESSAGE};
use crate::notify::{Notifier, NotifyError};

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to open bug store: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notifier(#[from] NotifyError),
    #[error("invalid frontend origin `{0}`")]
    InvalidOrigin(String),
    #[error("bind failed: {0}")]
    Bind(std::io::Error),
    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

/// Shared per-request state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<BugStore>,
    pub notifier: Notifier,
    pub environment: Environment,
}

impl AppState {
    pub fn new(store: BugStore, notifier: Notifier, environment: Environment) -> Self {
        Self {
            store: Arc::new(store),
            notifier,
            environment,
        }
    }
}

/// JSON body extractor whose rejections use the API envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Build the API router. CORS is layered on by [`serve`].
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health).fallback(method_not_allowed))
        .route(
            "/api/bugs",
            get(list_bugs)
                .post(create_bug)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/bugs/feedback",
            post(create_feedback_bug).fallback(method_not_allowed),
        )
        .route(
            "/api/bugs/:id",
            get(get_bug)
                .put(replace_bug)
                .delete(delete_bug)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/bugs/:id/status",
            patch(set_status).fallback(method_not_allowed),
        )
        .route(
            "/api/bugs/:id/comments",
            post(append_comment).fallback(method_not_allowed),
        )
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(
            state.environment,
            expose_error_detail,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Restrict cross-origin access to `frontend_url`, or allow any origin.
pub fn cors_layer(frontend_url: Option<&str>) -> Result<CorsLayer, ServeError> {
    let Some(origin) = frontend_url.map(str::trim).filter(|o| !o.is_empty()) else {
        return Ok(CorsLayer::permissive());
    };
    let origin = HeaderValue::from_str(origin.trim_end_matches('/'))
        .map_err(|_| ServeError::InvalidOrigin(origin.to_string()))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Open the store, bind, and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), ServeError> {
    let store = BugStore::open(&config.bugs_path)?;
    let notifier = Notifier::from_url(config.webhook_url.as_deref())?;
    let cors = cors_layer(config.frontend_url.as_deref())?;

    info!(
        bind = %config.bind,
        bugs = %config.bugs_path.display(),
        environment = %config.environment,
        webhook = notifier.is_enabled(),
        "starting bugtrack API"
    );

    let router = app(AppState::new(store, notifier, config.environment)).layer(cors);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(ServeError::Bind)?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServeError::Serve)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// In development, re-render 500 bodies with the internal detail.
async fn expose_error_detail(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let detail = response.extensions_mut().remove::<ErrorDetail>();
    match detail {
        Some(ErrorDetail(detail)) if environment.is_development() => (
            response.status(),
            Json(ApiResponse::failure(SERVER_ERROR_MESSAGE).with_error(json!(detail))),
        )
            .into_response(),
        _ => response,
    }
}

/// Run a store call on the blocking pool.
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&BugStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    let result = tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?;
    Ok(result?)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn health() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message_only("bugtrack API is running"))
}

async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}

async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

async fn create_bug(
    State(state): State<AppState>,
    ApiJson(fields): ApiJson<BugFields>,
) -> Result<(StatusCode, Json<ApiResponse<Bug>>), ApiError> {
    let missing = fields.missing_required();
    if !missing.is_empty() {
        return Err(StoreError::MissingRequiredField(missing).into());
    }

    let bug = with_store(&state, move |store| store.create(fields)).await?;
    info!(bug_id = %bug.id, priority = bug.priority.as_str(), "bug created");
    state.notifier.bug_created(&bug);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(bug).with_message("Bug created successfully")),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    status: Option<String>,
    priority: Option<String>,
    source: Option<String>,
    assigned_to: Option<String>,
    sort_by: Option<String>,
    order: Option<String>,
}

impl ListParams {
    fn into_query(self) -> BugQuery {
        BugQuery {
            sort_by: SortField::parse_or_default(self.sort_by.as_deref()),
            order: SortOrder::parse_or_default(self.order.as_deref()),
            filter: BugFilter {
                status: non_blank(self.status),
                priority: non_blank(self.priority),
                source: non_blank(self.source),
                assigned_to: non_blank(self.assigned_to),
            },
        }
    }
}

async fn list_bugs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<Bug>>>, ApiError> {
    let query = params.into_query();
    let bugs = with_store(&state, move |store| store.find_all(&query)).await?;
    let count = bugs.len();
    Ok(Json(ApiResponse::ok(bugs).with_count(count)))
}

async fn get_bug(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Bug>>, ApiError> {
    let bug = with_store(&state, move |store| store.find_by_id(&id)).await?;
    Ok(Json(ApiResponse::ok(bug)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceRequest {
    #[serde(flatten)]
    fields: BugFields,
    #[serde(default)]
    updated_by: Option<String>,
}

async fn replace_bug(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ReplaceRequest>,
) -> Result<Json<ApiResponse<Bug>>, ApiError> {
    let ReplaceRequest { fields, updated_by } = request;
    let bug = with_store(&state, move |store| {
        store.replace_fields(&id, fields, non_blank(updated_by))
    })
    .await?;
    info!(bug_id = %bug.id, status = bug.status.as_str(), "bug updated");
    Ok(Json(
        ApiResponse::ok(bug).with_message("Bug updated successfully"),
    ))
}

async fn delete_bug(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Bug>>, ApiError> {
    let bug = with_store(&state, move |store| store.delete(&id)).await?;
    info!(bug_id = %bug.id, "bug deleted");
    Ok(Json(
        ApiResponse::ok(bug).with_message("Bug deleted successfully"),
    ))
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    by: Option<String>,
}

async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> Result<Json<ApiResponse<Bug>>, ApiError> {
    let Some(status) = non_blank(request.status) else {
        return Err(StoreError::MissingRequiredField(vec!["status".to_string()]).into());
    };
    let (reason, by) = (request.reason, non_blank(request.by));
    let bug = with_store(&state, move |store| {
        store.set_status(&id, &status, reason, by)
    })
    .await?;
    info!(bug_id = %bug.id, status = bug.status.as_str(), "bug status changed");
    Ok(Json(
        ApiResponse::ok(bug).with_message("Bug status updated successfully"),
    ))
}

#[derive(Debug, Deserialize)]
struct CommentRequest {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

async fn append_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<CommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Comment>>), ApiError> {
    let CommentRequest { author, message } = request;
    let comment = with_store(&state, move |store| {
        store.append_comment(&id, author, message)
    })
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(comment).with_message("Comment added successfully")),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    priority: Option<String>,
}

impl FeedbackRequest {
    fn missing_required(&self) -> Vec<String> {
        [
            ("title", &self.title),
            ("description", &self.description),
            ("customerName", &self.customer_name),
            ("customerEmail", &self.customer_email),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| name.to_string())
        .collect()
    }

    fn into_fields(self) -> BugFields {
        BugFields {
            title: self.title,
            description: self.description,
            priority: non_blank(self.priority),
            reported_by: self.customer_name.clone(),
            source: Some("customer".to_string()),
            customer: Some(CustomerFields {
                name: self.customer_name,
                email: self.customer_email,
                id: self.customer_id,
            }),
            ..BugFields::default()
        }
    }
}

async fn create_feedback_bug(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FeedbackRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Bug>>), ApiError> {
    let missing = request.missing_required();
    if !missing.is_empty() {
        return Err(StoreError::MissingRequiredField(missing).into());
    }

    let fields = request.into_fields();
    let bug = with_store(&state, move |store| store.create(fields)).await?;
    info!(bug_id = %bug.id, "customer feedback bug created");
    state.notifier.bug_created(&bug);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(bug).with_message("Feedback submitted successfully")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_treat_blank_filters_as_unset() {
        let query = ListParams {
            status: Some(String::new()),
            priority: Some("High".to_string()),
            sort_by: Some("priority".to_string()),
            order: Some("asc".to_string()),
            ..ListParams::default()
        }
        .into_query();
        assert_eq!(query.filter.status, None);
        assert_eq!(query.filter.priority.as_deref(), Some("High"));
        assert_eq!(query.sort_by, SortField::Priority);
        assert_eq!(query.order, SortOrder::Asc);
    }

    #[test]
    fn feedback_maps_customer_onto_bug_fields() {
        let request = FeedbackRequest {
            title: Some("Checkout fails".to_string()),
            description: Some("card declined".to_string()),
            customer_name: Some("Ada".to_string()),
            customer_email: Some("ada@example.test".to_string()),
            customer_id: None,
            priority: None,
        };
        assert!(request.missing_required().is_empty());
        let fields = request.into_fields();
        assert_eq!(fields.reported_by.as_deref(), Some("Ada"));
        assert_eq!(fields.source.as_deref(), Some("customer"));
        assert_eq!(
            fields.customer.and_then(|c| c.email).as_deref(),
            Some("ada@example.test")
        );
    }

    #[test]
    fn feedback_reports_missing_customer_fields() {
        let request = FeedbackRequest {
            title: Some("Checkout fails".to_string()),
            description: None,
            customer_name: None,
            customer_email: Some("ada@example.test".to_string()),
            customer_id: None,
            priority: None,
        };
        assert_eq!(
            request.missing_required(),
            vec!["description", "customerName"]
        );
    }

    #[test]
    fn cors_layer_rejects_unusable_origin() {
        assert!(cors_layer(None).is_ok());
        assert!(cors_layer(Some("http://localhost:3000")).is_ok());
        assert!(matches!(
            cors_layer(Some("http://bad\norigin")),
            Err(ServeError::InvalidOrigin(_))
        ));
    }
}
