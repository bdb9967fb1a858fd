//! REST API Server for the SmartSpend tracker
//!
//! Exposes the transaction store, derived summaries and the advisory panel
//! over HTTP for a browser frontend.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::advisor::AdvisoryPanel;
use crate::error::SpendError;
use crate::models::{Category, NewTransaction, SummaryData, CURRENCIES, EXPENSE_CATEGORIES, INCOME_CATEGORIES};
use crate::store::TransactionStore;
use crate::summary::{compute_summary, expense_breakdown, sorted_by_date};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// =============================
/// Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryView {
    #[serde(flatten)]
    summary: SummaryData,
    savings_rate: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CurrencyView {
    code: &'static str,
    label: &'static str,
    symbol: &'static str,
}

#[derive(Debug, Serialize)]
struct CategoriesView {
    income: &'static [Category],
    expense: &'static [Category],
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(status: StatusCode, data: T) -> ApiResult {
    (status, Json(ApiResponse::success(data)))
}

fn fail(e: SpendError) -> ApiResult {
    let status = if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        error!(error = %e, "Request failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ApiResponse::error(e.to_string())))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<TransactionStore>,
    pub panel: Arc<AdvisoryPanel>,
}

impl ApiState {
    pub fn new(store: Arc<TransactionStore>, panel: Arc<AdvisoryPanel>) -> Self {
        Self { store, panel }
    }
}

/// Let the advisory panel react to the current sequence in the background.
///
/// The sequence is read with its store version so the panel can drop a task
/// that arrives after a newer one.
pub fn schedule_tip_refresh(state: &ApiState) {
    let store = state.store.clone();
    let panel = state.panel.clone();

    tokio::spawn(async move {
        let (version, transactions) = store.revision().await;
        let symbol = compute_summary(&transactions).currency_symbol;
        panel.observe(version, &transactions, &symbol).await;
    });
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Transaction Endpoints
/// =============================

async fn list_transactions(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let transactions = state.store.snapshot().await;

    match query.order.as_deref() {
        Some("date") => ok(StatusCode::OK, sorted_by_date(&transactions)),
        Some("inserted") | None => ok(StatusCode::OK, &*transactions),
        Some(other) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!(
                "unknown order {:?} (expected inserted or date)",
                other
            ))),
        ),
    }
}

async fn create_transaction(
    State(state): State<ApiState>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> ApiResult {
    let Json(new) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected transaction payload: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!(
                    "Invalid transaction: {}",
                    rejection.body_text()
                ))),
            );
        }
    };

    match state.store.add(new).await {
        Ok(transaction) => {
            schedule_tip_refresh(&state);
            ok(StatusCode::CREATED, transaction)
        }
        Err(e) => fail(e),
    }
}

async fn delete_transaction(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult {
    match state.store.remove(&id).await {
        Ok(removed) => {
            if removed {
                schedule_tip_refresh(&state);
            }
            ok(StatusCode::OK, serde_json::json!({ "id": id, "removed": removed }))
        }
        Err(e) => fail(e),
    }
}

async fn clear_transactions(
    State(state): State<ApiState>,
    Query(query): Query<ClearQuery>,
) -> ApiResult {
    if !query.confirm {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                "Clearing all data requires confirm=true".into(),
            )),
        );
    }

    match state.store.clear().await {
        Ok(removed) => {
            info!(removed, "All transactions cleared via API");
            schedule_tip_refresh(&state);
            ok(StatusCode::OK, serde_json::json!({ "removed": removed }))
        }
        Err(e) => fail(e),
    }
}

/// =============================
/// Derived Views
/// =============================

async fn get_summary(State(state): State<ApiState>) -> ApiResult {
    let transactions = state.store.snapshot().await;
    let summary = compute_summary(&transactions);
    let savings_rate = summary.savings_rate();

    ok(StatusCode::OK, SummaryView { summary, savings_rate })
}

async fn get_breakdown(State(state): State<ApiState>) -> ApiResult {
    let transactions = state.store.snapshot().await;
    ok(StatusCode::OK, expense_breakdown(&transactions))
}

async fn get_categories() -> ApiResult {
    ok(
        StatusCode::OK,
        CategoriesView {
            income: INCOME_CATEGORIES,
            expense: EXPENSE_CATEGORIES,
        },
    )
}

async fn get_currencies() -> ApiResult {
    let currencies: Vec<CurrencyView> = CURRENCIES
        .iter()
        .map(|c| CurrencyView {
            code: c.code(),
            label: c.label(),
            symbol: c.symbol(),
        })
        .collect();
    ok(StatusCode::OK, currencies)
}

/// =============================
/// Advisory Endpoints
/// =============================

async fn get_tips(State(state): State<ApiState>) -> ApiResult {
    ok(StatusCode::OK, state.panel.snapshot().await)
}

async fn refresh_tips(State(state): State<ApiState>) -> ApiResult {
    let (version, transactions) = state.store.revision().await;
    let symbol = compute_summary(&transactions).currency_symbol;

    let snapshot = state.panel.refresh(version, &transactions, &symbol).await;
    ok(StatusCode::OK, snapshot)
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/transactions",
            get(list_transactions)
                .post(create_transaction)
                .delete(clear_transactions),
        )
        .route("/api/transactions/:id", delete(delete_transaction))
        .route("/api/summary", get(get_summary))
        .route("/api/breakdown", get(get_breakdown))
        .route("/api/categories", get(get_categories))
        .route("/api/currencies", get(get_currencies))
        .route("/api/tips", get(get_tips))
        .route("/api/tips/refresh", post(refresh_tips))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initial tip load for a store that already has data
    schedule_tip_refresh(&state);

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
