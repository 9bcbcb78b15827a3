// Bank Ledger - Web Server
// REST API over the bank transaction list filters

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use bank_ledger::config::Config;
use bank_ledger::logging::init_logging;
use bank_ledger::{
    export_to_string, list_transactions, open_database, BankTransaction, FilterError, FixedTenant,
    ListParams, SqliteStore, EXPORT_FILENAME,
};
use clap::Parser;
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

const COMPANY_HEADER: &str = "x-company-id";

#[derive(Parser, Debug)]
#[command(name = "ledger-server", about = "Bank transaction list API")]
struct ServerArgs {
    /// Path to config file
    #[arg(short, long, default_value = "bank-ledger.toml")]
    config: PathBuf,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (overrides config file)
    #[arg(short, long)]
    log_level: Option<String>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    /// Used when a request carries no company header
    default_company: Option<String>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.into()),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::error(message))).into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// Tenant, then the filtered rows, or the error response to send instead
fn fetch(state: &AppState, headers: &HeaderMap, params: &ListParams) -> Result<Vec<BankTransaction>, Response> {
    let company_id = headers
        .get(COMPANY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| state.default_company.clone())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "missing X-Company-Id header"))?;

    let conn = state.db.lock().map_err(|_| {
        tracing::error!("database mutex poisoned");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
    })?;

    list_transactions(&SqliteStore::new(&conn), &FixedTenant::new(company_id), params).map_err(
        |e| match e.downcast_ref::<FilterError>() {
            Some(filter_error) => error_response(StatusCode::BAD_REQUEST, filter_error.to_string()),
            None => {
                tracing::error!(error = %e, "error listing bank transactions");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to list bank transactions")
            }
        },
    )
}

/// GET /api/bank_transactions - List with name/filter/client_status/status/sort
async fn get_bank_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    match fetch(&state, &headers, &params) {
        Ok(transactions) => (StatusCode::OK, Json(ApiResponse::ok(transactions))).into_response(),
        Err(response) => response,
    }
}

/// GET /api/bank_transactions/export - Same filters, as a CSV download
async fn export_bank_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    let transactions = match fetch(&state, &headers, &params) {
        Ok(transactions) => transactions,
        Err(response) => return response,
    };

    match export_to_string(&transactions) {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={}", EXPORT_FILENAME),
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "error exporting bank transactions");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to export bank transactions")
        }
    }
}

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/bank_transactions", get(get_bank_transactions))
        .route("/bank_transactions/export", get(export_bank_transactions))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging);

    let conn = open_database(&config.database.path)?;
    tracing::info!(path = ?config.database.path, "database opened");

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        default_company: config.tenant.company_id.clone(),
    };

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use bank_ledger::{insert_transactions, setup_database, read_csv};
    use tower::ServiceExt;

    const FIXTURE: &str = "\
id,company_id,date,description,bank_account_name,status,base_type,amount,deleted_at,is_deleted
tx-1,acme,2024-01-05,CLIENT PAYMENT,Operating,MATCHED,CREDIT,1200.00,,false
tx-2,acme,2024-01-06,RENT,Operating,UNMATCHED,DEBIT,-900.00,,false
tx-3,acme,2024-01-07,OLD FEE,Operating,UNMATCHED,DEBIT,-4.00,2024-02-01T00:00:00Z,false
tx-4,globex,2024-01-07,OTHER TENANT,Operating,MATCHED,CREDIT,10.00,,false
";

    fn test_state() -> AppState {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let rows = read_csv(csv::Reader::from_reader(FIXTURE.as_bytes())).unwrap();
        insert_transactions(&conn, &rows).unwrap();

        AppState {
            db: Arc::new(Mutex::new(conn)),
            default_company: None,
        }
    }

    async fn call(uri: &str, company: Option<&str>) -> (StatusCode, String) {
        let mut request = Request::builder().uri(uri);
        if let Some(company) = company {
            request = request.header(COMPANY_HEADER, company);
        }

        let response = app(test_state())
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_list_scoped_and_sorted() {
        let (status, body) = call(
            "/api/bank_transactions?status=active&sort=amount%7Cdesc",
            Some("acme"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let ids: Vec<&str> = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tx| tx["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["tx-1", "tx-2"]);
    }

    #[tokio::test]
    async fn test_bad_sort_is_400() {
        let (status, body) = call("/api/bank_transactions?sort=amount", Some("acme")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("invalid argument"));
    }

    #[tokio::test]
    async fn test_missing_company_is_400() {
        let (status, _) = call("/api/bank_transactions", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let (status, body) = call(
            "/api/bank_transactions/export?client_status=deposits",
            Some("acme"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("tx-1,"));
    }
}
