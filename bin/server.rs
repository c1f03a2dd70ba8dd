// Pet Ledger System - Web Server
// REST API over the lending ledger. One mutex guards the store, so every
// transition runs as a single critical section.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use pet_ledger::{
    derive_identity, get_recent_events, insert_event, load_engine, persist_engine, AnimalType,
    Event, Gender, LendingError, Notification,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Inventory row response
#[derive(Serialize)]
struct InventoryRow {
    animal: String,
    count: u64,
}

/// Loan response
#[derive(Serialize)]
struct LoanResponse {
    caller: String,
    animal: String,
}

#[derive(Deserialize)]
struct StockRequest {
    animal: String,
    count: u64,
}

#[derive(Deserialize)]
struct BorrowRequest {
    age: u8,
    gender: String,
    animal: String,
}

// ============================================================================
// Error mapping
// ============================================================================

fn error_status(e: &LendingError) -> StatusCode {
    match e {
        LendingError::Unauthorized => StatusCode::FORBIDDEN,
        LendingError::InvalidAnimal
        | LendingError::InvalidAge
        | LendingError::IneligibleAnimal { .. } => StatusCode::BAD_REQUEST,
        LendingError::OutOfStock { .. }
        | LendingError::AlreadyBorrowing { .. }
        | LendingError::ProfileMismatch
        | LendingError::NothingBorrowed => StatusCode::CONFLICT,
    }
}

fn rejection(e: LendingError) -> axum::response::Response {
    (
        error_status(&e),
        Json(ApiResponse::<serde_json::Value>::error(e.to_string())),
    )
        .into_response()
}

fn internal_error(e: anyhow::Error) -> axum::response::Response {
    eprintln!("Error: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<serde_json::Value>::error(
            "internal server error",
        )),
    )
        .into_response()
}

/// Caller name from the X-Caller header
fn caller_name(headers: &HeaderMap) -> Result<String, axum::response::Response> {
    match headers.get("x-caller").and_then(|v| v.to_str().ok()) {
        Some(name) if !name.trim().is_empty() => Ok(name.to_string()),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<serde_json::Value>::error(
                "missing X-Caller header",
            )),
        )
            .into_response()),
    }
}

fn parse_animal(name: &str) -> Result<AnimalType, axum::response::Response> {
    AnimalType::parse(name).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<serde_json::Value>::error(format!(
                "unknown animal type: {}",
                name
            ))),
        )
            .into_response()
    })
}

/// Persist the engine and append the audit event for one transition
fn commit(
    conn: &mut Connection,
    engine: &pet_ledger::LendingEngine,
    note: &Notification,
    actor: &str,
) -> anyhow::Result<()> {
    persist_engine(conn, engine)?;
    insert_event(conn, &Event::from_notification(note, actor))?;
    Ok(())
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/inventory - All available counts
async fn get_inventory(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match load_engine(&conn) {
        Ok(engine) => {
            let rows: Vec<InventoryRow> = engine
                .inventory()
                .counts()
                .into_iter()
                .map(|(animal, count)| InventoryRow {
                    animal: animal.as_str().to_string(),
                    count,
                })
                .collect();

            (StatusCode::OK, Json(ApiResponse::ok(rows))).into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// GET /api/available/:animal - Single available count
async fn get_available(
    State(state): State<AppState>,
    Path(animal): Path<String>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    // Unknown names and the None sentinel both read as zero
    let animal = AnimalType::parse(&animal).unwrap_or(AnimalType::None);

    match load_engine(&conn) {
        Ok(engine) => {
            let row = InventoryRow {
                animal: animal.as_str().to_string(),
                count: engine.available_count(animal),
            };
            (StatusCode::OK, Json(ApiResponse::ok(row))).into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// GET /api/loans/:caller - The caller's outstanding loan
async fn get_loan(
    State(state): State<AppState>,
    Path(caller): Path<String>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    // Decode URL-encoded caller name
    let decoded_caller = urlencoding::decode(&caller)
        .unwrap_or_else(|_| caller.clone().into())
        .into_owned();

    match load_engine(&conn) {
        Ok(engine) => {
            let animal = engine.loans().current_loan(&derive_identity(&decoded_caller));
            let response = LoanResponse {
                caller: decoded_caller,
                animal: animal.as_str().to_string(),
            };
            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// GET /api/events - Recent audit events, newest first
async fn get_events(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match get_recent_events(&conn, 100) {
        Ok(events) => (StatusCode::OK, Json(ApiResponse::ok(events))).into_response(),
        Err(e) => internal_error(e),
    }
}

/// POST /api/stock - Administrator stocking
async fn post_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<StockRequest>,
) -> impl IntoResponse {
    let caller = match caller_name(&headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let animal = match parse_animal(&req.animal) {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    let mut conn = state.db.lock().unwrap();
    let mut engine = match load_engine(&conn) {
        Ok(e) => e,
        Err(e) => return internal_error(e),
    };

    match engine.add(&derive_identity(&caller), animal, req.count) {
        Ok(note) => match commit(&mut conn, &engine, &note, &caller) {
            Ok(()) => (
                StatusCode::OK,
                Json(ApiResponse::ok(InventoryRow {
                    animal: animal.as_str().to_string(),
                    count: engine.available_count(animal),
                })),
            )
                .into_response(),
            Err(e) => internal_error(e),
        },
        Err(e) => rejection(e),
    }
}

/// POST /api/borrow - Borrow one animal
async fn post_borrow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BorrowRequest>,
) -> impl IntoResponse {
    let caller = match caller_name(&headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let animal = match parse_animal(&req.animal) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let gender = match Gender::parse(&req.gender) {
        Some(g) => g,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<serde_json::Value>::error(format!(
                    "unknown gender: {}",
                    req.gender
                ))),
            )
                .into_response()
        }
    };

    let mut conn = state.db.lock().unwrap();
    let mut engine = match load_engine(&conn) {
        Ok(e) => e,
        Err(e) => return internal_error(e),
    };

    match engine.borrow(&derive_identity(&caller), req.age, gender, animal) {
        Ok(note) => match commit(&mut conn, &engine, &note, &caller) {
            Ok(()) => (
                StatusCode::OK,
                Json(ApiResponse::ok(LoanResponse {
                    caller,
                    animal: animal.as_str().to_string(),
                })),
            )
                .into_response(),
            Err(e) => internal_error(e),
        },
        Err(e) => rejection(e),
    }
}

/// POST /api/return - Return the caller's outstanding loan
async fn post_return(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let caller = match caller_name(&headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let mut conn = state.db.lock().unwrap();
    let mut engine = match load_engine(&conn) {
        Ok(e) => e,
        Err(e) => return internal_error(e),
    };

    match engine.return_animal(&derive_identity(&caller)) {
        Ok(note) => match commit(&mut conn, &engine, &note, &caller) {
            Ok(()) => (
                StatusCode::OK,
                Json(ApiResponse::ok(LoanResponse {
                    caller,
                    animal: note.animal().as_str().to_string(),
                })),
            )
                .into_response(),
            Err(e) => internal_error(e),
        },
        Err(e) => rejection(e),
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Pet Ledger System - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Open database
    let db_path = std::env::var("PET_LEDGER_DB").unwrap_or_else(|_| "pet_ledger.db".to_string());
    let db_path = std::path::Path::new(&db_path);

    if !db_path.exists() {
        eprintln!("❌ Ledger not found at {:?}", db_path);
        eprintln!("   Run: cargo run -- init <admin-name>");
        eprintln!("   to initialize the ledger first.");
        std::process::exit(1);
    }

    let conn = Connection::open(db_path).expect("Failed to open database");
    println!("✓ Ledger opened: {:?}", db_path);

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/inventory", get(get_inventory))
        .route("/available/:animal", get(get_available))
        .route("/loans/:caller", get(get_loan))
        .route("/events", get(get_events))
        .route("/stock", post(post_stock))
        .route("/borrow", post(post_borrow))
        .route("/return", post(post_return))
        .with_state(state.clone());

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   API: http://localhost:3000/api/inventory");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
