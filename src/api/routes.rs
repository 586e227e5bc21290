//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ApiState>`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::allocator::Allocator;
use crate::journey::{BetEntry, Fingerprint, JourneyLog, JourneyReport, ProgressTracker};
use crate::storage::{self, JourneyStore};
use crate::types::{AllocationInput, Book, StakeError, StakePlan};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub allocator: Mutex<Allocator>,
    pub store: Arc<dyn JourneyStore>,
    /// Journeys loaded so far, keyed by canonical storage key.
    pub journeys: RwLock<HashMap<String, JourneyLog>>,
}

impl ApiState {
    pub fn new(store: Arc<dyn JourneyStore>) -> Self {
        Self::with_allocator(Allocator::with_entropy(), store)
    }

    pub fn with_allocator(allocator: Allocator, store: Arc<dyn JourneyStore>) -> Self {
        Self {
            allocator: Mutex::new(allocator),
            store,
            journeys: RwLock::new(HashMap::new()),
        }
    }
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    Stake(StakeError),
    NotFound(String),
}

impl From<StakeError> for ApiError {
    fn from(e: StakeError) -> Self {
        ApiError::Stake(e)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Stake(e @ StakeError::Configuration(_)) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Stake(e @ StakeError::InvalidEntry(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            ApiError::Stake(e @ StakeError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReallocateRequest {
    pub deposit_a: f64,
    pub deposit_b: f64,
    pub input: AllocationInput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddEntryRequest {
    pub book: Book,
    pub amount: Decimal,
    #[serde(default)]
    pub is_bonus: bool,
    /// Defaults to `book`.
    #[serde(default)]
    pub fund_source: Option<Book>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /api/allocate
pub async fn allocate(
    State(state): State<AppState>,
    Json(input): Json<AllocationInput>,
) -> Result<Json<StakePlan>, ApiError> {
    let plan = state.allocator.lock().await.allocate(&input)?;
    Ok(Json(plan))
}

/// POST /api/reallocate
pub async fn reallocate(
    State(state): State<AppState>,
    Json(req): Json<ReallocateRequest>,
) -> Result<Json<StakePlan>, ApiError> {
    let plan = state
        .allocator
        .lock()
        .await
        .reallocate(req.deposit_a, req.deposit_b, &req.input)?;
    Ok(Json(plan))
}

/// GET /api/journey/:key
pub async fn get_journey(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<JourneyLog>, ApiError> {
    let fingerprint: Fingerprint = key.parse()?;
    let mut journeys = state.journeys.write().await;
    let log = cached_log(&mut journeys, state.store.as_ref(), &fingerprint).await;
    Ok(Json(log.clone()))
}

/// DELETE /api/journey/:key
pub async fn clear_journey(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    let fingerprint: Fingerprint = key.parse()?;
    let mut journeys = state.journeys.write().await;
    let log = cached_log(&mut journeys, state.store.as_ref(), &fingerprint).await;
    storage::clear_journey(state.store.as_ref(), &fingerprint, log).await?;
    info!(key = %fingerprint, "Journey cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/journey/:key/entries
pub async fn add_entry(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<AddEntryRequest>,
) -> Result<(StatusCode, Json<BetEntry>), ApiError> {
    let fingerprint: Fingerprint = key.parse()?;
    let mut journeys = state.journeys.write().await;
    let log = cached_log(&mut journeys, state.store.as_ref(), &fingerprint).await;

    let entry = log.add_entry(req.book, req.amount, req.is_bonus, req.fund_source)?;
    persist(state.store.as_ref(), &fingerprint, log).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// DELETE /api/journey/:key/entries/:book/:id
pub async fn remove_entry(
    State(state): State<AppState>,
    Path((key, book, id)): Path<(String, Book, String)>,
) -> Result<Json<BetEntry>, ApiError> {
    let fingerprint: Fingerprint = key.parse()?;
    let mut journeys = state.journeys.write().await;
    let log = cached_log(&mut journeys, state.store.as_ref(), &fingerprint).await;

    let removed = log
        .remove_entry(book, &id)
        .ok_or_else(|| ApiError::NotFound(format!("No entry {id} on {book}")))?;
    persist(state.store.as_ref(), &fingerprint, log).await?;
    Ok(Json(removed))
}

/// POST /api/journey/:key/progress
pub async fn progress(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(plan): Json<StakePlan>,
) -> Result<Json<JourneyReport>, ApiError> {
    let fingerprint: Fingerprint = key.parse()?;
    if plan.fingerprint() != fingerprint {
        warn!(key = %fingerprint, plan = %plan.fingerprint(), "Plan does not match journey key");
    }

    let mut journeys = state.journeys.write().await;
    let log = cached_log(&mut journeys, state.store.as_ref(), &fingerprint).await;
    Ok(Json(ProgressTracker::new(&plan).report(log)))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Cached journey for `fingerprint`, loading it from the store on first use.
async fn cached_log<'a>(
    journeys: &'a mut HashMap<String, JourneyLog>,
    store: &dyn JourneyStore,
    fingerprint: &Fingerprint,
) -> &'a mut JourneyLog {
    let key = fingerprint.key();
    if !journeys.contains_key(&key) {
        let log = storage::load_journey(store, fingerprint).await;
        journeys.insert(key.clone(), log);
    }
    journeys.entry(key).or_default()
}

/// Save after a mutation. The cached log keeps the mutation either way.
async fn persist(
    store: &dyn JourneyStore,
    fingerprint: &Fingerprint,
    log: &JourneyLog,
) -> Result<(), StakeError> {
    storage::save_journey(store, fingerprint, log)
        .await
        .inspect_err(|e| warn!(key = %fingerprint, error = %e, "Journey kept in memory only"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rust_decimal_macros::dec;

    fn test_state() -> AppState {
        Arc::new(ApiState::new(Arc::new(MemoryStore::default())))
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (ApiError::Stake(StakeError::Configuration("x".into())), StatusCode::BAD_REQUEST),
            (
                ApiError::Stake(StakeError::InvalidEntry("x".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::Stake(StakeError::Storage("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_add_entry_request_defaults() {
        let req: AddEntryRequest =
            serde_json::from_str(r#"{"book":"B","amount":120.5}"#).unwrap();
        assert_eq!(req.book, Book::B);
        assert_eq!(req.amount, dec!(120.5));
        assert!(!req.is_bonus);
        assert!(req.fund_source.is_none());
    }

    #[tokio::test]
    async fn test_allocate_handler() {
        let state = test_state();
        let Json(plan) = allocate(State(state), Json(AllocationInput::default()))
            .await
            .unwrap();
        assert!(plan.deposit_a + plan.deposit_b <= 15_000.0);
    }

    #[tokio::test]
    async fn test_cached_log_loads_once() {
        let state = test_state();
        let fp: Fingerprint = "betting-journey-1.6-2.35-15000".parse().unwrap();
        {
            let mut journeys = state.journeys.write().await;
            let log = cached_log(&mut journeys, state.store.as_ref(), &fp).await;
            log.add_entry(Book::A, dec!(10), false, None).unwrap();
        }
        // Nothing was saved, so a reload would be empty; the cache must win.
        let Json(log) = get_journey(State(state), Path(fp.key())).await.unwrap();
        assert_eq!(log.book_a.total_deposit, dec!(10));
    }

    #[tokio::test]
    async fn test_remove_unknown_entry_is_not_found() {
        let state = test_state();
        let result = remove_entry(
            State(state),
            Path((
                "betting-journey-1.6-2.35-15000".to_string(),
                Book::A,
                "missing".to_string(),
            )),
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
