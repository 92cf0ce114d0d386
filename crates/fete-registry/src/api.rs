//! HTTP API for the registry.

use crate::models::{RegistrantSummary, Registration};
use crate::node::RegistryState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fete_seating::{AdmissionError, Registrant, Resolution, SeatingReport, TierLevel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type AppState = Arc<RegistryState>;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health (at root and under /api/v1 for compatibility)
        .route("/health", get(health))
        .route("/api/v1/health", get(health))
        .route("/ready", get(ready))
        // Seating configuration and advisory lookups
        .route("/api/v1/tiers", get(list_tiers))
        .route("/api/v1/seating/quote", get(get_quote))
        // Registration
        .route("/api/v1/registrations", post(create_registration))
        .route("/api/v1/registrants", get(list_registrants))
        // Admin dashboard
        .route("/api/v1/admin/seating", get(get_seating_report))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// --- Errors ---

/// JSON error body. `message` is fixed per kind and safe to show users.
#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// Admission failure rendered as an HTTP response.
#[derive(Debug)]
struct ApiError(AdmissionError);

impl From<AdmissionError> for ApiError {
    fn from(e: AdmissionError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self.0 {
            AdmissionError::DuplicateIdentity { fields } => {
                let fields: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
                (
                    StatusCode::CONFLICT,
                    "duplicate_identity",
                    format!("Someone with this {} is already registered.", fields.join(" and ")),
                )
            }
            AdmissionError::FullyBooked => (
                StatusCode::CONFLICT,
                "fully_booked",
                "Sorry, the event is fully booked.".to_string(),
            ),
            AdmissionError::InvalidRequest(reason) => {
                (StatusCode::BAD_REQUEST, "invalid_request", capitalize(&reason))
            }
            AdmissionError::StorageUnavailable(detail) => {
                tracing::error!("Storage unavailable: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "unavailable",
                    "Failed to save. Please try again.".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: kind.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>() + ".",
        None => String::new(),
    }
}

// --- Health endpoints ---

async fn health() -> &'static str {
    "OK"
}

async fn ready() -> &'static str {
    "OK"
}

// --- Seating endpoints ---

#[derive(Debug, Serialize, Deserialize)]
struct TierSummary {
    level: TierLevel,
    name: String,
    capacity: u32,
}

async fn list_tiers(State(state): State<AppState>) -> Json<Vec<TierSummary>> {
    let tiers = state
        .engine
        .table()
        .tiers()
        .iter()
        .map(|t| TierSummary {
            level: t.level,
            name: t.name.clone(),
            capacity: t.capacity,
        })
        .collect();
    Json(tiers)
}

#[derive(Debug, Deserialize)]
struct QuoteParams {
    code: Option<String>,
}

/// Advisory placement for an invitation code.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    requested_level: TierLevel,
    requested_tier: String,
    effective_level: Option<TierLevel>,
    effective_tier: Option<String>,
    fully_booked: bool,
    downgraded: bool,
}

async fn get_quote(
    State(state): State<AppState>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let quote = state.engine.quote(params.code.as_deref())?;
    let table = state.engine.table();

    Ok(Json(QuoteResponse {
        requested_level: quote.requested,
        requested_tier: table.tier_name(quote.requested),
        effective_level: quote.resolution.level(),
        effective_tier: quote.resolution.level().map(|l| table.tier_name(l)),
        fully_booked: quote.resolution == Resolution::FullyBooked,
        downgraded: quote.resolution.is_downgrade(quote.requested),
    }))
}

// --- Registration endpoints ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationResponse {
    registrant: Registrant,
    requested_tier_name: String,
    effective_tier_name: String,
    downgraded: bool,
}

async fn create_registration(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!("Rejected registration body: {}", rejection.body_text());
        ApiError(AdmissionError::InvalidRequest(
            "registration needs a JSON body with name and email".to_string(),
        ))
    })?;
    let identity = req.identity()?;
    let registrant = state
        .engine
        .admit_with_code(identity, req.code.as_deref(), &req.knows)?;

    let table = state.engine.table();
    let response = RegistrationResponse {
        requested_tier_name: table.tier_name(registrant.requested_tier),
        effective_tier_name: table.tier_name(registrant.effective_tier),
        downgraded: registrant.was_downgraded(),
        registrant,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_registrants(
    State(state): State<AppState>,
) -> Result<Json<Vec<RegistrantSummary>>, ApiError> {
    let mut registrants = state.engine.registrants()?;
    registrants.sort_by_key(|r| r.name.to_lowercase());
    Ok(Json(registrants.iter().map(RegistrantSummary::from).collect()))
}

// --- Admin endpoints ---

async fn get_seating_report(
    State(state): State<AppState>,
) -> Result<Json<SeatingReport>, ApiError> {
    Ok(Json(state.engine.report()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use axum::body::Body;
    use axum::extract::{FromRequest, Request};
    use fete_seating::{RegistrantId, TierTable};
    use tempfile::{tempdir, TempDir};

    fn state() -> (TempDir, AppState) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        let state = RegistryState::new(TierTable::default(), storage);
        (dir, Arc::new(state))
    }

    fn registration(name: &str, code: Option<&str>, knows: Vec<u64>) -> Registration {
        Registration {
            name: name.to_string(),
            email: format!("{}@example.org", name.to_lowercase()),
            code: code.map(str::to_string),
            knows: knows.into_iter().map(RegistrantId).collect(),
        }
    }

    async fn register(state: &AppState, reg: Registration) -> Response {
        create_registration(State(Arc::clone(state)), Ok(Json(reg)))
            .await
            .into_response()
    }

    async fn post_raw(state: &AppState, body: &'static str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/registrations")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let payload = Json::<Registration>::from_request(request, &()).await;
        create_registration(State(Arc::clone(state)), payload)
            .await
            .into_response()
    }

    async fn error_body(response: Response) -> ErrorBody {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn registration_created_at_requested_tier() {
        let (_dir, state) = state();
        let (status, Json(body)) =
            create_registration(State(Arc::clone(&state)), Ok(Json(registration("Ada", Some("3"), vec![]))))
                .await
                .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.effective_tier_name, "VIP");
        assert!(!body.downgraded);
    }

    #[tokio::test]
    async fn cascade_reported_as_downgrade() {
        let (_dir, state) = state();
        for name in ["Ada", "Bob"] {
            register(&state, registration(name, Some("3"), vec![])).await;
        }

        let (_, Json(body)) =
            create_registration(State(Arc::clone(&state)), Ok(Json(registration("Cy", Some("3"), vec![]))))
                .await
                .unwrap();
        assert_eq!(body.requested_tier_name, "VIP");
        assert_eq!(body.effective_tier_name, "Close Friends");
        assert!(body.downgraded);
    }

    #[tokio::test]
    async fn error_kinds_have_distinct_responses() {
        let (_dir, state) = state();

        let invalid = register(&state, registration(" ", None, vec![])).await;
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_body(invalid).await.error, "invalid_request");

        register(&state, registration("Ada", None, vec![])).await;
        let dup = register(&state, registration("Ada", None, vec![])).await;
        assert_eq!(dup.status(), StatusCode::CONFLICT);
        let body = error_body(dup).await;
        assert_eq!(body.error, "duplicate_identity");
        assert_eq!(body.message, "Someone with this name and email is already registered.");

        register(&state, registration("Bob", None, vec![])).await;
        let full = register(&state, registration("Cy", None, vec![])).await;
        assert_eq!(full.status(), StatusCode::CONFLICT);
        assert_eq!(error_body(full).await.error, "fully_booked");
    }

    #[tokio::test]
    async fn malformed_bodies_get_the_json_error_contract() {
        let (_dir, state) = state();

        for body in [
            r#"{"name": "Ada"}"#,
            r#"{"name": "Ada", "email": "ada@example.org", "knows": [-1]}"#,
            r#"{"name": "Ada", "email": "#,
        ] {
            let response = post_raw(&state, body).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
            let error = error_body(response).await;
            assert_eq!(error.error, "invalid_request");
            assert_eq!(
                error.message,
                "Registration needs a JSON body with name and email."
            );
        }
        assert_eq!(state.engine.report().unwrap().total_admitted, 0);

        let created = post_raw(&state, r#"{"name": "Ada", "email": "ada@example.org"}"#).await;
        assert_eq!(created.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn unknown_acquaintance_is_bad_request() {
        let (_dir, state) = state();
        let response = register(&state, registration("Ada", None, vec![12])).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.engine.report().unwrap().total_admitted, 0);
    }

    #[tokio::test]
    async fn storage_failure_hides_details() {
        let response = ApiError(AdmissionError::StorageUnavailable("rocksdb: IO error".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = error_body(response).await;
        assert!(!body.message.contains("rocksdb"));
    }

    #[tokio::test]
    async fn quote_does_not_take_a_seat() {
        let (_dir, state) = state();
        for name in ["Ada", "Bob"] {
            register(&state, registration(name, Some("3"), vec![])).await;
        }

        let params = QuoteParams {
            code: Some("3".into()),
        };
        let Json(quote) = get_quote(State(Arc::clone(&state)), Query(params))
            .await
            .unwrap();
        assert_eq!(quote.requested_tier, "VIP");
        assert_eq!(quote.effective_tier.as_deref(), Some("Close Friends"));
        assert!(quote.downgraded);
        assert!(!quote.fully_booked);
        assert_eq!(state.engine.report().unwrap().total_admitted, 2);
    }

    #[tokio::test]
    async fn registrants_sorted_by_name_without_email() {
        let (_dir, state) = state();
        for (name, code) in [("zed", "3"), ("Ada", "2"), ("bob", "1")] {
            register(&state, registration(name, Some(code), vec![])).await;
        }

        let Json(list) = list_registrants(State(Arc::clone(&state))).await.unwrap();
        let names: Vec<&str> = list.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "bob", "zed"]);

        let json = serde_json::to_value(&list).unwrap();
        assert!(json[0].get("email").is_none());
    }

    #[tokio::test]
    async fn seating_report_reflects_admissions() {
        let (_dir, state) = state();
        register(&state, registration("Ada", Some("3"), vec![])).await;
        register(&state, registration("Bob", Some("1"), vec![1])).await;

        let Json(report) = get_seating_report(State(Arc::clone(&state))).await.unwrap();
        assert_eq!(report.total_admitted, 2);
        assert_eq!(report.total_available, 4);
        assert_eq!(report.tier(TierLevel(3)).unwrap().effective_count, 1);
        assert_eq!(report.tier(TierLevel(1)).unwrap().percentage_full, 100);

        let Json(tiers) = list_tiers(State(state)).await;
        assert_eq!(tiers.len(), 4);
        assert_eq!(tiers[0].name, "VIP");
    }
}
