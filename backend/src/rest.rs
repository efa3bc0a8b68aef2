//! HTTP surface: JSON endpoints for the chore workflow plus the SSE event
//! stream dashboards subscribe to.

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use shared::{BatchConfirmSummary, CapAdvisory, CompletionView, DashboardEvent, WeeklyStatus};

use crate::db::DbConnection;
use crate::domain::{
    AllowanceService, ChoreError, ChoreService, HouseholdService, MemberLocks, WeeklyPointsLedger,
};
use crate::events::{EventBroadcaster, KEEP_ALIVE_INTERVAL};
use crate::storage::{
    AllowanceRepository, ChoreRepository, CompletionRepository, MemberRepository, ParentRepository,
    RoomRepository, WeeklyPointsRepository,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub household_service: HouseholdService,
    pub chore_service: ChoreService,
    pub allowance_service: AllowanceService,
    pub broadcaster: EventBroadcaster,
}

impl AppState {
    /// Wires every repository and service onto one database connection.
    pub fn new(db: DbConnection) -> Self {
        let parents = ParentRepository::new(db.clone());
        let members = MemberRepository::new(db.clone());
        let rooms = RoomRepository::new(db.clone());
        let chores = ChoreRepository::new(db.clone());
        let completions = CompletionRepository::new(db.clone());
        let weekly = WeeklyPointsRepository::new(db.clone());
        let allowances = AllowanceRepository::new(db);

        let ledger = WeeklyPointsLedger::new(weekly.clone(), members.clone());
        let broadcaster = EventBroadcaster::new();

        Self {
            household_service: HouseholdService::new(
                parents.clone(),
                members.clone(),
                rooms.clone(),
                chores.clone(),
            ),
            chore_service: ChoreService::new(
                chores,
                completions,
                members.clone(),
                parents,
                rooms,
                ledger,
                MemberLocks::new(),
                broadcaster.clone(),
            ),
            allowance_service: AllowanceService::new(members, weekly, allowances),
            broadcaster,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error_code: &'static str,
    message: String,
    user_message: String,
    suggested_action: &'static str,
}

impl IntoResponse for ChoreError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            match self.code() {
                code if code.ends_with("_NOT_FOUND") => StatusCode::NOT_FOUND,
                "PARENT_ACCESS_DENIED" | "INVALID_PIN" => StatusCode::FORBIDDEN,
                _ => StatusCode::BAD_REQUEST,
            }
        } else {
            if let ChoreError::Internal(inner) = &self {
                error!("operation failed: {:#}", inner);
            }
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorBody {
            error_code: self.code(),
            message: self.to_string(),
            user_message: self.user_message(),
            suggested_action: self.suggested_action(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/chores/:id/complete", post(complete_chore))
        .route("/completions/:id/confirm", post(confirm_completion))
        .route("/completions/confirm-batch", post(batch_confirm))
        .route("/members/:id/weekly-status", get(weekly_status))
        .route("/members/:id/allowance/:month", post(calculate_allowance))
        .route("/parents/:id/pending-completions", get(pending_completions))
        .route("/events", get(events));

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CompleteChoreRequest {
    member_id: i64,
}

#[derive(Debug, Serialize)]
struct CompleteChoreResponse {
    completion: CompletionView,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<CapAdvisory>,
}

async fn complete_chore(
    State(state): State<AppState>,
    Path(chore_id): Path<i64>,
    Json(request): Json<CompleteChoreRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/chores/{}/complete - member: {}",
        chore_id, request.member_id
    );
    match state
        .chore_service
        .complete_chore(chore_id, request.member_id)
        .await
    {
        Ok(outcome) => {
            let completion = CompletionView {
                id: outcome.completion.id,
                chore_id: outcome.completion.chore_id,
                chore_name: outcome.chore_name,
                member_id: outcome.completion.member_id,
                member_name: outcome.member_name,
                status: outcome.completion.status.as_str().to_string(),
                points_earned: outcome.completion.points_earned,
                completed_at: outcome.completion.completed_at,
                confirmed_at: outcome.completion.confirmed_at,
                week_start: outcome.completion.week_start,
            };
            (
                StatusCode::CREATED,
                Json(CompleteChoreResponse {
                    completion,
                    warning: outcome.advisory,
                }),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ConfirmRequest {
    parent_id: i64,
    confirmed: bool,
}

async fn confirm_completion(
    State(state): State<AppState>,
    Path(completion_id): Path<i64>,
    Json(request): Json<ConfirmRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/completions/{}/confirm - parent: {}, confirmed: {}",
        completion_id, request.parent_id, request.confirmed
    );
    match state
        .chore_service
        .confirm_completion(completion_id, request.parent_id, request.confirmed)
        .await
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct BatchConfirmRequest {
    completion_ids: Vec<i64>,
    parent_id: i64,
    confirmed: bool,
}

async fn batch_confirm(
    State(state): State<AppState>,
    Json(request): Json<BatchConfirmRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/completions/confirm-batch - {} ids, parent: {}",
        request.completion_ids.len(),
        request.parent_id
    );
    match state
        .chore_service
        .batch_confirm(&request.completion_ids, request.parent_id, request.confirmed)
        .await
    {
        Ok(summary) => (StatusCode::OK, Json::<BatchConfirmSummary>(summary)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn weekly_status(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/members/{}/weekly-status", member_id);
    match state.chore_service.weekly_status(member_id).await {
        Ok(status) => (StatusCode::OK, Json::<WeeklyStatus>(status)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Serialize)]
struct AllowanceResponse {
    member_id: i64,
    month_year: String,
    total_points_earned: i64,
    total_points_possible: i64,
    completion_percentage: f64,
    allowance_amount: f64,
    age_category: String,
}

async fn calculate_allowance(
    State(state): State<AppState>,
    Path((member_id, month)): Path<(i64, String)>,
) -> impl IntoResponse {
    info!("POST /api/members/{}/allowance/{}", member_id, month);
    match state
        .allowance_service
        .calculate_monthly_allowance(member_id, &month)
        .await
    {
        Ok(calc) => (
            StatusCode::OK,
            Json(AllowanceResponse {
                member_id: calc.member_id,
                month_year: calc.month_year,
                total_points_earned: calc.total_points_earned,
                total_points_possible: calc.total_points_possible,
                completion_percentage: calc.completion_percentage,
                allowance_amount: calc.allowance_amount,
                age_category: calc.age_category.as_str().to_string(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn pending_completions(
    State(state): State<AppState>,
    Path(parent_id): Path<i64>,
) -> impl IntoResponse {
    info!("GET /api/parents/{}/pending-completions", parent_id);
    match state.chore_service.pending_completions(parent_id).await {
        Ok(queue) => (StatusCode::OK, Json::<Vec<CompletionView>>(queue)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    parent_id: Option<i64>,
}

/// SSE stream of dashboard events. Opens with a `connected` event and emits
/// a `ping` whenever the stream has been idle for the keep-alive interval.
async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.broadcaster.subscribe(query.parent_id);
    info!(
        "GET /api/events - connection {} (parent scope: {:?})",
        subscription.connection_id(),
        query.parent_id
    );

    let connected = DashboardEvent::Connected {
        connection_id: subscription.connection_id().to_string(),
        message: "Connected to chore updates".to_string(),
        timestamp: Utc::now(),
    };
    let initial = stream::once(async move { sse_event(&connected) });

    // The subscription rides inside the stream; when the client disconnects
    // the stream is dropped and the subscription unregisters itself
    let updates = stream::unfold(subscription, |mut subscription| async move {
        match tokio::time::timeout(KEEP_ALIVE_INTERVAL, subscription.recv()).await {
            Ok(Some(event)) => Some((sse_event(&event), subscription)),
            Ok(None) => None,
            Err(_) => {
                let ping = DashboardEvent::Ping {
                    timestamp: Utc::now(),
                };
                Some((sse_event(&ping), subscription))
            }
        }
    });

    Sse::new(initial.chain(updates))
}

fn sse_event(event: &DashboardEvent) -> Result<Event, Infallible> {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Ok(Event::default().event(event.event_name()).data(data))
}
