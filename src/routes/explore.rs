use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

use crate::core::{DecisionEngine, LikesEngine};
use crate::models::{
    CountLikedYouRequest, CountLikedYouResponse, ErrorResponse, HealthResponse, Liker,
    ListLikedYouRequest, ListLikedYouResponse, ListNewLikedYouRequest, PutDecisionRequest,
    PutDecisionResponse,
};
use crate::services::{DecisionStore, StoreError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DecisionStore>,
    pub likes: LikesEngine,
    pub decisions: DecisionEngine,
}

impl AppState {
    pub fn new(store: Arc<dyn DecisionStore>, page_size: usize) -> Self {
        Self {
            likes: LikesEngine::new(store.clone(), page_size),
            decisions: DecisionEngine::new(store.clone()),
            store,
        }
    }
}

/// Configure all explore routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/explore/liked-you", web::post().to(list_liked_you))
        .route("/explore/liked-you/new", web::post().to(list_new_liked_you))
        .route("/explore/liked-you/count", web::post().to(count_liked_you))
        .route("/explore/decision", web::post().to(put_decision));
}

fn validation_failed(errors: ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

fn store_failure(context: &str, e: &StoreError) -> HttpResponse {
    let error = match e {
        StoreError::MatchCheck { .. } => "decision_recorded_match_unknown".to_string(),
        _ => context.to_string(),
    };

    HttpResponse::InternalServerError().json(ErrorResponse {
        error,
        message: e.to_string(),
        status_code: 500,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = state.store.health_check().await.unwrap_or(false);

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// List everyone who liked the recipient
///
/// POST /api/v1/explore/liked-you
///
/// Request body:
/// ```json
/// {
///   "recipient_user_id": "uuid",
///   "pagination_token": "uuid or omitted"
/// }
/// ```
async fn list_liked_you(
    state: web::Data<AppState>,
    req: web::Json<ListLikedYouRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match &req.pagination_token {
        None => tracing::info!("ListLikedYou request: [page=nil] [id={}]", req.recipient_user_id),
        Some(token) => tracing::info!(
            "ListLikedYou request: [page={}] [id={}]",
            token,
            req.recipient_user_id
        ),
    }

    match state
        .likes
        .list_likers(&req.recipient_user_id, req.pagination_token.as_deref())
        .await
    {
        Ok(page) => HttpResponse::Ok().json(ListLikedYouResponse {
            likers: page.likers.iter().map(Liker::from).collect(),
            next_pagination_token: page.next_cursor,
        }),
        Err(e) => {
            tracing::error!("Failed to list likers for {}: {}", req.recipient_user_id, e);
            store_failure("Failed to list likers", &e)
        }
    }
}

/// List likers the recipient has not liked back
///
/// POST /api/v1/explore/liked-you/new
async fn list_new_liked_you(
    state: web::Data<AppState>,
    req: web::Json<ListNewLikedYouRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    tracing::info!("ListNewLikedYou request: [id={}]", req.recipient_user_id);

    match state.likes.list_new_likers(&req.recipient_user_id).await {
        Ok(likers) => HttpResponse::Ok().json(ListLikedYouResponse {
            likers: likers.iter().map(Liker::from).collect(),
            next_pagination_token: None,
        }),
        Err(e) => {
            tracing::error!("Failed to list new likers for {}: {}", req.recipient_user_id, e);
            store_failure("Failed to list new likers", &e)
        }
    }
}

/// Count likes received
///
/// POST /api/v1/explore/liked-you/count
async fn count_liked_you(
    state: web::Data<AppState>,
    req: web::Json<CountLikedYouRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    tracing::info!("CountLikedYou request: [id={}]", req.recipient_user_id);

    match state.likes.count_likers(&req.recipient_user_id).await {
        Ok(count) => HttpResponse::Ok().json(CountLikedYouResponse { count }),
        Err(e) => {
            tracing::error!("Failed to count likes for {}: {}", req.recipient_user_id, e);
            store_failure("Failed to count likes", &e)
        }
    }
}

/// Record a like or pass
///
/// POST /api/v1/explore/decision
///
/// Request body:
/// ```json
/// {
///   "actor_user_id": "uuid",
///   "recipient_user_id": "uuid",
///   "liked_recipient": true
/// }
/// ```
async fn put_decision(
    state: web::Data<AppState>,
    req: web::Json<PutDecisionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    tracing::info!(
        "PutDecision request: [from={}] [to={}]",
        req.actor_user_id,
        req.recipient_user_id
    );

    match state
        .decisions
        .put_decision(&req.actor_user_id, &req.recipient_user_id, req.liked_recipient)
        .await
    {
        Ok(mutual_likes) => HttpResponse::Ok().json(PutDecisionResponse { mutual_likes }),
        Err(e) => {
            tracing::error!(
                "Failed to record decision {} -> {}: {}",
                req.actor_user_id,
                req.recipient_user_id,
                e
            );
            store_failure("Failed to record decision", &e)
        }
    }
}
