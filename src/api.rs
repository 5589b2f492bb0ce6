//! HTTP surface for the ballot page, results dashboard, chain explorer and admin panel.

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use log::{error, warn};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::error::{RegistryError, VoteError};
use crate::models::CandidateMetadata;
use crate::service::VoteService;
use crate::store::JsonStore;

pub struct AppState {
    pub service: Arc<VoteService>,
    /// Serializes saves; `None` keeps the election in memory only.
    pub store: Option<Arc<Mutex<JsonStore>>>,
}

impl AppState {
    pub fn new(service: VoteService, store: Option<JsonStore>) -> Self {
        AppState {
            service: Arc::new(service),
            store: store.map(|store| Arc::new(Mutex::new(store))),
        }
    }

    /// Writes the current state to the store on the blocking pool.
    ///
    /// Changes are committed in memory before this runs, so a failed save is logged and the
    /// request still reports the committed change; the next successful save catches up.
    async fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let store = Arc::clone(store).lock_owned().await;
        let service = Arc::clone(&self.service);
        let saved = tokio::task::spawn_blocking(move || {
            // Taken after the lock so the last save always carries the newest state.
            let snapshot = service.snapshot();
            store.save(&snapshot).map_err(|err| {
                format!("failed to persist election to {}: {err}", store.dir().display())
            })
        })
        .await;

        match saved {
            Ok(Ok(())) => {}
            Ok(Err(msg)) => error!("{msg}"),
            Err(err) => error!("persist task failed: {err}"),
        }
    }
}

#[derive(Deserialize)]
pub struct VoteRequest {
    pub voter_id: String,
    pub candidate_id: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/vote", web::post().to(cast_vote))
        .route("/hasVoted", web::get().to(has_voted))
        .route("/results", web::get().to(results))
        .route("/blocks", web::get().to(all_blocks))
        .route("/blocks/{index}", web::get().to(block_by_index))
        .route("/verify", web::get().to(verify))
        .route("/candidates", web::get().to(candidates))
        .route("/candidates", web::post().to(add_candidate))
        .route("/candidates/{id}", web::get().to(candidate_by_id));
}

fn error_response(err: &VoteError) -> HttpResponse {
    let body = json!({ "error": err.to_string() });
    match err {
        VoteError::DuplicateVote { .. } => HttpResponse::Conflict().json(body),
        VoteError::UnknownCandidate { .. } => HttpResponse::NotFound().json(body),
        VoteError::InvariantViolation(_) => HttpResponse::ServiceUnavailable().json(body),
        VoteError::IntegrityFailure { .. } => HttpResponse::InternalServerError().json(body),
        VoteError::Registry(RegistryError::DuplicateIdentity(_)) => {
            HttpResponse::Conflict().json(body)
        }
        VoteError::Registry(RegistryError::InvalidMetadata(_)) => {
            HttpResponse::BadRequest().json(body)
        }
        VoteError::Registry(RegistryError::NotFound(_)) => HttpResponse::NotFound().json(body),
    }
}

async fn cast_vote(data: web::Data<AppState>, vote: web::Json<VoteRequest>) -> impl Responder {
    let VoteRequest {
        voter_id,
        candidate_id,
    } = vote.into_inner();

    match Arc::clone(&data.service)
        .cast_vote_async(voter_id, candidate_id)
        .await
    {
        Ok(block) => {
            data.persist().await;
            HttpResponse::Ok().json(block)
        }
        Err(err) => {
            if err.is_fatal() {
                error!("vote refused: {err}");
            }
            error_response(&err)
        }
    }
}

async fn has_voted(
    data: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let voter_id = match query.get("voter_id") {
        Some(id) => id.clone(),
        None => return HttpResponse::BadRequest().body("Missing voter_id parameter"),
    };
    let has_voted = data.service.has_voted(&voter_id);
    HttpResponse::Ok().json(json!({ "voter_id": voter_id, "has_voted": has_voted }))
}

async fn results(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.service.ranked_results())
}

async fn all_blocks(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.service.all_blocks())
}

async fn block_by_index(data: web::Data<AppState>, path: web::Path<u64>) -> impl Responder {
    let index = path.into_inner();
    match data.service.block(index) {
        Some(block) => HttpResponse::Ok().json(block),
        None => HttpResponse::NotFound().json(json!({ "error": format!("no block {index}") })),
    }
}

async fn verify(data: web::Data<AppState>) -> impl Responder {
    match data.service.audit() {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(VoteError::IntegrityFailure { index }) => HttpResponse::InternalServerError().json(
            json!({ "valid": false, "first_broken_index": index }),
        ),
        Err(err) => error_response(&err),
    }
}

async fn candidates(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.service.candidates())
}

async fn candidate_by_id(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match data.service.candidate(&path.into_inner()) {
        Ok(candidate) => HttpResponse::Ok().json(candidate),
        Err(err) => error_response(&err),
    }
}

async fn add_candidate(
    data: web::Data<AppState>,
    metadata: web::Json<CandidateMetadata>,
) -> impl Responder {
    match data.service.add_candidate(metadata.into_inner()) {
        Ok(candidate) => {
            data.persist().await;
            HttpResponse::Created().json(candidate)
        }
        Err(err) => {
            warn!("candidate registration refused: {err}");
            error_response(&err)
        }
    }
}
