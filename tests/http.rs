use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};

use campus_ledger::api::{self, AppState};
use campus_ledger::registry::default_roster;
use campus_ledger::{Block, Candidate, JsonStore, Sha256Hasher, VoteService};

fn seeded_service() -> VoteService {
    let service = VoteService::new(Box::new(Sha256Hasher));
    for metadata in default_roster() {
        service.add_candidate(metadata).unwrap();
    }
    service
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(api::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn vote_then_duplicate_vote() {
    let app = app!(AppState::new(seeded_service(), None));

    let req = test::TestRequest::post()
        .uri("/vote")
        .set_json(json!({ "voter_id": "s1001", "candidate_id": "1" }))
        .to_request();
    let block: Block = test::call_and_read_body_json(&app, req).await;
    assert_eq!(block.index, 1);
    assert_eq!(block.voter, "s1001");

    let req = test::TestRequest::post()
        .uri("/vote")
        .set_json(json!({ "voter_id": "s1001", "candidate_id": "2" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::get().uri("/blocks").to_request();
    let blocks: Vec<Block> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(blocks.len(), 2);

    let req = test::TestRequest::get()
        .uri("/hasVoted?voter_id=s1001")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["has_voted"], json!(true));
}

#[actix_web::test]
async fn unknown_candidate_is_not_found() {
    let app = app!(AppState::new(seeded_service(), None));
    let req = test::TestRequest::post()
        .uri("/vote")
        .set_json(json!({ "voter_id": "s1", "candidate_id": "99" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/candidates/99").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn results_are_ranked() {
    let app = app!(AppState::new(seeded_service(), None));
    for (voter, candidate) in [("a", "2"), ("b", "3"), ("c", "2")] {
        let req = test::TestRequest::post()
            .uri("/vote")
            .set_json(json!({ "voter_id": voter, "candidate_id": candidate }))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
    }

    let req = test::TestRequest::get().uri("/results").to_request();
    let ranked: Vec<Candidate> = test::call_and_read_body_json(&app, req).await;
    let ids: Vec<_> = ranked.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["2", "3", "1"]);
    assert_eq!(ranked[0].votes, 2);

    let req = test::TestRequest::get().uri("/verify").to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report["valid"], json!(true));
}

#[actix_web::test]
async fn candidate_registration() {
    let app = app!(AppState::new(seeded_service(), None));

    let req = test::TestRequest::post()
        .uri("/candidates")
        .set_json(json!({ "name": "Priya Shah", "party": "Green Quad", "position": "Treasurer" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Candidate = test::read_body_json(resp).await;
    assert_eq!(created.id, "4");
    assert_eq!(created.votes, 0);

    let req = test::TestRequest::post()
        .uri("/candidates")
        .set_json(json!({ "id": "4", "name": "Someone Else" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/candidates")
        .set_json(json!({ "name": "" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/candidates").to_request();
    let all: Vec<Candidate> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all.len(), 4);
}

#[actix_web::test]
async fn block_lookup_by_index() {
    let app = app!(AppState::new(seeded_service(), None));

    let req = test::TestRequest::get().uri("/blocks/0").to_request();
    let genesis: Block = test::call_and_read_body_json(&app, req).await;
    assert_eq!(genesis.voter, "GENESIS");

    let req = test::TestRequest::get().uri("/blocks/5").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn votes_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = JsonStore::open(dir.path()).unwrap();
        let app = app!(AppState::new(seeded_service(), Some(store)));
        let req = test::TestRequest::post()
            .uri("/vote")
            .set_json(json!({ "voter_id": "s42", "candidate_id": "3" }))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
    }

    let store = JsonStore::open(dir.path()).unwrap();
    let restored = store.restore(Box::new(Sha256Hasher)).unwrap().unwrap();
    assert!(restored.has_voted("s42"));
    assert_eq!(restored.candidate("3").unwrap().votes, 1);
    assert!(restored.verify_integrity().valid);
}

#[actix_web::test]
async fn genesis_voter_is_refused_without_halting() {
    let app = app!(AppState::new(seeded_service(), None));

    let req = test::TestRequest::post()
        .uri("/vote")
        .set_json(json!({ "voter_id": "GENESIS", "candidate_id": "1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/vote")
        .set_json(json!({ "voter_id": "s7", "candidate_id": "1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/blocks").to_request();
    let blocks: Vec<Block> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].voter, "s7");
}

#[actix_web::test]
async fn committed_vote_is_reported_when_save_fails() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("ledger");
    let store = JsonStore::open(&data_dir).unwrap();
    std::fs::remove_dir_all(&data_dir).unwrap();
    let app = app!(AppState::new(seeded_service(), Some(store)));

    let req = test::TestRequest::post()
        .uri("/vote")
        .set_json(json!({ "voter_id": "s9", "candidate_id": "2" }))
        .to_request();
    let block: Block = test::call_and_read_body_json(&app, req).await;
    assert_eq!(block.voter, "s9");

    let req = test::TestRequest::get()
        .uri("/hasVoted?voter_id=s9")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["has_voted"], json!(true));
}
