//! End-to-end API tests against in-memory storage.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use lb_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use league_brackets::db::MemoryBracketRepository;
use league_brackets::tournament::{
    MatchResultProcessor, MemoryEventSink, TournamentLifecycleManager,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> (Router, Arc<MemoryEventSink>) {
    let repository = Arc::new(MemoryBracketRepository::new());
    let events = Arc::new(MemoryEventSink::new());
    let state = AppState {
        lifecycle: TournamentLifecycleManager::new(repository.clone(), events.clone()),
        results: MatchResultProcessor::new(repository, events.clone()),
        database: None,
    };
    (create_router(state), events)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_with_teams(app: &Router, format: &str, teams: &[&str]) -> i64 {
    let (status, tournament) = send(
        app,
        "POST",
        "/api/v1/tournaments",
        Some(json!({"name": "Spring Cup", "format": format})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = tournament["id"].as_i64().unwrap();

    for team in teams {
        let (status, _) = send(
            app,
            "POST",
            &format!("/api/v1/tournaments/{id}/teams"),
            Some(json!({"team_ref": team})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    id
}

fn scheduled_matches(bracket: &Value) -> Vec<Value> {
    bracket["matches"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["status"] == "SCHEDULED")
        .cloned()
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (app, _) = app();
    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "trace-7")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-7");
}

#[tokio::test]
async fn test_create_rejects_invalid_config() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(json!({
            "name": "Cup",
            "format": "DOUBLE_ELIMINATION",
            "has_consolation_bracket": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_CONFIG");
}

#[tokio::test]
async fn test_malformed_body_uses_error_shape() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(json!({"name": "Cup", "format": "ROUND_ROBIN"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_unknown_tournament_is_404() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/api/v1/tournaments/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_duplicate_team_is_conflict() {
    let (app, _) = app();
    let id = create_with_teams(&app, "SINGLE_ELIMINATION", &["lions"]).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/teams"),
        Some(json!({"team_ref": "lions"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "TEAM_ALREADY_REGISTERED");
}

#[tokio::test]
async fn test_remove_and_reseed() {
    let (app, _) = app();
    let id = create_with_teams(&app, "SINGLE_ELIMINATION", &["a", "b", "c"]).await;

    let (status, body) = send(&app, "DELETE", &format!("/api/v1/tournaments/{id}/teams/a"), None).await;
    assert_eq!(status, StatusCode::OK);
    let teams = body["teams"].as_array().unwrap();
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0]["external_team_ref"], "b");
    assert_eq!(teams[0]["seed"], 1);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/tournaments/{id}/seeds"),
        Some(json!({"seeds": [
            {"team_ref": "b", "seed": 2},
            {"team_ref": "c", "seed": 1}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["teams"][0]["external_team_ref"], "c");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/tournaments/{id}/seeds"),
        Some(json!({"seeds": [
            {"team_ref": "b", "seed": 1},
            {"team_ref": "c", "seed": 1}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "SEED_CONFLICT");
}

#[tokio::test]
async fn test_start_requires_two_teams() {
    let (app, _) = app();
    let id = create_with_teams(&app, "SINGLE_ELIMINATION", &["solo"]).await;
    let (status, body) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/start"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_TEAMS");
}

#[tokio::test]
async fn test_full_single_elimination_run() {
    let (app, events) = app();
    let id = create_with_teams(&app, "SINGLE_ELIMINATION", &["a", "b", "c", "d"]).await;

    let (status, bracket) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/start"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bracket["tournament"]["status"], "IN_PROGRESS");
    assert_eq!(bracket["matches"].as_array().unwrap().len(), 3);

    let (status, body) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/start"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");

    let semis = scheduled_matches(&bracket);
    assert_eq!(semis.len(), 2);

    let first = semis[0]["id"].as_i64().unwrap();
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/matches/{first}/result"),
        Some(json!({"home_score": 1, "away_score": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TIE_NOT_ALLOWED");

    for semi in &semis {
        let match_id = semi["id"].as_i64().unwrap();
        let (status, outcome) = send(
            &app,
            "POST",
            &format!("/api/v1/tournaments/{id}/matches/{match_id}/result"),
            Some(json!({"home_score": 2, "away_score": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["match"]["status"], "COMPLETED");
    }

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/matches/{first}/result"),
        Some(json!({"home_score": 3, "away_score": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_COMPLETE");

    let (_, bracket) = send(&app, "GET", &format!("/api/v1/tournaments/{id}/bracket"), None).await;
    let finals = scheduled_matches(&bracket);
    assert_eq!(finals.len(), 1);
    let final_id = finals[0]["id"].as_i64().unwrap();

    let (status, outcome) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/matches/{final_id}/result"),
        Some(json!({"home_score": 0, "away_score": 4, "notes": "penalties"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["tournament_complete"], true);
    assert_eq!(outcome["placements"].as_array().unwrap().len(), 2);

    let (_, tournament) = send(&app, "GET", &format!("/api/v1/tournaments/{id}"), None).await;
    assert_eq!(tournament["status"], "COMPLETED");
    assert_eq!(tournament["winner_id"], finals[0]["away_team_id"]);

    assert!(events.names().contains(&"tournament.completed"));
}

#[tokio::test]
async fn test_match_from_other_tournament() {
    let (app, _) = app();
    let first = create_with_teams(&app, "SINGLE_ELIMINATION", &["a", "b"]).await;
    let second = create_with_teams(&app, "SINGLE_ELIMINATION", &["c", "d"]).await;

    let (_, bracket) = send(&app, "POST", &format!("/api/v1/tournaments/{first}/start"), None).await;
    send(&app, "POST", &format!("/api/v1/tournaments/{second}/start"), None).await;
    let match_id = bracket["matches"][0]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{second}/matches/{match_id}/result"),
        Some(json!({"home_score": 1, "away_score": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "WRONG_TOURNAMENT");
}

#[tokio::test]
async fn test_cancel_twice() {
    let (app, _) = app();
    let id = create_with_teams(&app, "SINGLE_ELIMINATION", &[]).await;
    let (status, body) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");

    let (status, _) = send(&app, "POST", &format!("/api/v1/tournaments/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_preview_bracket() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/brackets/preview",
        Some(json!({"entrants": [1, 2, 3, 4, 5, 6], "format": "SINGLE_ELIMINATION"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bracket_size"], 8);
    assert_eq!(body["byes"], 2);
    assert_eq!(body["total_matches"], 5);

    // Seed 1 has a bye and is already placed in the semifinal
    let bye = &body["rounds"][0]["matches"][0];
    assert_eq!(bye["is_bye"], true);
    assert_eq!(bye["status"], "COMPLETED");
    assert_eq!(bye["winner"], 1);
    assert_eq!(body["rounds"][1]["matches"][0]["home"], 1);
    assert_eq!(body["rounds"][1]["matches"][0]["status"], "PENDING");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/brackets/preview",
        Some(json!({"entrants": [1], "format": "SINGLE_ELIMINATION"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_CONFIG");
}
