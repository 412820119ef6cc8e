//! Integration tests for minechess-server API

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use minechess_server::{create_router, ServerConfig, ServerState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> Router {
    let config = ServerConfig::default();
    let state = Arc::new(ServerState::new());
    create_router(&config, state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create_game(app: &Router) -> String {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/game/create")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    json["gameId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_status_endpoint() {
    let app = test_app();
    let (status, json) = send(&app, get("/api/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["engine"], "minechess");
    assert_eq!(json["activeGames"], 0);
}

#[tokio::test]
async fn test_create_game() {
    let app = test_app();
    let game_id = create_game(&app).await;
    assert_eq!(game_id.len(), 6);

    let (status, json) = send(&app, get(&format!("/api/game/{game_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["toMove"], "white");
    assert_eq!(json["players"]["white"], "");
    assert_eq!(json["clock"]["white"], 3000);
}

#[tokio::test]
async fn test_join_assigns_colors_then_fills() {
    let app = test_app();
    let game_id = create_game(&app).await;
    let uri = format!("/api/game/join/{game_id}");

    let (status, json) = send(&app, post_json(&uri, json!({ "playerId": "alice" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["gameId"], game_id.as_str());
    assert_eq!(json["color"], "white");

    let (status, json) = send(&app, post_json(&uri, json!({ "playerId": "bob" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["color"], "black");

    let (status, json) = send(&app, post_json(&uri, json!({ "playerId": "carol" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "game is full");

    let (_, state) = send(&app, get(&format!("/api/game/{game_id}"))).await;
    assert_eq!(state["players"]["white"], "alice");
    assert_eq!(state["players"]["black"], "bob");
}

#[tokio::test]
async fn test_join_rejects_empty_player_id() {
    let app = test_app();
    let game_id = create_game(&app).await;
    let uri = format!("/api/game/join/{game_id}");

    let (status, json) = send(&app, post_json(&uri, json!({ "playerId": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "player id must not be empty");

    // The white seat is still open
    let (status, json) = send(&app, post_json(&uri, json!({ "playerId": "alice" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["color"], "white");
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    let app = test_app();

    let (status, _) = send(&app, get("/api/game/nosuch")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(
        &app,
        post_json("/api/game/join/nosuch", json!({ "playerId": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "game not found: nosuch");
}

#[tokio::test]
async fn test_legal_moves_endpoint() {
    let app = test_app();
    let game_id = create_game(&app).await;

    let (status, json) = send(&app, get(&format!("/api/game/{game_id}/moves/e2"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["from"], json!({ "x": 4, "y": 6 }));
    assert_eq!(json["moves"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, get(&format!("/api/game/{game_id}/moves/z9"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
