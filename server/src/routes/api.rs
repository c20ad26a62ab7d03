use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use hexdom_shared::{BoardError, ClickRequest};
use tracing::warn;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let seq = state.live.read().await.seq;
    let (kingdoms, players, layout) = {
        let game = state.game.lock().await;
        (
            game.board.kingdoms().count(),
            game.players(),
            game.board.grid().layout(),
        )
    };
    Json(serde_json::json!({
        "status": "ok",
        "seq": seq,
        "kingdoms": kingdoms,
        "players": players,
        "width": layout.width,
        "height": layout.height,
        "sse_subscribers": state.event_tx.receiver_count(),
    }))
}

/// Serve the pre-serialized board view.
pub async fn get_board(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let (etag, json): (String, Arc<Bytes>) = {
        let live = state.live.read().await;
        (board_etag(live.seq), Arc::clone(&live.board_json))
    };

    if if_none_match_matches(&headers, &etag) {
        return not_modified_response("no-cache", Some(etag.as_str()));
    }

    json_bytes_response((*json).clone(), "no-cache", Some(etag.as_str()))
}

pub async fn post_click(
    State(state): State<AppState>,
    Json(request): Json<ClickRequest>,
) -> Response {
    match state.click(request.pos()).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => board_error_response(&e),
    }
}

pub async fn post_reset(State(state): State<AppState>) -> Json<serde_json::Value> {
    let seq = state.reset().await;
    Json(serde_json::json!({ "seq": seq }))
}

fn board_error_status(error: &BoardError) -> StatusCode {
    match error {
        BoardError::OutOfBounds(_) => StatusCode::BAD_REQUEST,
        BoardError::UnknownKingdom(_)
        | BoardError::OwnerMismatch { .. }
        | BoardError::NotMember { .. }
        | BoardError::LastCell { .. } => StatusCode::CONFLICT,
        BoardError::KingdomTooSmall(_) | BoardError::Boundary(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn board_error_response(error: &BoardError) -> Response {
    let status = board_error_status(error);
    if status.is_server_error() {
        warn!(error = %error, "click failed");
    }
    (
        status,
        Json(serde_json::json!({ "error": error.to_string() })),
    )
        .into_response()
}

fn board_etag(seq: u64) -> String {
    format!("\"board-{seq}\"")
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use hexdom_shared::{
        Board, BoardView, BoundaryError, CellPos, ClickOutcome, ClickResponse, GridLayout,
        KingdomId, PlayerId, RectGrid,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::BoardConfig;

    fn test_state() -> AppState {
        AppState::new(BoardConfig {
            layout: GridLayout::default(),
            players: 3,
            seed: Some(11),
        })
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("parse body")
    }

    fn click_request(col: i32, row: i32) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/click")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(r#"{{"col":{col},"row":{row}}}"#)))
            .expect("build request")
    }

    #[test]
    fn if_none_match_supports_weak_and_multiple_etags() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_static("W/\"other\", \"board-42\""),
        );
        assert!(if_none_match_matches(&headers, "\"board-42\""));
        assert!(!if_none_match_matches(&headers, "\"board-41\""));
    }

    #[test]
    fn board_errors_map_to_status_codes() {
        assert_eq!(
            board_error_status(&BoardError::OutOfBounds(CellPos::new(-1, 0))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            board_error_status(&BoardError::UnknownKingdom(KingdomId(3))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            board_error_status(&BoardError::Boundary(BoundaryError::EmptyRegion)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn board_endpoint_serves_view_and_honours_etag() {
        let app = crate::app::build_app(test_state());

        let first = app
            .clone()
            .oneshot(Request::get("/api/board").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let etag = first
            .headers()
            .get(header::ETAG)
            .cloned()
            .expect("etag header should be present");
        let view: BoardView = body_json(first).await;
        assert_eq!(view.seq, 0);
        assert_eq!(view.cells.len(), 50);
        assert_eq!(view.players, 3);

        let second = app
            .oneshot(
                Request::get("/api/board")
                    .header(header::IF_NONE_MATCH, etag)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn click_out_of_bounds_is_bad_request() {
        let app = crate::app::build_app(test_state());
        let response = app.oneshot(click_request(10, 0)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("(10, 0)"));
    }

    #[tokio::test]
    async fn click_selects_then_annexes() {
        let state = test_state();
        // Left half player 0, right half player 1, one lone player-2 corner.
        let lone_cell = CellPos::new(9, 4);
        let kingdom_cell = CellPos::new(0, 0);
        {
            let mut game = state.game.lock().await;
            game.board = Board::new(RectGrid::new(GridLayout::default()), |pos| {
                if pos == lone_cell {
                    PlayerId(2)
                } else if pos.col < 5 {
                    PlayerId(0)
                } else {
                    PlayerId(1)
                }
            });
        }
        let app = crate::app::build_app(state.clone());

        let response = app
            .clone()
            .oneshot(click_request(kingdom_cell.col, kingdom_cell.row))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let selected: ClickResponse = body_json(response).await;
        let ClickOutcome::Selected { kingdom } = selected.outcome else {
            panic!("expected selection, got {:?}", selected.outcome);
        };

        let response = app
            .clone()
            .oneshot(click_request(lone_cell.col, lone_cell.row))
            .await
            .unwrap();
        let annexed: ClickResponse = body_json(response).await;
        assert_eq!(annexed.seq, selected.seq + 1);
        assert!(matches!(
            annexed.outcome,
            ClickOutcome::Annexed { kingdom: k, cell, .. } if k == kingdom && cell == lone_cell
        ));

        let response = app
            .oneshot(Request::get("/api/board").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let view: BoardView = body_json(response).await;
        assert_eq!(view.seq, annexed.seq);
        assert_eq!(view.cell(lone_cell).unwrap().kingdom, Some(kingdom));
        assert_eq!(view.selected.map(|s| s.kingdom), Some(kingdom));
        assert_eq!(view.outlines.len(), 1);
    }

    #[tokio::test]
    async fn reset_and_health() {
        let state = test_state();
        let app = crate::app::build_app(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/reset")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(body["seq"], 1);

        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let health: serde_json::Value = body_json(response).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["seq"], 1);
        assert_eq!(health["kingdoms"], 0);
        assert_eq!(health["width"], 10);
    }

    #[tokio::test]
    async fn malformed_click_body_is_rejected() {
        let app = crate::app::build_app(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/click")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"col":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
