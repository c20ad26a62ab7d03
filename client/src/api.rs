use gloo_net::http::{Request, Response};
use hexdom_shared::{BoardView, CellPos, ClickRequest, ClickResponse};
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct ResetBody {
    seq: u64,
}

/// Fetch the full board view.
pub async fn fetch_board() -> Result<BoardView, String> {
    let resp = Request::get("/api/board")
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    read_json(resp).await
}

/// Click a cell. Rejected clicks come back as the server's error message.
pub async fn post_click(pos: CellPos) -> Result<ClickResponse, String> {
    let resp = Request::post("/api/click")
        .json(&ClickRequest {
            col: pos.col,
            row: pos.row,
        })
        .map_err(|e| format!("encode error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    read_json(resp).await
}

/// Ask for a freshly generated board. Returns the snapshot sequence.
pub async fn post_reset() -> Result<u64, String> {
    let resp = Request::post("/api/reset")
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    read_json::<ResetBody>(resp).await.map(|body| body.seq)
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, String> {
    if !resp.ok() {
        let status = resp.status();
        return Err(match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("HTTP {status}"),
        });
    }

    resp.json::<T>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}
