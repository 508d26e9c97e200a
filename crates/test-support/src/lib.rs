use anyhow::Context as _;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::net::{SocketAddr, TcpListener};
use std::process::Child;
use std::time::{Duration, Instant};

pub struct KillOnDrop(pub Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
    }
}

/// Pick an unused TCP port on localhost.
///
/// Note: this does not reserve the port; it's still possible for another process to bind it
/// before you do.
///
/// # Errors
///
/// Returns an error if binding an ephemeral localhost port fails or if the bound socket's
/// local address cannot be read.
pub fn pick_unused_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

/// Poll an HTTP URL until it returns a success status (2xx/3xx).
///
/// # Errors
///
/// Returns an error if the timeout elapses before the endpoint returns a success status.
pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout_dur {
            anyhow::bail!("timed out waiting for {url}");
        }

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            _ => tokio::time::sleep(Duration::from_millis(200)).await,
        }
    }
}

/// Access token accepted by the mock validate endpoint.
pub const MOCK_TOKEN: &str = "good-token";
/// User id the mock validate endpoint reports for [`MOCK_TOKEN`].
pub const MOCK_USER_ID: &str = "42";

/// In-process stand-in for `api.twitch.tv/helix` and `id.twitch.tv/oauth2/validate`.
///
/// Every Helix response echoes the request (`method`, `path`, `query`, `client_id`,
/// `authorization`, `body`) next to canned data:
/// - `/users` returns one user, `/streams` one live stream, `/channels/followers` `total: 99`;
/// - `/games/top` always answers `429 Too Many Requests`;
/// - anything else returns `data: []`.
pub struct MockHelix {
    pub addr: SocketAddr,
}

impl MockHelix {
    #[must_use]
    pub fn helix_url(&self) -> String {
        format!("http://{}/helix", self.addr)
    }

    #[must_use]
    pub fn validate_url(&self) -> String {
        format!("http://{}/oauth2/validate", self.addr)
    }
}

/// Start the mock on an ephemeral port. It lives until the runtime shuts down.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn spawn_mock_helix() -> anyhow::Result<MockHelix> {
    let app = Router::new()
        .route("/oauth2/validate", get(validate))
        .fallback(helix);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind mock helix")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(MockHelix { addr })
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn validate(headers: HeaderMap) -> Response {
    let expected = format!("OAuth {MOCK_TOKEN}");
    if header(&headers, "authorization").as_deref() == Some(expected.as_str()) {
        Json(json!({
            "client_id": "mock-client",
            "login": "mock_mod",
            "user_id": MOCK_USER_ID,
            "scopes": ["moderator:manage:banned_users"],
            "expires_in": 3600
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "status": 401, "message": "invalid access token" })),
        )
            .into_response()
    }
}

async fn helix(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let path = uri.path().strip_prefix("/helix").unwrap_or(uri.path()).to_string();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let (status, extra) = match path.as_str() {
        "/games/top" => (
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "error": "Too Many Requests", "status": 429, "message": "slow down" }),
        ),
        "/users" => (
            StatusCode::OK,
            json!({ "data": [{
                "id": "1001",
                "login": "ninja",
                "display_name": "Ninja",
                "view_count": 500,
                "created_at": "2011-11-16T00:00:00Z",
                "description": "pro gamer"
            }] }),
        ),
        "/streams" => (
            StatusCode::OK,
            json!({ "data": [{
                "game_name": "Fortnite",
                "title": "late night",
                "viewer_count": 12000,
                "started_at": "2024-01-01T00:00:00Z"
            }] }),
        ),
        "/channels/followers" => (StatusCode::OK, json!({ "total": 99, "data": [] })),
        _ => (StatusCode::OK, json!({ "data": [] })),
    };

    if status != StatusCode::OK {
        return (status, Json(extra)).into_response();
    }

    let mut echo = json!({
        "method": method.as_str(),
        "path": path,
        "query": uri.query(),
        "client_id": header(&headers, "client-id"),
        "authorization": header(&headers, "authorization"),
        "body": body,
    });
    if let (Some(obj), Value::Object(extra)) = (echo.as_object_mut(), extra) {
        obj.extend(extra);
    }
    Json(echo).into_response()
}
