//! Shared fixtures for the integration tests: a gateway over simulated
//! broker links, plus a signing client mirroring the external callers.
#![allow(dead_code)] // each test binary uses a subset of these fixtures

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use trade_gateway::broker::sim::SimTransportFactory;
use trade_gateway::broker::TransportFactory;
use trade_gateway::config::GatewaySettings;
use trade_gateway::notify::NoopNotifier;
use trade_gateway::pool::SessionPool;
use trade_gateway::server::{auth, create_router, AppState};
use trade_gateway::session::{BrokerSession, SessionConfig};

/// Signing client configured on every test gateway.
pub const CLIENT_ID: &str = "outer_client_002";

/// Its signing secret.
pub const CLIENT_SECRET: &str = "qmt_secret_key";

/// Login user configured on every test gateway.
pub const USERNAME: &str = "admin";

/// Its password.
pub const PASSWORD: &str = "trader-pass";

/// Build a gateway over simulated broker links, one session per account.
pub async fn gateway(account_ids: &[&str]) -> (Arc<SimTransportFactory>, Router) {
    let factory = Arc::new(SimTransportFactory::new());

    let mut sessions = Vec::new();
    for (i, account_id) in account_ids.iter().enumerate() {
        let mut session = BrokerSession::new(
            SessionConfig {
                account_id: (*account_id).to_string(),
                strategy_code: 7,
                display_name: format!("account-{i}"),
            },
            Arc::clone(&factory) as Arc<dyn TransportFactory>,
            Arc::new(NoopNotifier),
        );
        session.connect().await;
        sessions.push(session);
    }

    let mut settings = GatewaySettings::default();
    settings
        .api
        .clients
        .insert(CLIENT_ID.to_string(), CLIENT_SECRET.to_string());
    settings.auth.secret_key = "test-server-key".to_string();
    settings
        .auth
        .users
        .insert(USERNAME.to_string(), PASSWORD.to_string());

    let state = AppState::new(
        Arc::new(SessionPool::new(sessions)),
        Arc::new(settings),
    );
    (factory, create_router(state))
}

/// A request signed the way external callers sign: hex HMAC-SHA256 over
/// `METHOD\nPATH\nQUERY\nBODY\nTIMESTAMP\nCLIENT_ID` with the body as
/// sorted-key compact JSON.
pub fn signed_request(
    method: &str,
    path: &str,
    body: Option<&Value>,
    timestamp: i64,
    client_id: &str,
    secret: &str,
) -> Request<Body> {
    let raw_body = body.map(ToString::to_string).unwrap_or_default();
    let canonical = auth::canonical_body(raw_body.as_bytes());
    let signature = auth::compute_signature(
        secret,
        method,
        path,
        "",
        &canonical,
        &timestamp.to_string(),
        client_id,
    );

    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-client-id", client_id)
        .header("x-timestamp", timestamp.to_string())
        .header("x-signature", signature)
        .body(Body::from(raw_body))
        .expect("request")
}

/// A correctly signed request with a current timestamp.
pub fn signed_now(method: &str, path: &str, body: Option<&Value>) -> Request<Body> {
    signed_request(
        method,
        path,
        body,
        chrono::Utc::now().timestamp(),
        CLIENT_ID,
        CLIENT_SECRET,
    )
}

/// Run one request and return status plus parsed JSON body.
pub async fn call(router: &Router, request: Request<Body>) -> (u16, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("infallible service");
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Log in and return the session cookie header value.
pub async fn login_cookie(router: &Router) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/api/trade/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "username": USERNAME, "password": PASSWORD }).to_string(),
        ))
        .expect("request");
    let response = router.clone().oneshot(request).await.expect("service");
    assert_eq!(response.status().as_u16(), 200, "login must succeed");

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login sets a cookie")
        .to_str()
        .expect("ascii cookie")
        .to_string();
    // "gateway_session=value; Path=/; ..." -> "gateway_session=value"
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}
