use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Notify;
use tower::{Layer, Service};

use crate::{correlation_id_from_request, AppState, IdempotencyState};

const KEY_HEADER: &str = "idempotency-key";
const MAX_KEY_LEN: usize = 128;
const TTL_SECONDS: i64 = 24 * 60 * 60;

/// A completed response held for replay when the same idempotency key
/// arrives again with the same request.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub request_hash: String,
    pub status: u16,
    pub body: Bytes,
    pub expires_at: DateTime<Utc>,
}

/// Drops cached responses past their TTL. Called from the background
/// sweep.
pub fn prune_expired(state: &IdempotencyState, now: DateTime<Utc>) -> usize {
    let before = state.records.len();
    state.records.retain(|_, record| record.expires_at > now);
    before - state.records.len()
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    code: &'static str,
    message: String,
    correlation_id: Option<String>,
}

#[derive(Clone)]
pub struct IdempotencyLayer {
    state: AppState,
}

impl IdempotencyLayer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[derive(Clone)]
pub struct IdempotencyService<S> {
    inner: S,
    state: AppState,
}

impl<S> Layer<S> for IdempotencyLayer {
    type Service = IdempotencyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IdempotencyService {
            inner,
            state: self.state.clone(),
        }
    }
}

impl<S> Service<Request<Body>> for IdempotencyService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let state = self.state.clone();
        Box::pin(async move { Ok(handle_request(state, request, &mut inner).await) })
    }
}

async fn handle_request<S>(state: AppState, request: Request<Body>, inner: &mut S) -> Response
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Send,
    S::Future: Send,
{
    if !matches!(
        *request.method(),
        Method::POST | Method::PATCH | Method::DELETE
    ) {
        return match inner.call(request).await {
            Ok(response) => response,
            Err(err) => match err {},
        };
    }

    let key = match request.headers().get(KEY_HEADER) {
        Some(value) => match value.to_str() {
            Ok(text) if !text.trim().is_empty() => text.to_string(),
            _ => {
                return match inner.call(request).await {
                    Ok(response) => response,
                    Err(err) => match err {},
                };
            }
        },
        None => {
            return match inner.call(request).await {
                Ok(response) => response,
                Err(err) => match err {},
            };
        }
    };

    if !key.is_ascii() || key.len() > MAX_KEY_LEN {
        let correlation_id = correlation_id_from_request(&request);
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_input",
            "invalid idempotency key".to_string(),
            correlation_id,
        );
    }

    let correlation_id = correlation_id_from_request(&request);
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(|value| value.to_string());
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => Bytes::new(),
    };
    let scope_hash = hash_str(&format!("{method}|{path}"));
    let request_hash = hash_str(&format!(
        "{}|{}",
        canonical_query(query.as_deref()),
        canonical_body(&body_bytes)
    ));
    let record_key = format!("{key}:{scope_hash}");
    let now = Utc::now();

    if let Some(record) = lookup(&state.idempotency, &record_key, now) {
        if record.request_hash != request_hash {
            return error_response(
                StatusCode::CONFLICT,
                "conflict",
                "idempotency key conflict".to_string(),
                correlation_id,
            );
        }
        return replay(&record);
    }

    if wait_on_inflight(&state.idempotency, &record_key).await {
        if let Some(record) = lookup(&state.idempotency, &record_key, Utc::now()) {
            if record.request_hash == request_hash {
                return replay(&record);
            }
            return error_response(
                StatusCode::CONFLICT,
                "conflict",
                "idempotency key conflict".to_string(),
                correlation_id,
            );
        }
    }

    let request = Request::from_parts(parts, Body::from(body_bytes.clone()));
    let response = match inner.call(request).await {
        Ok(response) => response,
        Err(err) => match err {},
    };
    let (parts, body) = response.into_parts();
    let response_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    let status = parts.status;
    let response = Response::from_parts(parts, Body::from(response_bytes.clone()));

    // 5xx responses are transient and stay retryable; everything else
    // replays.
    let should_cache = status.is_success() || status.is_client_error();
    if should_cache {
        let stored = CachedResponse {
            request_hash,
            status: status.as_u16(),
            body: response_bytes,
            expires_at: Utc::now() + chrono::Duration::seconds(TTL_SECONDS),
        };
        state.idempotency.records.insert(record_key.clone(), stored);
    }

    notify_inflight(&state.idempotency, &record_key).await;
    response
}

fn lookup(state: &IdempotencyState, record_key: &str, now: DateTime<Utc>) -> Option<CachedResponse> {
    let record = state.records.get(record_key)?;
    if record.expires_at <= now {
        return None;
    }
    Some(record.clone())
}

fn replay(record: &CachedResponse) -> Response {
    let mut response = Response::builder()
        .status(StatusCode::from_u16(record.status).unwrap_or_default())
        .body(Body::from(record.body.clone()))
        .unwrap_or_else(|_| Response::new(Body::empty()));
    response
        .headers_mut()
        .insert("content-type", HeaderValue::from_static("application/json"));
    response
}

fn error_response(
    status: StatusCode,
    code: &'static str,
    message: String,
    correlation_id: Option<String>,
) -> Response {
    let body = ErrorEnvelope {
        code,
        message,
        correlation_id,
    };
    (status, axum::Json(body)).into_response()
}

async fn wait_on_inflight(state: &IdempotencyState, key: &str) -> bool {
    let notify = {
        let mut guard = state.locks.lock().await;
        if let Some(existing) = guard.get(key) {
            existing.clone()
        } else {
            let notify = Arc::new(Notify::new());
            guard.insert(key.to_string(), notify.clone());
            return false;
        }
    };
    notify.notified().await;
    true
}

async fn notify_inflight(state: &IdempotencyState, key: &str) {
    let notify = {
        let mut guard = state.locks.lock().await;
        guard.remove(key)
    };
    if let Some(notify) = notify {
        notify.notify_waiters();
    }
}

fn canonical_query(query: Option<&str>) -> String {
    let mut pairs = Vec::new();
    if let Some(query) = query {
        for part in query.split('&') {
            if part.is_empty() {
                continue;
            }
            let mut iter = part.splitn(2, '=');
            let key = iter.next().unwrap_or("");
            let value = iter.next().unwrap_or("");
            pairs.push((key.to_string(), value.to_string()));
        }
    }
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn canonical_body(bytes: &Bytes) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    let parsed: Result<Value, _> = serde_json::from_slice(bytes);
    if let Ok(value) = parsed {
        serde_json::to_string(&normalize_json(&value)).unwrap_or_default()
    } else {
        String::from_utf8_lossy(bytes).to_string()
    }
}

fn normalize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut ordered = BTreeMap::new();
            for (key, value) in map {
                ordered.insert(key.clone(), normalize_json(value));
            }
            Value::Object(ordered.into_iter().collect())
        }
        Value::Array(values) => Value::Array(values.iter().map(normalize_json).collect()),
        other => other.clone(),
    }
}

fn hash_str(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_query_sorts_pairs() {
        assert_eq!(canonical_query(Some("b=2&a=1")), "a=1&b=2");
        assert_eq!(canonical_query(None), "");
    }

    #[test]
    fn test_canonical_body_normalizes_key_order() {
        let a = Bytes::from(r#"{"x":1,"y":{"b":2,"a":3}}"#);
        let b = Bytes::from(r#"{"y":{"a":3,"b":2},"x":1}"#);
        assert_eq!(canonical_body(&a), canonical_body(&b));
    }

    #[test]
    fn test_prune_expired() {
        let state = IdempotencyState::new();
        let now = Utc::now();
        state.records.insert(
            "old".to_string(),
            CachedResponse {
                request_hash: "h".to_string(),
                status: 200,
                body: Bytes::new(),
                expires_at: now - chrono::Duration::seconds(1),
            },
        );
        state.records.insert(
            "live".to_string(),
            CachedResponse {
                request_hash: "h".to_string(),
                status: 200,
                body: Bytes::new(),
                expires_at: now + chrono::Duration::seconds(60),
            },
        );

        assert_eq!(prune_expired(&state, now), 1);
        assert!(state.records.get("live").is_some());
        assert!(state.records.get("old").is_none());
    }
}
