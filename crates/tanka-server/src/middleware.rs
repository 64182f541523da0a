use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tanka_core::{AppConfig, InboundLimit};
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Inbound request classes, each with its own `(max_requests, window)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    Read,
    RefetchItem,
    FullRescrape,
}

impl OperationClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperationClass::Read => "read",
            OperationClass::RefetchItem => "refetch_item",
            OperationClass::FullRescrape => "full_rescrape",
        }
    }
}

/// Outcome of one inbound gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub allowed: bool,
    /// Requests left in the current window after this one.
    pub remaining: usize,
    /// Time until the oldest request leaves the window; set when denied.
    pub retry_after: Option<Duration>,
}

/// Above this many tracked clients, idle logs are dropped on the next check.
const PRUNE_THRESHOLD: usize = 10_000;

type LogKey = (OperationClass, String);

/// Sliding-window log limiter keyed by `(operation class, client)`.
///
/// Only allowed requests are recorded, so a client hammering a closed
/// window does not extend its own lockout.
#[derive(Debug, Clone)]
pub struct InboundGate {
    limits: Arc<HashMap<OperationClass, InboundLimit>>,
    logs: Arc<Mutex<HashMap<LogKey, VecDeque<Instant>>>>,
}

impl InboundGate {
    #[must_use]
    pub fn new(limits: HashMap<OperationClass, InboundLimit>) -> Self {
        Self {
            limits: Arc::new(limits),
            logs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(HashMap::from([
            (OperationClass::Read, config.inbound_read),
            (OperationClass::RefetchItem, config.inbound_refetch),
            (OperationClass::FullRescrape, config.inbound_rescrape),
        ]))
    }

    pub fn check(&self, class: OperationClass, client: &str) -> GateDecision {
        self.check_at(class, client, Instant::now())
    }

    /// [`Self::check`] with an explicit clock reading.
    pub fn check_at(&self, class: OperationClass, client: &str, now: Instant) -> GateDecision {
        let Some(limit) = self.limits.get(&class).copied() else {
            return GateDecision {
                allowed: true,
                remaining: usize::MAX,
                retry_after: None,
            };
        };

        let mut logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        if logs.len() > PRUNE_THRESHOLD {
            logs.retain(|(c, _), log| {
                let window = self.limits.get(c).map_or(Duration::ZERO, |l| l.window);
                log.back()
                    .is_some_and(|last| now.saturating_duration_since(*last) < window)
            });
        }

        let log = logs.entry((class, client.to_string())).or_default();
        while log
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= limit.window)
        {
            log.pop_front();
        }

        if log.len() >= limit.max_requests {
            let retry_after = log.front().map_or(limit.window, |oldest| {
                limit
                    .window
                    .saturating_sub(now.saturating_duration_since(*oldest))
            });
            return GateDecision {
                allowed: false,
                remaining: 0,
                retry_after: Some(retry_after),
            };
        }

        log.push_back(now);
        GateDecision {
            allowed: true,
            remaining: limit.max_requests - log.len(),
            retry_after: None,
        }
    }
}

/// Middleware state: the shared gate plus the class of the routes it guards.
#[derive(Debug, Clone)]
pub struct GateLayer {
    pub gate: InboundGate,
    pub class: OperationClass,
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: String,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing the inbound gate for one operation class.
///
/// Denied requests get a 429 with `retry-after`; every response carries
/// `x-ratelimit-remaining`.
pub async fn enforce_inbound_gate(
    State(layer): State<GateLayer>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(req.headers(), peer);
    let decision = layer.gate.check(layer.class, &client);

    if !decision.allowed {
        let retry_after_secs = decision
            .retry_after
            .map_or(1, |d| d.as_secs() + u64::from(d.subsec_nanos() > 0))
            .max(1);
        tracing::warn!(
            client = %client,
            class = layer.class.as_str(),
            retry_after_secs,
            "inbound request rate limited"
        );
        let mut res = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "rate_limited",
                    message: format!(
                        "too many {} requests; retry in {retry_after_secs}s",
                        layer.class.as_str()
                    ),
                },
            }),
        )
            .into_response();
        res.headers_mut()
            .insert("retry-after", HeaderValue::from(retry_after_secs));
        res.headers_mut()
            .insert("x-ratelimit-remaining", HeaderValue::from(0u64));
        return res;
    }

    let mut res = next.run(req).await;
    res.headers_mut().insert(
        "x-ratelimit-remaining",
        HeaderValue::from(decision.remaining as u64),
    );
    res
}

/// Client identity for the inbound gate: the first `x-forwarded-for` hop,
/// else the peer address.
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    forwarded_for(headers)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first.is_empty() || first.len() > 64 {
        return None;
    }
    first
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b':' || b == b'-')
        .then(|| first.to_string())
}
