use axum::http::HeaderMap;
use tracing::debug;

use super::domain::UserId;
use super::error::PipelineError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolves the caller's identity from request metadata supplied by the session layer.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<UserId>;
}

/// Reads the user id forwarded by the session provider in `x-user-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderIdentity;

impl IdentityResolver for HeaderIdentity {
    fn resolve(&self, headers: &HeaderMap) -> Option<UserId> {
        headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(UserId)
    }
}

/// Compatibility shim for clients that never authenticate: unresolved requests are
/// attributed to a fixed user. Lives at the HTTP boundary only.
#[derive(Debug, Clone)]
pub struct DefaultUserShim<R> {
    inner: R,
    fallback: UserId,
}

impl<R> DefaultUserShim<R> {
    pub fn new(inner: R, fallback: UserId) -> Self {
        Self { inner, fallback }
    }
}

impl<R: IdentityResolver> IdentityResolver for DefaultUserShim<R> {
    fn resolve(&self, headers: &HeaderMap) -> Option<UserId> {
        self.inner.resolve(headers).or_else(|| {
            debug!(user_id = self.fallback.0, "no identity presented; using default user");
            Some(self.fallback)
        })
    }
}

/// An explicit `user_id` wins; otherwise ask the resolver.
pub fn resolve_user(
    explicit: Option<i64>,
    headers: &HeaderMap,
    resolver: &dyn IdentityResolver,
) -> Result<UserId, PipelineError> {
    match explicit {
        Some(raw) => UserId::parse(raw),
        None => resolver.resolve(headers).ok_or_else(|| {
            PipelineError::Validation("user_id is required and no identity was presented".into())
        }),
    }
}
