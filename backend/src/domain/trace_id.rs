//! Correlation identifier carried by every ledger request.
//!
//! The identifier lives in task-local storage for the duration of a request,
//! so error payloads and log lines can pick it up without threading it
//! through every call. Task-locals are not inherited by spawned tasks; wrap
//! such work in [`TraceId::scope`].

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use tokio::task_local;
use uuid::Uuid;

task_local! {
    static TRACE_ID: TraceId;
}

/// Header used both to accept a caller's identifier and to echo it back.
pub const TRACE_ID_HEADER: &str = "trace-id";

/// Per-request trace identifier.
///
/// # Examples
/// ```
/// use backend::domain::TraceId;
///
/// let supplied = TraceId::from_header("6f1c1e86-6f4f-4c9e-9a61-4f3f1c0d2b11");
/// assert_eq!(supplied.to_string(), "6f1c1e86-6f4f-4c9e-9a61-4f3f1c0d2b11");
///
/// // Anything that is not a UUID is replaced by a fresh identifier.
/// let fresh = TraceId::from_header("not-a-uuid");
/// assert_ne!(fresh.to_string(), "not-a-uuid");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reuse a caller-supplied identifier when it parses, else generate one.
    #[must_use]
    pub fn from_header(value: &str) -> Self {
        value.trim().parse().unwrap_or_else(|_| Self::generate())
    }

    /// Identifier of the request currently in scope, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        TRACE_ID.try_with(|id| *id).ok()
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Run `fut` with `trace_id` in scope.
    pub async fn scope<Fut>(trace_id: TraceId, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        TRACE_ID.scope(trace_id, fut).await
    }
}

impl From<Uuid> for TraceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("00000000-0000-0000-0000-000000000000")]
    #[case("  6f1c1e86-6f4f-4c9e-9a61-4f3f1c0d2b11 ")]
    fn valid_header_is_reused(#[case] raw: &str) {
        assert_eq!(TraceId::from_header(raw).to_string(), raw.trim());
    }

    #[rstest]
    #[case("")]
    #[case("purchase-42")]
    fn invalid_header_is_replaced(#[case] raw: &str) {
        let id = TraceId::from_header(raw);
        assert_ne!(id.to_string(), raw);
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[tokio::test]
    async fn scope_exposes_current_identifier() {
        let expected = TraceId::generate();
        let observed = TraceId::scope(expected, async { TraceId::current() }).await;
        assert_eq!(observed, Some(expected));
    }

    #[tokio::test]
    async fn spawned_tasks_do_not_inherit_scope() {
        let outer = TraceId::generate();
        let inner = TraceId::scope(outer, async {
            tokio::spawn(async { TraceId::current() })
                .await
                .expect("task joins")
        })
        .await;
        assert!(inner.is_none());
    }

    #[test]
    fn nothing_in_scope_outside_a_request() {
        assert!(TraceId::current().is_none());
    }
}
