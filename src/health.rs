/// Upstream heartbeat probe.
///
/// One direct request per endpoint, no proxy and no retries: the point is to
/// learn whether the service itself answers, not whether the fallback path
/// can reach it.

use std::fmt;

use futures::future::join_all;
use serde::Serialize;
use tracing::debug;

use crate::context::Context;
use crate::http::{CancelSignal, Fetcher, HttpRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiHealth {
    /// 2xx response.
    Online,
    /// Reachable but answered with a non-success status.
    Degraded,
    /// Transport failure or timeout.
    Offline,
}

impl fmt::Display for ApiHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApiHealth::Online => "online",
            ApiHealth::Degraded => "degraded",
            ApiHealth::Offline => "offline",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointHealth {
    pub label: &'static str,
    pub url: String,
    pub status: ApiHealth,
}

/// A fired cancel signal ends the probe as `Offline`.
pub async fn check(fetcher: &Fetcher, url: &str, cancel: Option<&CancelSignal>) -> ApiHealth {
    let request = HttpRequest::get(url);
    match fetcher.send_once(&request, fetcher.defaults().timeout, cancel).await {
        Ok(resp) if resp.is_success() => ApiHealth::Online,
        Ok(resp) => {
            debug!(url, status = resp.status, "heartbeat degraded");
            ApiHealth::Degraded
        }
        Err(e) => {
            debug!(url, error = %e, "heartbeat failed");
            ApiHealth::Offline
        }
    }
}

/// Probes every configured endpoint concurrently, in configuration order.
pub async fn check_all(ctx: &Context) -> Vec<EndpointHealth> {
    let targets = ctx.config.endpoints.probe_targets();
    let probes = targets.iter().map(|(_, url)| check(&ctx.fetcher, url, ctx.cancel()));
    let statuses = join_all(probes).await;

    targets
        .into_iter()
        .zip(statuses)
        .map(|((label, url), status)| EndpointHealth {
            label,
            url: url.to_string(),
            status,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::error::TransportError;
    use crate::http::{HttpResponse, HttpTransport, cancel_pair};
    use std::time::Duration;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Answers by URL: `/ok` → 200, `/down` → 503, anything else refuses.
    struct ByPath;

    #[async_trait]
    impl HttpTransport for ByPath {
        async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            let status = if request.url.ends_with("/ok") {
                200
            } else if request.url.ends_with("/down") {
                503
            } else {
                return Err(TransportError::Network("connection refused".into()));
            };
            Ok(HttpResponse {
                status,
                content_type: None,
                body: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_check_classifies_responses() {
        let fetcher = Fetcher::new(Arc::new(ByPath), Some("https://proxy.test/get".to_string()));
        assert_eq!(check(&fetcher, "https://svc.test/ok", None).await, ApiHealth::Online);
        assert_eq!(check(&fetcher, "https://svc.test/down", None).await, ApiHealth::Degraded);
        assert_eq!(check(&fetcher, "https://svc.test/gone", None).await, ApiHealth::Offline);
    }

    /// Never answers.
    struct Hung;

    #[async_trait]
    impl HttpTransport for Hung {
        async fn send(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_all_ends_on_cancel() {
        let (handle, signal) = cancel_pair();
        let ctx = Context::with_transport(Arc::new(Hung), ServiceConfig::default()).with_cancel(signal);
        let started = tokio::time::Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        });
        let report = check_all(&ctx).await;

        assert!(!report.is_empty());
        assert!(report.iter().all(|e| e.status == ApiHealth::Offline));
        assert!(started.elapsed() < ctx.fetcher.defaults().timeout);
    }

    #[test]
    fn test_display() {
        assert_eq!(ApiHealth::Degraded.to_string(), "degraded");
    }
}
