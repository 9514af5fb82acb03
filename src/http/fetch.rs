/// Resilient fetch.
///
/// `Fetcher::fetch` tries an optional direct URL once, then falls back to the
/// target wrapped through a CORS-bridging proxy (`<proxy>?url=<encoded>`),
/// retrying with exponential backoff. Every attempt races a timeout and the
/// caller's cancel signal; whichever fires first wins.
///
/// A non-success status is retried exactly like a network error, but the last
/// status and a short body preview are kept for the final error message.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use super::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::error::{FetchError, TransportError};

/// Maximum characters of a response body kept in error messages.
pub const PREVIEW_CHARS: usize = 280;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(300);

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Fires the paired `CancelSignal`s.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Caller-owned cancellation token. Cloning is cheap; all clones observe the
/// same handle. If the handle is dropped without firing, the signal never fires.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the handle fires.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

async fn wait_for_cancel(cancel: Option<&CancelSignal>) {
    match cancel {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Method, headers and body of an outbound request, independent of its URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInit {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestInit {
    pub fn post_json(body: impl Into<String>) -> Self {
        RequestInit {
            method: Method::Post,
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            body: Some(body.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Tried once before the proxy fallback. A success status short-circuits.
    pub direct_url: Option<String>,
    pub timeout: Duration,
    /// Fallback attempts = `retries + 1`.
    pub retries: u32,
    /// Wait after fallback attempt `n` is `backoff * 2^n`.
    pub backoff: Duration,
    pub init: RequestInit,
    pub cancel: Option<CancelSignal>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            direct_url: None,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            backoff: DEFAULT_BACKOFF,
            init: RequestInit::default(),
            cancel: None,
        }
    }
}

impl FetchOptions {
    pub fn with_init(mut self, init: RequestInit) -> Self {
        self.init = init;
        self
    }

    pub fn with_cancel(mut self, cancel: Option<CancelSignal>) -> Self {
        self.cancel = cancel;
        self
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    /// `None` disables proxy wrapping; fallback attempts then hit the target.
    proxy_base: Option<String>,
    direct_first: bool,
    defaults: FetchOptions,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, proxy_base: Option<String>) -> Self {
        Fetcher {
            transport,
            proxy_base: proxy_base.filter(|p| !p.trim().is_empty()),
            direct_first: true,
            defaults: FetchOptions::default(),
        }
    }

    /// Whether `options_for` fills in the target as the direct URL.
    pub fn direct_first(mut self, enabled: bool) -> Self {
        self.direct_first = enabled;
        self
    }

    pub fn with_defaults(mut self, timeout: Duration, retries: u32, backoff: Duration) -> Self {
        self.defaults.timeout = timeout;
        self.defaults.retries = retries;
        self.defaults.backoff = backoff;
        self
    }

    pub fn defaults(&self) -> &FetchOptions {
        &self.defaults
    }

    /// Default options for fetching `url`, with the direct attempt enabled
    /// when the fetcher runs direct-first.
    pub fn options_for(&self, url: &str) -> FetchOptions {
        let mut options = self.defaults.clone();
        if self.direct_first {
            options.direct_url = Some(url.to_string());
        }
        options
    }

    /// `<proxy>?url=<percent-encoded target>`, or the target itself when no
    /// proxy is configured.
    pub fn proxied_url(&self, target: &str) -> String {
        match &self.proxy_base {
            Some(base) => format!("{}?url={}", base, urlencoding::encode(target)),
            None => target.to_string(),
        }
    }

    /// Single attempt raced against `timeout` and `cancel`.
    pub async fn send_once(
        &self,
        request: &HttpRequest,
        timeout: Duration,
        cancel: Option<&CancelSignal>,
    ) -> Result<HttpResponse, TransportError> {
        tokio::select! {
            biased;
            _ = wait_for_cancel(cancel) => Err(TransportError::Cancelled),
            result = self.transport.send(request) => result,
            _ = tokio::time::sleep(timeout) => Err(TransportError::TimedOut(timeout)),
        }
    }

    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<HttpResponse, FetchError> {
        let cancel = options.cancel.as_ref();
        let mut attempts = 0u32;
        let mut last = LastFailure::default();

        if let Some(direct) = &options.direct_url {
            let request = HttpRequest::with_init(direct.as_str(), &options.init);
            attempts += 1;
            match self.send_once(&request, options.timeout, cancel).await {
                Ok(resp) if resp.is_success() => return Ok(resp),
                Ok(resp) => {
                    debug!(url = %direct, status = resp.status, "direct attempt failed");
                    last = LastFailure::status(&resp);
                }
                Err(TransportError::Cancelled) => return Err(FetchError::Cancelled),
                Err(err) => {
                    debug!(url = %direct, error = %err, "direct attempt failed");
                    last = LastFailure::transport(&err);
                }
            }
        }

        let fallback = self.fallback_request(url, &options.init);
        let fallback_attempts = options.retries.saturating_add(1);

        for attempt in 0..fallback_attempts {
            attempts += 1;
            debug!(url = %fallback.url, attempt, "fallback attempt");
            match self.send_once(&fallback, options.timeout, cancel).await {
                Ok(resp) if resp.is_success() => return Ok(resp),
                Ok(resp) => last = LastFailure::status(&resp),
                Err(TransportError::Cancelled) => return Err(FetchError::Cancelled),
                Err(err) => last = LastFailure::transport(&err),
            }

            if attempt + 1 < fallback_attempts {
                let delay = backoff_delay(options.backoff, attempt);
                tokio::select! {
                    biased;
                    _ = wait_for_cancel(cancel) => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts,
            status: last.status,
            detail: last.detail,
        })
    }

    /// GETs go through the proxy without headers. Other methods cannot be
    /// wrapped by a GET-only proxy, so they retry against their own URL.
    fn fallback_request(&self, url: &str, init: &RequestInit) -> HttpRequest {
        match init.method {
            Method::Get => HttpRequest::get(self.proxied_url(url)),
            _ => HttpRequest::with_init(url, init),
        }
    }
}

pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

#[derive(Debug, Default)]
struct LastFailure {
    status: Option<u16>,
    detail: String,
}

impl LastFailure {
    fn status(resp: &HttpResponse) -> Self {
        LastFailure {
            status: Some(resp.status),
            detail: format!("responded with {}: {}", resp.status, preview(&resp.body)),
        }
    }

    fn transport(err: &TransportError) -> Self {
        LastFailure {
            status: None,
            detail: err.to_string(),
        }
    }
}

/// Whitespace-collapsed body, truncated to `PREVIEW_CHARS`.
pub fn preview(body: &str) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= PREVIEW_CHARS {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(PREVIEW_CHARS).collect();
    truncated.push('…');
    truncated
}
