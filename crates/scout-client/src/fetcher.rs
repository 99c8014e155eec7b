use std::error::Error as _;
use std::net::IpAddr;
use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use scout_core::error::AppError;
use scout_core::traits::Fetcher;
use url::{Host, Url};

/// Browser-like User-Agent; many career sites refuse obvious bots.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;
/// Bodies beyond this are cut off; the cleaned text budget is far smaller.
const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// HTTP page fetcher using reqwest.
///
/// Follows redirects and identifies as a desktop browser. Search results
/// point at arbitrary third-party hosts, so requests to private/reserved
/// IP ranges are blocked unless [`allow_private_urls`](Self::allow_private_urls)
/// is called. The initial URL is checked after DNS resolution; each redirect
/// hop is checked for scheme and literal private addresses.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout: Duration,
    max_body_bytes: usize,
    ssrf_protection: bool,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(timeout, true)?,
            timeout,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            ssrf_protection: true,
        })
    }

    /// Disable SSRF protection, allowing requests to private/reserved IPs.
    ///
    /// Only for CLI usage on a machine the user controls.
    pub fn allow_private_urls(self) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(self.timeout, false)?,
            ssrf_protection: false,
            ..self
        })
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}

fn build_client(timeout: Duration, guard_redirects: bool) -> Result<Client, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    let policy = if guard_redirects {
        Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error(format!("more than {MAX_REDIRECTS} redirects"));
            }
            match check_redirect_target(attempt.url()) {
                Ok(()) => attempt.follow(),
                Err(reason) => attempt.error(reason),
            }
        })
    } else {
        Policy::limited(MAX_REDIRECTS)
    };

    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers)
        .redirect(policy)
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::HttpError(e.to_string()))
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        if self.ssrf_protection {
            check_public_url(url).await?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout.as_secs()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        read_capped(response, self.max_body_bytes).await
    }
}

/// Read at most `limit` bytes of the body, decoding lossily as UTF-8.
async fn read_capped(mut response: Response, limit: usize) -> Result<String, AppError> {
    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?
    {
        let room = limit - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            tracing::debug!(url = %response.url(), limit, "Response body truncated");
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Map a reqwest transport failure onto the matching [`AppError`].
pub(crate) fn transport_error(e: reqwest::Error, timeout_secs: u64) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout_secs)
    } else if e.is_connect() {
        AppError::NetworkError(format!("Connection failed: {e}"))
    } else if e.is_redirect() {
        let reason = e
            .source()
            .map(|s| s.to_string())
            .unwrap_or_else(|| e.to_string());
        AppError::HttpError(format!("Redirect rejected: {reason}"))
    } else {
        AppError::HttpError(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Reject non-http(s) URLs and hosts resolving to private/reserved addresses.
async fn check_public_url(url: &str) -> Result<(), AppError> {
    let parsed = Url::parse(url).map_err(|e| AppError::HttpError(format!("Invalid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::HttpError(format!(
            "URL scheme '{}' is not allowed (only http/https)",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::HttpError("URL has no host".to_string()))?;

    // IPv6 literals come back bracketed from host_str().
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return ensure_public(host, ip);
    }

    let port = parsed.port_or_known_default().unwrap_or(80);
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| AppError::NetworkError(format!("DNS resolution failed for {host}: {e}")))?;

    let mut resolved = false;
    for addr in addrs {
        resolved = true;
        ensure_public(host, addr.ip())?;
    }
    if !resolved {
        return Err(AppError::NetworkError(format!(
            "DNS resolution returned no addresses for {host}"
        )));
    }
    Ok(())
}

/// Synchronous check for a redirect hop: scheme plus literal addresses.
fn check_redirect_target(url: &Url) -> Result<(), String> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("redirect to scheme '{}' is not allowed", url.scheme()));
    }
    match url.host() {
        Some(Host::Ipv4(ip)) if is_private_ip(IpAddr::V4(ip)) => {
            Err(format!("SSRF blocked: redirect to private/reserved IP {ip}"))
        }
        Some(Host::Ipv6(ip)) if is_private_ip(IpAddr::V6(ip)) => {
            Err(format!("SSRF blocked: redirect to private/reserved IP {ip}"))
        }
        Some(Host::Domain(d)) if d.eq_ignore_ascii_case("localhost") => {
            Err("SSRF blocked: redirect to localhost".to_string())
        }
        Some(_) => Ok(()),
        None => Err("redirect target has no host".to_string()),
    }
}

fn ensure_public(host: &str, ip: IpAddr) -> Result<(), AppError> {
    if is_private_ip(ip) {
        Err(AppError::HttpError(format!(
            "SSRF blocked: {host} resolves to private/reserved IP {ip}"
        )))
    } else {
        Ok(())
    }
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                // 100.64.0.0/10 carrier-grade NAT
                || (a == 100 && (b & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xFFC0) == 0xFE80
                || (first & 0xFE00) == 0xFC00
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(IpAddr::V4(v4)))
        }
    }
}
