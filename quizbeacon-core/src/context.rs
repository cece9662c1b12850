//! Ambient context resolution
//!
//! Two kinds of context annotate every event:
//!
//! - **Device context**: a coarse OS/model classification derived from the
//!   host's user-agent string. Pure and cheap, so it is recomputed on every
//!   event rather than cached.
//! - **Network context**: the client's origin IP, resolved once at
//!   bootstrap through a public lookup service with a same-backend fallback,
//!   then cached for the life of the tracker. Total failure yields the
//!   `"Unknown"` sentinel; resolution never errors out.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::error::{Error, Result};

/// Sentinel carried by events when the origin IP could not be resolved
pub const UNKNOWN_IP: &str = "Unknown";

/// Coarse operating system classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Os {
    Windows,
    #[serde(rename = "macOS")]
    MacOs,
    Android,
    #[serde(rename = "iOS")]
    Ios,
    Linux,
    #[serde(rename = "Unknown OS")]
    Unknown,
}

impl Os {
    /// Wire representation, matching the ingestion endpoint's vocabulary
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Windows => "Windows",
            Os::MacOs => "macOS",
            Os::Android => "Android",
            Os::Ios => "iOS",
            Os::Linux => "Linux",
            Os::Unknown => "Unknown OS",
        }
    }

    /// Windows, macOS and Linux all report the fixed "Desktop" model
    fn is_desktop(&self) -> bool {
        matches!(self, Os::Windows | Os::MacOs | Os::Linux)
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device classification attached to every event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceContext {
    pub os: Os,
    pub model: String,
}

/// Ordered OS detection rules, evaluated top-down; first substring match
/// wins. "Mac OS X" before "iOS" preserves the legacy precedence where
/// iPhone user agents (which advertise "like Mac OS X") classify as macOS.
const OS_RULES: &[(&str, Os)] = &[
    ("Windows", Os::Windows),
    ("Mac OS X", Os::MacOs),
    ("Android", Os::Android),
    ("iOS", Os::Ios),
    ("Linux", Os::Linux),
];

/// Classify a user-agent string into OS and device model.
///
/// Pure and total: any input yields a classification, with "Unknown OS" /
/// "Unknown Model" defaults. Desktop operating systems force the model to
/// the literal `"Desktop"` regardless of any token match.
pub fn resolve_device(ua: &str) -> DeviceContext {
    let os = OS_RULES
        .iter()
        .find(|(pattern, _)| ua.contains(pattern))
        .map(|(_, os)| *os)
        .unwrap_or(Os::Unknown);

    let mut model = "Unknown Model".to_string();
    if let Some(token) = android_version_token(ua) {
        model = token;
    }
    if let Some(token) = apple_device_token(ua) {
        model = token.to_string();
    }
    if os.is_desktop() {
        model = "Desktop".to_string();
    }

    DeviceContext { os, model }
}

/// Extract the Android version token: the text after "Android " up to the
/// next semicolon (e.g. "10" from "Android 10; Pixel 4")
fn android_version_token(ua: &str) -> Option<String> {
    let (_, rest) = ua.split_once("Android")?;
    let mut chars = rest.chars();
    if !chars.next()?.is_whitespace() {
        return None;
    }
    let token = chars.as_str().split(';').next().unwrap_or("");
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Extract an Apple device token: "(iPhone", "(iPad" or "(iPod"
fn apple_device_token(ua: &str) -> Option<&'static str> {
    ["iPhone", "iPad", "iPod"]
        .into_iter()
        .find(|device| ua.contains(&format!("({}", device)))
}

/// Response shape shared by both IP lookup endpoints
#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

/// Resolves the client's origin IP via a primary public service and a
/// same-backend fallback
pub struct NetworkResolver {
    http: reqwest::Client,
    primary_url: String,
    fallback_url: String,
}

impl NetworkResolver {
    /// Create a resolver from tracker configuration
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.resolve_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            primary_url: config.ip_service_url.clone(),
            fallback_url: config.ip_fallback_url.clone(),
        })
    }

    /// Resolve the origin IP, falling back to `"Unknown"` on total failure.
    ///
    /// Infallible: every failure path is caught, logged and converted to the
    /// sentinel. Intended to be called once, at bootstrap.
    pub async fn resolve(&self) -> String {
        match self.lookup(&self.primary_url).await {
            Ok(ip) => ip,
            Err(e) => {
                tracing::debug!(error = %e, "Primary IP lookup failed, trying fallback");
                match self.lookup(&self.fallback_url).await {
                    Ok(ip) => ip,
                    Err(e) => {
                        tracing::warn!(error = %e, "Could not resolve client IP");
                        UNKNOWN_IP.to_string()
                    }
                }
            }
        }
    }

    /// Single GET expecting `{"ip": "..."}`
    async fn lookup(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("IP lookup request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Delivery(format!("IP lookup failed ({})", status)));
        }

        let body: IpResponse = response
            .json()
            .await
            .map_err(|e| Error::Delivery(format!("failed to parse IP lookup response: {}", e)))?;

        Ok(body.ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOWS_UA: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";
    const MAC_UA: &str =
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 Safari/537.36";
    const ANDROID_UA: &str =
        "Mozilla/5.0 (Linux; Android 10; Pixel 4) AppleWebKit/537.36 Chrome/120.0 Mobile";
    const IPHONE_UA: &str =
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Safari";
    const LINUX_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/121.0";

    #[test]
    fn test_desktop_os_forces_desktop_model() {
        for ua in [WINDOWS_UA, MAC_UA, LINUX_UA] {
            let device = resolve_device(ua);
            assert_eq!(device.model, "Desktop", "ua: {}", ua);
        }
    }

    #[test]
    fn test_os_classification() {
        assert_eq!(resolve_device(WINDOWS_UA).os, Os::Windows);
        assert_eq!(resolve_device(MAC_UA).os, Os::MacOs);
        assert_eq!(resolve_device(ANDROID_UA).os, Os::Android);
        assert_eq!(resolve_device(LINUX_UA).os, Os::Linux);
        assert_eq!(resolve_device("something else").os, Os::Unknown);
    }

    #[test]
    fn test_rule_order_android_before_linux() {
        // Android UAs advertise Linux too; the rule table must pick Android
        let device = resolve_device("Mozilla/5.0 (Android 10; Mobile) Gecko Firefox");
        assert_eq!(device.os, Os::Android);
    }

    #[test]
    fn test_android_model_token() {
        let device = resolve_device(ANDROID_UA);
        assert_eq!(device.model, "10");
    }

    #[test]
    fn test_iphone_classifies_as_macos_desktop() {
        // "like Mac OS X" wins under legacy precedence, and a desktop OS
        // forces the Desktop model even though an iPhone token is present
        let device = resolve_device(IPHONE_UA);
        assert_eq!(device.os, Os::MacOs);
        assert_eq!(device.model, "Desktop");
    }

    #[test]
    fn test_apple_token_without_desktop_os() {
        let device = resolve_device("Mozilla/5.0 (iPad; CPU OS 16_0) AppleWebKit/605.1.15");
        assert_eq!(device.os, Os::Unknown);
        assert_eq!(device.model, "iPad");
    }

    #[test]
    fn test_unknown_defaults() {
        let device = resolve_device("curl/8.4.0");
        assert_eq!(device.os, Os::Unknown);
        assert_eq!(device.model, "Unknown Model");
    }

    #[test]
    fn test_resolve_device_is_pure() {
        assert_eq!(resolve_device(ANDROID_UA), resolve_device(ANDROID_UA));
    }

    #[test]
    fn test_os_wire_strings() {
        assert_eq!(serde_json::to_value(Os::MacOs).unwrap(), "macOS");
        assert_eq!(serde_json::to_value(Os::Ios).unwrap(), "iOS");
        assert_eq!(serde_json::to_value(Os::Unknown).unwrap(), "Unknown OS");
    }

    #[tokio::test]
    async fn test_resolve_unknown_when_both_lookups_fail() {
        // Grab a free port, then close it so both lookups are refused
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = TrackerConfig {
            ip_service_url: format!("http://127.0.0.1:{}/ip", port),
            ip_fallback_url: format!("http://127.0.0.1:{}/api/client-ip", port),
            resolve_timeout_secs: 2,
            ..Default::default()
        };

        let resolver = NetworkResolver::new(&config).unwrap();
        assert_eq!(resolver.resolve().await, UNKNOWN_IP);
    }
}
