//! Cross-origin policy for the chat endpoint
//!
//! The widget is embedded on a small, fixed set of sites. A request whose `Origin` is on the
//! allow-list gets that origin echoed back. What happens to every other origin depends on the
//! [`OriginPolicy`].
use anyhow::{anyhow, bail};
use axum::http::{
    HeaderMap, HeaderValue,
    header::{
        ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        VARY,
    },
};
use tracing::debug;

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "https://lol-bets.design.webflow.io",
    "https://lol-bets.design.webflow.com",
    "https://www.lol-bets.com",
];

const ALLOWED_METHODS: &str = "POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// What to do with an origin that isn't on the allow-list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Grant the first allow-listed origin instead. Browsers on other sites will still reject
    /// the response, but no request is refused outright.
    #[default]
    Fallback,
    /// Omit `Access-Control-Allow-Origin` entirely.
    Strict,
}

/// A non-empty list of origins, each a valid header value.
#[derive(Debug, Clone)]
pub struct AllowedOrigins {
    origins: Vec<HeaderValue>,
    policy: OriginPolicy,
}

impl AllowedOrigins {
    pub fn new<I, S>(origins: I, policy: OriginPolicy) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let origins = origins
            .into_iter()
            .map(|origin| {
                let origin = origin.as_ref().trim();
                HeaderValue::from_str(origin)
                    .map_err(|_| anyhow!("Origin '{origin}' is not a valid header value"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        if origins.is_empty() {
            bail!("At least one allowed origin is required");
        }

        Ok(Self { origins, policy })
    }

    pub fn policy(&self) -> OriginPolicy {
        self.policy
    }

    /// The value for `Access-Control-Allow-Origin`, if any, given the request's `Origin`.
    pub fn resolve(&self, origin: Option<&HeaderValue>) -> Option<&HeaderValue> {
        if let Some(origin) = origin
            && let Some(allowed) = self.origins.iter().find(|allowed| *allowed == origin)
        {
            return Some(allowed);
        }

        match self.policy {
            OriginPolicy::Fallback => self.origins.first(),
            OriginPolicy::Strict => {
                debug!(?origin, "Origin not allowed, omitting allow-origin header");
                None
            }
        }
    }

    /// Writes the CORS headers onto an outgoing response.
    pub fn apply(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        if let Some(allowed) = self.resolve(origin) {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allowed.clone());
        }
        headers.insert(VARY, HeaderValue::from_static("Origin"));
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
    }
}

impl Default for AllowedOrigins {
    fn default() -> Self {
        Self {
            origins: DEFAULT_ALLOWED_ORIGINS
                .into_iter()
                .map(HeaderValue::from_static)
                .collect(),
            policy: OriginPolicy::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("https://lol-bets.design.webflow.io"), "https://lol-bets.design.webflow.io")]
    #[case(Some("https://lol-bets.design.webflow.com"), "https://lol-bets.design.webflow.com")]
    #[case(Some("https://www.lol-bets.com"), "https://www.lol-bets.com")]
    #[case(Some("https://evil.example"), "https://lol-bets.design.webflow.io")]
    #[case(Some("https://www.lol-bets.com/"), "https://lol-bets.design.webflow.io")]
    #[case(Some("HTTPS://WWW.LOL-BETS.COM"), "https://lol-bets.design.webflow.io")]
    #[case(None, "https://lol-bets.design.webflow.io")]
    fn test_fallback_resolution(#[case] origin: Option<&str>, #[case] expected: &str) {
        let origins = AllowedOrigins::default();
        let origin = origin.map(|o| HeaderValue::from_str(o).unwrap());
        assert_eq!(origins.resolve(origin.as_ref()).unwrap(), expected);
    }

    #[rstest]
    #[case(Some("https://evil.example"))]
    #[case(None)]
    fn test_strict_denies_unknown_origins(#[case] origin: Option<&str>) {
        let origins =
            AllowedOrigins::new(["https://www.lol-bets.com"], OriginPolicy::Strict).unwrap();
        let origin = origin.map(|o| HeaderValue::from_str(o).unwrap());
        assert!(origins.resolve(origin.as_ref()).is_none());

        let mut headers = HeaderMap::new();
        origins.apply(origin.as_ref(), &mut headers);
        assert!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert_eq!(headers[VARY], "Origin");
    }

    #[test]
    fn test_strict_echoes_known_origin() {
        let origins =
            AllowedOrigins::new(["https://www.lol-bets.com"], OriginPolicy::Strict).unwrap();
        let origin = HeaderValue::from_static("https://www.lol-bets.com");
        assert_eq!(origins.resolve(Some(&origin)).unwrap(), "https://www.lol-bets.com");
    }

    #[test]
    fn test_apply_sets_all_headers() {
        let origins = AllowedOrigins::default();
        let mut headers = HeaderMap::new();
        origins.apply(
            Some(&HeaderValue::from_static("https://www.lol-bets.com")),
            &mut headers,
        );

        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "https://www.lol-bets.com");
        assert_eq!(headers[VARY], "Origin");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
        assert_eq!(
            headers[ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization"
        );
    }

    #[test]
    fn test_new_rejects_empty_list() {
        let result = AllowedOrigins::new(Vec::<String>::new(), OriginPolicy::Fallback);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_rejects_invalid_header_value() {
        let result = AllowedOrigins::new(["https://ok.example", "bad\norigin"], OriginPolicy::Fallback);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_trims_whitespace() {
        let origins =
            AllowedOrigins::new([" https://a.example ", "https://b.example"], OriginPolicy::Fallback)
                .unwrap();
        assert_eq!(origins.resolve(None).unwrap(), "https://a.example");
    }
}
