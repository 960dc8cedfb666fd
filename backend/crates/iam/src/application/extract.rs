//! Credential Extractors
//!
//! Pull a raw credential out of the inbound request headers. The chain
//! tries extractors in configured order and returns the first hit; no
//! hit means the caller is anonymous, which is not an error.

use axum::http::{HeaderMap, header};

/// Transient credential produced by an extractor. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer { token: String },
    Basic { id: String, secret: String },
}

/// One strategy for pulling a credential off a request.
pub trait CredentialExtractor: Send + Sync {
    fn extract_from(&self, headers: &HeaderMap) -> Option<Credential>;
}

/// Run the chain, first non-empty result wins.
pub fn extract_credential(
    extractors: &[Box<dyn CredentialExtractor>],
    headers: &HeaderMap,
) -> Option<Credential> {
    extractors.iter().find_map(|e| e.extract_from(headers))
}

/// The default chain.
pub fn default_extractors() -> Vec<Box<dyn CredentialExtractor>> {
    vec![Box::new(BearerExtractor), Box::new(BasicExtractor)]
}

/// Reads `Authorization: Bearer <token>`, case-insensitive scheme.
pub struct BearerExtractor;

impl CredentialExtractor for BearerExtractor {
    fn extract_from(&self, headers: &HeaderMap) -> Option<Credential> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, rest) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = rest.trim();
        if token.is_empty() {
            return None;
        }
        Some(Credential::Bearer {
            token: token.to_string(),
        })
    }
}

/// Reads `Authorization: Basic <base64(id:secret)>`. Malformed base64
/// or non-utf8 content is "no credential", not an error.
pub struct BasicExtractor;

impl CredentialExtractor for BasicExtractor {
    fn extract_from(&self, headers: &HeaderMap) -> Option<Credential> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, rest) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = platform::crypto::from_base64(rest.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (id, secret) = decoded.split_once(':')?;
        Some(Credential::Basic {
            id: id.trim().to_string(),
            secret: secret.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_extraction() {
        let headers = headers_with_auth("Bearer abc.def.ghi");
        let cred = BearerExtractor.extract_from(&headers).unwrap();
        assert_eq!(
            cred,
            Credential::Bearer {
                token: "abc.def.ghi".to_string()
            }
        );
    }

    #[test]
    fn test_bearer_scheme_case_insensitive() {
        let headers = headers_with_auth("bEaReR tok");
        assert!(BearerExtractor.extract_from(&headers).is_some());
    }

    #[test]
    fn test_bearer_rejects_other_schemes() {
        let headers = headers_with_auth("Basic dXNlcjpwdw==");
        assert!(BearerExtractor.extract_from(&headers).is_none());
    }

    #[test]
    fn test_basic_extraction() {
        // base64("user:pw")
        let headers = headers_with_auth("Basic dXNlcjpwdw==");
        let cred = BasicExtractor.extract_from(&headers).unwrap();
        assert_eq!(
            cred,
            Credential::Basic {
                id: "user".to_string(),
                secret: "pw".to_string()
            }
        );
    }

    #[test]
    fn test_basic_malformed_base64_is_no_credential() {
        let headers = headers_with_auth("Basic %%%not-base64%%%");
        assert!(BasicExtractor.extract_from(&headers).is_none());
    }

    #[test]
    fn test_chain_order_and_anonymous() {
        let chain = default_extractors();

        let headers = headers_with_auth("Bearer tok");
        assert!(matches!(
            extract_credential(&chain, &headers),
            Some(Credential::Bearer { .. })
        ));

        let headers = headers_with_auth("Basic dXNlcjpwdw==");
        assert!(matches!(
            extract_credential(&chain, &headers),
            Some(Credential::Basic { .. })
        ));

        // no Authorization header at all: anonymous, not an error
        assert!(extract_credential(&chain, &HeaderMap::new()).is_none());
    }
}
