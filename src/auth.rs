//! Request signing for the Spark WebSocket endpoint.
//!
//! The service authenticates connections through query parameters derived from
//! an HMAC-SHA256 signature over a fixed three-line canonical string:
//!
//! ```text
//! host: {host}
//! date: {date}
//! GET {path} HTTP/1.1
//! ```
//!
//! The signature is wrapped into an authorization clause, base64-encoded as a
//! whole, and appended to the URL together with the date and host. Signing is
//! per call; nothing here is retained between requests.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use crate::error::GenerateError;

type HmacSha256 = Hmac<Sha256>;

/// Build a fully signed `wss://` URL for the given endpoint, stamped with the
/// current instant. Any parse/hashing failure is fatal to the call.
pub fn signed_ws_url(
    endpoint: &str,
    api_key: &str,
    api_secret: &str,
) -> Result<String, GenerateError> {
    let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    signed_ws_url_at(endpoint, api_key, api_secret, &date)
}

/// Signing with an explicit date string, split out so tests are deterministic.
pub fn signed_ws_url_at(
    endpoint: &str,
    api_key: &str,
    api_secret: &str,
    date: &str,
) -> Result<String, GenerateError> {
    let url = Url::parse(endpoint).map_err(|e| GenerateError::Auth(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| GenerateError::Auth(format!("endpoint '{endpoint}' has no host")))?
        .to_string();
    let path = url.path().to_string();

    let signature = sign(&host, &path, date, api_secret)?;
    let authorization = format!(
        "api_key=\"{api_key}\", algorithm=\"hmac-sha256\", \
         headers=\"host date request-line\", signature=\"{signature}\""
    );

    let mut signed = Url::parse(&format!("wss://{host}{path}"))
        .map_err(|e| GenerateError::Auth(e.to_string()))?;
    signed
        .query_pairs_mut()
        .append_pair("authorization", &STANDARD.encode(authorization))
        .append_pair("date", date)
        .append_pair("host", &host);
    Ok(signed.to_string())
}

/// HMAC-SHA256 over the canonical signing string, base64-encoded.
fn sign(host: &str, path: &str, date: &str, secret: &str) -> Result<String, GenerateError> {
    let canonical = format!("host: {host}\ndate: {date}\nGET {path} HTTP/1.1");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| GenerateError::Auth(e.to_string()))?;
    mac.update(canonical.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "https://spark-api.xf-yun.com/v1/x1";
    const DATE: &str = "Mon, 01 Jan 2024 00:00:00 GMT";

    #[test]
    fn signed_url_is_wss_and_carries_all_query_parameters() {
        let url = signed_ws_url_at(ENDPOINT, "key", "secret", DATE).unwrap();
        assert!(url.starts_with("wss://spark-api.xf-yun.com/v1/x1?"));
        let parsed = Url::parse(&url).unwrap();
        let params: Vec<String> = parsed.query_pairs().map(|(k, _)| k.to_string()).collect();
        assert_eq!(params, vec!["authorization", "date", "host"]);
    }

    #[test]
    fn signing_is_deterministic_for_a_fixed_date() {
        let a = signed_ws_url_at(ENDPOINT, "key", "secret", DATE).unwrap();
        let b = signed_ws_url_at(ENDPOINT, "key", "secret", DATE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn authorization_decodes_to_the_expected_clause() {
        let url = signed_ws_url_at(ENDPOINT, "my-key", "secret", DATE).unwrap();
        let parsed = Url::parse(&url).unwrap();
        let auth = parsed
            .query_pairs()
            .find(|(k, _)| k == "authorization")
            .map(|(_, v)| v.to_string())
            .unwrap();
        let decoded = String::from_utf8(STANDARD.decode(auth).unwrap()).unwrap();
        assert!(decoded.starts_with("api_key=\"my-key\", algorithm=\"hmac-sha256\""));
        assert!(decoded.contains("headers=\"host date request-line\""));
        assert!(decoded.contains("signature=\""));
    }

    #[test]
    fn different_secrets_produce_different_signatures() {
        let a = sign("h", "/p", DATE, "one").unwrap();
        let b = sign("h", "/p", DATE, "two").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn endpoint_without_host_is_an_auth_error() {
        let err = signed_ws_url_at("not a url", "k", "s", DATE).unwrap_err();
        assert!(matches!(err, GenerateError::Auth(_)));
    }
}
