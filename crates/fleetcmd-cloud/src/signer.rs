//! ACS3-HMAC-SHA256 request signing for RPC-style APIs.
//!
//! ```text
//! CanonicalRequest = METHOD \n "/" \n CanonicalQuery \n CanonicalHeaders \n SignedHeaders \n hex(sha256(body))
//! StringToSign     = "ACS3-HMAC-SHA256" \n hex(sha256(CanonicalRequest))
//! Signature        = hex(hmac_sha256(secret, StringToSign))
//! ```
//!
//! Query parameters and headers are sorted; keys and values are
//! percent-encoded per RFC 3986.

use std::collections::BTreeMap;

use fleetcmd_core::Session;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// The parts of an RPC call that are covered by the signature.
#[derive(Debug, Clone)]
pub struct RpcRequest<'a> {
    pub method: &'a str,
    /// `host[:port]` exactly as sent in the `Host` header.
    pub host: &'a str,
    pub action: &'a str,
    pub version: &'a str,
    pub params: &'a [(String, String)],
    pub body: &'a [u8],
    /// `x-acs-date`, e.g. `2024-01-02T03:04:05Z`.
    pub date: String,
    pub nonce: String,
}

/// Headers to attach to the outgoing request, `authorization` included.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub query: String,
    pub headers: Vec<(String, String)>,
}

/// Build the canonical query string: RFC 3986 encoded, sorted by key.
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (urlencoding::encode(k).into_owned(), urlencoding::encode(v).into_owned()))
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Sign an RPC request with the session's credentials.
pub fn sign(session: &Session, request: &RpcRequest<'_>) -> Result<SignedRequest, ApiError> {
    let query = canonical_query(request.params);
    let payload_hash = sha256_hex(request.body);

    let mut headers: BTreeMap<&'static str, String> = BTreeMap::new();
    headers.insert("host", request.host.to_string());
    headers.insert("x-acs-action", request.action.to_string());
    headers.insert("x-acs-version", request.version.to_string());
    headers.insert("x-acs-date", request.date.clone());
    headers.insert("x-acs-signature-nonce", request.nonce.clone());
    headers.insert("x-acs-content-sha256", payload_hash.clone());
    if let Some(token) = &session.security_token {
        headers.insert("x-acs-security-token", token.clone());
    }

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{k}:{}\n", v.trim()))
        .collect();
    let signed_headers = headers.keys().copied().collect::<Vec<_>>().join(";");

    let canonical_request = format!(
        "{}\n/\n{query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
        request.method
    );
    let string_to_sign = format!("{ALGORITHM}\n{}", sha256_hex(canonical_request.as_bytes()));

    let mut mac = HmacSha256::new_from_slice(session.access_key_secret.as_bytes())
        .map_err(|e| ApiError::Signing(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let authorization = format!(
        "{ALGORITHM} Credential={},SignedHeaders={signed_headers},Signature={signature}",
        session.access_key_id
    );

    let mut out: Vec<(String, String)> = headers
        .into_iter()
        .filter(|(k, _)| *k != "host")
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    out.push(("authorization".to_string(), authorization));

    Ok(SignedRequest {
        query,
        headers: out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: Option<&str>) -> Session {
        Session {
            access_key_id: "AKID".to_string(),
            access_key_secret: "secret".to_string(),
            security_token: token.map(str::to_string),
            region: "cn-hangzhou".to_string(),
        }
    }

    fn params() -> Vec<(String, String)> {
        vec![
            ("RegionId".to_string(), "cn-hangzhou".to_string()),
            ("CommandContent".to_string(), "echo a b*c~".to_string()),
            ("InstanceId.1".to_string(), "i-1".to_string()),
        ]
    }

    fn request<'a>(params: &'a [(String, String)]) -> RpcRequest<'a> {
        RpcRequest {
            method: "POST",
            host: "ecs.cn-hangzhou.aliyuncs.com",
            action: "RunCommand",
            version: "2014-05-26",
            params,
            body: b"",
            date: "2024-01-02T03:04:05Z".to_string(),
            nonce: "nonce-1".to_string(),
        }
    }

    fn header<'a>(signed: &'a SignedRequest, name: &str) -> Option<&'a str> {
        signed
            .headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn canonical_query_sorts_and_encodes() {
        let query = canonical_query(&params());
        assert_eq!(
            query,
            "CommandContent=echo%20a%20b%2Ac~&InstanceId.1=i-1&RegionId=cn-hangzhou"
        );
    }

    #[test]
    fn empty_payload_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn authorization_lists_sorted_signed_headers() {
        let p = params();
        let signed = sign(&session(None), &request(&p)).unwrap();
        let auth = header(&signed, "authorization").unwrap();
        assert!(auth.starts_with(
            "ACS3-HMAC-SHA256 Credential=AKID,SignedHeaders=host;x-acs-action;x-acs-content-sha256;x-acs-date;x-acs-signature-nonce;x-acs-version,Signature="
        ));
        let signature = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn host_header_is_signed_but_not_returned() {
        let p = params();
        let signed = sign(&session(None), &request(&p)).unwrap();
        assert!(header(&signed, "host").is_none());
        assert_eq!(header(&signed, "x-acs-action"), Some("RunCommand"));
        assert_eq!(header(&signed, "x-acs-date"), Some("2024-01-02T03:04:05Z"));
    }

    #[test]
    fn security_token_is_signed_when_present() {
        let p = params();
        let signed = sign(&session(Some("tok")), &request(&p)).unwrap();
        assert_eq!(header(&signed, "x-acs-security-token"), Some("tok"));
        assert!(header(&signed, "authorization")
            .unwrap()
            .contains("x-acs-security-token"));
    }

    #[test]
    fn signature_is_deterministic_and_key_dependent() {
        let p = params();
        let a = sign(&session(None), &request(&p)).unwrap();
        let b = sign(&session(None), &request(&p)).unwrap();
        assert_eq!(header(&a, "authorization"), header(&b, "authorization"));

        let mut other = session(None);
        other.access_key_secret = "different".to_string();
        let c = sign(&other, &request(&p)).unwrap();
        assert_ne!(header(&a, "authorization"), header(&c, "authorization"));
    }

    #[test]
    fn signature_covers_parameters() {
        let p = params();
        let a = sign(&session(None), &request(&p)).unwrap();

        let mut changed = params();
        changed[2].1 = "i-2".to_string();
        let b = sign(&session(None), &request(&changed)).unwrap();
        assert_ne!(header(&a, "authorization"), header(&b, "authorization"));
    }
}
