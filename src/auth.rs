//! Credential resolution, including the strict-mode key exchange.
//!
//! Strict mode turns a service-account private key into a bearer token: the key
//! signs a short-lived RS256 JWT, which is posted to the login endpoint. The
//! returned token is sent as `Authorization: token=<token>` on every request.

use chrono::Utc;
use prometheus::IntCounter;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error, info};
use url::Url;

use crate::error::{AuthError, TransportError};
use crate::transport::{Credentials, HttpClient};

/// Lifetime of the JWT presented to the login endpoint.
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Authentication settings as configured on the command line.
#[derive(Clone, Default)]
pub struct AuthOptions {
    pub strict_mode: bool,
    pub username: String,
    pub password: String,
    pub login_url: String,
    /// Inline secret JSON or a path to a PEM file.
    pub private_key: String,
}

/// Inline service-account secret.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServiceAccountSecret {
    pub uid: String,
    #[serde(default)]
    pub login_endpoint: String,
    pub private_key: String,
    #[serde(default)]
    pub scheme: String,
}

/// Everything needed to perform one strict-mode login.
#[derive(Clone, PartialEq)]
pub struct StrictLogin {
    pub uid: String,
    pub login_url: String,
    pub key_pem: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    uid: &'a str,
    token: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: String,
}

/// Resolves the configured private key.
///
/// A value that is not an existing path is decoded as a [`ServiceAccountSecret`];
/// its `uid` and `login_endpoint` then take precedence over `username` and
/// `login_url`.
pub fn resolve_private_key(
    value: &str,
    username: &str,
    login_url: &str,
) -> Result<StrictLogin, AuthError> {
    let path = Path::new(value);
    if value.is_empty() || !path.exists() {
        let secret: ServiceAccountSecret =
            serde_json::from_str(value).map_err(AuthError::DecodeSecret)?;
        debug!(uid = %secret.uid, "using inline service account secret");
        let login_url = if secret.login_endpoint.is_empty() {
            login_url.to_string()
        } else {
            secret.login_endpoint
        };
        return Ok(StrictLogin {
            uid: secret.uid,
            login_url,
            key_pem: secret.private_key,
        });
    }

    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let key_pem = std::fs::read_to_string(&absolute).map_err(|source| AuthError::ReadKey {
        path: absolute.display().to_string(),
        source,
    })?;
    Ok(StrictLogin {
        uid: username.to_string(),
        login_url: login_url.to_string(),
        key_pem,
    })
}

fn parse_key(pem: &str) -> Result<RsaPrivateKey, AuthError> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|_| AuthError::ParseKey)
}

fn b64(bytes: impl AsRef<[u8]>) -> String {
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

/// Builds the RS256 JWT `{"uid": uid, "exp": now + 1h}` signed with `pem`.
pub fn sign_login_token(uid: &str, pem: &str, now: i64) -> Result<String, AuthError> {
    let key = parse_key(pem)?;
    let header = serde_json::json!({ "alg": "RS256", "typ": "JWT" });
    let claims = serde_json::json!({ "uid": uid, "exp": now + TOKEN_LIFETIME_SECS });
    let signing_input = format!("{}.{}", b64(header.to_string()), b64(claims.to_string()));

    let signature = SigningKey::<Sha256>::new(key)
        .try_sign(signing_input.as_bytes())
        .map_err(|e| AuthError::Sign(e.to_string()))?;

    Ok(format!("{signing_input}.{}", b64(signature.to_vec())))
}

/// Exchanges the key for a bearer token at the login endpoint.
pub async fn login(client: &HttpClient, login: &StrictLogin) -> Result<String, AuthError> {
    let url = Url::parse(&login.login_url)
        .map_err(|e| TransportError::InvalidUrl(login.login_url.clone(), e))?;
    let jwt = sign_login_token(&login.uid, &login.key_pem, Utc::now().timestamp())?;

    let response: LoginResponse = client
        .post_json(
            url,
            &LoginRequest {
                uid: &login.uid,
                token: &jwt,
            },
        )
        .await?;

    if response.token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok(response.token)
}

/// Resolves the credential mode once at startup.
///
/// Strict-mode failures are logged and counted on `errors`, and leave the
/// exporter without credentials so later requests fail per scrape instead of
/// aborting the process.
pub async fn resolve_credentials(
    client: &HttpClient,
    options: &AuthOptions,
    errors: &IntCounter,
) -> Credentials {
    if !options.strict_mode {
        return Credentials::basic(&options.username, &options.password);
    }

    let result = match resolve_private_key(
        &options.private_key,
        &options.username,
        &options.login_url,
    ) {
        Ok(strict) => login(client, &strict).await.map(|token| (strict.uid, token)),
        Err(e) => Err(e),
    };

    match result {
        Ok((uid, token)) => {
            info!(uid = %uid, "strict mode login succeeded");
            Credentials::Token(token)
        }
        Err(e) => {
            error!(error = %e, "strict mode authentication failed, continuing without credentials");
            errors.inc();
            Credentials::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PKCS1_KEY: &str = include_str!("../tests/fixtures/service-account-pkcs1.pem");
    const PKCS8_KEY: &str = include_str!("../tests/fixtures/service-account-pkcs8.pem");

    fn decode(part: &str) -> Vec<u8> {
        base64::decode_config(part, base64::URL_SAFE_NO_PAD).unwrap()
    }

    #[test]
    fn test_inline_secret_overrides_username_and_login_url() {
        let secret = serde_json::json!({
            "uid": "exporter",
            "login_endpoint": "https://master.mesos/acs/api/v1/auth/login",
            "private_key": PKCS1_KEY,
            "scheme": "RS256",
        })
        .to_string();

        let strict = resolve_private_key(&secret, "ignored", "https://default/login").unwrap();
        assert_eq!(strict.uid, "exporter");
        assert_eq!(strict.login_url, "https://master.mesos/acs/api/v1/auth/login");
        assert_eq!(strict.key_pem, PKCS1_KEY);
    }

    #[test]
    fn test_inline_secret_without_endpoint_keeps_configured_url() {
        let secret = serde_json::json!({ "uid": "exporter", "private_key": "k" }).to_string();
        let strict = resolve_private_key(&secret, "", "https://default/login").unwrap();
        assert_eq!(strict.login_url, "https://default/login");
    }

    #[test]
    fn test_key_file_is_read() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(PKCS8_KEY.as_bytes()).unwrap();

        let path = file.path().to_string_lossy().to_string();
        let strict = resolve_private_key(&path, "svc", "https://default/login").unwrap();
        assert_eq!(strict.uid, "svc");
        assert_eq!(strict.key_pem, PKCS8_KEY);
    }

    #[test]
    fn test_malformed_secret_is_rejected() {
        let err = resolve_private_key("{not json", "svc", "https://default/login").err().unwrap();
        assert!(matches!(err, AuthError::DecodeSecret(_)));

        let err = resolve_private_key("", "svc", "https://default/login").err().unwrap();
        assert!(matches!(err, AuthError::DecodeSecret(_)));
    }

    #[test]
    fn test_signed_token_verifies() {
        let token = sign_login_token("exporter", PKCS1_KEY, 1_700_000_000).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let claims: serde_json::Value = serde_json::from_slice(&decode(parts[1])).unwrap();
        assert_eq!(claims["uid"], "exporter");
        assert_eq!(claims["exp"], 1_700_000_000 + TOKEN_LIFETIME_SECS);

        let key = parse_key(PKCS1_KEY).unwrap();
        let verifying = VerifyingKey::<Sha256>::new(key.to_public_key());
        let signature = Signature::try_from(decode(parts[2]).as_slice()).unwrap();
        let signing_input = format!("{}.{}", parts[0], parts[1]);
        assert!(verifying.verify(signing_input.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn test_pkcs8_key_is_accepted() {
        assert!(sign_login_token("exporter", PKCS8_KEY, 0).is_ok());
    }

    #[test]
    fn test_garbage_key_is_rejected() {
        let err = sign_login_token("exporter", "not a key", 0).unwrap_err();
        assert!(matches!(err, AuthError::ParseKey));
    }
}
