//! Google account auth for the Keep API.
//!
//! Two form posts against the Android auth endpoint:
//! 1. master login: email + password -> long-lived master token (cached)
//! 2. OAuth exchange: master token -> short-lived bearer for the notes API
//!
//! The password never travels in clear: it is RSA-OAEP encrypted with
//! Google's published login key into the `EncryptedPasswd` field.
//! Responses are `Key=Value` lines, failures carry an `Error=` line.

use crate::error::KeepError;
use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use rsa::{BigUint, Oaep, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

const AUTH_URL: &str = "https://android.clients.google.com/auth";
const USER_AGENT: &str = "GoogleAuth/1.4";

const KEEP_SCOPES: &str =
    "oauth2:https://www.googleapis.com/auth/memento https://www.googleapis.com/auth/reminders";
const KEEP_APP: &str = "com.google.android.keep";
const KEEP_CLIENT_SIG: &str = "38918a453d07199354f8b19af05ec6562ced5788";

/// Google's Android login public key: length-prefixed modulus and exponent.
const LOGIN_KEY: &str = "AAAAgMom/1a/v0lblO2Ubrt60J2gcuXSljGFQXgcyZWveWLEwo6prwgi3iJIZdodyhKZQrNWp5nKJ3srRXcUW+F1BD3baEVGcmEgqaLZUNBjm057pKRI16kB0YppeGx5qIQ5QjKzsR8ETQbKLNWgRY0QRNVz34kMJR3P/LgHax/6rmf5AAAAAwEAAQ==";

pub struct GoogleAuth {
    client: reqwest::blocking::Client,
    android_id: String,
}

impl GoogleAuth {
    pub fn new(client: reqwest::blocking::Client, android_id: &str) -> Self {
        Self {
            client,
            android_id: android_id.to_string(),
        }
    }

    /// Step 1: exchange account credentials for a master token.
    pub fn master_login(&self, email: &str, password: &str) -> Result<String> {
        let signature = encrypt_login(email, password)?;
        let fields = self.post(&[
            ("accountType", "HOSTED_OR_GOOGLE"),
            ("Email", email),
            ("has_permission", "1"),
            ("add_account", "1"),
            ("EncryptedPasswd", signature.as_str()),
            ("service", "ac2dm"),
            ("source", "android"),
            ("androidId", self.android_id.as_str()),
            ("device_country", "us"),
            ("operatorCountry", "us"),
            ("lang", "en"),
            ("sdk_version", "17"),
            ("client_sig", KEEP_CLIENT_SIG),
            ("droidguard_results", "dummy123"),
        ])?;

        take_field(fields, "Token")
    }

    /// Step 2: exchange the master token for a bearer token scoped to Keep.
    pub fn exchange(&self, email: &str, master_token: &str) -> Result<String> {
        let fields = self.post(&[
            ("accountType", "HOSTED_OR_GOOGLE"),
            ("Email", email),
            ("has_permission", "1"),
            ("EncryptedPasswd", master_token),
            ("service", KEEP_SCOPES),
            ("source", "android"),
            ("androidId", self.android_id.as_str()),
            ("app", KEEP_APP),
            ("client_sig", KEEP_CLIENT_SIG),
            ("device_country", "us"),
            ("operatorCountry", "us"),
            ("lang", "en"),
            ("sdk_version", "17"),
        ])?;

        take_field(fields, "Auth")
    }

    fn post(&self, form: &[(&str, &str)]) -> Result<HashMap<String, String>> {
        let response = self
            .client
            .post(AUTH_URL)
            .header("User-Agent", USER_AGENT)
            .form(form)
            .send()
            .context("Cannot reach Google auth endpoint")?;

        let status = response.status();
        let body = response.text().context("Cannot read auth response")?;
        let fields = parse_auth_response(&body);

        if let Some(error) = fields.get("Error") {
            return Err(KeepError::Auth(error.clone()).into());
        }
        if !status.is_success() {
            return Err(KeepError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(fields)
    }
}

fn take_field(mut fields: HashMap<String, String>, key: &str) -> Result<String> {
    fields
        .remove(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| KeepError::Auth(format!("response has no {key}")).into())
}

/// Parse `Key=Value` lines. Values may themselves contain `=`.
pub fn parse_auth_response(body: &str) -> HashMap<String, String> {
    body.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// Decoded login key: raw key bytes plus the RSA public key they describe.
struct LoginKey {
    raw: Vec<u8>,
    public: RsaPublicKey,
}

fn login_key() -> Result<LoginKey> {
    let raw = STANDARD
        .decode(LOGIN_KEY)
        .context("Cannot decode login key")?;

    let (modulus, rest) = split_prefixed(&raw)?;
    let (exponent, rest) = split_prefixed(rest)?;
    if !rest.is_empty() {
        bail!("Login key has {} trailing bytes", rest.len());
    }

    let public = RsaPublicKey::new(
        BigUint::from_bytes_be(modulus),
        BigUint::from_bytes_be(exponent),
    )
    .context("Invalid login key")?;
    Ok(LoginKey { raw, public })
}

/// Split off a field prefixed by its big-endian `u32` length.
fn split_prefixed(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    let Some((len, rest)) = bytes.split_first_chunk::<4>() else {
        bail!("Login key truncated");
    };
    let len = u32::from_be_bytes(*len) as usize;
    if rest.len() < len {
        bail!("Login key truncated");
    }
    Ok(rest.split_at(len))
}

/// `EncryptedPasswd` value: a zero byte, the first four bytes of the key's
/// SHA-1, then `email\0password` under RSA-OAEP, all URL-safe base64.
pub fn encrypt_login(email: &str, password: &str) -> Result<String> {
    let key = login_key()?;
    let plain = format!("{email}\u{0}{password}");
    let encrypted = key
        .public
        .encrypt(&mut rand::thread_rng(), Oaep::new::<Sha1>(), plain.as_bytes())
        .context("Cannot encrypt credentials")?;

    let mut signature = vec![0u8];
    signature.extend_from_slice(&Sha1::digest(&key.raw)[..4]);
    signature.extend_from_slice(&encrypted);
    Ok(URL_SAFE.encode(signature))
}

/// Stable 16 hex digit device id derived from the account name.
pub fn derive_android_id(username: &str) -> String {
    let digest = Sha256::digest(username.trim().to_lowercase().as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;

    #[test]
    fn test_parse_auth_response() {
        let fields = parse_auth_response("SID=abc\nAuth=ya29.x==\nExpiry=0\n\ngarbage\n");
        assert_eq!(fields.get("SID").map(String::as_str), Some("abc"));
        assert_eq!(fields.get("Auth").map(String::as_str), Some("ya29.x=="));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_take_field_missing_is_auth_error() {
        let err = take_field(parse_auth_response("Foo=bar"), "Token").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KeepError>(),
            Some(KeepError::Auth(_))
        ));
    }

    #[test]
    fn test_login_key_shape() -> Result<()> {
        let key = login_key()?;
        assert_eq!(key.raw.len(), 139);
        assert_eq!(key.public.e(), &BigUint::from(65_537u32));
        assert_eq!(key.public.n().bits(), 1024);
        Ok(())
    }

    #[test]
    fn test_encrypted_login_layout() -> Result<()> {
        let key = login_key()?;
        let signature = URL_SAFE.decode(encrypt_login("me@example.com", "hunter2")?)?;

        assert_eq!(signature.len(), 1 + 4 + 128);
        assert_eq!(signature[0], 0);
        assert_eq!(&signature[1..5], &Sha1::digest(&key.raw)[..4]);
        Ok(())
    }

    #[test]
    fn test_encrypted_login_is_randomized() -> Result<()> {
        assert_ne!(encrypt_login("a", "b")?, encrypt_login("a", "b")?);
        Ok(())
    }

    #[test]
    fn test_truncated_key_is_rejected() {
        assert!(split_prefixed(&[0, 0, 0, 9, 1, 2]).is_err());
        assert!(split_prefixed(&[0, 0]).is_err());
    }

    #[test]
    fn test_android_id_is_stable() {
        let a = derive_android_id("Me@Example.com");
        let b = derive_android_id(" me@example.com ");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, derive_android_id("someone@example.com"));
    }
}
