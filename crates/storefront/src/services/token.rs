//! Signed bearer tokens.
//!
//! Tokens are compact JWS values (`header.payload.signature`, base64url without
//! padding) signed with HMAC-SHA256. Only `HS256` is accepted on the way in.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use tech_store_core::{AccountRef, AdminUserId, Role, UserId};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

/// Errors from issuing or verifying a token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("signing key rejected: {0}")]
    Key(String),
    #[error("token lifetime out of range")]
    Lifetime,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Which account table `sub` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    User,
    Admin,
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub kind: AccountKind,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// The account this token was issued for.
    #[must_use]
    pub const fn account(&self) -> AccountRef {
        match self.kind {
            AccountKind::User => AccountRef::Customer(UserId::new(self.sub)),
            AccountKind::Admin => AccountRef::Admin(AdminUserId::new(self.sub)),
        }
    }
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies bearer tokens with one key.
#[derive(Clone)]
pub struct TokenIssuer {
    key: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("key", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenIssuer {
    #[must_use]
    pub const fn new(key: SecretString, ttl: Duration) -> Self {
        Self { key, ttl }
    }

    /// Issue a token for `account` valid from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Key` or `TokenError::Lifetime` on misconfiguration.
    pub fn issue(&self, account: AccountRef, role: Role) -> Result<IssuedToken, TokenError> {
        self.issue_at(account, role, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::issue`].
    pub fn issue_at(
        &self,
        account: AccountRef,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let ttl = chrono::Duration::from_std(self.ttl).map_err(|_| TokenError::Lifetime)?;
        let expires_at = now.checked_add_signed(ttl).ok_or(TokenError::Lifetime)?;

        let (sub, kind) = match account {
            AccountRef::Customer(id) => (id.as_i32(), AccountKind::User),
            AccountRef::Admin(id) => (id.as_i32(), AccountKind::Admin),
        };
        let claims = Claims {
            sub,
            kind,
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let header = Header {
            alg: ALGORITHM.to_owned(),
            typ: "JWT".to_owned(),
        };
        let signing_input = format!(
            "{}.{}",
            encode_segment(&header)?,
            encode_segment(&claims)?
        );
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&signing_input)?.finalize().into_bytes());

        Ok(IssuedToken {
            token: format!("{signing_input}.{signature}"),
            expires_at,
        })
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Any [`TokenError`] describing why the token is unusable.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::verify`].
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header: Header = decode_segment(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;
        // verify_slice compares in constant time
        self.mac(&format!("{header_b64}.{claims_b64}"))?
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = decode_segment(claims_b64)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self, signing_input: &str) -> Result<HmacSha256, TokenError> {
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|e| TokenError::Key(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|_| TokenError::Malformed)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            SecretString::from("k7#Qm2!vX9$pL4@wR8&zT1*bN6^cF3%h"),
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn test_issue_then_verify() {
        let account = AccountRef::Customer(UserId::new(12));
        let issued = issuer().issue(account, Role::User).unwrap();

        let claims = issuer().verify(&issued.token).unwrap();
        assert_eq!(claims.account(), account);
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_admin_token_carries_role() {
        let account = AccountRef::Admin(AdminUserId::new(3));
        let issued = issuer().issue(account, Role::Editor).unwrap();
        let claims = issuer().verify(&issued.token).unwrap();
        assert_eq!(claims.kind, AccountKind::Admin);
        assert_eq!(claims.account(), account);
        assert_eq!(claims.role, Role::Editor);
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now();
        let issued = issuer()
            .issue_at(AccountRef::Customer(UserId::new(1)), Role::User, now)
            .unwrap();

        let later = now + chrono::Duration::seconds(3601);
        assert_eq!(
            issuer().verify_at(&issued.token, later),
            Err(TokenError::Expired)
        );
        assert!(issuer().verify_at(&issued.token, now).is_ok());
    }

    #[test]
    fn test_wrong_key_rejected() {
        let issued = issuer()
            .issue(AccountRef::Customer(UserId::new(1)), Role::User)
            .unwrap();
        let other = TokenIssuer::new(
            SecretString::from("a-completely-different-signing-key-01"),
            Duration::from_secs(3600),
        );
        assert_eq!(other.verify(&issued.token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let issued = issuer()
            .issue(AccountRef::Customer(UserId::new(1)), Role::User)
            .unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();

        let forged_claims = Claims {
            sub: 1,
            kind: AccountKind::Admin,
            role: Role::SuperAdmin,
            iat: 0,
            exp: i64::MAX,
        };
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            encode_segment(&forged_claims).unwrap(),
            parts[2]
        );
        assert_eq!(issuer().verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert_eq!(issuer().verify(""), Err(TokenError::Malformed));
        assert_eq!(issuer().verify("abc"), Err(TokenError::Malformed));
        assert_eq!(issuer().verify("a.b.c.d"), Err(TokenError::Malformed));
        assert_eq!(issuer().verify("!!.??.**"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let header = encode_segment(&Header {
            alg: "none".to_owned(),
            typ: "JWT".to_owned(),
        })
        .unwrap();
        let claims = encode_segment(&Claims {
            sub: 1,
            kind: AccountKind::User,
            role: Role::User,
            iat: 0,
            exp: i64::MAX,
        })
        .unwrap();
        let token = format!("{header}.{claims}.");
        assert_eq!(
            issuer().verify(&token),
            Err(TokenError::UnsupportedAlgorithm("none".to_owned()))
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", issuer());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("k7#Qm2"));
    }
}
