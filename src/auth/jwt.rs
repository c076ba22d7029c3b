//! Compact HS256 JWT mint/verify. `TokenCodec` is the trait boundary that
//! keeps this implementation swappable, built over `hmac` + `sha2`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::domain::errors::{AuthError, TownResult};

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by every Gastown-issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub agent_id: String,
    pub rig_id: String,
    pub town_id: String,
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

pub trait TokenCodec: Send + Sync {
    fn mint(&self, claims: Claims) -> TownResult<String>;
    fn verify(&self, token: &str) -> TownResult<Claims>;
}

/// HS256 implementation over a shared secret (`GASTOWN_JWT_SECRET`).
pub struct HmacTokenCodec {
    secret: Vec<u8>,
}

impl HmacTokenCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    fn mac(&self) -> TownResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| AuthError::Malformed("bad key length".to_string()).into())
    }
}

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

impl TokenCodec for HmacTokenCodec {
    fn mint(&self, claims: Claims) -> TownResult<String> {
        let header_b64 = URL_SAFE_NO_PAD.encode(HEADER);
        let payload = serde_json::to_vec(&claims)?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signing_input = format!("{header_b64}.{payload_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    fn verify(&self, token: &str) -> TownResult<Claims> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed("expected 3 segments".to_string()).into());
        };
        if parts.next().is_some() {
            return Err(AuthError::Malformed("unexpected trailing segment".to_string()).into());
        }

        let signing_input = format!("{header_b64}.{payload_b64}");
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let expected = mac.finalize().into_bytes();

        let given = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|_| AuthError::BadSignature)?;
        if given.len() != expected.len() || !constant_time_eq(&given, &expected) {
            return Err(AuthError::BadSignature.into());
        }

        let payload_raw = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| AuthError::Malformed("bad payload encoding".to_string()))?;
        let claims: Claims = serde_json::from_slice(&payload_raw).map_err(|e| AuthError::Malformed(e.to_string()))?;

        if claims.exp < Utc::now().timestamp() {
            return Err(AuthError::Expired.into());
        }

        Ok(claims)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Builds an agent-scoped claim set with the given TTL.
pub fn build_claims(agent_id: &str, rig_id: &str, town_id: &str, user_id: &str, ttl: std::time::Duration) -> Claims {
    let now = Utc::now();
    let exp = now + ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::hours(8));
    Claims {
        agent_id: agent_id.to_string(),
        rig_id: rig_id.to_string(),
        town_id: town_id.to_string(),
        user_id: user_id.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    }
}
