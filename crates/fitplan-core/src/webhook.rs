//! Identity-provider webhook: signature verification and user sync.
//!
//! Deliveries are signed the Svix way. The secret has the form
//! `whsec_<base64 key>`; the signed content is
//! `<svix-id>.<svix-timestamp>.<raw body>`; the `svix-signature` header
//! holds space-separated `v1,<base64 HMAC-SHA256>` entries, any of which may
//! match.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use sqlx::PgPool;
use tracing::{debug, info};

use fitplan_db::models::User;
use fitplan_db::queries::users::{self, NewUser};

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// Maximum allowed distance between the delivery timestamp and now.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 5 * 60;

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("invalid webhook secret: {0}")]
    InvalidSecret(String),

    #[error("invalid timestamp header: {0}")]
    InvalidTimestamp(String),

    #[error("timestamp is more than five minutes from now")]
    TimestampOutOfRange,

    #[error("no matching signature")]
    NoMatchingSignature,

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("failed to sync user: {0}")]
    Sync(String),
}

/// The three delivery headers, borrowed from the request.
#[derive(Debug, Clone, Copy)]
pub struct WebhookHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

/// Verifies deliveries against one signing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    mac: HmacSha256,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    /// Parse a `whsec_`-prefixed secret. The prefix is optional.
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|e| WebhookError::InvalidSecret(e.to_string()))?;
        let mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| WebhookError::InvalidSecret(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Signature entry (`v1,<base64>`) for the given delivery.
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(signed_prefix(id, &timestamp.to_string()).as_bytes());
        mac.update(body);
        let digest = mac.finalize().into_bytes();
        format!("{SIGNATURE_VERSION},{}", STANDARD.encode(digest))
    }

    /// Verify a delivery against the current clock.
    pub fn verify(&self, headers: &WebhookHeaders<'_>, body: &[u8]) -> Result<(), WebhookError> {
        self.verify_at(headers, body, chrono::Utc::now().timestamp())
    }

    /// Verify a delivery as if the current time were `now` (Unix seconds).
    pub fn verify_at(
        &self,
        headers: &WebhookHeaders<'_>,
        body: &[u8],
        now: i64,
    ) -> Result<(), WebhookError> {
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| WebhookError::InvalidTimestamp(e.to_string()))?;
        if now.abs_diff(timestamp) > TIMESTAMP_TOLERANCE_SECS.unsigned_abs() {
            return Err(WebhookError::TimestampOutOfRange);
        }

        let mut mac = self.mac.clone();
        mac.update(signed_prefix(headers.id, headers.timestamp.trim()).as_bytes());
        mac.update(body);

        for entry in headers.signature.split_whitespace() {
            let Some((version, encoded)) = entry.split_once(',') else {
                continue;
            };
            if version != SIGNATURE_VERSION {
                continue;
            }
            let Ok(candidate) = STANDARD.decode(encoded) else {
                continue;
            };
            // Constant-time comparison.
            if mac.clone().verify_slice(&candidate).is_ok() {
                return Ok(());
            }
        }
        Err(WebhookError::NoMatchingSignature)
    }
}

fn signed_prefix(id: &str, timestamp: &str) -> String {
    format!("{id}.{timestamp}.")
}

/// Envelope of a webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    image_url: Option<String>,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
}

impl WebhookEvent {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// The user to mirror for a `user.created` event.
    ///
    /// Returns `None` for other event types and for users without an email
    /// address.
    pub fn user_to_sync(&self) -> Result<Option<NewUser>, WebhookError> {
        if self.event_type != "user.created" {
            return Ok(None);
        }
        let data = UserData::deserialize(&self.data)?;
        let Some(email) = data.email_addresses.into_iter().next() else {
            return Ok(None);
        };
        let name = format!(
            "{} {}",
            data.first_name.unwrap_or_default(),
            data.last_name.unwrap_or_default()
        )
        .trim()
        .to_owned();

        Ok(Some(NewUser {
            external_id: data.id,
            email: email.email_address,
            name,
            image: data.image_url,
        }))
    }
}

/// Verify a delivery, then mirror the user it announces.
///
/// Returns the stored user, or `None` when the event required no action.
pub async fn handle_delivery(
    pool: &PgPool,
    verifier: &WebhookVerifier,
    headers: &WebhookHeaders<'_>,
    body: &[u8],
) -> Result<Option<User>, WebhookError> {
    verifier.verify(headers, body)?;
    let event = WebhookEvent::parse(body)?;
    debug!(event_type = %event.event_type, id = headers.id, "verified webhook delivery");

    let Some(new_user) = event.user_to_sync()? else {
        return Ok(None);
    };
    let user = users::upsert_user(pool, &new_user)
        .await
        .map_err(|e| WebhookError::Sync(format!("{e:#}")))?;
    info!(external_id = %user.external_id, "synced user from webhook");
    Ok(Some(user))
}
