use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::constants::SESSION_LIFETIME_DAYS;
use crate::error::ApiError;
use crate::schema::{User, UserRole};

use super::permissions::ActionType;

/// Token payload. The profile fields are a snapshot taken when the token was issued.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub id: Uuid,
    pub role: UserRole,
    pub email: String,
    pub full_name: String,
    pub image_url: String,
    pub bookmarks: Vec<Uuid>,
    iat: i64,
    exp: i64,
}

impl SessionClaims {
    pub fn new(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            id: user.id,
            role: user.role,
            email: user.email.to_owned(),
            full_name: user.full_name.to_owned(),
            image_url: user.image_url.to_owned(),
            bookmarks: user.bookmarks.to_owned(),
            iat: now.timestamp(),
            exp: (now + Duration::days(SESSION_LIFETIME_DAYS)).timestamp(),
        }
    }

    pub fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Identity attached to an authenticated request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub role: UserRole,
    pub email: String,
    pub full_name: String,
}

impl Session {
    pub fn authorize(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.is_allowed_for(self.role) {
            log::debug!("{} ({:?}) may not {:?}", self.user_id, self.role, action);
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }

    pub fn owns(&self, owner: Uuid) -> Result<(), ApiError> {
        if self.user_id != owner {
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }
}

impl From<SessionClaims> for Session {
    fn from(claims: SessionClaims) -> Self {
        Session {
            user_id: claims.id,
            role: claims.role,
            email: claims.email,
            full_name: claims.full_name,
        }
    }
}

/// HS256 signing key shared by every request.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Result<Self, ApiError> {
        if secret.is_empty() {
            return Err(ApiError::Internal("Session secret is empty".to_string()));
        }
        let key = Hmac::new_from_slice(secret.as_bytes())
            .map_err(|e| ApiError::Internal(format!("Invalid session secret: {e}")))?;

        Ok(Self { key })
    }

    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, ApiError> {
        SessionClaims::new(user, now)
            .sign_with_key(&self.key)
            .map_err(|e| ApiError::Internal(format!("Signing session failed: {e}")))
    }

    /// Bad signatures, malformed tokens and expired tokens all come back as `None`.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<SessionClaims> {
        let claims: SessionClaims = token.verify_with_key(&self.key).ok()?;
        if claims.exp <= now.timestamp() {
            return None;
        }
        Some(claims)
    }
}
