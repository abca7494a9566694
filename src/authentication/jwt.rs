use chrono::{DateTime, Duration, Utc};
use hmac::{digest::InvalidLength, Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::database::{
    error::ActionError,
    schema::{User, UserRole, Uuid},
};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(
        id: Uuid,
        username: String,
        role: UserRole,
        issued_at: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            user_id: id,
            username,
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + lifetime).timestamp(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ActionError> {
        if !action.authenticate(self) {
            return Err(ActionError::Forbidden(String::from(
                "You don't have permission to perform this action",
            )));
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(data: JwtSessionData) -> Self {
        SessionData {
            user_id: data.user_id,
            username: data.username,
            role: data.role,
        }
    }
}

/// Signs and verifies session tokens with one HMAC-SHA256 key.
#[derive(Clone)]
pub struct SessionSigner {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl SessionSigner {
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, InvalidLength> {
        Ok(Self {
            key: Hmac::new_from_slice(secret)?,
            lifetime,
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn generate(&self, user: &User) -> Result<String, ActionError> {
        self.generate_at(user, Utc::now())
    }

    pub fn generate_at(
        &self,
        user: &User,
        issued_at: DateTime<Utc>,
    ) -> Result<String, ActionError> {
        let claims = JwtSessionData::new(
            user.id,
            user.username.to_owned(),
            user.role.to_owned(),
            issued_at,
            self.lifetime,
        );

        claims.sign_with_key(&self.key).map_err(|e| {
            log::error!("Failed to sign session token: {e}");
            ActionError::Unauthorized(String::from("Could not issue a session"))
        })
    }

    pub fn verify(&self, token: &str) -> Result<SessionData, ActionError> {
        let session: JwtSessionData = token.verify_with_key(&self.key).map_err(|_| {
            ActionError::Unauthorized(String::from("Invalid session; Invalid token"))
        })?;

        if session.exp < Utc::now().timestamp() {
            return Err(ActionError::Unauthorized(String::from(
                "Invalid session; Token expired",
            )));
        }

        Ok(session.into())
    }
}
