use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Represents the claims encoded within a session JWT.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's UUID in its hyphenated string form.
    pub sub: String,
    pub email: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// Claims of a verified token, with the subject already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub subject_id: Uuid,
    pub email: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Signs and verifies HS256 session tokens with a single server secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime_seconds: i64,
}

impl TokenCodec {
    pub fn new(secret: &str, lifetime_seconds: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime_seconds,
        }
    }

    pub fn lifetime_seconds(&self) -> i64 {
        self.lifetime_seconds
    }

    /// Issues a session token for a user, valid from now for the configured lifetime.
    ///
    /// # Arguments
    /// * `subject` - The ID of the user the token is issued to.
    /// * `email` - The user's email, carried for display purposes only.
    ///
    /// # Returns
    /// The compact JWT string, or `AppError::InternalServerError` if signing fails.
    pub fn issue(&self, subject: Uuid, email: &str) -> Result<String, AppError> {
        self.issue_at(subject, email, Utc::now().timestamp())
    }

    /// Issues a token as if it had been created at `issued_at` (seconds since epoch).
    pub fn issue_at(&self, subject: Uuid, email: &str, issued_at: i64) -> Result<String, AppError> {
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.lifetime_seconds),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            log::error!("failed to sign session token: {}", e);
            AppError::InternalServerError(format!("Failed to generate token: {}", e))
        })
    }

    /// Verifies a token's signature and expiry and decodes its claims.
    ///
    /// # Returns
    /// * `AppError::SessionExpired` if the signature is valid but `exp` has passed.
    /// * `AppError::InvalidToken` for any other failure: bad signature, malformed encoding,
    ///   unexpected algorithm, missing claims, or a subject that is not a UUID.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AppError::SessionExpired,
                other => {
                    log::debug!("rejected session token: {:?}", other);
                    AppError::InvalidToken
                }
            }
        })?;

        let claims = data.claims;
        let subject_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        Ok(SessionClaims {
            subject_id,
            email: claims.email,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_for_session_tokens";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, 86_400)
    }

    #[test]
    fn test_token_issue_and_verify() {
        let user_id = Uuid::new_v4();
        let token = codec().issue(user_id, "ada@example.com").unwrap();
        let claims = codec().verify(&token).unwrap();

        assert_eq!(claims.subject_id, user_id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.expires_at - claims.issued_at, 86_400);
    }

    #[test]
    fn test_huge_lifetime_saturates_expiry() {
        let codec = TokenCodec::new(SECRET, i64::MAX);
        let token = codec.issue(Uuid::new_v4(), "ada@example.com").unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.expires_at, i64::MAX);
    }

    #[test]
    fn test_expired_token_is_session_expired() {
        let issued_at = Utc::now().timestamp() - 2 * 86_400;
        let token = codec()
            .issue_at(Uuid::new_v4(), "ada@example.com", issued_at)
            .unwrap();

        assert!(matches!(
            codec().verify(&token),
            Err(AppError::SessionExpired)
        ));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_invalid() {
        let other = TokenCodec::new("a_completely_different_secret", 86_400);
        let token = other.issue(Uuid::new_v4(), "ada@example.com").unwrap();

        assert!(matches!(codec().verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_with_wrong_secret_is_invalid_not_expired() {
        let other = TokenCodec::new("a_completely_different_secret", 60);
        let token = other
            .issue_at(Uuid::new_v4(), "ada@example.com", 1_000)
            .unwrap();

        assert!(matches!(codec().verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_corrupted_token_is_invalid() {
        let token = codec().issue(Uuid::new_v4(), "ada@example.com").unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1] = format!("{}x", parts[1]);
        let tampered = parts.join(".");

        assert!(matches!(
            codec().verify(&tampered),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            codec().verify("not-a-jwt"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_non_uuid_subject_is_invalid() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "42".to_string(),
            email: "ada@example.com".to_string(),
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(codec().verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_algorithm_mismatch_is_invalid() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "ada@example.com".to_string(),
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(codec().verify(&token), Err(AppError::InvalidToken)));
    }
}
