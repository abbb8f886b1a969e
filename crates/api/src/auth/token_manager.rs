//! Signing of access tokens and API keys with the database-held key set.
//!
//! Access tokens are HS256 JWTs whose `kid` header names the
//! `encryption_keys` row that signed them. API keys carry the same key id
//! in the database next to their stored signature.

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use kbase_core::api_keys::{self, GeneratedApiKey};
use kbase_core::signing::{KeyInfo, SigningError, SigningKeys};
use kbase_core::types::DbId;
use kbase_db::repositories::EncryptionKeyRepo;
use kbase_db::DbPool;
use rand::RngCore;

use super::jwt::{Claims, JwtConfig};

/// Random bytes in a token's `jti`.
const JTI_BYTES: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("no active signing key; run `kbase init` first")]
    NoActiveKey,

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("token has a missing or malformed key id")]
    InvalidKeyId,

    #[error("token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub struct TokenManager {
    keys: SigningKeys,
    jwt: JwtConfig,
}

impl TokenManager {
    pub fn new(keys: SigningKeys, jwt: JwtConfig) -> Self {
        Self { keys, jwt }
    }

    /// Build a manager around the active `encryption_keys` row.
    pub async fn load(pool: &DbPool, jwt: JwtConfig) -> Result<Self, TokenError> {
        let active = EncryptionKeyRepo::find_active(pool)
            .await?
            .ok_or(TokenError::NoActiveKey)?;

        tracing::info!(key_id = active.id, "Loaded active signing key");
        let keys = SigningKeys::with_active(
            active.id,
            KeyInfo::new(active.symmetric_key, active.expired_at),
        );
        Ok(Self::new(keys, jwt))
    }

    pub fn active_key_id(&self) -> DbId {
        self.keys.active_id()
    }

    /// Issue an access token for a user.
    pub fn create_access_token(&self, user_id: DbId, role: &str) -> Result<String, TokenError> {
        let kid = self.keys.active_id();
        let signing_key = self.keys.active()?;

        let now = Utc::now().timestamp();
        let mut jti = [0u8; JTI_BYTES];
        rand::rng().fill_bytes(&mut jti);

        let claims = Claims {
            user_id,
            role: role.to_string(),
            exp: now.saturating_add(self.jwt.access_token_hours.saturating_mul(3600)),
            iss: self.jwt.issuer.clone(),
            aud: self.jwt.audience.clone(),
            iat: now,
            jti: hex::encode(jti),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.to_string());

        Ok(encode(
            &header,
            &claims,
            &EncodingKey::from_secret(&signing_key.key),
        )?)
    }

    /// Validate signature, expiry, issuer and audience, using the key named
    /// by the token's `kid`.
    pub fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        let header = decode_header(token)?;
        let kid: DbId = header
            .kid
            .as_deref()
            .and_then(|kid| kid.parse().ok())
            .ok_or(TokenError::InvalidKeyId)?;
        let signing_key = self.keys.usable(kid)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.jwt.issuer]);
        validation.set_audience(&[&self.jwt.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        let data = decode::<Claims>(token, &DecodingKey::from_secret(&signing_key.key), &validation)?;
        Ok(data.claims)
    }

    /// Mint an API key with the active signing key.
    pub fn generate_api_key(&self) -> Result<GeneratedApiKey, TokenError> {
        Ok(api_keys::generate_api_key(&self.keys)?)
    }

    pub fn verify_api_key(
        &self,
        plaintext: &str,
        stored_signature: &[u8],
        kid: DbId,
    ) -> Result<bool, TokenError> {
        Ok(api_keys::verify_api_key(
            &self.keys,
            plaintext,
            stored_signature,
            kid,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn manager(kid: DbId) -> TokenManager {
        TokenManager::new(
            SigningKeys::with_active(kid, KeyInfo::new(vec![7; 32], None)),
            JwtConfig::default(),
        )
    }

    #[test]
    fn oversized_lifetime_does_not_overflow() {
        let tm = TokenManager::new(
            SigningKeys::with_active(1, KeyInfo::new(vec![7; 32], None)),
            JwtConfig {
                access_token_hours: i64::MAX,
                ..JwtConfig::default()
            },
        );
        let token = tm.create_access_token(1, "USER").unwrap();
        assert_eq!(tm.verify_token(&token).unwrap().exp, i64::MAX);
    }

    #[test]
    fn issued_token_verifies() {
        let tm = manager(1);
        let token = tm.create_access_token(42, "ADMIN").unwrap();
        let claims = tm.verify_token(&token).unwrap();

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.role, "ADMIN");
        assert_eq!(claims.iss, "kbase");
        assert_eq!(claims.aud, "kbase-api");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
        assert_eq!(claims.jti.len(), JTI_BYTES * 2);
    }

    #[test]
    fn token_header_names_the_key() {
        let tm = manager(9);
        let token = tm.create_access_token(1, "USER").unwrap();
        assert_eq!(decode_header(&token).unwrap().kid.as_deref(), Some("9"));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let issuer = manager(1);
        let verifier = TokenManager::new(
            SigningKeys::with_active(1, KeyInfo::new(vec![7; 32], None)),
            JwtConfig {
                audience: "someone-else".into(),
                ..JwtConfig::default()
            },
        );
        let token = issuer.create_access_token(1, "USER").unwrap();
        assert_matches!(verifier.verify_token(&token), Err(TokenError::Jwt(_)));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let issuer = TokenManager::new(
            SigningKeys::with_active(1, KeyInfo::new(vec![7; 32], None)),
            JwtConfig {
                issuer: "impostor".into(),
                ..JwtConfig::default()
            },
        );
        let token = issuer.create_access_token(1, "USER").unwrap();
        assert_matches!(manager(1).verify_token(&token), Err(TokenError::Jwt(_)));
    }

    #[test]
    fn unknown_kid_is_rejected() {
        let token = manager(1).create_access_token(1, "USER").unwrap();
        assert_matches!(
            manager(2).verify_token(&token),
            Err(TokenError::Signing(SigningError::KeyNotFound(1)))
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let tm = manager(1);
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: 1,
            role: "USER".into(),
            exp: now - 300,
            iss: "kbase".into(),
            aud: "kbase-api".into(),
            iat: now - 600,
            jti: "00".into(),
        };
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("1".into());
        let token = encode(&header, &claims, &EncodingKey::from_secret(&[7; 32])).unwrap();

        assert_matches!(tm.verify_token(&token), Err(TokenError::Jwt(_)));
    }

    #[test]
    fn expired_signing_key_cannot_issue() {
        let tm = TokenManager::new(
            SigningKeys::with_active(
                4,
                KeyInfo::new(vec![1; 32], Some(Utc::now() - Duration::hours(1))),
            ),
            JwtConfig::default(),
        );
        assert_matches!(
            tm.create_access_token(1, "USER"),
            Err(TokenError::Signing(SigningError::KeyExpired(4)))
        );
    }

    #[test]
    fn api_keys_round_trip_through_manager() {
        let tm = manager(3);
        let key = tm.generate_api_key().unwrap();
        assert_eq!(key.key_id, 3);
        assert!(tm.verify_api_key(&key.plaintext, &key.signature, 3).unwrap());
        assert!(!tm.verify_api_key(&key.plaintext, &key.signature, 5).unwrap());
    }
}
