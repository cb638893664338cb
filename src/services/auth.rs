// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{AuthResponse, Claims, User, UserSummary},
};

const TOKEN_TTL_HOURS: i64 = 1;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String) -> Self {
        Self { user_repo, jwt_secret }
    }

    // bcrypt is CPU-bound, keep it off the async workers
    pub async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_owned();
        let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("password hashing task failed: {e}"))??;
        Ok(hashed)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::UserNotFound)?;

        let password = password.to_owned();
        let stored_hash = user.hashed_password.clone();
        let is_valid = tokio::task::spawn_blocking(move || verify(&password, &stored_hash))
            .await
            .map_err(|e| anyhow::anyhow!("password verification task failed: {e}"))??;

        if !is_valid {
            return Err(AppError::InvalidPassword);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.auth_response(&user)
    }

    pub fn auth_response(&self, user: &User) -> Result<AuthResponse, AppError> {
        Ok(AuthResponse {
            token: self.issue_token(user)?,
            user: UserSummary { id: user.id, email: user.email.clone() },
        })
    }

    /// HS256, valid for one hour.
    pub fn issue_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            exp: (now + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::ExpiredToken,
            _ => AppError::InvalidToken,
        })?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn service() -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        AuthService::new(UserRepository::new(pool), "test-secret".to_string())
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
            hashed_password: String::new(),
            stripe_customer_id: None,
            is_paid: true,
            company_id: None,
            first_name: Some("Ada".to_string()),
            last_name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn issued_tokens_carry_identity_claims() {
        let service = service();
        let user = user();
        let token = service.issue_token(&user).unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.first_name.as_deref(), Some("Ada"));
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[tokio::test]
    async fn expired_and_foreign_tokens_are_distinguished() {
        let service = service();
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            user_id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
            first_name: None,
            last_name: None,
            exp: now - 7200,
            iat: now - 10800,
        };
        let expired = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(matches!(service.validate_token(&expired), Err(AppError::ExpiredToken)));

        let foreign = encode(
            &Header::new(Algorithm::HS256),
            &Claims { exp: now + 600, ..claims },
            &EncodingKey::from_secret(b"another-secret"),
        )
        .unwrap();
        assert!(matches!(service.validate_token(&foreign), Err(AppError::InvalidToken)));
        assert!(matches!(service.validate_token("not.a.jwt"), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn hashes_verify_against_the_original_password() {
        let hashed = service().hash_password("HelloWorld123").await.unwrap();
        assert_ne!(hashed, "HelloWorld123");
        assert!(verify("HelloWorld123", &hashed).unwrap());
    }
}
