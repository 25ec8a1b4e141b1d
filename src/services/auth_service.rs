use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::rngs::OsRng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::user::User;

/// Verified profile handed over by the OAuth collaborator. How the
/// handshake produced it is not this crate's concern.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub google_id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
}

impl AuthService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let username = username.trim();
        let email = email.trim().to_lowercase();

        let existing = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE username = $1 OR email = $2"#,
        )
        .bind(username)
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(user) = existing {
            let message = if user.email == email {
                "Email already registered"
            } else {
                "Username already taken"
            };
            return Err(Error::BadRequest(message.to_string()));
        }

        let password_hash = hash_password(password)?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, full_name, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(username)
        .bind(&email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(username = %user.username, "user registered");
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE username = $1"#)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                Error::Unauthorized("Invalid username or invalid password".to_string())
            })?;

        let hash = user.password_hash.as_deref().ok_or_else(|| {
            Error::Unauthorized("Account uses Google sign-in".to_string())
        })?;
        if !verify_password(password, hash)? {
            return Err(Error::Unauthorized(
                "Invalid username or invalid password".to_string(),
            ));
        }

        tracing::info!(username = %user.username, "user logged in");
        Ok(user)
    }

    /// Verifies a Google ID token against the tokeninfo endpoint and
    /// resolves it to a local account: existing Google account, link by
    /// e-mail, or a fresh account, in that order.
    pub async fn google_sign_in(&self, id_token: &str) -> Result<User> {
        let info: serde_json::Value = reqwest::Client::new()
            .get("https://oauth2.googleapis.com/tokeninfo")
            .query(&[("id_token", id_token)])
            .send()
            .await?
            .error_for_status()
            .map_err(|_| Error::Unauthorized("Google authentication failed".to_string()))?
            .json()
            .await?;

        let profile = GoogleProfile {
            google_id: info
                .get("sub")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::Unauthorized("Google token missing subject".to_string()))?
                .to_string(),
            email: info
                .get("email")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_lowercase(),
            name: info.get("name").and_then(|v| v.as_str()).map(String::from),
            picture: info
                .get("picture")
                .and_then(|v| v.as_str())
                .map(String::from),
        };
        self.resolve_google_profile(profile).await
    }

    pub async fn resolve_google_profile(&self, profile: GoogleProfile) -> Result<User> {
        if let Some(user) =
            sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE google_id = $1"#)
                .bind(&profile.google_id)
                .fetch_optional(&self.pool)
                .await?
        {
            if let Some(picture) = &profile.picture {
                if user.profile_picture.as_deref() != Some(picture) {
                    sqlx::query(r#"UPDATE users SET profile_picture = $1 WHERE id = $2"#)
                        .bind(picture)
                        .bind(user.id)
                        .execute(&self.pool)
                        .await?;
                }
            }
            return Ok(user);
        }

        if !profile.email.is_empty() {
            if let Some(user) =
                sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE email = $1"#)
                    .bind(&profile.email)
                    .fetch_optional(&self.pool)
                    .await?
            {
                let linked = sqlx::query_as::<_, User>(
                    r#"UPDATE users SET google_id = $1, profile_picture = COALESCE($2, profile_picture)
                       WHERE id = $3 RETURNING *"#,
                )
                .bind(&profile.google_id)
                .bind(&profile.picture)
                .bind(user.id)
                .fetch_one(&self.pool)
                .await?;
                tracing::info!(username = %linked.username, "linked Google account");
                return Ok(linked);
            }
        }

        let username = if profile.email.is_empty() {
            format!("google_{}", profile.google_id)
        } else {
            profile.email.clone()
        };
        let full_name = profile.name.clone().unwrap_or_else(|| username.clone());
        let email = if profile.email.is_empty() {
            format!("{}@google.local", profile.google_id)
        } else {
            profile.email.clone()
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, full_name, email, google_id, profile_picture, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&username)
        .bind(&full_name)
        .bind(&email)
        .bind(&profile.google_id)
        .bind(&profile.picture)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(username = %user.username, "new Google user created");
        Ok(user)
    }

    /// Issues a signed session token for the identity middleware.
    pub fn issue_session(&self, user: &User) -> Result<String> {
        let config = crate::config::get_config();
        let exp = Utc::now() + Duration::days(config.session_ttl_days);
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            exp: exp.timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )?;
        Ok(token)
    }
}

fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(plain: &str, hashed: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hashed)
        .map_err(|e| Error::Internal(format!("Stored password hash invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
