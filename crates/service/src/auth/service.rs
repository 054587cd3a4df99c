use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use tracing::{info, instrument, warn};

use super::domain::{AuthSession, Claims, LoginInput};
use super::errors::AuthError;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub admin_username: String,
    pub admin_password: String,
    pub token_ttl: Duration,
}

impl From<&configs::AuthConfig> for AuthConfig {
    fn from(cfg: &configs::AuthConfig) -> Self {
        Self {
            jwt_secret: cfg.secret_key.clone(),
            admin_username: cfg.admin_username.clone(),
            admin_password: cfg.admin_password.clone(),
            token_ttl: Duration::minutes(cfg.token_ttl_minutes.clamp(1, configs::MAX_TOKEN_TTL_MINUTES)),
        }
    }
}

/// Auth business service independent of web framework
pub struct AuthService {
    cfg: AuthConfig,
}

impl AuthService {
    pub fn new(cfg: AuthConfig) -> Self { Self { cfg } }

    /// Check the admin credentials and issue a token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AuthConfig, AuthService, domain::LoginInput};
    /// let svc = AuthService::new(AuthConfig {
    ///     jwt_secret: "secret".into(),
    ///     admin_username: "admin".into(),
    ///     admin_password: "pw".into(),
    ///     token_ttl: chrono::Duration::minutes(5),
    /// });
    /// let session = svc.login(LoginInput { username: "admin".into(), password: "pw".into() }).unwrap();
    /// assert_eq!(svc.verify(&session.access_token).unwrap().sub, "admin");
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user_ok = constant_time_eq(input.username.as_bytes(), self.cfg.admin_username.as_bytes());
        let pass_ok = constant_time_eq(input.password.as_bytes(), self.cfg.admin_password.as_bytes());
        if !(user_ok && pass_ok) {
            warn!("admin login rejected");
            return Err(AuthError::Unauthorized);
        }

        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.cfg.token_ttl)
            .ok_or_else(|| AuthError::TokenError("token lifetime overflows the clock".into()))?;
        let claims = Claims {
            sub: input.username.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(
            &JwtHeader::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenError(e.to_string()))?;

        info!(username = %claims.sub, "admin_logged_in");
        Ok(AuthSession {
            access_token: token,
            token_type: "bearer".into(),
            expires_in: self.cfg.token_ttl.num_seconds(),
            username: input.username,
        })
    }

    /// Decode a token, checking signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let key = DecodingKey::from_secret(self.cfg.jwt_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
