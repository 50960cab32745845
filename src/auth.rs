use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{
    bearer::bearer_token,
    error::AuthError,
    types::{Claims, LoginRequest, Subject},
};

/// Issued tokens are valid for 24 hours.
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Shortest HMAC secret accepted at start-up.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct AuthConfig {
    /// The single account allowed to log in.
    pub admin_username: String,
    pub admin_password: String,
    /// The HMAC secret used to sign and verify tokens.
    /// If the secret changes, all outstanding tokens stop verifying.
    pub auth_token_secret: String,
    /// How long issued tokens remain valid. After this interval, the client will have to re-login.
    pub auth_token_lifetime: Duration,
}

impl AuthConfig {
    pub fn new(
        admin_username: impl Into<String>,
        admin_password: impl Into<String>,
        auth_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            admin_username: admin_username.into(),
            admin_password: admin_password.into(),
            auth_token_secret: auth_token_secret.into(),
            auth_token_lifetime: TOKEN_LIFETIME,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"<redacted>")
            .field("auth_token_secret", &"<redacted>")
            .field("auth_token_lifetime", &self.auth_token_lifetime)
            .finish()
    }
}

pub(crate) struct AuthInternal {
    config: AuthConfig,
    username_digest: [u8; 32],
    password_digest: [u8; 32],
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthInternal {
    fn new(config: AuthConfig) -> Self {
        let secret = config.auth_token_secret.as_bytes();

        // Only the HMAC family is accepted; anything else in the header fails decoding.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);

        Self {
            username_digest: digest(&config.admin_username),
            password_digest: digest(&config.admin_password),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            config,
        }
    }

    // Compares fixed-size digests so neither the content nor the length of
    // the configured values shows in the timing.
    fn credentials_match(&self, request: &LoginRequest) -> bool {
        let username = digest(&request.username).as_slice().ct_eq(&self.username_digest);
        let password = digest(&request.password).as_slice().ct_eq(&self.password_digest);

        (username & password).into()
    }

    fn generate_token(&self, subject: &str, now: SystemTime) -> Result<String, AuthError> {
        let iat = unix_seconds(now);

        let claims = Claims {
            sub: subject.to_string(),
            iat,
            nbf: iat,
            exp: iat + self.config.auth_token_lifetime.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|source| AuthError::Signing { source })
    }

    fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let token = decode::<Claims>(token, &self.decoding_key, &self.validation)?;

        Ok(token.claims)
    }
}

fn digest(value: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(value.as_bytes()));
    out
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Credential issuer and token verifier. Cheap to clone; all state is
/// read-only after construction.
#[derive(Clone)]
pub struct Auth {
    pub(crate) internal: Arc<AuthInternal>,
}

impl Auth {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            internal: Arc::new(AuthInternal::new(config)),
        }
    }

    /// Check `request` against the configured account and issue a token for it.
    pub fn login(&self, request: &LoginRequest) -> Result<String, AuthError> {
        if !self.internal.credentials_match(request) {
            return Err(AuthError::LoginFailed);
        }

        self.issue_token(&request.username, SystemTime::now())
    }

    /// Sign a token for `subject` as if issued at `now`.
    pub fn issue_token(&self, subject: &str, now: SystemTime) -> Result<String, AuthError> {
        self.internal.generate_token(subject, now)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.internal.verify_token(token)
    }

    /// Run the bearer gate over a raw `Authorization` header value.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Subject, AuthError> {
        let header = header.ok_or(AuthError::MissingHeader)?;
        let token = bearer_token(header)?;
        let claims = self.verify_token(token)?;

        Ok(Subject(claims.sub))
    }
}
