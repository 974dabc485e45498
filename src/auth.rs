/// Caller authentication and admin authorization
///
/// Authentication turns a bearer token into a [`UserId`] through an identity
/// collaborator. Authorization then checks that id against the admin
/// allow-list on every request; admin status is never cached.
use crate::{
    config::{IdentityConfig, IdentityProvider},
    db::{AdminStore, UserId},
    deadline::{self, Bounded},
    error::{BroadcastError, BroadcastResult},
};
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;

/// Shortest bearer token accepted before asking the identity provider
pub const MIN_TOKEN_CHARS: usize = 10;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential rejected: {0}")]
    Rejected(String),
    #[error("identity provider error: {0}")]
    Provider(String),
    #[error("identity verification timed out")]
    TimedOut,
}

/// Resolves a bearer token to the caller's identity
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
}

/// Verifies tokens against a remote user endpoint
///
/// Only the caller-scoped API key is sent with these requests.
pub struct HttpIdentityVerifier {
    client: reqwest::Client,
    user_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
}

impl HttpIdentityVerifier {
    pub fn new(user_url: String, api_key: String, timeout: Duration) -> BroadcastResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pillar-broadcast/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| BroadcastError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_url,
            api_key,
        })
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let response = self
            .client
            .get(&self.user_url)
            .bearer_auth(token)
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AuthError::Rejected(format!("provider returned {}", status)));
        }
        if !status.is_success() {
            return Err(AuthError::Provider(format!("provider returned {}", status)));
        }

        let user: ProviderUser = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("invalid user payload: {}", e)))?;

        if user.id.trim().is_empty() {
            return Err(AuthError::Rejected("empty user id".to_string()));
        }

        Ok(UserId::new(user.id))
    }
}

/// Verifies HS256 tokens locally, taking `sub` as the user id
pub struct JwtIdentityVerifier {
    secret: String,
}

impl JwtIdentityVerifier {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let token_data = verify_jwt_token(token, &self.secret)?;

        token_data
            .claims
            .get("sub")
            .and_then(|v| v.as_str())
            .filter(|sub| !sub.is_empty())
            .map(UserId::new)
            .ok_or_else(|| AuthError::Rejected("missing 'sub' claim".to_string()))
    }
}

/// Verify a JWT token with signature and expiry checks
pub fn verify_jwt_token(
    token: &str,
    jwt_secret: &str,
) -> Result<jsonwebtoken::TokenData<serde_json::Value>, AuthError> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (1 minute)
    validation.leeway = 60;
    validation.validate_aud = false;

    decode::<serde_json::Value>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!("JWT verification failed: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AuthError::Rejected("token has expired".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                AuthError::Rejected("invalid token signature".to_string())
            }
            _ => AuthError::Rejected(format!("invalid token: {}", e)),
        }
    })
}

/// Build the verifier selected by configuration
pub fn verifier_from_config(config: &IdentityConfig) -> BroadcastResult<Arc<dyn IdentityVerifier>> {
    let verifier: Arc<dyn IdentityVerifier> = match &config.provider {
        IdentityProvider::Http { url, api_key } => Arc::new(HttpIdentityVerifier::new(
            url.clone(),
            api_key.clone(),
            config.timeout(),
        )?),
        IdentityProvider::Jwt { secret } => Arc::new(JwtIdentityVerifier::new(secret.clone())),
    };
    Ok(verifier)
}

/// Bounded identity verification
#[derive(Clone)]
pub struct Authenticator {
    verifier: Arc<dyn IdentityVerifier>,
    timeout: Duration,
}

impl Authenticator {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, timeout: Duration) -> Self {
        Self { verifier, timeout }
    }

    pub async fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        match deadline::within(self.timeout, self.verifier.verify(token)).await {
            Bounded::Completed(result) => result,
            Bounded::TimedOut => Err(AuthError::TimedOut),
        }
    }
}

/// Admin allow-list check; every failure mode denies
#[derive(Clone)]
pub struct Authorizer {
    admins: Arc<dyn AdminStore>,
}

impl Authorizer {
    pub fn new(admins: Arc<dyn AdminStore>) -> Self {
        Self { admins }
    }

    pub async fn authorize(&self, user_id: &UserId) -> bool {
        match self.admins.is_admin(user_id).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                tracing::error!(error = %e, "Admin lookup failed; denying");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, StoreError, StoreResult};
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "unit-test-secret-unit-test-secret";

    fn token_for(sub: &str, exp_offset: i64) -> String {
        let claims = json!({
            "sub": sub,
            "exp": chrono::Utc::now().timestamp() + exp_offset,
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    struct SlowVerifier;

    #[async_trait]
    impl IdentityVerifier for SlowVerifier {
        async fn verify(&self, _token: &str) -> Result<UserId, AuthError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(UserId::new("late"))
        }
    }

    struct FailingAdminStore;

    #[async_trait]
    impl AdminStore for FailingAdminStore {
        async fn is_admin(&self, _user_id: &UserId) -> StoreResult<bool> {
            Err(StoreError::Unavailable("connection reset".to_string()))
        }
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer   abcdefghijkl  "),
        );
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abcdefghijkl"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer short"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abcdefghijkl"));
        assert_eq!(extract_bearer_token(&headers), None);

        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_jwt_verifier_accepts_valid_token() {
        let verifier = JwtIdentityVerifier::new(SECRET.to_string());
        let user = verifier.verify(&token_for("user-123", 3600)).await.unwrap();
        assert_eq!(user, UserId::new("user-123"));
    }

    #[tokio::test]
    async fn test_jwt_verifier_rejects_expired_and_forged() {
        let verifier = JwtIdentityVerifier::new(SECRET.to_string());
        assert!(verifier.verify(&token_for("user-123", -3600)).await.is_err());

        let forged = JwtIdentityVerifier::new("some-other-secret-some-other-secret".to_string());
        assert!(forged.verify(&token_for("user-123", 3600)).await.is_err());
    }

    #[tokio::test]
    async fn test_verifier_follows_configured_provider() {
        let config = IdentityConfig {
            provider: IdentityProvider::Jwt {
                secret: SECRET.to_string(),
            },
            timeout_ms: 1_000,
        };
        let verifier = verifier_from_config(&config).unwrap();
        let user = verifier.verify(&token_for("user-9", 60)).await.unwrap();
        assert_eq!(user, UserId::new("user-9"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticate_times_out() {
        let auth = Authenticator::new(Arc::new(SlowVerifier), Duration::from_secs(5));
        let result = auth.authenticate("abcdefghijkl").await;
        assert!(matches!(result, Err(AuthError::TimedOut)));
    }

    #[tokio::test]
    async fn test_authorize_checks_allow_list() {
        let store = Arc::new(MemoryStore::new());
        store.add_admin(UserId::new("admin-1")).await;
        let authorizer = Authorizer::new(store);

        assert!(authorizer.authorize(&UserId::new("admin-1")).await);
        assert!(!authorizer.authorize(&UserId::new("employee-7")).await);
    }

    #[tokio::test]
    async fn test_authorize_fails_closed() {
        let authorizer = Authorizer::new(Arc::new(FailingAdminStore));
        assert!(!authorizer.authorize(&UserId::new("admin-1")).await);
    }
}
