/// Application context and dependency injection
use crate::{
    audit::AuditRecorder,
    auth::{verifier_from_config, Authenticator, Authorizer, IdentityVerifier},
    config::ServerConfig,
    db::{AdminStore, AuditStore, DirectoryStore, PostgresStore},
    dispatch::DispatchEngine,
    error::BroadcastResult,
    mailer::{EmailTransport, Mailer},
    rate_limit::RateLimiter,
    recipients::RecipientResolver,
};
use std::sync::Arc;

/// Storage roles backing one deployment
#[derive(Clone)]
pub struct Stores {
    pub directory: Arc<dyn DirectoryStore>,
    pub admins: Arc<dyn AdminStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl Stores {
    /// One backend serving all three roles
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: DirectoryStore + AdminStore + AuditStore + 'static,
    {
        Self {
            directory: store.clone(),
            admins: store.clone(),
            audit: store,
        }
    }
}

/// External collaborators the core talks to
///
/// Every collaborator is optional: without one the service still starts,
/// but the broadcast endpoint answers with a configuration error.
#[derive(Clone)]
pub struct Collaborators {
    pub stores: Option<Stores>,
    pub identity: Option<Arc<dyn IdentityVerifier>>,
    pub transport: Option<Arc<dyn EmailTransport>>,
}

/// Services that need the directory database
#[derive(Clone)]
pub struct StorageServices {
    pub authorizer: Authorizer,
    pub resolver: RecipientResolver,
    pub audit: AuditRecorder,
}

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub authenticator: Option<Authenticator>,
    pub storage: Option<StorageServices>,
    pub rate_limiter: Arc<RateLimiter>,
    pub dispatcher: Option<DispatchEngine>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> BroadcastResult<Self> {
        // Validate configuration
        config.validate()?;

        let stores = if config.storage.database_url.is_some() {
            let store = PostgresStore::connect(&config.storage).await?;
            store.ping().await?;
            Some(Stores::shared(Arc::new(store)))
        } else {
            tracing::warn!("DATABASE_URL not set; broadcasts are disabled");
            None
        };

        let identity = match &config.identity {
            Some(identity_config) => Some(verifier_from_config(identity_config)?),
            None => {
                tracing::warn!("Identity provider not configured; broadcasts are disabled");
                None
            }
        };

        let mailer = Mailer::new(config.email.as_ref())?;

        Ok(Self::from_parts(
            config,
            Collaborators {
                stores,
                identity,
                transport: mailer.transport(),
            },
        ))
    }

    /// Assemble a context from already-built collaborators
    pub fn from_parts(config: ServerConfig, parts: Collaborators) -> Self {
        let identity_timeout = config
            .identity
            .as_ref()
            .map(|identity| identity.timeout())
            .unwrap_or_else(|| std::time::Duration::from_secs(5));

        let authenticator = parts
            .identity
            .map(|verifier| Authenticator::new(verifier, identity_timeout));

        let storage = parts.stores.map(|stores| StorageServices {
            authorizer: Authorizer::new(stores.admins),
            resolver: RecipientResolver::from_config(stores.directory, &config.broadcast),
            audit: AuditRecorder::new(stores.audit),
        });

        let dispatcher = parts
            .transport
            .map(|transport| DispatchEngine::from_config(transport, &config.broadcast));

        Self {
            rate_limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)),
            authenticator,
            storage,
            dispatcher,
            config: Arc::new(config),
        }
    }

    /// Whether every collaborator needed to broadcast is present
    pub fn broadcast_ready(&self) -> bool {
        self.authenticator.is_some() && self.storage.is_some() && self.dispatcher.is_some()
    }
}
