//! Authentication module: configuration, credential handling, token minting,
//! session rotation, Rocket request guards, and the identity store seam.

use std::sync::Arc;

pub mod accounts;
pub mod config;
pub mod error;
pub mod guards;
pub mod jwt;
pub mod memory_store;
pub mod passwords;
pub mod responses;
pub mod session;
pub mod store;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use guards::AuthUser;
pub use jwt::JwtService;
pub use memory_store::MemoryCredentialStore;
pub use passwords::PasswordService;
pub use session::{LoginOutcome, TokenPair};
pub use store::{CredentialStore, PgCredentialStore, User, UserProfile};

#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub password_service: Arc<PasswordService>,
    pub jwt_service: Arc<JwtService>,
    pub store: Arc<dyn CredentialStore>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        password_service: PasswordService,
        jwt_service: JwtService,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            config,
            password_service: Arc::new(password_service),
            jwt_service: Arc::new(jwt_service),
            store,
        }
    }

    /// Build the signing and hashing services from `config` around `store`.
    pub fn from_config(config: AuthConfig, store: Arc<dyn CredentialStore>) -> AuthResult<Self> {
        let password_service = PasswordService::new()?;
        let jwt_service = JwtService::from_config(&config)?;
        Ok(Self::new(config, password_service, jwt_service, store))
    }
}
