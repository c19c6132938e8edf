//! Application state.

use std::sync::Arc;

use jobport_firestore::{
    ApplicationRepository, EmployerRepository, FirestoreClient, JobRepository, UserRepository,
};
use jobport_storage::R2Client;

use crate::auth::TokenKeys;
use crate::config::ApiConfig;
use crate::revocation::RevocationRegistry;
use crate::services::{Mailer, PrincipalService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub firestore: Arc<FirestoreClient>,
    pub storage: Arc<R2Client>,
    pub users: Arc<UserRepository>,
    pub employers: Arc<EmployerRepository>,
    pub jobs: Arc<JobRepository>,
    pub applications: Arc<ApplicationRepository>,
    pub principals: PrincipalService,
    pub mailer: Mailer,
    pub tokens: Arc<TokenKeys>,
    pub revoked: Arc<RevocationRegistry>,
}

impl AppState {
    /// Create new application state, connecting the external collaborators.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let firestore = Arc::new(FirestoreClient::from_env().await?);
        let storage = Arc::new(R2Client::from_env().await?);

        let users = Arc::new(UserRepository::new((*firestore).clone()));
        let employers = Arc::new(EmployerRepository::new((*firestore).clone()));
        let jobs = Arc::new(JobRepository::new((*firestore).clone()));
        let applications = Arc::new(ApplicationRepository::new((*firestore).clone()));

        let principals = PrincipalService::new(Arc::clone(&users), Arc::clone(&employers));
        let mailer = Mailer::from_env();

        let tokens = Arc::new(TokenKeys::new(&config.jwt_secret, config.token_ttl_days));
        let revoked = Arc::new(RevocationRegistry::new(
            tokens
                .ttl()
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(14 * 24 * 3600)),
        ));

        Ok(Self {
            config,
            firestore,
            storage,
            users,
            employers,
            jobs,
            applications,
            principals,
            mailer,
            tokens,
            revoked,
        })
    }
}
