use axum::extract::FromRef;

use crate::auth::TokenVerifier;
use crate::catalog::CatalogService;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedCatalogService = Arc<CatalogService>;
pub type GuardedTokenVerifier = Arc<dyn TokenVerifier>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub catalog: GuardedCatalogService,
    pub token_verifier: GuardedTokenVerifier,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        catalog: CatalogService,
        token_verifier: GuardedTokenVerifier,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            catalog: Arc::new(catalog),
            token_verifier,
        }
    }
}

impl FromRef<ServerState> for GuardedCatalogService {
    fn from_ref(input: &ServerState) -> Self {
        input.catalog.clone()
    }
}

impl FromRef<ServerState> for GuardedTokenVerifier {
    fn from_ref(input: &ServerState) -> Self {
        input.token_verifier.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
