use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    core::{
        AuthService, CaptionValidator, GoogleTokenVerifier, IntakePipeline, IntakeSettings,
        JwtVerifier, RetryPolicy, VerifierChain,
    },
    infrastructure::{
        external::{Captioner, GoogleIdentityClient, HttpCaptioner},
        AppResult, ModelRegistry, UserStore,
    },
    utils::{Config, TokenIssuer},
};

/// État partagé entre les workers actix
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub intake: Arc<IntakePipeline>,
    pub store: Arc<dyn UserStore>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Assemble les services à partir de la configuration
    pub fn build(config: Config, registry: ModelRegistry, store: Arc<dyn UserStore>) -> AppResult<Self> {
        if config.jwt_secret.len() < 32 {
            warn!("⚠️ JWT_SECRET fait moins de 32 caractères");
        }

        let captioner: Option<Arc<dyn Captioner>> = match &config.caption_api_url {
            Some(url) => {
                info!("📝 Service de légende configuré: {}", url);
                Some(Arc::new(HttpCaptioner::new(
                    url.clone(),
                    config.caption_api_token.clone(),
                    config.caption_timeout(),
                )?))
            }
            None => {
                warn!("⚠️ CAPTION_API_URL absent: validation par légende désactivée");
                None
            }
        };
        let captions = CaptionValidator::new(
            captioner,
            RetryPolicy {
                max_attempts: config.caption_max_attempts,
                delay: config.caption_retry_delay(),
            },
        );

        let intake = IntakePipeline::new(
            Arc::new(registry),
            captions,
            store.clone(),
            IntakeSettings::from_config(&config),
        );

        let issuer = TokenIssuer::new(
            &config.jwt_secret,
            chrono::Duration::hours(config.jwt_expiry_hours),
        );
        let mut verifiers = VerifierChain::new().with(Arc::new(JwtVerifier::new(issuer.clone())));
        if let Some(client_id) = &config.google_oauth_client_id {
            let client = GoogleIdentityClient::new(config.google_tokeninfo_url.clone(), client_id.clone())?;
            verifiers = verifiers.with(Arc::new(GoogleTokenVerifier::new(client)));
        }
        let auth = AuthService::new(store.clone(), issuer, verifiers);

        Ok(Self {
            config: Arc::new(config),
            intake: Arc::new(intake),
            store,
            auth: Arc::new(auth),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::infrastructure::MemoryUserStore;
    use std::collections::HashMap;

    pub const TEST_SECRET: &str = "test-secret-that-is-long-enough-123";

    pub fn test_config() -> Config {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", TEST_SECRET),
        ]);
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
    }

    /// État en mémoire avec le registre fourni et sans service de légende
    pub fn test_state(registry: ModelRegistry) -> (AppState, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::new());
        let state = AppState::build(test_config(), registry, store.clone()).unwrap();
        (state, store)
    }
}
