// core/auth_service.rs
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

use crate::{
    domain::{normalize_email, Identity, NewUser, UserAccount, UserLogin},
    infrastructure::{
        database::{Registration, UserStore},
        error::{not_found, unauthorized, AppError, AppResult},
        external::GoogleIdentityClient,
    },
    utils::{hash_password, verify_password, TokenIssuer},
};

/// Vérifie un token porteur et en extrait l'identité
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    fn provider(&self) -> &'static str;
    async fn verify(&self, token: &str) -> AppResult<Identity>;
}

/// Tokens signés par ce backend
pub struct JwtVerifier {
    issuer: TokenIssuer,
}

impl JwtVerifier {
    pub fn new(issuer: TokenIssuer) -> Self {
        Self { issuer }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    fn provider(&self) -> &'static str {
        "jwt"
    }

    async fn verify(&self, token: &str) -> AppResult<Identity> {
        let claims = self.issuer.verify(token)?;
        Ok(Identity {
            email: normalize_email(&claims.email),
            provider: self.provider(),
        })
    }
}

/// ID tokens Google, vérifiés via l'endpoint tokeninfo
pub struct GoogleTokenVerifier {
    client: GoogleIdentityClient,
}

impl GoogleTokenVerifier {
    pub fn new(client: GoogleIdentityClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenVerifier for GoogleTokenVerifier {
    fn provider(&self) -> &'static str {
        "google"
    }

    async fn verify(&self, token: &str) -> AppResult<Identity> {
        let email = self.client.verify_id_token(token).await?;
        Ok(Identity {
            email: normalize_email(&email),
            provider: self.provider(),
        })
    }
}

/// Essaie chaque vérificateur dans l'ordre; le premier succès l'emporte
#[derive(Clone, Default)]
pub struct VerifierChain {
    verifiers: Vec<Arc<dyn TokenVerifier>>,
}

impl VerifierChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifiers.push(verifier);
        self
    }

    pub async fn verify(&self, token: &str) -> AppResult<Identity> {
        for verifier in &self.verifiers {
            match verifier.verify(token).await {
                Ok(identity) => return Ok(identity),
                Err(e) => debug!(provider = verifier.provider(), error = %e, "Token refusé"),
            }
        }
        Err(unauthorized("Invalid token"))
    }
}

/// Session ouverte après inscription ou connexion
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: UserAccount,
}

pub struct AuthService {
    store: Arc<dyn UserStore>,
    issuer: TokenIssuer,
    verifiers: VerifierChain,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, issuer: TokenIssuer, verifiers: VerifierChain) -> Self {
        Self {
            store,
            issuer,
            verifiers,
        }
    }

    /// Inscription d'un nouvel utilisateur
    pub async fn register(&self, input: NewUser) -> AppResult<AuthSession> {
        input.validate()?;
        let email = normalize_email(&input.email);
        let password_hash = hash_password(&input.password)?;

        let user = match self
            .store
            .register(&email, &password_hash, input.name.trim())
            .await?
        {
            Registration::Created(user) => user,
            Registration::AlreadyRegistered => {
                return Err(AppError::Conflict("Email already registered".to_string()))
            }
        };

        info!(email = %user.email, "👤 Nouvel utilisateur inscrit");
        let token = self.issuer.issue(&user.email)?;
        Ok(AuthSession { token, user })
    }

    /// Authentification email/mot de passe
    pub async fn login(&self, input: UserLogin) -> AppResult<AuthSession> {
        input.validate()?;
        let email = normalize_email(&input.email);

        let user = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or_else(|| unauthorized("Invalid email or password"))?;

        // Les comptes créés par un upload n'ont pas de mot de passe
        let Some(hash) = user.password_hash.as_deref() else {
            return Err(unauthorized("Invalid email or password"));
        };
        if !verify_password(&input.password, hash)? {
            return Err(unauthorized("Invalid email or password"));
        }

        let token = self.issuer.issue(&user.email)?;
        Ok(AuthSession { token, user })
    }

    /// Identité portée par un token, quel que soit le fournisseur
    pub async fn identify(&self, token: &str) -> AppResult<Identity> {
        self.verifiers.verify(token).await
    }

    /// Compte associé à une identité vérifiée
    pub async fn current_user(&self, identity: &Identity) -> AppResult<UserAccount> {
        self.store
            .find_by_email(&identity.email)
            .await?
            .ok_or_else(|| not_found("User"))
    }
}
