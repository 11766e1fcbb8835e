//! # Authentification des requêtes
//!
//! `AuthenticatedUser` lit l'en-tête `Authorization: Bearer <token>` et le
//! fait vérifier par la chaîne de vérificateurs de l'`AuthService` (token
//! signé par ce backend, puis ID token Google si configuré).

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;

use crate::{
    api::AppState,
    domain::Identity,
    infrastructure::error::{unauthorized, AppError},
};

/// Identité de l'appelant, extraite du token porteur
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

/// Extrait le token de l'en-tête `Authorization`
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token.ok_or_else(|| unauthorized("Missing or invalid Authorization header"))?;
            let state = state
                .ok_or_else(|| AppError::Internal("Application state is not configured".to_string()))?;
            let identity = state.auth.identify(&token).await?;
            Ok(AuthenticatedUser(identity))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_bearer_token_parsing() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer abc.def"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def"));

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);

        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer "))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);

        assert_eq!(bearer_token(&TestRequest::default().to_http_request()), None);
    }
}
