use actix_web::{get, web, HttpResponse};
use serde_json::json;

use super::middleware::AuthenticatedUser;
use crate::{api::AppState, infrastructure::error::AppResult};

/// Profil de l'appelant
#[get("/users/me")]
pub async fn me(state: web::Data<AppState>, user: AuthenticatedUser) -> AppResult<HttpResponse> {
    let AuthenticatedUser(identity) = user;
    let account = state.auth.current_user(&identity).await?;

    Ok(HttpResponse::Ok().json(json!({ "email": account.email })))
}
