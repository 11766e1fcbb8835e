use actix_web::{get, web, HttpResponse};
use serde_json::json;

use super::middleware::AuthenticatedUser;
use crate::{
    api::AppState,
    domain::normalize_email,
    infrastructure::error::{not_found, AppResult},
};

/// Designs de l'appelant authentifié. Un compte sans design (ou pas encore
/// créé) renvoie une liste vide.
#[get("/images/me")]
pub async fn list_my_images(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> AppResult<HttpResponse> {
    let AuthenticatedUser(identity) = user;
    let images = state
        .store
        .list_images(&identity.email)
        .await?
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "images": images,
    })))
}

/// Designs d'un utilisateur, du plus récent au plus ancien
#[get("/images/{email}")]
pub async fn list_user_images(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let email = normalize_email(&path.into_inner());
    let images = state
        .store
        .list_images(&email)
        .await?
        .ok_or_else(|| not_found("User"))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "images": images,
    })))
}

#[cfg(test)]
mod tests {
    use crate::api::{
        config,
        state::testing::{test_state, TEST_SECRET},
    };
    use crate::domain::{ImageMeta, ImageRecord, ModelKind};
    use crate::infrastructure::{ModelRegistry, UserStore};
    use crate::utils::TokenIssuer;
    use actix_web::{http::StatusCode, test, web, App};

    #[actix_web::test]
    async fn test_lists_most_recent_first() {
        let (state, store) = test_state(ModelRegistry::new());
        let older = ImageRecord::new("a@x.com", vec![1], vec![2], ModelKind::Gold, ImageMeta::default());
        let mut newer = ImageRecord::new("a@x.com", vec![3], vec![4], ModelKind::Silver, ImageMeta::default());
        newer.created_at = older.created_at + chrono::Duration::seconds(5);
        store.append_image(&older).await.unwrap();
        store.append_image(&newer).await.unwrap();

        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;
        let req = test::TestRequest::get().uri("/api/images/A@x.com").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        let images = body["images"].as_array().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0]["id"], newer.id.to_string());
        assert_eq!(images[0]["sketch_image"], "Aw==");
        assert_eq!(images[1]["category"], "gold");
    }

    #[actix_web::test]
    async fn test_own_images_require_a_token() {
        let (state, store) = test_state(ModelRegistry::new());
        let mine = ImageRecord::new("ada@x.com", vec![1], vec![2], ModelKind::Gold, ImageMeta::default());
        let theirs = ImageRecord::new("bob@x.com", vec![5], vec![6], ModelKind::Silver, ImageMeta::default());
        store.append_image(&mine).await.unwrap();
        store.append_image(&theirs).await.unwrap();
        let issuer = TokenIssuer::new(TEST_SECRET, chrono::Duration::hours(1));

        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/images/me").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/images/me")
            .insert_header(("Authorization", format!("Bearer {}", issuer.issue("ada@x.com").unwrap())))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let images = body["images"].as_array().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0]["id"], mine.id.to_string());

        let req = test::TestRequest::get()
            .uri("/api/images/me")
            .insert_header(("Authorization", format!("Bearer {}", issuer.issue("new@x.com").unwrap())))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!({ "success": true, "images": [] }));
    }

    #[actix_web::test]
    async fn test_unknown_user_is_not_found() {
        let (state, _store) = test_state(ModelRegistry::new());
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/images/nobody@x.com").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "User not found");
    }
}
