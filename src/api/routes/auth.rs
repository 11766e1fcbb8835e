use actix_web::{post, web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::AppState,
    domain::{NewUser, UserLogin},
    infrastructure::error::AppResult,
};

/// Enveloppe `{ "data": ... }` des réponses d'authentification
#[derive(Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

#[derive(Serialize)]
pub struct RegisteredUser {
    pub email: String,
    pub id: Uuid,
    pub name: String,
}

#[derive(Serialize)]
pub struct LoggedInUser {
    pub email: String,
    pub id: Uuid,
}

#[derive(Serialize)]
pub struct TokenResponse<U: Serialize> {
    pub token: String,
    pub user: U,
}

/// Endpoint d'inscription
#[post("/auth/register")]
pub async fn register(
    state: web::Data<AppState>,
    new_user: web::Json<NewUser>,
) -> AppResult<HttpResponse> {
    let session = state.auth.register(new_user.into_inner()).await?;

    Ok(HttpResponse::Created().json(DataResponse {
        data: TokenResponse {
            token: session.token,
            user: RegisteredUser {
                email: session.user.email,
                id: session.user.id,
                name: session.user.name,
            },
        },
    }))
}

/// Endpoint de connexion (email/mot de passe)
#[post("/auth/login")]
pub async fn login(
    state: web::Data<AppState>,
    credentials: web::Json<UserLogin>,
) -> AppResult<HttpResponse> {
    let session = state.auth.login(credentials.into_inner()).await?;

    Ok(HttpResponse::Ok().json(DataResponse {
        data: TokenResponse {
            token: session.token,
            user: LoggedInUser {
                email: session.user.email,
                id: session.user.id,
            },
        },
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::{config, state::testing::test_state};
    use crate::infrastructure::ModelRegistry;
    use actix_web::{http::StatusCode, test, web, App};
    use assert_json_diff::assert_json_include;
    use serde_json::json;

    #[actix_web::test]
    async fn test_register_login_and_me() {
        let (state, _store) = test_state(ModelRegistry::new());
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({"email": "Ada@X.com", "password": "hunter22", "name": "Ada"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_json_include!(
            actual: body.clone(),
            expected: json!({"data": {"user": {"email": "ada@x.com", "name": "Ada"}}})
        );
        assert!(body["data"]["user"].get("password_hash").is_none());

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"email": "ada@x.com", "password": "hunter22"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["user"]["email"], "ada@x.com");

        let req = test::TestRequest::get()
            .uri("/api/users/me")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"email": "ada@x.com"}));
    }

    #[actix_web::test]
    async fn test_duplicate_and_bad_credentials() {
        let (state, _store) = test_state(ModelRegistry::new());
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;
        let user = json!({"email": "a@x.com", "password": "hunter22", "name": "A"});

        let req = test::TestRequest::post().uri("/api/auth/register").set_json(&user).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post().uri("/api/auth/register").set_json(&user).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Email already registered");

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"email": "a@x.com", "password": "nope-nope"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }
}
