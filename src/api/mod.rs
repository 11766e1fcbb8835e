pub mod routes;
pub mod state;

pub use state::AppState;

use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use tracing::debug;

use crate::infrastructure::error::invalid_input;

/// Configure toutes les routes de l'API
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(json_error))
            // Génération
            .service(routes::upload::upload_gold)
            .service(routes::upload::upload_silver)
            .service(routes::upload::upload_gold_gemstone)
            // `/images/me` avant `/images/{email}`
            .service(routes::images::list_my_images)
            .service(routes::images::list_user_images)
            // Authentification
            .service(routes::auth::register)
            .service(routes::auth::login)
            .service(routes::users::me),
    );

    // Endpoint de santé
    cfg.service(web::resource("/health").route(web::get().to(health_check)));
}

/// Corps JSON illisible ou incomplet: erreur 400 au format de l'API
fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!(path = req.path(), error = %err, "Corps JSON rejeté");
    invalid_input("Request body must be valid JSON with all required fields").into()
}

/// Endpoint de santé pour monitoring
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let models: Vec<&str> = state
        .intake
        .registry()
        .loaded_kinds()
        .iter()
        .map(|kind| kind.tag())
        .collect();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "models": models,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": state.config.run_mode,
    }))
}
