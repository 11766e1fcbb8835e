//! # Upload Routes
//!
//! Réception des croquis et renvoi du rendu généré.
//!
//! ## Endpoints
//! - `POST /api/upload`: rendu or
//! - `POST /api/upload/silver`: rendu argent
//! - `POST /api/upload/gold-gemstone`: rendu or serti
//!
//! ## Corps multipart
//! - `file`: image PNG ou JPEG (obligatoire)
//! - `email` ou `userEmail`: propriétaire du design (obligatoire)
//! - `title`, `description`: métadonnées facultatives
//!
//! La réponse est le PNG généré, avec les en-têtes `X-Record-Id` (si
//! l'archivage est confirmé) et `X-Validation-Outcome`.

use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use futures_util::TryStreamExt;

use crate::{
    api::AppState,
    core::Submission,
    domain::{ImageMeta, ModelKind},
    infrastructure::error::{invalid_input, AppResult},
};

pub const RECORD_ID_HEADER: &str = "X-Record-Id";
pub const VALIDATION_HEADER: &str = "X-Validation-Outcome";

/// Champs lus dans le corps multipart
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    email: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

#[post("/upload")]
pub async fn upload_gold(state: web::Data<AppState>, payload: Multipart) -> AppResult<HttpResponse> {
    handle_upload(&state, payload, ModelKind::Gold).await
}

#[post("/upload/silver")]
pub async fn upload_silver(state: web::Data<AppState>, payload: Multipart) -> AppResult<HttpResponse> {
    handle_upload(&state, payload, ModelKind::Silver).await
}

#[post("/upload/gold-gemstone")]
pub async fn upload_gold_gemstone(
    state: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    handle_upload(&state, payload, ModelKind::GoldGemstone).await
}

async fn handle_upload(state: &AppState, payload: Multipart, kind: ModelKind) -> AppResult<HttpResponse> {
    let form = read_form(payload, state.intake.max_upload_bytes()).await?;

    let image = form.file.ok_or_else(|| invalid_input("No image file provided"))?;
    let email = form
        .email
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| invalid_input("Email is required"))?;

    let outcome = state
        .intake
        .submit(Submission {
            email,
            image,
            kind,
            meta: ImageMeta {
                title: form.title,
                description: form.description,
            },
        })
        .await?;

    let mut response = HttpResponse::Ok();
    response
        .content_type("image/png")
        .insert_header((VALIDATION_HEADER, outcome.validation.as_header()));
    if let Some(record_id) = outcome.record_id {
        response.insert_header((RECORD_ID_HEADER, record_id.to_string()));
    }
    Ok(response.body(outcome.png))
}

/// Lit le corps multipart en coupant la lecture du fichier au-delà de la limite
async fn read_form(mut payload: Multipart, max_file_bytes: usize) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().unwrap_or_default().to_string();

        let limit = if name == "file" { max_file_bytes } else { 64 * 1024 };
        let mut buffer = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if buffer.len() + chunk.len() > limit {
                return Err(invalid_input(format!(
                    "Field '{}' exceeds the maximum size of {} bytes",
                    name, limit
                )));
            }
            buffer.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "file" => form.file = Some(buffer),
            "email" | "userEmail" => form.email = Some(String::from_utf8_lossy(&buffer).into_owned()),
            "title" => form.title = Some(String::from_utf8_lossy(&buffer).into_owned()),
            "description" => form.description = Some(String::from_utf8_lossy(&buffer).into_owned()),
            _ => {}
        }
    }

    Ok(form)
}
