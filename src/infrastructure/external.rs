// infrastructure/external.rs
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::infrastructure::error::{unauthorized, AppError, AppResult};

/// Échec d'un appel unique au service de légende
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptionAttemptError {
    #[error("rate limit exceeded")]
    RateLimited,

    #[error("caption service returned status {0}")]
    Status(u16),

    #[error("caption service unreachable: {0}")]
    Transport(String),

    #[error("malformed caption response: {0}")]
    Malformed(String),
}

/// Service qui décrit une image en une phrase
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image: &[u8]) -> Result<String, CaptionAttemptError>;
}

/// Client HTTP de l'API de légende
pub struct HttpCaptioner {
    http_client: HttpClient,
    url: String,
    token: Option<String>,
}

impl HttpCaptioner {
    pub fn new(url: String, token: Option<String>, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url,
            token,
        })
    }
}

#[async_trait]
impl Captioner for HttpCaptioner {
    async fn caption(&self, image: &[u8]) -> Result<String, CaptionAttemptError> {
        let mut request = self
            .http_client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CaptionAttemptError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(CaptionAttemptError::RateLimited),
            status => return Err(CaptionAttemptError::Status(status.as_u16())),
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CaptionAttemptError::Malformed(e.to_string()))?;
        extract_caption(&body)
            .ok_or_else(|| CaptionAttemptError::Malformed("no caption field in response".to_string()))
    }
}

/// Accepte `[{"generated_text"}]`, `{"generated_text"}` ou `{"caption"}`
fn extract_caption(body: &Value) -> Option<String> {
    let object = match body {
        Value::Array(items) => items.first()?,
        other => other,
    };
    object
        .get("generated_text")
        .or_else(|| object.get("caption"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Réponse de l'endpoint tokeninfo (les nombres y sont des chaînes)
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenInfo {
    pub aud: String,
    pub iss: String,
    pub exp: String,
    pub email: Option<String>,
    pub email_verified: Option<String>,
    pub name: Option<String>,
}

/// Client de vérification des ID tokens Google
#[derive(Clone)]
pub struct GoogleIdentityClient {
    http_client: HttpClient,
    tokeninfo_url: String,
    client_id: String,
}

impl GoogleIdentityClient {
    pub fn new(tokeninfo_url: String, client_id: String) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            tokeninfo_url,
            client_id,
        })
    }

    /// Vérifier un token Google et renvoyer l'email associé
    pub async fn verify_id_token(&self, token: &str) -> AppResult<String> {
        let response = self
            .http_client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", token)])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Google tokeninfo unreachable: {}", e)))?;

        if response.status() != StatusCode::OK {
            return Err(unauthorized("Invalid token"));
        }

        let info: GoogleTokenInfo = response
            .json()
            .await
            .map_err(|_| unauthorized("Invalid token"))?;

        // Vérifier l'audience et l'émetteur
        if info.aud != self.client_id || !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
            return Err(unauthorized("Invalid token"));
        }

        // Vérifier l'expiration
        let exp: i64 = info.exp.parse().map_err(|_| unauthorized("Invalid token"))?;
        if exp < chrono::Utc::now().timestamp() {
            return Err(unauthorized("Token expired"));
        }

        if info.email_verified.as_deref() == Some("false") {
            return Err(unauthorized("Email not verified"));
        }
        info.email.ok_or_else(|| unauthorized("Token carries no email"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn captioner(server: &MockServer, token: Option<&str>) -> HttpCaptioner {
        HttpCaptioner::new(
            format!("{}/caption", server.uri()),
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_extract_caption_shapes() {
        assert_eq!(
            extract_caption(&json!([{"generated_text": "a ring"}])).as_deref(),
            Some("a ring")
        );
        assert_eq!(
            extract_caption(&json!({"caption": "a chain"})).as_deref(),
            Some("a chain")
        );
        assert_eq!(extract_caption(&json!([])), None);
        assert_eq!(extract_caption(&json!({"label": "x"})), None);
    }

    #[tokio::test]
    async fn test_caption_success_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/caption"))
            .and(header("authorization", "Bearer hf_token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "a gold ring"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let caption = captioner(&server, Some("hf_token")).caption(b"bytes").await.unwrap();
        assert_eq!(caption, "a gold ring");
    }

    #[tokio::test]
    async fn test_caption_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = captioner(&server, None);
        assert_eq!(client.caption(b"x").await, Err(CaptionAttemptError::RateLimited));
        assert_eq!(client.caption(b"x").await, Err(CaptionAttemptError::Status(503)));
    }

    #[tokio::test]
    async fn test_google_token_checks() {
        let server = MockServer::start().await;
        let future_exp = (chrono::Utc::now().timestamp() + 3600).to_string();
        Mock::given(method("GET"))
            .and(path("/tokeninfo"))
            .and(query_param("id_token", "good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "aud": "client-123",
                "iss": "https://accounts.google.com",
                "exp": future_exp,
                "email": "ada@gmail.com",
                "email_verified": "true"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tokeninfo"))
            .and(query_param("id_token", "other-app"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "aud": "someone-else",
                "iss": "accounts.google.com",
                "exp": future_exp,
                "email": "eve@gmail.com"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tokeninfo"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let client =
            GoogleIdentityClient::new(format!("{}/tokeninfo", server.uri()), "client-123".into())
                .unwrap();
        assert_eq!(client.verify_id_token("good").await.unwrap(), "ada@gmail.com");
        assert!(matches!(
            client.verify_id_token("other-app").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            client.verify_id_token("garbage").await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
