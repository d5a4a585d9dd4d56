use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::api::errors::ApiError;
use crate::services::text::{non_blank, truncate_chars};

pub(crate) const MIN_PROMPT_INPUT_CHARS: usize = 10;
pub(crate) const MAX_RESOURCE_TEXT_CHARS: usize = 100_000;

/// `Json` whose rejections use the API error body (always 400).
pub(crate) struct JsonBody<T>(pub(crate) T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Like [`JsonBody`] but an empty body is `None`. A non-empty body must still parse.
pub(crate) struct OptionalJsonBody<T>(pub(crate) Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(None));
        }
        let Json(value) = Json::<T>::from_bytes(&bytes)
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(Some(value)))
    }
}

pub(crate) fn validation_error(errors: validator::ValidationErrors) -> ApiError {
    ApiError::BadRequest(errors.to_string())
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn require_text(value: Option<&str>, field: &str) -> Result<String, ApiError> {
    non_blank(value).ok_or_else(|| ApiError::BadRequest(format!("{field} is required")))
}

/// Trimmed free-form input for AI prompts: at least `MIN_PROMPT_INPUT_CHARS`, cut to `max_chars`.
pub(crate) fn prompt_input(value: &str, max_chars: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.chars().count() < MIN_PROMPT_INPUT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Input must be at least {MIN_PROMPT_INPUT_CHARS} characters"
        )));
    }
    Ok(truncate_chars(trimmed, max_chars).to_string())
}

pub(crate) fn validate_http_url(value: &str) -> Result<(), ApiError> {
    let parsed = reqwest::Url::parse(value.trim())
        .map_err(|_| ApiError::BadRequest("content_ref must be a valid URL".to_string()))?;
    if matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some() {
        Ok(())
    } else {
        Err(ApiError::BadRequest("content_ref must be an http(s) URL".to_string()))
    }
}

/// Trims tags, drops blanks and case-insensitive duplicates.
pub(crate) fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|known| known.eq_ignore_ascii_case(tag)) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_input_enforces_minimum_and_truncates() {
        assert!(prompt_input("  short  ", 100).is_err());
        assert_eq!(prompt_input("  long enough input  ", 8).unwrap(), "long eno");
    }

    #[test]
    fn only_http_urls_are_accepted() {
        assert!(validate_http_url("https://example.com/doc.pdf").is_ok());
        assert!(validate_http_url("ftp://example.com/doc.pdf").is_err());
        assert!(validate_http_url("not a url").is_err());
    }

    #[test]
    fn tags_are_cleaned() {
        let tags = vec![" rust ".into(), "".into(), "Rust".into(), "axum".into()];
        assert_eq!(clean_tags(tags), vec!["rust", "axum"]);
    }

    #[test]
    fn require_text_rejects_blank() {
        assert!(require_text(Some("  "), "topic").is_err());
        assert_eq!(require_text(Some(" x "), "topic").unwrap(), "x");
    }

    #[tokio::test]
    async fn optional_body_allows_empty_but_rejects_malformed() {
        #[derive(Debug, serde::Deserialize)]
        struct Payload {
            body_text: Option<String>,
        }

        let request = |body: &'static str| {
            axum::http::Request::builder()
                .method("POST")
                .uri("/")
                .body(axum::body::Body::from(body))
                .unwrap()
        };

        let OptionalJsonBody(empty) =
            OptionalJsonBody::<Payload>::from_request(request(""), &()).await.unwrap();
        assert!(empty.is_none());

        let OptionalJsonBody(parsed) =
            OptionalJsonBody::<Payload>::from_request(request(r#"{"body_text": "hi"}"#), &())
                .await
                .unwrap();
        assert_eq!(parsed.and_then(|payload| payload.body_text).as_deref(), Some("hi"));

        let malformed = OptionalJsonBody::<Payload>::from_request(request("{oops"), &()).await;
        assert!(matches!(malformed, Err(ApiError::BadRequest(_))));
    }
}
