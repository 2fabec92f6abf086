//! Request extractors shared by the OAuth handlers.

use axum::{
    Form, Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::{HeaderMap, header, request::Parts},
};
use serde::de::DeserializeOwned;

use crate::error::AuthError;
use crate::oauth::client_auth::parse_basic_auth;

/// Body parsed as JSON when `Content-Type` is `application/json`, and as
/// `application/x-www-form-urlencoded` otherwise.
#[derive(Debug, Clone)]
pub struct FormOrJson<T>(pub T);

impl<T, S> FromRequest<S> for FormOrJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_json(req.headers()) {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| AuthError::invalid_request(e.body_text()))?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AuthError::invalid_request(e.body_text()))?;
            Ok(Self(value))
        }
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

/// Client id and secret from an `Authorization: Basic` header, if present.
#[derive(Debug, Clone, Default)]
pub struct BasicCredentials(pub Option<(String, String)>);

impl<S> FromRequestParts<S> for BasicCredentials
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .filter(|v| v.starts_with("Basic "))
        else {
            return Ok(Self(None));
        };

        parse_basic_auth(value)
            .map(|pair| Self(Some(pair)))
            .ok_or_else(|| AuthError::invalid_client("Malformed Basic credentials"))
    }
}

/// Token from an `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| Self(t.to_string()))
            .ok_or_else(|| AuthError::verification("Missing Bearer token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Params {
        token: String,
    }

    async fn parse(content_type: &str, body: &'static str) -> Result<Params, AuthError> {
        let req = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        FormOrJson::<Params>::from_request(req, &()).await.map(|f| f.0)
    }

    #[tokio::test]
    async fn test_form_or_json() {
        let form = parse("application/x-www-form-urlencoded", "token=a%2Bb").await.unwrap();
        assert_eq!(form.token, "a+b");

        let json = parse("application/json; charset=utf-8", r#"{"token":"x"}"#)
            .await
            .unwrap();
        assert_eq!(json.token, "x");

        let err = parse("application/json", "not json").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest { .. }));
    }

    async fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder();
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_bearer_token() {
        let mut p = parts(Some("Bearer abc.def")).await;
        let BearerToken(token) = BearerToken::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(token, "abc.def");

        let mut p = parts(None).await;
        let err = BearerToken::from_request_parts(&mut p, &()).await.unwrap_err();
        assert!(matches!(err, AuthError::VerificationError { .. }));
    }

    #[tokio::test]
    async fn test_basic_credentials() {
        // "spa:s3cret"
        let mut p = parts(Some("Basic c3BhOnMzY3JldA==")).await;
        let BasicCredentials(pair) = BasicCredentials::from_request_parts(&mut p, &())
            .await
            .unwrap();
        assert_eq!(pair, Some(("spa".to_string(), "s3cret".to_string())));

        let mut p = parts(Some("Bearer x")).await;
        let BasicCredentials(pair) = BasicCredentials::from_request_parts(&mut p, &())
            .await
            .unwrap();
        assert!(pair.is_none());

        let mut p = parts(Some("Basic !!!")).await;
        assert!(BasicCredentials::from_request_parts(&mut p, &()).await.is_err());
    }
}
