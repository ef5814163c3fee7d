//! # Request Extractors
//!
//! Drop-in replacements for axum's `Json`, `Query` and `Path` whose
//! rejection is an [`AppError`], so a body or parameter that fails to parse
//! still answers with the `{code, message, data}` envelope.
//!
//! ```text
//! POST /api/orders  {"items":[{"medicine_id":"M1","quantity":"three"}]}
//!      │
//!      ▼
//! axum::Json ──► JsonRejection ──► AppError::BadRequest ──► 400 / 4001
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;

/// JSON body.
#[derive(Debug)]
pub struct Json<T>(pub T);

/// Query string.
#[derive(Debug)]
pub struct Query<T>(pub T);

/// Path parameters.
#[derive(Debug)]
pub struct Path<T>(pub T);

fn bad_request(what: &str, message: String) -> AppError {
    debug!(part = what, error = %message, "Rejected request");
    AppError::BadRequest(message)
}

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

impl<S, T> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(Query(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

impl<S, T> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Path(value)),
            Err(rejection) => Err(path_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    bad_request("body", rejection.body_text())
}

fn query_rejection(rejection: QueryRejection) -> AppError {
    bad_request("query", rejection.body_text())
}

fn path_rejection(rejection: PathRejection) -> AppError {
    bad_request("path", rejection.body_text())
}
