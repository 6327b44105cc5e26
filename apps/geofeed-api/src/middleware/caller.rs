//! Caller identity extractor.
//!
//! Credentials are checked by the gateway in front of this service, which
//! forwards the authenticated user id in the `X-User-Id` header.

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use std::future::{Ready, ready};
use uuid::Uuid;

use super::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller. Rejects the request with 401 when absent.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: Uuid,
}

impl Caller {
    fn from_headers(req: &HttpRequest) -> Result<Option<Self>, AppError> {
        let Some(value) = req.headers().get(USER_ID_HEADER) else {
            return Ok(None);
        };

        let user_id = value
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| AppError::Unauthorized("X-User-Id is not a valid UUID".to_string()))?;

        Ok(Some(Self { user_id }))
    }
}

impl FromRequest for Caller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Caller::from_headers(req).and_then(|caller| {
            caller.ok_or_else(|| AppError::Unauthorized("X-User-Id header is required".to_string()))
        }))
    }
}

/// Caller extractor for routes that also serve anonymous viewers.
pub struct OptionalCaller(pub Option<Caller>);

impl FromRequest for OptionalCaller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Caller::from_headers(req).map(OptionalCaller))
    }
}

impl OptionalCaller {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.map(|c| c.user_id)
    }
}
