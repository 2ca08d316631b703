use std::str::FromStr;

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use stagecraft_core::{DomainError, DomainResult};

use crate::app::errors::ApiError;
use crate::context::RequestId;

// -------------------------
// Request bodies
// -------------------------

/// JSON body whose rejections come back as `VALIDATION_FAILED` in the envelope.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(|| RequestId::from_header(None));

        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::new(
                DomainError::validation("malformed request body")
                    .with_detail("reason", rejection.body_text()),
                &request_id,
            )),
        }
    }
}

// -------------------------
// Query strings
// -------------------------
//
// Values arrive as strings and are parsed with the domain `FromStr` impls so a
// bad value is a `VALIDATION_FAILED` rather than a bare 400.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsQuery {
    pub status: Option<String>,
    pub office_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamsQuery {
    pub office_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipsQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "type")]
    pub report_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEventsQuery {
    pub entity_id: Option<String>,
    pub event_type: Option<String>,
    pub limit: Option<String>,
}

/// Parse an optional, possibly blank, query value.
pub fn parse_opt<T>(value: Option<&str>) -> DomainResult<Option<T>>
where
    T: FromStr<Err = DomainError>,
{
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::parse)
        .transpose()
}

pub fn required<T>(field: &str, value: Option<&str>) -> DomainResult<T>
where
    T: FromStr<Err = DomainError>,
{
    parse_opt(value)?.ok_or_else(|| {
        DomainError::validation(format!("{field} is required")).with_detail("field", field)
    })
}

pub fn parse_limit(value: Option<&str>) -> DomainResult<Option<usize>> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<usize>().map_err(|_| {
                DomainError::validation("limit must be a positive integer").with_detail("limit", v)
            })
        })
        .transpose()
}
