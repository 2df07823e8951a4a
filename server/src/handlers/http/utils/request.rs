use anyhow::{Result, anyhow};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::Request;
use serde::de::DeserializeOwned;

/// Largest request body accepted by JSON endpoints
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Why a JSON body was not accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyRejection {
    TooLarge,
    Invalid(String),
}

impl BodyRejection {
    pub fn to_code(&self) -> &'static str {
        match self {
            Self::TooLarge => "PAYLOAD_TOO_LARGE",
            Self::Invalid(_) => "INVALID_JSON",
        }
    }

    pub fn to_message(&self) -> String {
        match self {
            Self::TooLarge => format!("Request body exceeds {} bytes", MAX_BODY_BYTES),
            Self::Invalid(e) => format!("Invalid request body: {}", e),
        }
    }
}

/// Collect and decode a JSON body, reading at most `MAX_BODY_BYTES`.
///
/// The outer error is a transport failure; the inner one is a client mistake
/// the handler should answer with 400. An oversized body is rejected as soon
/// as the limit is crossed, without draining the rest.
pub async fn read_json_body<T, B>(req: Request<B>) -> Result<Result<T, BodyRejection>>
where
    T: DeserializeOwned,
    B: hyper::body::Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let bytes = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Ok(Err(BodyRejection::TooLarge));
        }
        Err(e) => return Err(anyhow!("Failed to read request body: {}", e)),
    };

    Ok(serde_json::from_slice(&bytes).map_err(|e| BodyRejection::Invalid(e.to_string())))
}

/// The `index`-th segment of the request path, `/` separated, ignoring the
/// leading slash: for `/api/products/42`, index 2 is `42`.
pub fn path_segment<B>(req: &Request<B>, index: usize) -> Option<String> {
    req.uri()
        .path()
        .trim_start_matches('/')
        .split('/')
        .nth(index)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
