use std::fmt;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{debug, error};

pub const AUTH_FAILURE_MESSAGE: &str
  = "Invalid or missing Hugging Face token.";
pub const UNAVAILABLE_MESSAGE: &str
  = "Model is loading. Try again shortly.";
pub const INTERNAL_MESSAGE: &str = "Internal Server Error";

/// Every failure the gateway can produce.
/// The variant is the error kind; `status_code` maps it to HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Request body failed validation; carries the public message
    InvalidInput(String)
  , /// Request body could not be read (too large, aborted)
    RequestRejected
    {   status: u16
      , message: String
    }
  , /// Provider rejected the bearer token
    AuthFailure
  , /// Model is cold or loading on the provider side
    UpstreamUnavailable
  , /// Provider answered with a failure status or an `error` field
    UpstreamError
    {   status: Option<u16>
      , message: String
    }
  , /// Provider body was not JSON, or not a shape we understand
    UpstreamProtocolError
    {   snippet: String
    }
  , /// Provider succeeded but the expected field was absent or empty
    UpstreamEmptyResult(crate::Task)
  , /// Transport level failure talking to the provider
    HttpError(String)
  , /// Upstream call exceeded the configured timeout
    Timeout
  , /// API token is missing from configuration
    MissingApiKey(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Generic error
    Other(String)
}

impl Error
{   /// Re-classify a provider failure once, at the router boundary.
    ///
    /// 401 becomes `AuthFailure`; 503, a loading message, or a timeout
    /// becomes `UpstreamUnavailable`. Everything else is returned as is.
    pub fn reclassify(self) -> Self
    {   match self
        {   Error::UpstreamError { status: Some(401), .. } => {
              Error::AuthFailure
            }
          , Error::UpstreamError { status: Some(503), .. } => {
              Error::UpstreamUnavailable
            }
          , Error::UpstreamError { ref message, .. }
              if mentions_loading(message) => {
              Error::UpstreamUnavailable
            }
          , Error::Timeout => Error::UpstreamUnavailable
          , other => other
        }
    }

    /// HTTP status for this error kind
    pub fn status_code(&self) -> StatusCode
    {   match self
        {   Error::InvalidInput(_) => StatusCode::BAD_REQUEST
          , Error::RequestRejected { status, .. } => {
              StatusCode::from_u16(*status)
                .unwrap_or(StatusCode::BAD_REQUEST)
            }
          , Error::AuthFailure => StatusCode::UNAUTHORIZED
          , Error::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE
          , Error::UpstreamError { .. }
          | Error::UpstreamProtocolError { .. }
          | Error::UpstreamEmptyResult(_)
          | Error::HttpError(_)
          | Error::Timeout
          | Error::MissingApiKey(_)
          | Error::InvalidConfiguration(_)
          | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Message safe to return to the caller.
    /// Never includes upstream text or raw bodies.
    pub fn public_message(&self) -> String
    {   match self
        {   Error::InvalidInput(msg) => msg.clone()
          , Error::RequestRejected { message, .. } => message.clone()
          , Error::AuthFailure => AUTH_FAILURE_MESSAGE.to_string()
          , Error::UpstreamUnavailable => UNAVAILABLE_MESSAGE.to_string()
          , _ => INTERNAL_MESSAGE.to_string()
        }
    }
}

fn mentions_loading(message: &str) -> bool
{   let message = message.to_ascii_lowercase();
    message.contains("loading")
      || message.contains("currently unavailable")
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::InvalidInput(msg) => {
              write!(f, "Invalid input: {}", msg)
            }
          , Error::RequestRejected { status, message } => {
              write!(f, "Request rejected ({}): {}", status, message)
            }
          , Error::AuthFailure => {
              write!(f, "Upstream rejected the API token")
            }
          , Error::UpstreamUnavailable => {
              write!(f, "Upstream model is loading or unavailable")
            }
          , Error::UpstreamError { status: Some(status), message } => {
              write!(f, "Upstream error ({}): {}", status, message)
            }
          , Error::UpstreamError { status: None, message } => {
              write!(f, "Upstream error: {}", message)
            }
          , Error::UpstreamProtocolError { snippet } => {
              write!(f,
                "Invalid JSON from Hugging Face: {}",
                snippet
              )
            }
          , Error::UpstreamEmptyResult(task) => {
              write!(f, "No {} result generated", task)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::MissingApiKey(var) => {
              write!(f, "Missing API key: set {}", var)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error
{   fn into_response(self) -> Response
    {   let status = self.status_code();
        if status.is_server_error()
        {   error!("Internal error: {}", self);
        } else
        {   debug!("Request rejected ({}): {}", status, self);
        }
        let body = crate::request::ErrorBody
        {   error: self.public_message()
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn upstream_401_becomes_auth_failure()
    {   let err = Error::UpstreamError
        {   status: Some(401)
          , message: "Authorization header is correct, but the token seems invalid".into()
        };
        assert_eq!(err.reclassify(), Error::AuthFailure);
    }

    #[test]
    fn loading_message_becomes_unavailable()
    {   let err = Error::UpstreamError
        {   status: Some(500)
          , message: "Model gpt2 is currently loading".into()
        };
        assert_eq!(err.reclassify(), Error::UpstreamUnavailable);
        assert_eq!(Error::Timeout.reclassify(), Error::UpstreamUnavailable);
    }

    #[test]
    fn other_upstream_failures_stay_internal()
    {   let err = Error::UpstreamError
        {   status: Some(400)
          , message: "secret upstream detail".into()
        }.reclassify();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), INTERNAL_MESSAGE);
    }

    #[test]
    fn invalid_input_echoes_its_message()
    {   let err = Error::InvalidInput("Missing field 'text'.".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Missing field 'text'.");
    }
}
