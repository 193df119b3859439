use serde::Serialize;
use log::{debug, trace, error};
use crate::error::Error;
use crate::response::UpstreamResponse;

// ===== Payload Types =====

/// Body of every inference call: `inputs` plus optional `parameters`
#[derive(Debug, Clone, Serialize)]
pub struct InferencePayload<I, P>
where I: Serialize
    , P: Serialize
{   pub inputs: I
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<P>
}

impl<I: Serialize> InferencePayload<I, ()>
{   /// Payload without parameters
    pub fn inputs(inputs: I) -> Self
    {   InferencePayload
        {   inputs
          , parameters: None
        }
    }
}

// ===== Hugging Face Client =====

/// Thin transport over the hosted inference API.
/// One POST per call; no retries.
#[derive(Clone)]
pub struct HuggingFaceClient
{   api_base: String
  , api_token: String
  , http_client: reqwest::Client
}

impl std::fmt::Debug for HuggingFaceClient
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("HuggingFaceClient")
          .field("api_base", &self.api_base)
          .field("api_token", &"<redacted>")
          .finish()
    }
}

impl HuggingFaceClient
{   pub fn new(
      api_base: impl Into<String>
    , api_token: impl Into<String>
    , timeout: std::time::Duration
    ) -> crate::Result<Self>
    {   debug!("Creating HuggingFaceClient");
        let http_client = reqwest::Client::builder()
          .timeout(timeout)
          .build()
          .map_err(|e| {
            error!("Failed to build HTTP client: {}", e);
            Error::InvalidConfiguration(e.to_string())
          })?;
        Ok(HuggingFaceClient
        {   api_base: api_base.into()
          , api_token: api_token.into()
          , http_client
        })
    }

    /// Endpoint for `model`; the identifier is percent-encoded
    pub fn model_url(&self, model: &str) -> String
    {   format!(
          "{}/models/{}",
          self.api_base,
          urlencoding::encode(model)
        )
    }

    /// POST `payload` to `model` and return the classified body.
    ///
    /// Fails with `UpstreamProtocolError` on a non-JSON body and with
    /// `UpstreamError` on a failure status or an `error` field.
    pub async fn post<T>(
      &self
    , model: &str
    , payload: &T
    ) -> crate::Result<UpstreamResponse>
    where T: Serialize + ?Sized
    {   let url = self.model_url(model);
        debug!("POST {}", url);
        trace!(
          "Payload: {}",
          serde_json::to_string(payload).unwrap_or_default()
        );

        let response = self.http_client
          .post(&url)
          .header("Authorization", format!("Bearer {}", self.api_token))
          .header("Content-Type", "application/json")
          .json(payload)
          .send()
          .await
          .map_err(transport_error)?;

        let status = response.status();
        trace!("Hugging Face response status: {}", status);

        let raw = response.text().await.map_err(transport_error)?;
        let parsed = UpstreamResponse::from_body(&raw);

        // failure status takes precedence over an unreadable body
        if !status.is_success()
        {   let message = match &parsed
            {   Ok(body) => body.error_message()
              , Err(e) => {
                  error!("Unreadable error body: {}", e);
                  None
                }
            }.unwrap_or_else(|| {
              status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
            });
            error!("Hugging Face API error ({}): {}", status, message);
            return Err(Error::UpstreamError
            {   status: Some(status.as_u16())
              , message
            });
        }

        let body = parsed?;
        if let Some(message) = body.error_message()
        {   error!("Hugging Face API error ({}): {}", status, message);
            return Err(Error::UpstreamError
            {   status: Some(status.as_u16())
              , message
            });
        }

        Ok(body)
    }
}

fn transport_error(e: reqwest::Error) -> Error
{   if e.is_timeout()
    {   error!("Upstream request timed out: {}", e);
        Error::Timeout
    } else
    {   error!("HTTP error: {}", e);
        Error::HttpError(e.to_string())
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use std::time::Duration;

    #[test]
    fn model_id_is_percent_encoded()
    {   let client = HuggingFaceClient::new(
          "https://api-inference.huggingface.co",
          "hf_test",
          Duration::from_secs(5)
        ).unwrap();
        assert_eq!(
          client.model_url("facebook/bart-large-cnn"),
          "https://api-inference.huggingface.co/models/facebook%2Fbart-large-cnn"
        );
    }

    #[test]
    fn parameters_are_omitted_when_absent()
    {   let payload = InferencePayload::inputs("hello");
        assert_eq!(
          serde_json::to_value(&payload).unwrap(),
          serde_json::json!({"inputs": "hello"})
        );
    }
}
