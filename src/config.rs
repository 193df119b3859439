//! Configuration for the gateway and its task models

use std::time::Duration;
use log::debug;
use serde::{Deserialize, Serialize};
use crate::Task;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_API_BASE: &str
  = "https://api-inference.huggingface.co";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Model identifier per task.
/// Resolved once at startup, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig
{   pub summarization: String
  , pub sentiment: String
  , pub zero_shot: String
  , pub translation: String
  , pub ner: String
  , pub qa: String
  , pub generation: String
  , pub paraphrase: String
}

impl ModelConfig
{   /// Resolve every task model through `lookup`, falling back to
    /// the built-in default when a variable is unset or empty.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String>
    {   let resolve = |task: Task| {
          non_empty(lookup(task.env_var()))
            .unwrap_or_else(|| task.default_model().to_string())
        };
        ModelConfig
        {   summarization: resolve(Task::Summarization)
          , sentiment: resolve(Task::Sentiment)
          , zero_shot: resolve(Task::ZeroShotClassification)
          , translation: resolve(Task::Translation)
          , ner: resolve(Task::NamedEntities)
          , qa: resolve(Task::QuestionAnswering)
          , generation: resolve(Task::Generation)
          , paraphrase: resolve(Task::Paraphrase)
        }
    }

    /// Model identifier configured for `task`
    pub fn model_for(&self, task: Task) -> &str
    {   match task
        {   Task::Summarization => &self.summarization
          , Task::Sentiment => &self.sentiment
          , Task::ZeroShotClassification => &self.zero_shot
          , Task::Translation => &self.translation
          , Task::NamedEntities => &self.ner
          , Task::QuestionAnswering => &self.qa
          , Task::Generation => &self.generation
          , Task::Paraphrase => &self.paraphrase
        }
    }
}

impl Default for ModelConfig
{   fn default() -> Self
    {   ModelConfig::from_lookup(|_| None)
    }
}

/// Process-wide gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig
{   /// Listen port
    pub port: u16
  , /// Bearer token sent to the provider
    #[serde(skip_serializing)]
    pub api_token: String
  , /// Provider base URL, without trailing slash
    pub api_base: String
  , /// Upstream request timeout in seconds
    pub timeout_secs: u64
  , /// Model per task
    pub models: ModelConfig
}

impl GatewayConfig
{   /// Build a configuration with defaults around a token
    pub fn new(api_token: impl Into<String>) -> Self
    {   GatewayConfig
        {   port: DEFAULT_PORT
          , api_token: api_token.into()
          , api_base: DEFAULT_API_BASE.to_string()
          , timeout_secs: DEFAULT_TIMEOUT_SECS
          , models: ModelConfig::default()
        }
    }

    /// Load from the process environment
    pub fn from_env() -> crate::Result<Self>
    {   GatewayConfig::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where F: Fn(&str) -> Option<String>
    {   let api_token = non_empty(lookup("HF_API_TOKEN"))
          .ok_or_else(|| {
            crate::error::Error::MissingApiKey(
              "HF_API_TOKEN".to_string()
            )
          })?;

        let port = parse_var(&lookup, "PORT", DEFAULT_PORT)?;
        let timeout_secs = parse_var(
          &lookup, "HF_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS
        )?;
        if timeout_secs == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "HF_TIMEOUT_SECS must be positive".to_string()
            ));
        }

        let api_base = non_empty(lookup("HF_API_BASE"))
          .map(|base| base.trim_end_matches('/').to_string())
          .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let models = ModelConfig::from_lookup(&lookup);
        debug!("Resolved models: {:?}", models);

        Ok(GatewayConfig
        {   port
          , api_token
          , api_base
          , timeout_secs
          , models
        })
    }

    pub fn timeout(&self) -> Duration
    {   Duration::from_secs(self.timeout_secs)
    }
}

fn non_empty(value: Option<String>) -> Option<String>
{   value
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty())
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T)
  -> crate::Result<T>
where F: Fn(&str) -> Option<String>
    , T: std::str::FromStr
{   match non_empty(lookup(key))
    {   None => Ok(default)
      , Some(raw) => raw.parse().map_err(|_| {
          crate::error::Error::InvalidConfiguration(
            format!("{} is not valid: {}", key, raw)
          )
        })
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)])
      -> impl Fn(&str) -> Option<String>
    {   let vars: HashMap<String, String> = pairs
          .iter()
          .map(|(k, v)| (k.to_string(), v.to_string()))
          .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn token_is_required()
    {   let err = GatewayConfig::from_lookup(lookup_from(&[]))
          .unwrap_err();
        assert_eq!(
          err,
          crate::Error::MissingApiKey("HF_API_TOKEN".into())
        );

        let blank = GatewayConfig::from_lookup(
          lookup_from(&[("HF_API_TOKEN", "  ")])
        );
        assert!(blank.is_err());
    }

    #[test]
    fn defaults_apply_without_overrides()
    {   let config = GatewayConfig::from_lookup(
          lookup_from(&[("HF_API_TOKEN", "hf_abc")])
        ).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(
          config.models.model_for(Task::Summarization),
          "facebook/bart-large-cnn"
        );
        assert_eq!(config.models.model_for(Task::Generation), "gpt2");
    }

    #[test]
    fn overrides_win()
    {   let config = GatewayConfig::from_lookup(lookup_from(&[
          ("HF_API_TOKEN", "hf_abc")
        , ("PORT", "8080")
        , ("HF_API_BASE", "http://localhost:9000/")
        , ("HF_MODEL_ZS_CLASSIFY", "my/classifier")
        , ("HF_MODEL_NER", "")
        ])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_base, "http://localhost:9000");
        assert_eq!(
          config.models.model_for(Task::ZeroShotClassification),
          "my/classifier"
        );
        assert_eq!(
          config.models.model_for(Task::NamedEntities),
          "dslim/bert-base-NER"
        );
    }

    #[test]
    fn bad_port_is_rejected()
    {   let result = GatewayConfig::from_lookup(lookup_from(&[
          ("HF_API_TOKEN", "hf_abc")
        , ("PORT", "not-a-port")
        ]));
        assert!(matches!(
          result,
          Err(crate::Error::InvalidConfiguration(_))
        ));
    }
}
