pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod response;
pub mod client;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use log::info;

/*

nlp-gateway: a thin HTTP front for the Hugging Face hosted inference API.
Each task below gets one POST endpoint; a request is validated, turned into
the provider payload, forwarded exactly once, and the interesting part of the
provider's answer is relayed back.

nlp-gateway/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Task enum, re-exports, serve()
│   ├── main.rs         # process entry
│   ├── error.rs        # error kinds and the public status mapping
│   ├── config.rs       # model table + environment loading
│   ├── request.rs      # validated task requests
│   ├── response.rs     # provider response shapes and extraction
│   ├── client.rs       # per-task payloads over the provider
│   ├── routes.rs       # axum router
│   └── providers/
│       ├── mod.rs
│       └── huggingface.rs
└── tests/

*/

pub use client::InferenceClient;
pub use config::{GatewayConfig, ModelConfig};
pub use error::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// The NLP operations exposed by the gateway.
/// Each variant maps to one endpoint and one configured model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task
{   /// Abstractive summarization
    Summarization
  , /// Sentiment analysis
    Sentiment
  , /// Zero-shot classification against caller labels
    ZeroShotClassification
  , /// Machine translation
    Translation
  , /// Named-entity recognition
    NamedEntities
  , /// Extractive question answering
    QuestionAnswering
  , /// Free text generation
    Generation
  , /// Paraphrasing via a text2text model
    Paraphrase
}

impl Task
{   pub const ALL: [Task; 8] = [
      Task::Summarization
    , Task::Sentiment
    , Task::ZeroShotClassification
    , Task::Translation
    , Task::NamedEntities
    , Task::QuestionAnswering
    , Task::Generation
    , Task::Paraphrase
    ];

    /// Endpoint path serving this task
    pub fn path(&self) -> &'static str
    {   match self
        {   Task::Summarization => "/summarize"
          , Task::Sentiment => "/sentiment"
          , Task::ZeroShotClassification => "/classify"
          , Task::Translation => "/translate"
          , Task::NamedEntities => "/ner"
          , Task::QuestionAnswering => "/qa"
          , Task::Generation => "/generate"
          , Task::Paraphrase => "/paraphrase"
        }
    }

    /// Environment variable overriding the model for this task
    pub fn env_var(&self) -> &'static str
    {   match self
        {   Task::Summarization => "HF_MODEL_SUMMARIZATION"
          , Task::Sentiment => "HF_MODEL_SENTIMENT"
          , Task::ZeroShotClassification => "HF_MODEL_ZS_CLASSIFY"
          , Task::Translation => "HF_MODEL_TRANSLATION"
          , Task::NamedEntities => "HF_MODEL_NER"
          , Task::QuestionAnswering => "HF_MODEL_QA"
          , Task::Generation => "HF_MODEL_GENERATION"
          , Task::Paraphrase => "HF_MODEL_PARAPHRASE"
        }
    }

    /// Public model used when no override is configured
    pub fn default_model(&self) -> &'static str
    {   match self
        {   Task::Summarization => "facebook/bart-large-cnn"
          , Task::Sentiment
              => "distilbert-base-uncased-finetuned-sst-2-english"
          , Task::ZeroShotClassification => "facebook/bart-large-mnli"
          , Task::Translation => "Helsinki-NLP/opus-mt-en-ROMANCE"
          , Task::NamedEntities => "dslim/bert-base-NER"
          , Task::QuestionAnswering => "deepset/roberta-base-squad2"
          , Task::Generation => "gpt2"
          , Task::Paraphrase => "Vamsi/T5_Paraphrase_Paws"
        }
    }
}

impl std::fmt::Display for Task
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   let name = match self
        {   Task::Summarization => "summarization"
          , Task::Sentiment => "sentiment"
          , Task::ZeroShotClassification => "zero-shot classification"
          , Task::Translation => "translation"
          , Task::NamedEntities => "ner"
          , Task::QuestionAnswering => "question answering"
          , Task::Generation => "generation"
          , Task::Paraphrase => "paraphrase"
        };
        f.write_str(name)
    }
}

/// Build the inference client and run the HTTP server until it stops.
pub async fn serve(config: GatewayConfig) -> Result<()>
{   let client = Arc::new(InferenceClient::new(&config)?);
    let app = routes::app(client);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .map_err(|e| {
        Error::InvalidConfiguration(
          format!("cannot bind {}: {}", addr, e)
        )
      })?;

    info!("Server running at http://127.0.0.1:{}", config.port);
    axum::serve(listener, app)
      .await
      .map_err(|e| Error::Other(e.to_string()))
}
