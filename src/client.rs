use serde::Serialize;
use serde_json::{Map, Value};
use log::debug;
use crate::config::{GatewayConfig, ModelConfig};
use crate::error::Error;
use crate::providers::huggingface::{HuggingFaceClient, InferencePayload};
use crate::request::{Params, TaskRequest};
use crate::Task;

pub const PARAPHRASE_PREFIX: &str = "paraphrase: ";
pub const GENERATION_MAX_LENGTH: u64 = 200;
pub const PARAPHRASE_MAX_LENGTH: u64 = 128;
pub const PARAPHRASE_TEMPERATURE: f64 = 0.7;

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyParameters<'a>
{   pub candidate_labels: &'a [String]
  , pub multi_label: bool
}

#[derive(Debug, Clone, Serialize)]
pub struct QaInputs<'a>
{   pub context: &'a str
  , pub question: &'a str
}

#[derive(Debug, Clone, Serialize)]
pub struct ParaphraseParameters
{   pub max_length: u64
  , pub temperature: f64
}

/// Normalized result of one task, ready for the response body
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput
{   Summary(String)
  , Sentiment(Value)
  , Classification(Value)
  , Translation(String)
  , Entities(Value)
  , Answer(Value)
  , Generated(String)
  , Paraphrase(Value)
}

impl TaskOutput
{   /// Key under which the result is returned to the caller
    pub fn response_key(&self) -> &'static str
    {   match self
        {   TaskOutput::Summary(_) => "summary"
          , TaskOutput::Sentiment(_) => "result"
          , TaskOutput::Classification(_) => "result"
          , TaskOutput::Translation(_) => "translation"
          , TaskOutput::Entities(_) => "entities"
          , TaskOutput::Answer(_) => "result"
          , TaskOutput::Generated(_) => "output"
          , TaskOutput::Paraphrase(_) => "output"
        }
    }

    pub fn into_body(self) -> Value
    {   let key = self.response_key();
        let value = match self
        {   TaskOutput::Summary(text)
          | TaskOutput::Translation(text)
          | TaskOutput::Generated(text) => Value::String(text)
          , TaskOutput::Sentiment(v)
          | TaskOutput::Classification(v)
          | TaskOutput::Entities(v)
          | TaskOutput::Answer(v)
          | TaskOutput::Paraphrase(v) => v
        };
        let mut body = Map::new();
        body.insert(key.to_string(), value);
        Value::Object(body)
    }
}

/// Per-task calls over the provider.
/// Holds the immutable model table; safe to share across requests.
#[derive(Debug, Clone)]
pub struct InferenceClient
{   models: ModelConfig
  , provider: HuggingFaceClient
}

impl InferenceClient
{   pub fn new(config: &GatewayConfig) -> crate::Result<Self>
    {   debug!("Creating InferenceClient");
        let provider = HuggingFaceClient::new(
          config.api_base.clone()
        , config.api_token.clone()
        , config.timeout()
        )?;
        Ok(InferenceClient
        {   models: config.models.clone()
          , provider
        })
    }

    pub fn models(&self) -> &ModelConfig
    {   &self.models
    }

    /// Run a validated request; exactly one upstream call
    pub async fn run(&self, request: &TaskRequest)
      -> crate::Result<TaskOutput>
    {   match request
        {   TaskRequest::Summarize { text } => {
              self.summarize(text).await.map(TaskOutput::Summary)
            }
          , TaskRequest::Sentiment { text } => {
              self.sentiment(text).await.map(TaskOutput::Sentiment)
            }
          , TaskRequest::Classify { text, labels, multi_label } => {
              self.zero_shot_classify(text, labels, *multi_label)
                .await
                .map(TaskOutput::Classification)
            }
          , TaskRequest::Translate { text } => {
              self.translate(text).await.map(TaskOutput::Translation)
            }
          , TaskRequest::Ner { text } => {
              self.named_entities(text).await.map(TaskOutput::Entities)
            }
          , TaskRequest::Qa { context, question } => {
              self.answer_question(context, question)
                .await
                .map(TaskOutput::Answer)
            }
          , TaskRequest::Generate { prompt, params } => {
              self.generate(prompt, params)
                .await
                .map(TaskOutput::Generated)
            }
          , TaskRequest::Paraphrase { text } => {
              self.paraphrase(text).await.map(TaskOutput::Paraphrase)
            }
        }
    }

    pub async fn summarize(&self, text: &str) -> crate::Result<String>
    {   self.call(Task::Summarization, &InferencePayload::inputs(text))
          .await?
          .first_text("summary_text")
          .ok_or_else(|| empty(Task::Summarization))
    }

    pub async fn sentiment(&self, text: &str) -> crate::Result<Value>
    {   let body = self
          .call(Task::Sentiment, &InferencePayload::inputs(text))
          .await?;
        Ok(body.unnested())
    }

    pub async fn zero_shot_classify(
      &self
    , text: &str
    , labels: &[String]
    , multi_label: bool
    ) -> crate::Result<Value>
    {   let payload = InferencePayload
        {   inputs: text
          , parameters: Some(ClassifyParameters
            {   candidate_labels: labels
              , multi_label
            })
        };
        let body = self
          .call(Task::ZeroShotClassification, &payload)
          .await?;
        Ok(body.into_value())
    }

    pub async fn translate(&self, text: &str) -> crate::Result<String>
    {   self.call(Task::Translation, &InferencePayload::inputs(text))
          .await?
          .first_text("translation_text")
          .ok_or_else(|| empty(Task::Translation))
    }

    pub async fn named_entities(&self, text: &str)
      -> crate::Result<Value>
    {   let body = self
          .call(Task::NamedEntities, &InferencePayload::inputs(text))
          .await?;
        Ok(body.unnested())
    }

    pub async fn answer_question(
      &self
    , context: &str
    , question: &str
    ) -> crate::Result<Value>
    {   let payload = InferencePayload::inputs(QaInputs
        {   context
          , question
        });
        let body = self
          .call(Task::QuestionAnswering, &payload)
          .await?;
        Ok(body.into_value())
    }

    /// Caller params are merged over the defaults; caller wins
    pub async fn generate(&self, prompt: &str, params: &Params)
      -> crate::Result<String>
    {   let payload = InferencePayload
        {   inputs: prompt
          , parameters: Some(generation_parameters(params))
        };
        self.call(Task::Generation, &payload)
          .await?
          .first_text("generated_text")
          .ok_or_else(|| empty(Task::Generation))
    }

    pub async fn paraphrase(&self, text: &str) -> crate::Result<Value>
    {   let payload = InferencePayload
        {   inputs: format!("{}{}", PARAPHRASE_PREFIX, text)
          , parameters: Some(ParaphraseParameters
            {   max_length: PARAPHRASE_MAX_LENGTH
              , temperature: PARAPHRASE_TEMPERATURE
            })
        };
        let body = self.call(Task::Paraphrase, &payload).await?;
        Ok(body.paraphrase())
    }

    async fn call<T>(&self, task: Task, payload: &T)
      -> crate::Result<crate::response::UpstreamResponse>
    where T: Serialize
    {   let model = self.models.model_for(task);
        debug!("Running {} on {}", task, model);
        self.provider.post(model, payload).await
    }
}

/// Defaults for text generation with caller overrides applied
pub fn generation_parameters(overrides: &Params) -> Params
{   let mut parameters = Params::new();
    parameters.insert(
      "max_length".to_string(),
      Value::from(GENERATION_MAX_LENGTH)
    );
    for (key, value) in overrides
    {   parameters.insert(key.clone(), value.clone());
    }
    parameters
}

fn empty(task: Task) -> Error
{   debug!("Provider returned no {} result", task);
    Error::UpstreamEmptyResult(task)
}
