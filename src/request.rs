//! Validated task requests and the uniform error body

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::error::Error;
use crate::Task;

/// Caller-supplied generation overrides
pub type Params = Map<String, Value>;

/// A request body that passed validation for its endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum TaskRequest
{   Summarize { text: String }
  , Sentiment { text: String }
  , Classify
    {   text: String
      , labels: Vec<String>
      , multi_label: bool
    }
  , Translate { text: String }
  , Ner { text: String }
  , Qa
    {   context: String
      , question: String
    }
  , Generate
    {   prompt: String
      , params: Params
    }
  , Paraphrase { text: String }
}

impl TaskRequest
{   /// Validate a JSON body for `task`.
    /// Fields are checked in declaration order; the first failure wins.
    pub fn parse(task: Task, body: &Value) -> crate::Result<Self>
    {   let obj = body.as_object().ok_or_else(|| {
          Error::InvalidInput(
            "Request body must be a JSON object.".to_string()
          )
        })?;

        let request = match task
        {   Task::Summarization => TaskRequest::Summarize
            {   text: require_string(obj, "text")?
            }
          , Task::Sentiment => TaskRequest::Sentiment
            {   text: require_string(obj, "text")?
            }
          , Task::ZeroShotClassification => TaskRequest::Classify
            {   text: require_string(obj, "text")?
              , labels: require_labels(obj)?
              , multi_label: optional_bool(obj, "multiLabel")?
            }
          , Task::Translation => TaskRequest::Translate
            {   text: require_string(obj, "text")?
            }
          , Task::NamedEntities => TaskRequest::Ner
            {   text: require_string(obj, "text")?
            }
          , Task::QuestionAnswering => TaskRequest::Qa
            {   context: require_string(obj, "context")?
              , question: require_string(obj, "question")?
            }
          , Task::Generation => TaskRequest::Generate
            {   prompt: require_string(obj, "prompt")?
              , params: optional_object(obj, "params")?
            }
          , Task::Paraphrase => TaskRequest::Paraphrase
            {   text: require_string(obj, "text")?
            }
        };
        Ok(request)
    }

    pub fn task(&self) -> Task
    {   match self
        {   TaskRequest::Summarize { .. } => Task::Summarization
          , TaskRequest::Sentiment { .. } => Task::Sentiment
          , TaskRequest::Classify { .. } => Task::ZeroShotClassification
          , TaskRequest::Translate { .. } => Task::Translation
          , TaskRequest::Ner { .. } => Task::NamedEntities
          , TaskRequest::Qa { .. } => Task::QuestionAnswering
          , TaskRequest::Generate { .. } => Task::Generation
          , TaskRequest::Paraphrase { .. } => Task::Paraphrase
        }
    }
}

fn require_string(obj: &Map<String, Value>, field: &str)
  -> crate::Result<String>
{   match obj.get(field)
    {   None => Err(Error::InvalidInput(
          format!("Missing field '{}'.", field)
        ))
      , Some(Value::String(s)) => Ok(s.clone())
      , Some(_) => Err(Error::InvalidInput(
          format!("Field '{}' must be string.", field)
        ))
    }
}

fn require_labels(obj: &Map<String, Value>)
  -> crate::Result<Vec<String>>
{   let invalid = || Error::InvalidInput(
      "Field 'labels' must be a non-empty string array.".to_string()
    );
    let items = match obj.get("labels")
    {   Some(Value::Array(items)) if !items.is_empty() => items
      , _ => return Err(invalid())
    };
    items
      .iter()
      .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
      .collect()
}

fn optional_bool(obj: &Map<String, Value>, field: &str)
  -> crate::Result<bool>
{   match obj.get(field)
    {   None | Some(Value::Null) => Ok(false)
      , Some(Value::Bool(b)) => Ok(*b)
      , Some(_) => Err(Error::InvalidInput(
          format!("Field '{}' must be boolean.", field)
        ))
    }
}

fn optional_object(obj: &Map<String, Value>, field: &str)
  -> crate::Result<Params>
{   match obj.get(field)
    {   None | Some(Value::Null) => Ok(Params::new())
      , Some(Value::Object(map)) => Ok(map.clone())
      , Some(_) => Err(Error::InvalidInput(
          format!("Field '{}' must be object.", field)
        ))
    }
}

/// Uniform error body: `{ "error": "<public message>" }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody
{   pub error: String
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;

    fn message(err: Error) -> String
    {   err.public_message()
    }

    #[test]
    fn missing_and_mistyped_fields_are_named()
    {   let err = TaskRequest::parse(Task::Summarization, &json!({}))
          .unwrap_err();
        assert_eq!(message(err), "Missing field 'text'.");

        let err = TaskRequest::parse(Task::Generation, &json!({"prompt": 5}))
          .unwrap_err();
        assert_eq!(message(err), "Field 'prompt' must be string.");

        let err = TaskRequest::parse(
          Task::QuestionAnswering,
          &json!({"context": "c"})
        ).unwrap_err();
        assert_eq!(message(err), "Missing field 'question'.");
    }

    #[test]
    fn labels_must_be_non_empty_strings()
    {   for labels in [json!([]), json!("not-an-array"), json!(["a", 1])]
        {   let err = TaskRequest::parse(
              Task::ZeroShotClassification,
              &json!({"text": "t", "labels": labels})
            ).unwrap_err();
            assert_eq!(
              message(err),
              "Field 'labels' must be a non-empty string array."
            );
        }
    }

    #[test]
    fn classify_defaults_multi_label_off()
    {   let req = TaskRequest::parse(
          Task::ZeroShotClassification,
          &json!({"text": "t", "labels": ["a", "b"]})
        ).unwrap();
        assert_eq!(req, TaskRequest::Classify
        {   text: "t".into()
          , labels: vec!["a".into(), "b".into()]
          , multi_label: false
        });
        assert_eq!(req.task(), Task::ZeroShotClassification);
    }

    #[test]
    fn multi_label_must_be_boolean()
    {   let err = TaskRequest::parse(
          Task::ZeroShotClassification,
          &json!({"text": "t", "labels": ["a"], "multiLabel": "yes"})
        ).unwrap_err();
        assert_eq!(message(err), "Field 'multiLabel' must be boolean.");

        let req = TaskRequest::parse(
          Task::ZeroShotClassification,
          &json!({"text": "t", "labels": ["a"], "multiLabel": true})
        ).unwrap();
        assert_eq!(req, TaskRequest::Classify
        {   text: "t".into()
          , labels: vec!["a".into()]
          , multi_label: true
        });
    }

    #[test]
    fn generate_params_must_be_an_object()
    {   let err = TaskRequest::parse(
          Task::Generation,
          &json!({"prompt": "hi", "params": [1]})
        ).unwrap_err();
        assert_eq!(message(err), "Field 'params' must be object.");

        let req = TaskRequest::parse(
          Task::Generation,
          &json!({"prompt": "hi", "params": null})
        ).unwrap();
        assert_eq!(req, TaskRequest::Generate
        {   prompt: "hi".into()
          , params: Params::new()
        });
    }

    #[test]
    fn non_object_body_is_rejected()
    {   let err = TaskRequest::parse(Task::Sentiment, &json!(["text"]))
          .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
