//! Provider response shapes and per-task extraction
//!
//! The provider answers with one of a few JSON layouts depending on the
//! task and model. `UpstreamResponse` names those layouts; anything else
//! is rejected as a protocol error instead of being passed through.

use log::{error, trace};
use serde_json::{Map, Value};
use crate::error::Error;

/// Max chars of a raw body kept for diagnostics
pub const SNIPPET_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamResponse
{   /// A single JSON object (classification, QA, error payloads)
    Object(Map<String, Value>)
  , /// An array of objects (summary, translation, generation, flat NER)
    Objects(Vec<Map<String, Value>>)
  , /// An array of arrays (batched sentiment / NER)
    Nested(Vec<Vec<Value>>)
}

impl UpstreamResponse
{   /// Classify a parsed body into a known shape
    pub fn from_value(value: Value) -> crate::Result<Self>
    {   match value
        {   Value::Object(map) => Ok(UpstreamResponse::Object(map))
          , Value::Array(items) => classify_array(items)
          , other => Err(unexpected_shape(&other))
        }
    }

    /// Parse a raw body; an empty body is an empty object
    pub fn from_body(raw: &str) -> crate::Result<Self>
    {   if raw.trim().is_empty()
        {   return Ok(UpstreamResponse::Object(Map::new()));
        }
        let value: Value = serde_json::from_str(raw).map_err(|e| {
          error!("Parse error: {}", e);
          Error::UpstreamProtocolError
          {   snippet: truncate(raw, SNIPPET_LIMIT)
          }
        })?;
        trace!("Upstream body: {}", value);
        UpstreamResponse::from_value(value)
    }

    /// The provider's `error` field, if this is an error payload.
    /// Falsy values (`""`, `false`, `0`, `null`) count as absent.
    pub fn error_message(&self) -> Option<String>
    {   match self
        {   UpstreamResponse::Object(map) => match map.get("error")
            {   Some(Value::String(s)) if !s.is_empty() => Some(s.clone())
              , Some(other) if truthy(other) => Some(other.to_string())
              , _ => None
            }
          , UpstreamResponse::Objects(_)
          | UpstreamResponse::Nested(_) => None
        }
    }

    /// Text field of the first element, if present and non-empty.
    /// Used for summary, translation and generation.
    pub fn first_text(&self, field: &str) -> Option<String>
    {   match self
        {   UpstreamResponse::Objects(items) => items
              .first()
              .and_then(|first| first.get(field))
              .and_then(Value::as_str)
              .filter(|s| !s.is_empty())
              .map(str::to_string)
          , UpstreamResponse::Object(_)
          | UpstreamResponse::Nested(_) => None
        }
    }

    /// Paraphrase: the first element's `generated_text`, or the first
    /// element itself when that field is absent or empty; `null` when
    /// there is no first element.
    pub fn paraphrase(&self) -> Value
    {   match self
        {   UpstreamResponse::Objects(items) => match items.first()
            {   None => Value::Null
              , Some(first) => match first.get("generated_text")
                {   Some(text) if truthy(text) => text.clone()
                  , _ => Value::Object(first.clone())
                }
            }
          , UpstreamResponse::Nested(rows) => rows
              .first()
              .map(|row| Value::Array(row.clone()))
              .unwrap_or(Value::Null)
          , UpstreamResponse::Object(_) => Value::Null
        }
    }

    /// Sentiment and NER: unwrap one level of batching, otherwise
    /// return the body unchanged.
    pub fn unnested(self) -> Value
    {   match self
        {   UpstreamResponse::Nested(mut rows) if !rows.is_empty() => {
              Value::Array(rows.swap_remove(0))
            }
          , other => other.into_value()
        }
    }

    /// The body as received
    pub fn into_value(self) -> Value
    {   match self
        {   UpstreamResponse::Object(map) => Value::Object(map)
          , UpstreamResponse::Objects(items) => Value::Array(
              items.into_iter().map(Value::Object).collect()
            )
          , UpstreamResponse::Nested(rows) => Value::Array(
              rows.into_iter().map(Value::Array).collect()
            )
        }
    }
}

fn classify_array(items: Vec<Value>) -> crate::Result<UpstreamResponse>
{   if items.iter().all(Value::is_object)
    {   let objects = items
          .into_iter()
          .filter_map(|item| match item
          {   Value::Object(map) => Some(map)
            , _ => None
          })
          .collect();
        return Ok(UpstreamResponse::Objects(objects));
    }
    if items.iter().all(Value::is_array)
    {   let rows = items
          .into_iter()
          .filter_map(|item| match item
          {   Value::Array(row) => Some(row)
            , _ => None
          })
          .collect();
        return Ok(UpstreamResponse::Nested(rows));
    }
    Err(unexpected_shape(&Value::Array(items)))
}

fn unexpected_shape(value: &Value) -> Error
{   let raw = value.to_string();
    error!("Unexpected response shape from provider");
    Error::UpstreamProtocolError
    {   snippet: truncate(&raw, SNIPPET_LIMIT)
    }
}

/// JSON truthiness as the provider's own clients read it
fn truthy(value: &Value) -> bool
{   match value
    {   Value::Null => false
      , Value::Bool(b) => *b
      , Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0)
      , Value::String(s) => !s.is_empty()
      , Value::Array(_) | Value::Object(_) => true
    }
}

/// Truncate to at most `limit` chars, on a char boundary
pub fn truncate(raw: &str, limit: usize) -> String
{   raw.chars().take(limit).collect()
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;

    #[test]
    fn empty_array_is_objects()
    {   let shape = UpstreamResponse::from_value(json!([])).unwrap();
        assert_eq!(shape, UpstreamResponse::Objects(vec![]));
        assert_eq!(shape.first_text("summary_text"), None);
    }

    #[test]
    fn summary_text_is_extracted()
    {   let shape = UpstreamResponse::from_body(
          r#"[{"summary_text":"X"}]"#
        ).unwrap();
        assert_eq!(shape.first_text("summary_text"), Some("X".into()));
        assert_eq!(shape.first_text("translation_text"), None);
    }

    #[test]
    fn empty_string_counts_as_missing()
    {   let shape = UpstreamResponse::from_value(
          json!([{"generated_text": ""}])
        ).unwrap();
        assert_eq!(shape.first_text("generated_text"), None);
        assert_eq!(shape.paraphrase(), json!({"generated_text": ""}));
    }

    #[test]
    fn nested_sentiment_is_unwrapped()
    {   let body = json!([[
          {"label": "POSITIVE", "score": 0.99}
        , {"label": "NEGATIVE", "score": 0.01}
        ]]);
        let shape = UpstreamResponse::from_value(body).unwrap();
        assert_eq!(
          shape.unnested(),
          json!([
            {"label": "POSITIVE", "score": 0.99}
          , {"label": "NEGATIVE", "score": 0.01}
          ])
        );
    }

    #[test]
    fn flat_ner_passes_through()
    {   let body = json!([{"entity_group": "PER", "word": "Ada"}]);
        let shape = UpstreamResponse::from_value(body.clone()).unwrap();
        assert_eq!(shape.unnested(), body);
    }

    #[test]
    fn paraphrase_falls_back_to_element()
    {   let shape = UpstreamResponse::from_value(
          json!([{"text": "other"}])
        ).unwrap();
        assert_eq!(shape.paraphrase(), json!({"text": "other"}));

        let shape = UpstreamResponse::from_value(
          json!([{"generated_text": "again"}])
        ).unwrap();
        assert_eq!(shape.paraphrase(), json!("again"));
    }

    #[test]
    fn paraphrase_without_elements_is_null()
    {   for body in [json!([]), json!({})]
        {   let shape = UpstreamResponse::from_value(body).unwrap();
            assert_eq!(shape.paraphrase(), Value::Null);
        }
    }

    #[test]
    fn falsy_error_field_is_not_an_error()
    {   for error in [json!(""), json!(false), json!(null)]
        {   let shape = UpstreamResponse::from_value(
              json!({"error": error})
            ).unwrap();
            assert_eq!(shape.error_message(), None);
        }
    }

    #[test]
    fn error_field_is_found_on_objects_only()
    {   let shape = UpstreamResponse::from_value(
          json!({"error": "Model is currently loading", "estimated_time": 20.0})
        ).unwrap();
        assert_eq!(
          shape.error_message(),
          Some("Model is currently loading".into())
        );
        let shape = UpstreamResponse::from_value(
          json!([{"error": "not here"}])
        ).unwrap();
        assert_eq!(shape.error_message(), None);
    }

    #[test]
    fn unknown_shapes_fail_loudly()
    {   assert!(UpstreamResponse::from_value(json!("text")).is_err());
        assert!(UpstreamResponse::from_value(json!([1, {"a": 1}])).is_err());
    }

    #[test]
    fn malformed_body_keeps_truncated_snippet()
    {   let raw = format!("<html>{}</html>", "x".repeat(500));
        match UpstreamResponse::from_body(&raw)
        {   Err(Error::UpstreamProtocolError { snippet }) => {
              assert_eq!(snippet.chars().count(), SNIPPET_LIMIT);
              assert!(snippet.starts_with("<html>"));
            }
          , other => panic!("unexpected: {:?}", other)
        }
    }
}
