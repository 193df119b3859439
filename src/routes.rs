//! HTTP surface: one POST endpoint per task plus health

use std::sync::Arc;
use std::time::Instant;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::header::{
  CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
  X_DNS_PREFETCH_CONTROL, X_FRAME_OPTIONS,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, info};
use serde_json::{json, Map, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use crate::client::InferenceClient;
use crate::error::Error;
use crate::request::{ErrorBody, TaskRequest};
use crate::Task;

pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Full application router with middleware
pub fn app(client: Arc<InferenceClient>) -> Router
{   let mut router = Router::new()
      .route("/health", get(health));

    for task in Task::ALL
    {   router = router.route(
          task.path(),
          post(move |State(client): State<Arc<InferenceClient>>
                   , body: Result<Bytes, BytesRejection>| {
            async move
            {   match body
                {   Ok(body) => handle_task(task, &client, &body).await
                  , Err(rejection) => Err(rejected(rejection))
                }
            }
          })
        );
    }

    router
      .method_not_allowed_fallback(method_not_allowed)
      .fallback(not_found)
      .with_state(client)
      .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
      .layer(middleware::from_fn(log_requests))
      .layer(cors())
      .layer(SetResponseHeaderLayer::if_not_present(
        X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff")
      ))
      .layer(SetResponseHeaderLayer::if_not_present(
        X_FRAME_OPTIONS,
        HeaderValue::from_static("SAMEORIGIN")
      ))
      .layer(SetResponseHeaderLayer::if_not_present(
        REFERRER_POLICY,
        HeaderValue::from_static("no-referrer")
      ))
      .layer(SetResponseHeaderLayer::if_not_present(
        X_DNS_PREFETCH_CONTROL,
        HeaderValue::from_static("off")
      ))
}

/// Validate, call upstream once, shape the response.
/// Validation failures never reach the client.
async fn handle_task(
  task: Task
, client: &InferenceClient
, body: &[u8]
) -> Result<Json<Value>, Error>
{   let body = parse_body(body)?;
    let request = TaskRequest::parse(task, &body)?;
    debug!("Dispatching {} request", request.task());
    let output = client
      .run(&request)
      .await
      .map_err(Error::reclassify)?;
    Ok(Json(output.into_body()))
}

/// Empty body reads as `{}`
fn parse_body(body: &[u8]) -> crate::Result<Value>
{   if body.iter().all(u8::is_ascii_whitespace)
    {   return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| {
      debug!("Malformed request body: {}", e);
      Error::InvalidInput("Request body must be valid JSON.".to_string())
    })
}

fn rejected(rejection: BytesRejection) -> Error
{   let status = rejection.status();
    debug!("Request body rejected: {}", rejection.body_text());
    let message = if status == StatusCode::PAYLOAD_TOO_LARGE
    {   "Request body too large."
    } else
    {   "Request body could not be read."
    };
    Error::RequestRejected
    {   status: status.as_u16()
      , message: message.to_string()
    }
}

async fn health() -> Json<Value>
{   Json(json!({ "status": "ok" }))
}

async fn not_found() -> Response
{   error_body(StatusCode::NOT_FOUND, "Not Found")
}

async fn method_not_allowed() -> Response
{   error_body(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

fn error_body(status: StatusCode, message: &str) -> Response
{   let body = ErrorBody
    {   error: message.to_string()
    };
    (status, Json(body)).into_response()
}

fn cors() -> CorsLayer
{   CorsLayer::new()
      .allow_origin(AllowOrigin::mirror_request())
      .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
      .allow_headers([CONTENT_TYPE])
}

async fn log_requests(req: Request, next: Next) -> Response
{   let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    info!(
      "{} {} {} {}ms",
      method,
      path,
      response.status().as_u16(),
      started.elapsed().as_millis()
    );
    response
}
