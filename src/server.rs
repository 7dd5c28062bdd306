//! The webhook server. Telegram posts updates to `/webhook`, and `/set_webhook` registers the URL
//! that it should post them to.

use crate::error::Res;
use crate::handler::Handler;
use crate::ErrorType;
use anyhow::Context;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::types::{Update, UpdateKind};
use tokio::net::TcpListener;
use tracing::{debug, error, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

/// Telegram photos are well under this.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

type ResponseBody = Full<Bytes>;

/// Accepts connections on `port` until Ctrl-C is pressed. Each connection is served on its own
/// task.
pub async fn serve(handler: Arc<Handler>, port: u16) -> Res<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Unable to listen on {addr}"))?;
    info!("Listening on http://{addr}");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Unable to accept a connection: {e}");
                    continue;
                }
            },
            _ = &mut shutdown => {
                info!("Received Ctrl-C, shutting down");
                return Ok(());
            }
        };

        let handler = handler.clone();
        tokio::spawn(async move {
            let service = service_fn(move |request| {
                let handler = handler.clone();
                async move { Ok::<_, Infallible>(route(&handler, request).await) }
            });
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!("Connection from {remote} ended with an error: {e}");
            }
        });
    }
}

/// Dispatches a request to its route.
pub async fn route<B>(handler: &Handler, request: Request<B>) -> Response<ResponseBody>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let (parts, body) = request.into_parts();
    debug!("{} {}", parts.method, parts.uri.path());
    match (&parts.method, parts.uri.path()) {
        (&Method::GET, "/") => json_response(
            StatusCode::OK,
            json!({"status": "OK", "message": "Expense bot is running"}),
        ),
        (&Method::POST, "/webhook") => match read_body(body).await {
            Ok(bytes) => webhook(handler, &bytes).await,
            Err(response) => response,
        },
        (&Method::POST, "/set_webhook") => match read_body(body).await {
            Ok(bytes) => set_webhook(handler, &bytes).await,
            Err(response) => response,
        },
        _ => json_response(StatusCode::NOT_FOUND, json!({"error": "Not found"})),
    }
}

async fn webhook(handler: &Handler, body: &[u8]) -> Response<ResponseBody> {
    let update: Update = match serde_json::from_slice(body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Rejecting an invalid update: {e}");
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({"error": format!("Invalid update: {e}")}),
            );
        }
    };

    let chat_id = match &update.kind {
        UpdateKind::Message(message) => Some(message.chat.id.0),
        _ => None,
    };
    let span = info_span!(
        "webhook",
        request_id = %Uuid::new_v4(),
        update_id = update.id.0,
        chat_id = ?chat_id
    );
    async {
        match handler.handle(&update).await {
            Ok(Some(_)) => debug!("Replied"),
            Ok(None) => debug!("Nothing to reply to"),
            Err(e) => error!("Unable to send the reply: {e}"),
        }
    }
    .instrument(span)
    .await;

    // Telegram redelivers anything that is not a 2xx, so failures are only reported to the user.
    json_response(StatusCode::OK, json!({"status": "OK"}))
}

#[derive(Debug, Deserialize)]
struct SetWebhookRequest {
    webhook_url: Option<String>,
}

async fn set_webhook(handler: &Handler, body: &[u8]) -> Response<ResponseBody> {
    let url = match parse_webhook_url(body) {
        Ok(url) => url,
        Err(message) => {
            warn!("Rejecting a set_webhook request: {message}");
            return error_response(StatusCode::BAD_REQUEST, message);
        }
    };

    match handler.messenger().set_webhook(&url).await {
        Ok(()) => {
            info!("Webhook set to {url}");
            json_response(
                StatusCode::OK,
                json!({"status": "success", "message": "Webhook set successfully"}),
            )
        }
        Err(e) if e.error_type() == ErrorType::Request => {
            warn!("Telegram refused the webhook: {e}");
            error_response(StatusCode::BAD_REQUEST, e.root_cause().to_string())
        }
        Err(e) => {
            error!("Unable to set the webhook: {e}");
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

fn parse_webhook_url(body: &[u8]) -> std::result::Result<Url, String> {
    let request: SetWebhookRequest =
        serde_json::from_slice(body).map_err(|e| format!("Invalid request body: {e}"))?;
    let webhook_url = request
        .webhook_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| "webhook_url is required".to_string())?;
    Url::parse(webhook_url.trim()).map_err(|e| format!("Invalid webhook_url '{webhook_url}': {e}"))
}

/// Collects the body, refusing anything larger than `MAX_BODY_BYTES`.
async fn read_body<B>(body: B) -> std::result::Result<Bytes, Response<ResponseBody>>
where
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(json_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({"error": "Request body is too large"}),
        )),
        Err(e) => {
            warn!("Unable to read the request body: {e}");
            Err(json_response(
                StatusCode::BAD_REQUEST,
                json!({"error": format!("Unable to read the request body: {e}")}),
            ))
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response<ResponseBody> {
    json_response(status, json!({"status": "error", "message": message.into()}))
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
