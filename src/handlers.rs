/// Axum handler for the chat relay endpoint
use crate::AppState;
use crate::client::HttpClient;
use crate::errors::RelayError;
use crate::models::ChatRequest;
use crate::relay::CappedStream;
use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{
        HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CACHE_CONTROL, CONNECTION, CONTENT_TYPE, ORIGIN},
    },
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, instrument, warn};

const EVENT_STREAM: &str = "text/event-stream; charset=utf-8";

/// Entry point for every method on the chat route.
///
/// Preflights are answered before anything else runs. Every response, including errors, gets the
/// CORS headers.
#[instrument(skip(state, req), fields(method = %req.method()))]
pub async fn chat_handler<T: HttpClient + Clone + Send + Sync + 'static>(
    State(state): State<AppState<T>>,
    req: axum::extract::Request,
) -> Response {
    let origin = req.headers().get(ORIGIN).cloned();

    let mut response = if req.method() == Method::OPTIONS {
        debug!(?origin, "Answering preflight");
        StatusCode::OK.into_response()
    } else {
        match relay_chat(&state, req).await {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    RelayError::MethodNotAllowed | RelayError::MissingMessages => {
                        debug!(error = %e, "Rejected chat request")
                    }
                    _ => error!(error = %e, detail = ?e.detail(), "Chat request failed"),
                }
                e.into_response()
            }
        }
    };

    state
        .settings
        .allowed_origins
        .apply(origin.as_ref(), response.headers_mut());
    response
}

/// Validates the request, calls the upstream, and wires its body into the response.
async fn relay_chat<T: HttpClient>(
    state: &AppState<T>,
    req: axum::extract::Request,
) -> Result<Response, RelayError> {
    if req.method() != Method::POST {
        return Err(RelayError::MethodNotAllowed);
    }

    let settings = &state.settings;

    let body_bytes = axum::body::to_bytes(req.into_body(), settings.max_request_bytes)
        .await
        .map_err(RelayError::server)?;
    let chat = ChatRequest::from_slice(&body_bytes)?;

    let api_key = settings.api_key().ok_or(RelayError::MissingApiKey)?;

    let received = chat.messages.len();
    let upstream_body = chat.into_upstream(&settings.model, settings.context_window);
    info!(
        received,
        forwarded = upstream_body.messages.len(),
        model = %upstream_body.model,
        "Forwarding chat to upstream"
    );

    let payload = serde_json::to_vec(&upstream_body).map_err(RelayError::server)?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key.expose()))
        .map_err(RelayError::server)?;
    let upstream_req = axum::http::Request::builder()
        .method(Method::POST)
        .uri(settings.upstream_url.as_str())
        .header(AUTHORIZATION, bearer)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(payload))
        .map_err(RelayError::server)?;

    let upstream = state
        .http_client
        .request(upstream_req)
        .await
        .map_err(|e| {
            error!(
                "Error forwarding request to upstream url {}: {}",
                settings.upstream_url, e
            );
            RelayError::server(e)
        })?;

    let status = upstream.status();
    if !status.is_success() || upstream.body().is_end_stream() {
        // The diagnostic body is best-effort: a failed read becomes an empty detail.
        let detail = match axum::body::to_bytes(upstream.into_body(), settings.max_relay_bytes)
            .await
        {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!(error = %e, "Failed to read upstream error body");
                String::new()
            }
        };
        error!(%status, "Upstream did not return a stream");
        return Err(RelayError::Upstream { detail });
    }

    debug!(%status, cap = settings.max_relay_bytes, "Relaying upstream stream");
    let relay = CappedStream::new(upstream.into_body().into_data_stream(), settings.max_relay_bytes);

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, EVENT_STREAM)
        .header(CACHE_CONTROL, "no-cache, no-transform")
        .header(CONNECTION, "keep-alive")
        .body(Body::from_stream(relay))
        .map_err(RelayError::server)
}
