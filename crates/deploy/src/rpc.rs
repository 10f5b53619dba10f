//! Shared utilities for talking to Ethereum-style JSON-RPC endpoints.
//!
//! Every call is sent as its own HTTP request. Requests are never batched, so a
//! failing call can never be hidden behind a partially successful batch.

use std::{future::Future, time::Duration};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Default timeout for a single RPC request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from a single JSON-RPC round-trip.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("{method} request failed: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a JSON-RPC error object.
    #[error("{method} returned error {code}: {message}")]
    Response {
        method: String,
        code: i64,
        message: String,
    },

    /// The endpoint answered with something that is not the expected JSON-RPC shape.
    #[error("failed to decode {method} response: {reason}")]
    Decode { method: String, reason: String },
}

impl RpcError {
    /// Whether the error came from the transport rather than the node.
    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::Transport { .. })
    }
}

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result, or an error if the request failed or returned an error response.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, RpcError> {
    tracing::trace!(method, "Sending RPC request");

    let transport = |source| RpcError::Transport {
        method: method.to_string(),
        source,
    };
    let decode = |reason: String| RpcError::Decode {
        method: method.to_string(),
        reason,
    };

    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .map_err(transport)?;

    let status = response.status();
    let body = response.text().await.map_err(transport)?;

    let result: Value = serde_json::from_str(&body).map_err(|e| {
        decode(format!(
            "HTTP {status}, body is not JSON ({e}): {}",
            truncate(&body, 200)
        ))
    })?;

    if let Some(error) = result.get("error").filter(|error| !error.is_null()) {
        return Err(RpcError::Response {
            method: method.to_string(),
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        });
    }

    let result_value = result
        .get("result")
        .cloned()
        .ok_or_else(|| decode("no result in response".to_string()))?;

    serde_json::from_value(result_value).map_err(|e| decode(e.to_string()))
}

/// Outcome of [`poll_until`] when the deadline passes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimeout {
    pub waited: Duration,
}

/// Repeatedly call `check_fn` until it yields a value or `timeout` elapses.
///
/// `check_fn` returns `Ok(Some(value))` when done, `Ok(None)` to keep waiting
/// and `Err` to abort immediately. A check still running at the deadline is
/// cancelled.
pub async fn poll_until<T, E, F, Fut>(
    name: &str,
    timeout: Duration,
    interval: Duration,
    check_fn: F,
) -> Result<Result<T, E>, PollTimeout>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = tokio::time::Instant::now();

    loop {
        let remaining = timeout.saturating_sub(start.elapsed());
        let Ok(checked) = tokio::time::timeout(remaining, check_fn()).await else {
            return Err(PollTimeout {
                waited: start.elapsed(),
            });
        };

        match checked {
            Ok(Some(value)) => return Ok(Ok(value)),
            Ok(None) => {
                tracing::trace!(name, elapsed = ?start.elapsed(), "Not ready yet, polling again...");
            }
            Err(e) => return Ok(Err(e)),
        }

        if start.elapsed() + interval > timeout {
            return Err(PollTimeout {
                waited: start.elapsed(),
            });
        }

        tokio::time::sleep(interval).await;
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
