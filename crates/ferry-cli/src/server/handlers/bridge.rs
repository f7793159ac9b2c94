//! Runs blocking library calls off the async runtime.

use std::io;
use std::sync::Arc;

use axum::body::Body;
use ferry::Ferry;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::server::error::ApiError;
use crate::server::state::AppState;

/// Chunks buffered between the producer thread and the response body.
const CHANNEL_CAPACITY: usize = 16;

/// Run `f` on the blocking pool.
pub async fn run_blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Ferry) -> ferry::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let ferry = Arc::clone(&state.ferry);
    let result = tokio::task::spawn_blocking(move || f(&ferry)).await?;
    Ok(result?)
}

/// Stream the chunks produced by `start` as a response body.
///
/// The producer runs on the blocking pool and pulls one chunk ahead of the
/// response, so a failure before the first chunk becomes an error status. A
/// later failure aborts the body. The producer stops as soon as the client
/// goes away.
pub async fn stream_body<F, I>(state: &AppState, start: F) -> Result<Body, ApiError>
where
    F: FnOnce(&Ferry) -> ferry::Result<I> + Send + 'static,
    I: Iterator<Item = ferry::Result<Vec<u8>>> + 'static,
{
    let ferry = Arc::clone(&state.ferry);
    let (tx, rx) = mpsc::channel::<io::Result<Vec<u8>>>(CHANNEL_CAPACITY);
    let (ready_tx, ready_rx) = oneshot::channel::<ferry::Result<()>>();

    tokio::task::spawn_blocking(move || {
        let mut chunks = match start(&ferry) {
            Ok(chunks) => chunks,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };

        match chunks.next() {
            Some(Err(e)) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
            Some(Ok(first)) => {
                if ready_tx.send(Ok(())).is_err() || tx.blocking_send(Ok(first)).is_err() {
                    return;
                }
            }
            None => {
                let _ = ready_tx.send(Ok(()));
                return;
            }
        }

        for chunk in chunks {
            match chunk {
                Ok(bytes) => {
                    if tx.blocking_send(Ok(bytes)).is_err() {
                        debug!("client disconnected, stopping stream");
                        return;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "stream failed after response started");
                    let _ = tx.blocking_send(Err(io::Error::other(e.to_string())));
                    return;
                }
            }
        }
    });

    ready_rx
        .await
        .map_err(|_| ApiError::Internal("Stream producer exited unexpectedly".to_string()))??;

    Ok(Body::from_stream(ReceiverStream::new(rx)))
}
