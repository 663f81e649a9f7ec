// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stdio transport: the transport is abstracted behind
//! `Serve`/`Stop`/`SetHandler` so the request handler never depends on
//! how bytes arrive. This workspace ships one concrete framing —
//! newline-delimited JSON over a single reader/writer pair — generic over
//! the underlying I/O so tests can swap in an in-memory duplex instead of
//! real stdin/stdout.

use async_trait::async_trait;
use ck_core::{ErrorKind, TaggedError};
use ck_wire::{read_message, write_message, Request, Response};
use parking_lot::Mutex as SyncMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Binds a decoded wire request to a response. `None` means the request
/// was a notification and no response should be written.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: Request) -> Option<Response>;
}

/// `Serve`/`Stop`/`SetHandler`.
#[async_trait]
pub trait Transport: Send + Sync {
    fn set_handler(&self, handler: Arc<dyn Handler>);
    /// Runs until EOF or `stop()` is called. Safe to call only once.
    async fn serve(&self) -> Result<(), TaggedError>;
    /// Stops accepting new requests. Idempotent.
    async fn stop(&self);
    fn is_accepting(&self) -> bool;
}

/// Newline-delimited JSON transport over one reader/writer pair.
pub struct IoTransport<R, W> {
    reader: AsyncMutex<Option<BufReader<R>>>,
    writer: AsyncMutex<W>,
    handler: SyncMutex<Option<Arc<dyn Handler>>>,
    cancel: CancellationToken,
    accepting: Arc<AtomicBool>,
}

impl<R, W> IoTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: AsyncMutex::new(Some(BufReader::new(reader))),
            writer: AsyncMutex::new(writer),
            handler: SyncMutex::new(None),
            cancel: CancellationToken::new(),
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }
}

#[async_trait]
impl<R, W> Transport for IoTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn set_handler(&self, handler: Arc<dyn Handler>) {
        *self.handler.lock() = Some(handler);
    }

    async fn serve(&self) -> Result<(), TaggedError> {
        loop {
            let mut reader_guard = self.reader.lock().await;
            let Some(reader) = reader_guard.as_mut() else {
                return Err(TaggedError::new(ErrorKind::Internal, "transport reader already consumed"));
            };

            let message = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("transport draining, stopped reading new requests");
                    return Ok(());
                }
                message = read_message::<_, Request>(reader) => message,
            };
            drop(reader_guard);

            let request = match message {
                Ok(Some(request)) => request,
                Ok(None) => return Ok(()), // clean EOF
                Err(e) => return Err(TaggedError::new(ErrorKind::Internal, format!("malformed request: {e}"))),
            };

            let Some(handler) = self.handler.lock().clone() else {
                warn!("request received before a handler was attached, dropping");
                continue;
            };

            let is_notification = request.is_notification();
            let response = handler.handle(request).await;
            if is_notification {
                continue;
            }
            let Some(response) = response else {
                warn!("handler returned no response for a non-notification request");
                continue;
            };

            let mut writer = self.writer.lock().await;
            write_message(&mut *writer, &response).await.map_err(|e| TaggedError::new(ErrorKind::Internal, e.to_string()))?;
        }
    }

    async fn stop(&self) {
        self.accepting.store(false, Ordering::Release);
        self.cancel.cancel();
    }

    fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
