//! The background read loop: receive, parse, dispatch, reconnect.

use crate::config::Config;
use crate::connection;
use crate::errors::GrxClientError;
use crate::events::{ControllerEvent, StatusSnapshot};
use crate::parser::ResponseParser;
use crate::transport::{CommandWriter, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::select;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Connection lifecycle state, observable through
/// [`ClientHandle::state`](crate::ClientHandle::state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live transport; the loop will retry after the polling interval.
    Disconnected,
    /// Opening the TCP transport.
    Connecting,
    /// Transport open, login handshake in progress.
    LoggingIn,
    /// Logged in; the only state in which commands can be sent.
    Ready,
    /// Shut down; terminal.
    Closing,
}

/// Delivers parsed events to the registered handler, synchronously on
/// the loop task. A slow handler delays the next read; back-pressure is
/// implicit and total.
pub(crate) struct EventDispatcher {
    handler: Box<dyn Fn(ControllerEvent) + Send + Sync>,
    last_status: Arc<Mutex<Option<StatusSnapshot>>>,
}

impl EventDispatcher {
    pub(crate) fn new(
        handler: Box<dyn Fn(ControllerEvent) + Send + Sync>,
        last_status: Arc<Mutex<Option<StatusSnapshot>>>,
    ) -> Self {
        Self {
            handler,
            last_status,
        }
    }

    fn dispatch(&self, event: ControllerEvent) {
        if let ControllerEvent::Status(snapshot) = &event {
            *self.last_status.lock() = Some(*snapshot);
        }
        (self.handler)(event);
    }
}

/// Everything the loop task owns besides the read half itself.
pub(crate) struct LoopContext {
    pub(crate) config: Config,
    pub(crate) writer: CommandWriter,
    pub(crate) state: watch::Sender<ConnectionState>,
    pub(crate) shutdown: watch::Receiver<bool>,
    pub(crate) dispatcher: EventDispatcher,
}

/// Spawn the loop task with an already-established connection.
pub(crate) fn spawn(reader: OwnedReadHalf, ctx: LoopContext) -> JoinHandle<()> {
    tokio::spawn(run(reader, ctx))
}

async fn run(reader: OwnedReadHalf, mut ctx: LoopContext) {
    let mut parser = ResponseParser::new(ctx.config.events.forward_protocol_errors);
    let mut reader = Some(reader);
    let mut failures: u32 = 0;
    let mut buf = [0u8; 1024];

    loop {
        let Some(live) = reader.as_mut() else {
            // Fixed-interval retry cadence; the sleep also yields to a
            // shutdown signal.
            select! {
                _ = shutdown_signal(&mut ctx.shutdown) => break,
                () = tokio::time::sleep(ctx.config.poll_interval()) => {}
            }

            match reconnect(&ctx).await {
                Ok(new_reader) => {
                    parser.reset();
                    failures = 0;
                    reader = Some(new_reader);
                    let _ = ctx.state.send(ConnectionState::Ready);
                }
                Err(e) => {
                    ctx.writer.clear().await;
                    let _ = ctx.state.send(ConnectionState::Disconnected);
                    failures = failures.saturating_add(1);
                    tracing::warn!(attempt = failures, "reconnect failed: {e}");

                    let ceiling = ctx.config.reconnect.max_retries;
                    if ceiling > 0 && failures >= ceiling {
                        tracing::error!("reconnect ceiling of {ceiling} reached, giving up");
                        return;
                    }
                }
            }
            continue;
        };

        // None marks a shutdown signal; the read future is dropped with it.
        let outcome = select! {
            _ = shutdown_signal(&mut ctx.shutdown) => None,
            result = live.read(&mut buf) => Some(result),
        };

        match outcome {
            None => break,
            Some(Ok(0)) => {
                tracing::warn!("Lost connection.");
                drop_transport(&mut reader, &ctx).await;
            }
            Some(Ok(n)) => match std::str::from_utf8(&buf[..n]) {
                Ok(text) => {
                    tracing::debug!(raw = %text.trim_end(), "received");
                    for event in parser.feed(text) {
                        ctx.dispatcher.dispatch(event);
                    }
                }
                // One bad chunk, not a dead connection.
                Err(e) => tracing::warn!("dropping undecodable chunk: {e}"),
            },
            Some(Err(e)) => {
                tracing::warn!("read failed: {e}");
                drop_transport(&mut reader, &ctx).await;
            }
        }
    }

    ctx.writer.clear().await;
    let _ = ctx.state.send(ConnectionState::Closing);
    tracing::info!("read loop stopped");
}

/// Resolves when close() is signalled or every handle is gone.
async fn shutdown_signal(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // All handles dropped without an explicit close.
            return;
        }
    }
}

async fn drop_transport(reader: &mut Option<OwnedReadHalf>, ctx: &LoopContext) {
    *reader = None;
    ctx.writer.clear().await;
    let _ = ctx.state.send(ConnectionState::Disconnected);
}

/// One full connection attempt: transport, handshake, initial status
/// request. Any failure is recoverable here; the loop keeps retrying.
async fn reconnect(ctx: &LoopContext) -> Result<OwnedReadHalf, GrxClientError> {
    let _ = ctx.state.send(ConnectionState::Connecting);
    let conn = &ctx.config.connection;
    let transport = Transport::connect(&conn.host, conn.port).await?;
    let (mut reader, write_half) = transport.split();
    ctx.writer.install(write_half).await;

    let _ = ctx.state.send(ConnectionState::LoggingIn);
    connection::login(
        &mut reader,
        &ctx.writer,
        &conn.username,
        ctx.config.login_timeout(),
    )
    .await?;

    Ok(reader)
}
