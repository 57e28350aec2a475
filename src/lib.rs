//! Async client for the Lutron Grafik Eye GRX-CI-NWK control interface.
//!
//! The GRX-CI-NWK exposes a line-oriented ASCII protocol over a telnet
//! port: scene commands go in, status broadcasts and keypad button
//! echoes come back on the same channel. This crate owns the whole
//! connection lifecycle — connect, log in, read, reconnect — and turns
//! the loosely delimited text stream into typed events.
//!
//! # Quick Start
//!
//! ```no_run
//! use grx_client::{ClientBuilder, Config, ControllerEvent, Scene};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::builder()
//!         .host("192.168.1.50")
//!         .port(23)
//!         .username("nwk")
//!         .build()?;
//!
//!     let client = ClientBuilder::new(config)
//!         .on_event(|event| match event {
//!             ControllerEvent::Status(snapshot) => {
//!                 for (unit, scene) in snapshot.iter() {
//!                     println!("unit {unit}: scene {scene}");
//!                 }
//!             }
//!             ControllerEvent::ButtonPress(press) => {
//!                 println!("unit {} pressed scene {}", press.unit, press.scene);
//!             }
//!             ControllerEvent::ProtocolError { message } => {
//!                 eprintln!("controller error:{message}");
//!             }
//!         })
//!         .build()
//!         .await?;
//!
//!     let handle = client.handle();
//!     handle.set_scene(Scene::Number(5), "3").await?;
//!     handle.close();
//!     client.join().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! One background task owns the entire receive path: read, parse,
//! dispatch, reconnect. Command issuance is safe from any number of
//! other tasks; every write shares one lock with the handshake's writes,
//! while the read side never contends it.
//!
//! Commands are fire-and-forget. A send while the transport is down
//! reports `false` and the command is lost; nothing is queued or
//! retried. After the initial connection the client retries a lost
//! connection forever at a fixed interval (configurable ceiling via
//! [`config::ReconnectConfig::max_retries`]).
//!
//! # Safety
//!
//! This crate is `#![forbid(unsafe_code)]` and uses only safe Rust.

#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod commands;
pub mod config;
pub mod errors;
pub mod events;
pub mod parser;
pub mod scene;

// Private implementation modules
mod connection;
mod event_loop;
mod transport;

// Re-exports
pub use config::Config;
pub use errors::GrxClientError;
pub use event_loop::ConnectionState;
pub use events::{ButtonPress, ControllerEvent, StatusSnapshot};
pub use scene::Scene;

use event_loop::{EventDispatcher, LoopContext};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use transport::{CommandWriter, Transport};

/// Builder for creating a connected GRX client.
///
/// # Examples
///
/// ```no_run
/// use grx_client::{ClientBuilder, Config};
/// # use anyhow::Result;
///
/// # async fn example() -> Result<()> {
/// let config = Config::builder()
///     .host("192.168.1.50")
///     .port(23)
///     .username("nwk")
///     .build()?;
///
/// let client = ClientBuilder::new(config)
///     .on_event(|event| println!("{event:?}"))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: Config,
    handler: Option<Box<dyn Fn(ControllerEvent) + Send + Sync>>,
}

impl ClientBuilder {
    /// Creates a new client builder with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            handler: None,
        }
    }

    /// Registers the event handler.
    ///
    /// The handler runs synchronously on the read-loop task, once per
    /// decoded event; it must not block for long, since a slow handler
    /// delays the next read. For a pull-style consumer, wire in
    /// [`events::channel`].
    #[must_use]
    pub fn on_event(mut self, handler: impl Fn(ControllerEvent) + Send + Sync + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Connects, logs in, and spawns the background read loop.
    ///
    /// The initial status request is issued as part of the handshake, so
    /// the handler receives a first snapshot without being asked.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, no handler was
    /// registered, the TCP connection cannot be established, or the
    /// login handshake fails. Only this initial attempt is fatal; once
    /// `build` returns, connection failures are retried internally.
    pub async fn build(self) -> Result<Client, GrxClientError> {
        self.config.validate()?;
        let handler = self.handler.ok_or_else(|| {
            GrxClientError::Config("an event handler must be registered".to_string())
        })?;

        let conn = &self.config.connection;
        let writer = CommandWriter::new();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let transport = Transport::connect(&conn.host, conn.port).await?;
        let (mut reader, write_half) = transport.split();
        writer.install(write_half).await;

        let _ = state_tx.send(ConnectionState::LoggingIn);
        if let Err(e) =
            connection::login(&mut reader, &writer, &conn.username, self.config.login_timeout())
                .await
        {
            writer.clear().await;
            return Err(e);
        }
        let _ = state_tx.send(ConnectionState::Ready);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let last_status = Arc::new(Mutex::new(None));
        let dispatcher = EventDispatcher::new(handler, Arc::clone(&last_status));

        let join_handle = event_loop::spawn(
            reader,
            LoopContext {
                config: self.config,
                writer: writer.clone(),
                state: state_tx,
                shutdown: shutdown_rx,
                dispatcher,
            },
        );

        Ok(Client {
            handle: ClientHandle {
                writer,
                state: state_rx,
                last_status,
                shutdown: shutdown_tx,
            },
            join_handle,
        })
    }
}

/// Handle for driving a running client.
///
/// Cloneable and usable from any task; all clones share the same
/// connection.
#[derive(Clone)]
pub struct ClientHandle {
    writer: CommandWriter,
    state: watch::Receiver<ConnectionState>,
    last_status: Arc<Mutex<Option<StatusSnapshot>>>,
    shutdown: watch::Sender<bool>,
}

impl ClientHandle {
    /// Request a full status broadcast (`:G`).
    ///
    /// Returns `false` if the command could not be written because the
    /// connection is not ready; the command is then simply lost.
    /// Requests are not deduplicated — two calls produce two wire
    /// commands and, if both succeed, two snapshot events.
    pub async fn status_request(&self) -> bool {
        self.send(commands::status_request()).await
    }

    /// Set `unit` to `scene` (`:A<symbol><unit>`).
    ///
    /// The unit identifier is sent exactly as supplied. Turning a unit
    /// off is `Scene::OFF`.
    ///
    /// # Errors
    ///
    /// Returns [`GrxClientError::InvalidScene`] if the scene has no
    /// command representation. `Ok(false)` means the scene encoded fine
    /// but there was no live connection to write to.
    pub async fn set_scene(&self, scene: Scene, unit: &str) -> Result<bool, GrxClientError> {
        let command = commands::set_scene(scene, unit)?;
        Ok(self.send(command).await)
    }

    async fn send(&self, command: bytes::Bytes) -> bool {
        // Ready is the only state in which a send can succeed; this also
        // keeps callers from interleaving with an in-flight handshake.
        if *self.state.borrow() != ConnectionState::Ready {
            tracing::debug!("send while not ready, command dropped");
            return false;
        }
        self.writer.send(command).await
    }

    /// Watch the connection lifecycle state.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// The current connection state.
    #[must_use]
    pub fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// The most recently received status snapshot, if any.
    #[must_use]
    pub fn last_status(&self) -> Option<StatusSnapshot> {
        *self.last_status.lock()
    }

    /// Signal the read loop to stop and close the transport.
    ///
    /// Cooperative: a pending blocking read observes the signal
    /// immediately, no drain sleep involved. Idempotent.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// A connected GRX client.
///
/// The read loop runs in a background task. Use [`Client::handle`] to
/// send commands; the client signals shutdown when dropped.
pub struct Client {
    handle: ClientHandle,
    join_handle: JoinHandle<()>,
}

impl Client {
    /// Returns a handle for interacting with the client.
    #[must_use]
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Waits for the read loop to finish.
    ///
    /// This resolves after [`ClientHandle::close`] (or after the retry
    /// ceiling, when one is configured).
    ///
    /// # Errors
    ///
    /// Returns an error if the background task panicked.
    pub async fn join(mut self) -> Result<(), GrxClientError> {
        // Take ownership of join_handle without triggering Drop
        let join_handle = std::mem::replace(&mut self.join_handle, tokio::spawn(async {}));
        // Prevent Drop from running
        std::mem::forget(self);
        join_handle
            .await
            .map_err(|e| GrxClientError::Internal(format!("client task panicked: {e}")))
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.handle.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_handle_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientHandle>();
    }
}
