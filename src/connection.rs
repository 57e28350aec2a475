//! Login handshake.
//!
//! The processor gates its command interface behind a telnet-style
//! exchange, once per transport connection:
//!
//! 1. processor sends the literal prompt `login: `
//! 2. client sends the username line
//! 3. processor answers `connection established`
//!
//! Each read is bounded by the configured login timeout; a timeout or any
//! unexpected data fails the handshake. On success a status request goes
//! out immediately so the caller gets an initial snapshot unprompted.

use crate::commands;
use crate::errors::GrxClientError;
use crate::transport::CommandWriter;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;

const LOGIN_PROMPT: &str = "login: ";
const LOGIN_BANNER: &str = "connection established";

/// Upper bound on handshake chatter; the prompt and banner are short.
const MAX_HANDSHAKE_BYTES: usize = 4096;

/// Run the login handshake on a freshly connected transport.
///
/// Writes go through the shared [`CommandWriter`] lock, the same
/// discipline as caller-issued commands.
///
/// # Errors
///
/// Returns [`GrxClientError::Login`] if either handshake read times out
/// or yields unexpected data, or if the transport drops mid-handshake.
pub(crate) async fn login(
    reader: &mut OwnedReadHalf,
    writer: &CommandWriter,
    username: &str,
    timeout: Duration,
) -> Result<(), GrxClientError> {
    expect_literal(reader, LOGIN_PROMPT, timeout).await?;

    if !writer.send(commands::login_line(username)).await {
        return Err(GrxClientError::Login(
            "transport lost while sending username".to_string(),
        ));
    }

    expect_literal(reader, LOGIN_BANNER, timeout).await?;
    tracing::info!("logged in to GRX processor");

    // Prime the caller with a full snapshot; no explicit request needed.
    if !writer.send(commands::status_request()).await {
        return Err(GrxClientError::Login(
            "transport lost while requesting initial status".to_string(),
        ));
    }

    Ok(())
}

/// Read until the exact `needle` has arrived, bounded by `timeout`.
///
/// The processor sends nothing else during the handshake, so anything
/// around the needle besides line terminators is a mismatch.
async fn expect_literal(
    reader: &mut OwnedReadHalf,
    needle: &str,
    timeout: Duration,
) -> Result<(), GrxClientError> {
    let collected = tokio::time::timeout(timeout, read_until(reader, needle.as_bytes()))
        .await
        .map_err(|_| GrxClientError::Login(format!("timed out waiting for {needle:?}")))??;

    let text = String::from_utf8_lossy(&collected);
    let trimmed = text.trim_matches(|c| c == '\r' || c == '\n');
    if trimmed != needle {
        return Err(GrxClientError::Login(format!(
            "unexpected data from GRX processor: {text:?}"
        )));
    }
    Ok(())
}

async fn read_until(
    reader: &mut OwnedReadHalf,
    needle: &[u8],
) -> Result<Vec<u8>, GrxClientError> {
    let mut collected = Vec::new();
    let mut chunk = [0u8; 256];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(GrxClientError::Login(
                "connection closed during handshake".to_string(),
            ));
        }
        collected.extend_from_slice(&chunk[..n]);

        if collected
            .windows(needle.len())
            .any(|window| window == needle)
        {
            return Ok(collected);
        }
        if collected.len() > MAX_HANDSHAKE_BYTES {
            return Err(GrxClientError::Login(
                "handshake data exceeded expected size".to_string(),
            ));
        }
    }
}
