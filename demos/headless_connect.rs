//! Headless GRX client example - connect and log controller events.
//!
//! Usage:
//!   cargo run --example headless_connect -- 192.168.1.50:23 nwk
//!
//! This example demonstrates:
//! - Creating a client configuration
//! - Connecting and logging in to a GRX processor
//! - Processing status snapshots and button presses
//! - Issuing scene commands
//! - Graceful shutdown

use grx_client::{events, ClientBuilder, Config, ControllerEvent};
use std::env;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <host>:<port> <username>", args[0]);
        eprintln!("Example: {} 192.168.1.50:23 nwk", args[0]);
        std::process::exit(1);
    }

    let (host, port) = parse_server_address(&args[1])?;
    let username = &args[2];

    info!("Connecting to {}:{}", host, port);

    let config = Config::builder()
        .host(&host)
        .port(port)
        .username(username)
        .build()?;

    let (on_event, event_rx) = events::channel(64);
    let client = match ClientBuilder::new(config).on_event(on_event).build().await {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to connect: {}", e);
            return Err(e.into());
        }
    };

    let handle = client.handle();
    info!("✓ Logged in, initial status requested");

    // Shut down cleanly on Ctrl-C
    let close_handle = handle.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down...");
        close_handle.close();
    });

    // Process events until close
    while let Ok(event) = event_rx.recv_async().await {
        match event {
            ControllerEvent::Status(snapshot) => {
                for (unit, scene) in snapshot.iter() {
                    info!("  unit {}: scene {}", unit, scene);
                }
            }
            ControllerEvent::ButtonPress(press) => {
                info!("Button press: unit {} scene {}", press.unit, press.scene);
            }
            ControllerEvent::ProtocolError { message } => {
                error!("Controller error:{}", message);
            }
        }
    }

    client.join().await?;
    Ok(())
}

fn parse_server_address(server: &str) -> anyhow::Result<(String, u16)> {
    if let Some((host, port_str)) = server.split_once(':') {
        let port = port_str.parse::<u16>()?;
        Ok((host.to_string(), port))
    } else {
        // Default telnet port
        Ok((server.to_string(), 23))
    }
}
