//! Demo-mode inference backend.
//!
//! Demonstrates:
//! - Serving the backend wire protocol on port 8000
//! - Answering every frame with a `Demo Mode` verdict and banner frame
//!
//! Usage:
//!   cargo run --example demo_backend
//!   cargo run --example demo_backend -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};

use common::Args;
use safety_stream::Result;
use safety_stream::backend::{LoopbackBackend, demo_reply};

// ============================================================================
// Constants
// ============================================================================

const PORT: u16 = 8000;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== Demo Backend ===\n");

    let backend =
        LoopbackBackend::bind_addr(IpAddr::V4(Ipv4Addr::UNSPECIFIED), PORT, demo_reply).await?;

    println!("[1] Listening on ws://0.0.0.0:{}/ws", backend.port());
    println!("    Press Ctrl+C to exit...\n");

    tokio::signal::ctrl_c().await.ok();

    println!(
        "\n[2] Served {} connection(s), {} frame(s)",
        backend.connections(),
        backend.frames_received()
    );

    Ok(())
}
