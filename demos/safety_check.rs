//! Live safety check against a backend.
//!
//! Demonstrates:
//! - Building a SessionManager from environment options
//! - Streaming still images (or a test pattern) as camera frames
//! - Observing verdicts through the published session view
//! - Stopping on Ctrl+C or after `--limit` verdicts
//!
//! Usage:
//!   cargo run --example safety_check
//!   cargo run --example safety_check -- worker.jpg helmet.png
//!   cargo run --example safety_check -- --limit 20 --debug
//!
//! Environment:
//!   SAFETY_STREAM_ENDPOINT  backend URL (default ws://localhost:8000/ws)
//!   SAFETY_STREAM_QUALITY   JPEG quality 1-100 (default 70)

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use safety_stream::{Result, SessionManager, StillCamera, StreamOptions};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Safety Check ===\n");

    // ========================================================================
    // Configure
    // ========================================================================

    let options = StreamOptions::from_env()?;
    println!("[1] Backend: {}", options.endpoint);

    let camera = if args.paths.is_empty() {
        println!("    Camera: test pattern 1280x720");
        StillCamera::test_pattern(1280, 720)
    } else {
        println!("    Camera: {} still image(s)", args.paths.len());
        StillCamera::open(&args.paths)?
    };

    let manager = SessionManager::builder()
        .camera(camera)
        .options(options)
        .build()?;

    // ========================================================================
    // Stream
    // ========================================================================

    let mut view = manager.subscribe();
    let session = manager.start().await?;
    println!("[2] Session {session} active. Press Ctrl+C to stop...\n");

    let mut last_response = 0;
    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }

                let snapshot = view.borrow_and_update().clone();
                if snapshot.phase.is_idle() {
                    if let Some(notice) = snapshot.notice {
                        println!("\n    {notice}");
                    }
                    break;
                }

                if snapshot.responses > last_response {
                    last_response = snapshot.responses;
                    let verdict = &snapshot.verdict;
                    let user = verdict.user.as_deref().unwrap_or("-");
                    let missing = if verdict.is_compliant() {
                        "none".to_string()
                    } else {
                        verdict.missing_ppe.join(", ")
                    };
                    println!(
                        "    #{last_response:<5} {:<15} user={user:<12} missing={missing}  {}",
                        verdict.status.as_str(),
                        verdict.message
                    );
                }

                if args.limit.is_some_and(|limit| last_response >= limit) {
                    break;
                }
            }

            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // ========================================================================
    // Stop
    // ========================================================================

    manager.stop();
    println!("\n[3] Stopped after {last_response} verdict(s)");

    Ok(())
}
