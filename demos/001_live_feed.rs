//! Live feed against a real SSE endpoint.
//!
//! Demonstrates:
//! - Building a client with a custom host
//! - Connecting one scope and registering filtered subscribers
//! - Watching reconnects when the server drops the stream
//!
//! Usage:
//!   cargo run --example 001_live_feed -- http://localhost:8080/events
//!   cargo run --example 001_live_feed -- http://localhost:8080/events --debug
//!   cargo run --example 001_live_feed -- http://localhost:8080/events --no-wait

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use common::{Args, PrintingHost};
use sse_multiplex::{CloseReason, ElementId, Result, SseClient, SseConfig};

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_URL: &str = "http://localhost:8080/events";

const FEED: u64 = 1;
const BADGE: u64 = 2;
const LOG: u64 = 3;
const STOP: u64 = 4;

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
    println!("=== 001: Live Feed ===\n");

    let url = args.url.clone().unwrap_or_else(|| DEFAULT_URL.to_string());

    // ========================================================================
    // Build Client
    // ========================================================================

    println!("[1] Building client...");

    let host = Arc::new(PrintingHost::default());
    host.insert(FEED, None);
    host.insert(BADGE, Some(FEED));
    host.insert(LOG, Some(FEED));
    host.insert(STOP, Some(FEED));

    let client = SseClient::builder()
        .host(Arc::clone(&host))
        .config(SseConfig::new().with_event_type("done"))
        .build()?;

    println!("    ✓ Client ready\n");

    // ========================================================================
    // Connect and Subscribe
    // ========================================================================

    println!("[2] Connecting {url}...");
    client.connect(ElementId::new(FEED), url).await?;

    client
        .swap(ElementId::new(BADGE), "type:notification")
        .await?;
    client
        .trigger(ElementId::new(LOG), "*", "append-log")
        .await?;
    client.close_on(ElementId::new(STOP), "type:done").await?;

    println!("    ✓ 3 subscribers registered\n");

    // ========================================================================
    // Observe
    // ========================================================================

    tokio::time::sleep(Duration::from_secs(1)).await;

    if let Some(status) = client.status(ElementId::new(FEED)).await? {
        println!(
            "[3] Status: {:?} (retry {}, {} subscribers)\n",
            status.state, status.retry_count, status.subscribers
        );
    } else {
        println!("[3] Status: closed\n");
    }

    common::wait_for_exit(args.no_wait).await;

    // ========================================================================
    // Cleanup
    // ========================================================================

    println!("\n[Cleanup] Closing feed...");
    client
        .close(ElementId::new(FEED), CloseReason::NodeReplaced)
        .await?;
    client.shutdown();
    println!("          ✓ Done");

    Ok(())
}
