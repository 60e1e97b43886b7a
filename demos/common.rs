//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - A printing host backed by a flat element table

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use sse_multiplex::{CloseReason, ElementId, Host, InboundMessage};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub no_wait: bool,
    pub url: Option<String>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            no_wait: args.iter().any(|a| a == "--no-wait"),
            url: args.iter().skip(1).find(|a| !a.starts_with("--")).cloned(),
        }
    }
}

/// Host that prints every callback.
///
/// Elements map to their parent (`None` for roots).
#[derive(Default)]
pub struct PrintingHost {
    elements: Mutex<FxHashMap<ElementId, Option<ElementId>>>,
}

impl PrintingHost {
    pub fn insert(&self, element: u64, parent: Option<u64>) {
        self.elements
            .lock()
            .insert(ElementId::new(element), parent.map(ElementId::new));
    }

    pub fn remove(&self, element: u64) {
        self.elements.lock().remove(&ElementId::new(element));
    }
}

impl Host for PrintingHost {
    fn is_present(&self, element: ElementId) -> bool {
        self.elements.lock().contains_key(&element)
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.elements.lock().get(&element).copied().flatten()
    }

    fn replace_content(&self, element: ElementId, data: &str) {
        println!("    [swap]    {element} <- {data}");
    }

    fn run_trigger(&self, element: ElementId, spec: &str, message: &InboundMessage) {
        println!("    [trigger] {element} {spec} (id={:?})", message.id);
    }

    fn on_connection_open(&self, scope: ElementId) {
        println!("    [open]    {scope}");
    }

    fn on_connection_error(&self, scope: ElementId, info: &str) {
        println!("    [error]   {scope}: {info}");
    }

    fn on_connection_closed(&self, scope: ElementId, reason: CloseReason) {
        println!("    [closed]  {scope} ({reason})");
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "sse_multiplex=trace"
    } else {
        "sse_multiplex=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Wait for Ctrl+C or skip if `--no-wait` flag is set.
pub async fn wait_for_exit(no_wait: bool) {
    if no_wait {
        println!("[--no-wait] Skipping wait");
        return;
    }

    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await.ok();
}
