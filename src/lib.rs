//! # vidgrab
//!
//! State machine behind a "paste a video link, pick a format, watch it
//! download" front end. The download itself is simulated: analysis is a fixed
//! delay and progress comes from a bounded step generator.
//!
//! ## Design Philosophy
//!
//! - **One job at a time** - [`JobMachine`] owns a single job and its lifecycle
//! - **Two variants, one type** - attach a [`store::JobStore`] to persist the
//!   job per user and drive the visible state from store notifications
//! - **Event-driven** - consumers subscribe to [`Event`]s or read
//!   [`JobMachine::snapshot`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use vidgrab::{Config, JobMachine, Status};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let machine = JobMachine::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = machine.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     machine.analyze("https://youtu.be/abc123").await?;
//!     machine.select_format("mp3-320").await?;
//!     // ... once the job is ready
//!     machine.download().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Fixed format catalog
pub mod catalog;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Identity provider seam
pub mod identity;
/// Job state machine (decomposed into focused submodules)
pub mod machine;
/// Simulated progress generator
pub mod progress;
/// Job document stores and watches
pub mod store;
/// Core types and events
pub mod types;
/// URL shape check
pub mod url_check;

// Re-export commonly used types
pub use catalog::{DownloadOption, FORMAT_CATALOG, MediaKind};
pub use config::{Config, ProgressSchedule};
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, JobError, Result, ToHttpStatus};
pub use machine::{Collaborators, DOWNLOAD_FAILED_MESSAGE, JobMachine};
pub use progress::{ProgressSimulator, Tick};
pub use types::{Event, JobId, JobPatch, JobRecord, JobState, Status, UserId};

/// Helper function to run the machine with graceful signal handling.
///
/// Waits for a termination signal and then calls [`JobMachine::shutdown`].
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use vidgrab::{Config, JobMachine, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let machine = JobMachine::new(Config::default())?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(machine).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(machine: JobMachine) -> Result<()> {
    wait_for_signal().await;
    machine.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
