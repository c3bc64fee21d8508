//! REST API server example
//!
//! Runs the persisted variant (SQLite store, anonymous sign-in) behind the
//! REST API until Ctrl+C.
//!
//! After starting, you can:
//! - List formats via GET http://localhost:6790/api/v1/formats
//! - Submit a link via POST http://localhost:6790/api/v1/job/analyze
//! - Stream events via GET http://localhost:6790/api/v1/events

use std::sync::Arc;
use vidgrab::api::start_api_server;
use vidgrab::identity::AnonymousIdentity;
use vidgrab::store::SqliteStore;
use vidgrab::{Collaborators, Config, JobMachine, run_with_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::default();
    config.job.require_identity = true;

    let store = Arc::new(SqliteStore::new(&config.persistence.database_path).await?);
    let identity = Arc::new(AnonymousIdentity::new());
    let user = identity.sign_in();

    let machine = JobMachine::with_collaborators(
        config.clone(),
        Collaborators {
            store: Some(store.clone()),
            identity: Some(identity),
        },
    )?;

    println!("Signed in as {user}");
    println!("API Base: http://{}/api/v1", config.api.bind_address);
    println!();
    println!("Example commands:");
    println!("  curl -X POST http://{}/api/v1/job/analyze \\", config.api.bind_address);
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"url\": \"https://youtu.be/dQw4w9WgXcQ\"}}'");
    println!("  curl -N http://{}/api/v1/events", config.api.bind_address);

    let server = tokio::spawn(start_api_server(machine.clone(), Arc::new(config)));

    run_with_shutdown(machine).await?;
    server.abort();
    store.close().await;
    Ok(())
}
