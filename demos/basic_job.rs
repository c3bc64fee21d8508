//! Basic job example
//!
//! Runs one simulated job end to end in the local variant and prints every
//! lifecycle event.

use std::time::Duration;
use vidgrab::{Config, Event, JobMachine, ProgressSchedule, Status};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::default();
    config.simulation.analysis_delay = Duration::from_millis(300);
    config.simulation.tick_interval = Duration::from_millis(100);
    config.simulation.schedule = ProgressSchedule::Random {
        min_step: 5.0,
        max_step: 20.0,
    };

    let machine = JobMachine::new(config)?;
    let mut events = machine.subscribe();

    // A rejected link first
    if let Err(e) = machine.analyze("not a url").await {
        println!("rejected: {e}");
    }

    let id = machine.analyze("https://youtu.be/dQw4w9WgXcQ").await?;
    machine.select_format("mp3-320").await?;
    println!("job {id} submitted");

    while let Ok(event) = events.recv().await {
        match &event {
            Event::Ready { .. } => {
                println!("ready, starting download");
                machine.download().await?;
            }
            Event::Downloading { percent, .. } => println!("  {percent:5.1}%"),
            Event::Complete { result_url, .. } => {
                println!("complete: {}", result_url.as_deref().unwrap_or("-"));
                break;
            }
            Event::Failed { error, .. } => println!("failed: {error}"),
            other => println!("{other:?}"),
        }
    }

    assert_eq!(machine.snapshot().status, Status::Complete);
    machine.reset().await?;
    machine.shutdown().await?;
    Ok(())
}
