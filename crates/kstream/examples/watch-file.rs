//! Watch a recorded newline-delimited watch response.
//!
//! Run with: cargo run -p kstream --example watch-file -- <FILE>

use kstream::watch::{EventType, LineReader, WatchState, Watcher};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Object {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    name: String,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "watch.ndjson".to_string());
    let file = tokio::fs::File::open(&path).await?;

    let watcher = Watcher::builder(LineReader::new(file), |event_type: EventType, obj: Object| {
        println!(
            "{event_type:<9} {} {}",
            obj.kind.as_deref().unwrap_or("-"),
            obj.metadata.name
        );
    })
    .on_error(|err| eprintln!("watch error: {err}"))
    .on_closed(|| println!("watch closed"))
    .start();

    if watcher.join().await == WatchState::Faulted {
        eprintln!("watch ended with a fatal error");
    }
    Ok(())
}
