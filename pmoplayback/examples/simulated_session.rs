//! Simulated playback session.
//!
//! Two fake decoders run on their own threads behind [`BridgeAdapter`] ports:
//! the primary engine fails every stream, the alternate one plays it. The
//! session retries on the primary engine, fails over, reaches `playing`, and
//! is dismissed a few seconds later.
//!
//! ```bash
//! RUST_LOG=pmoplayback=debug cargo run -p pmoplayback --example simulated_session
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pmoplayback::{
    AdapterCommand, AdapterPort, BackendStatus, Backends, BridgeAdapter, Collaborators,
    ContentKind, Engine, ExtensionRouter, MemoryDirectory, MemoryProgressStore, PlayableItem,
    PlaybackConfig, PlaybackSession, SessionStatus, StreamErrorKind,
};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
buffer_timeout_secs: 5
retry:
  delays_secs: [1, 1, 2]
"#;

/// Decoder that never gets past loading.
fn broken_decoder(port: AdapterPort) {
    for command in port.commands().iter() {
        if let AdapterCommand::Play(request) = command {
            println!("   [{}] opening {}", port.engine(), request.url);
            port.status(BackendStatus::Loading);
            thread::sleep(Duration::from_millis(300));
            port.error(StreamErrorKind::DecodingFailed);
        }
    }
}

/// Decoder that plays whatever it is given.
fn working_decoder(port: AdapterPort) {
    for command in port.commands().iter() {
        match command {
            AdapterCommand::Play(request) => {
                println!("   [{}] opening {}", port.engine(), request.url);
                port.status(BackendStatus::Loading);
                thread::sleep(Duration::from_millis(200));
                port.status(BackendStatus::Playing);
            }
            AdapterCommand::Stop => println!("   [{}] stopped", port.engine()),
            other => println!("   [{}] {other:?}", port.engine()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== pmoplayback - simulated session ===\n");

    let mut config = PlaybackConfig::from_yaml_str(CONFIG)?;
    config.apply_env_overrides();

    let (primary, primary_port) = BridgeAdapter::new(Engine::Primary);
    let (alternate, alternate_port) = BridgeAdapter::new(Engine::Alternate);
    let decoders = [
        thread::spawn(move || broken_decoder(primary_port)),
        thread::spawn(move || working_decoder(alternate_port)),
    ];

    let collaborators = Collaborators {
        router: Arc::new(ExtensionRouter::new()),
        directory: Arc::new(MemoryDirectory::new()),
        progress: Arc::new(MemoryProgressStore::new()),
        backends: Backends::new(Arc::new(primary), Arc::new(alternate)),
    };

    let item = PlayableItem::new(
        "news-24",
        "News 24",
        "http://iptv.local/live/24.m3u8",
        ContentKind::Live,
    );
    let session = PlaybackSession::spawn(item, config, collaborators)?;
    let handle = session.handle();

    let events = handle.subscribe_events();
    let printer = thread::spawn(move || {
        for event in events.iter() {
            println!("-> event: {event:?}");
        }
    });

    let mut snapshots = handle.watch();
    handle.appear()?;

    loop {
        snapshots.changed().await?;
        let snapshot = snapshots.borrow_and_update().clone();
        println!("{}", serde_json::to_string(&snapshot)?);
        if snapshot.status == SessionStatus::Playing {
            break;
        }
    }

    println!("\nPlaying; dismissing in 3 seconds...\n");
    tokio::time::sleep(Duration::from_secs(3)).await;
    handle.dismiss()?;
    drop(snapshots);
    drop(handle);
    session.wait().await?;

    for decoder in decoders {
        let _ = decoder.join();
    }
    let _ = printer.join();

    println!("\n✓ Session ended");
    Ok(())
}
