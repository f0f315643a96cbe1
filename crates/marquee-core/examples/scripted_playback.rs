//! Scripted Playback Example
//!
//! Drives a player with a simulated engine that reports telemetry from its
//! own thread, while the main thread pumps it into the state machine.
//!
//! # Usage
//! ```bash
//! RUST_LOG=debug cargo run -p marquee-core --example scripted_playback
//! ```

use anyhow::{anyhow, Result};
use marquee_core::playback::{AssetDuration, ItemStatus};
use marquee_core::{
    Event, EventProtocol, Loader, MediaEngine, Options, Player, Telemetry, TelemetrySink,
};
use std::cell::Cell;
use std::rc::Rc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use url::Url;

const CLIP_SECONDS: f64 = 3.0;
const TICK: Duration = Duration::from_millis(250);

/// Pretends to decode a short clip in real time
#[derive(Default)]
struct SimulatedEngine {
    sink: Option<TelemetrySink>,
    worker: Option<JoinHandle<()>>,
}

impl MediaEngine for SimulatedEngine {
    fn attach(&mut self, source: &Url, telemetry: TelemetrySink) -> marquee_core::Result<()> {
        println!("engine: opening {source}");
        self.sink = Some(telemetry);
        Ok(())
    }

    fn play(&mut self) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        if self.worker.is_some() {
            return;
        }
        self.worker = Some(thread::spawn(move || {
            thread::sleep(TICK);
            sink.send(Telemetry::StatusChanged(ItemStatus::ReadyToPlay));
            sink.send(Telemetry::DurationChanged(AssetDuration::Finite(CLIP_SECONDS)));
            thread::sleep(TICK);
            sink.send(Telemetry::LikelyToKeepUp(true));
            sink.send(Telemetry::RateChanged(1.0));

            let mut position = 0.0;
            while position < CLIP_SECONDS {
                thread::sleep(TICK);
                position += TICK.as_secs_f64();
                if !sink.send(Telemetry::PositionTick(position.min(CLIP_SECONDS))) {
                    return;
                }
            }
            sink.send(Telemetry::RateChanged(0.0));
            sink.send(Telemetry::ItemDidFinish);
        }));
    }

    fn pause(&mut self) {}

    fn seek(&mut self, to: f64) {
        println!("engine: seek to {to}");
    }

    fn set_muted(&mut self, muted: bool) {
        println!("engine: muted = {muted}");
    }

    fn release(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    marquee_core::init();

    let loader = Loader::with_engine(|| Box::new(SimulatedEngine::default()) as Box<dyn MediaEngine>);
    let options = Options::from_json(r#"{ "sourceUrl": "https://cdn.example.com/clip.mp4" }"#)?;
    let player = Player::new(Rc::new(loader), options)?;

    for event in [Event::Ready, Event::Stalled, Event::Playing, Event::DidComplete] {
        player.on(event, move |_| println!("player: {event}"));
    }
    let done = Rc::new(Cell::new(false));
    let finished = Rc::clone(&done);
    player.on(Event::DidComplete, move |_| finished.set(true));
    player.on(Event::DidUpdatePosition, |info| {
        if let Some(position) = info.f64("position") {
            println!("player: position {position:.2}s");
        }
    });

    player.play();

    let mut interval = tokio::time::interval(Duration::from_millis(50));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !done.get() {
        if tokio::time::Instant::now() > deadline {
            return Err(anyhow!("playback did not complete in time"));
        }
        interval.tick().await;
        player.pump();
    }

    println!("final state: {}", player.state());
    player.destroy();
    Ok(())
}
