//! Scoreboard broadcast server
//!
//! Run with: cargo run --example scoreboard_server CONFIG FRAMES_DIR [ASSET_DIR]
//!
//! Examples:
//!   cargo run --example scoreboard_server scoreboard.json recordings/game1
//!   cargo run --example scoreboard_server scoreboard.json recordings/game1 display/
//!
//! Replays the images in FRAMES_DIR in a loop as if they came from the
//! camera. Set `SCORECAST_TEMPLATES` to a directory of reference glyph PNGs
//! to use them instead of the built-in set.
//!
//! ## Watching updates
//!
//! With websocat:
//!   websocat ws://localhost:9000
//!
//! With a browser (when ASSET_DIR is given):
//!   http://localhost:8080/

use std::sync::Arc;

use scorecast::vision::{ImageSequenceOpener, TemplateLibrary};
use scorecast::{Pipeline, PipelineEvent, ScoreboardConfig, ScoreboardServer, ServerConfig};

fn print_usage() {
    eprintln!("Usage: scoreboard_server CONFIG FRAMES_DIR [ASSET_DIR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  CONFIG       Scoreboard configuration JSON");
    eprintln!("  FRAMES_DIR   Directory of frame images to replay");
    eprintln!("  ASSET_DIR    Static files for the display page (optional)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scorecast=debug".parse()?)
                .add_directive("scoreboard_server=debug".parse()?),
        )
        .init();

    let config = ScoreboardConfig::load(&args[1])?;
    let templates = match std::env::var("SCORECAST_TEMPLATES") {
        Ok(dir) => TemplateLibrary::load_dir(dir)?,
        Err(_) => TemplateLibrary::builtin(),
    };
    println!("Loaded {} regions, {} templates", config.regions.len(), templates.len());

    let mut server_config = ServerConfig::default();
    if let Some(dir) = args.get(3) {
        server_config = server_config.asset_dir(dir);
    }
    println!("WebSocket: ws://{}", server_config.ws_addr);
    if server_config.asset_dir.is_some() {
        println!("Display:   http://{}/", server_config.http_addr);
    }

    let server = ScoreboardServer::new(server_config);
    let (mut pipeline, mut events) = Pipeline::new(
        ImageSequenceOpener::new(&args[2], true),
        Arc::new(templates),
        server.hub(),
    );

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                PipelineEvent::Frame(state) => {
                    tracing::debug!(
                        clock = %state.clock,
                        shot_clock = %state.shot_clock,
                        home = %state.home_score,
                        guest = %state.guest_score,
                        "Frame"
                    );
                }
                PipelineEvent::Failed(reason) => eprintln!("Pipeline failed: {}", reason),
                other => println!("Pipeline: {:?}", other),
            }
        }
    });

    pipeline.start(config)?;

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    pipeline.stop();
    let stats = pipeline.stats();
    println!(
        "Stats: frames={} missed={} unrecognized={} published={}",
        stats.frames_processed,
        stats.missed_frames,
        stats.unrecognized_readings,
        stats.messages_published
    );

    Ok(())
}
