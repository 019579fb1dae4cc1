//! End-to-end: a painted scoreboard frame goes through the pipeline and
//! reaches WebSocket clients as JSON.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use image::{Rgb, RgbImage};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use scorecast::config::{Rect, Region};
use scorecast::vision::{
    FnOpener, FrameSource, FrameSourceError, GlyphValue, StillFrameSource, TemplateLibrary,
    GLYPH_HEIGHT, GLYPH_WIDTH,
};
use scorecast::{
    Pipeline, ScoreboardConfig, ScoreboardMessage, ScoreboardServer, ServerConfig, TeamInfo,
};

const AMBER: Rgb<u8> = Rgb([255, 140, 0]);
const SCALE: u32 = 10;

fn scoreboard_frame(library: &TemplateLibrary, digits: [u8; 4]) -> RgbImage {
    let mut frame = RgbImage::new(320, 100);
    for (i, value) in digits.iter().enumerate() {
        let glyph = library
            .get(GlyphValue::Digit(*value), 'A')
            .expect("builtin digit")
            .glyph;
        let ox = 10 + i as u32 * 70;
        for y in 0..GLYPH_HEIGHT * SCALE {
            for x in 0..GLYPH_WIDTH * SCALE {
                if glyph.get(x / SCALE, y / SCALE) {
                    frame.put_pixel(ox + x, 10 + y, AMBER);
                }
            }
        }
    }
    for y in 40..50 {
        for x in 300..310 {
            frame.put_pixel(x, y, AMBER);
        }
    }
    frame
}

fn scoreboard_config() -> ScoreboardConfig {
    let mut config = ScoreboardConfig::new()
        .with_erosion(0)
        .with_pacing_interval(Duration::from_millis(10))
        .with_teams(
            TeamInfo::new("Visitors", "img/visitors.png", "#0000ff"),
            TeamInfo::new("Hawks", "img/hawks.png", "#ff0000"),
        )
        .with_ticker("Welcome");
    for i in 0..4u32 {
        let ox = 10 + i * 70;
        config = config.with_region(Region::digit(
            format!("clock_{}", i + 1),
            Rect::new(ox - 5, 5, ox + 55, 85),
        ));
    }
    config.with_region(Region::separator(
        "clock_colon",
        Rect::new(300, 40, 310, 50),
    ))
}

async fn next_message<S>(ws: &mut S) -> ScoreboardMessage
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for update")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("valid scoreboard JSON");
        }
    }
}

#[tokio::test]
async fn test_recognized_clock_reaches_clients() {
    let library = Arc::new(TemplateLibrary::builtin());
    let frame = scoreboard_frame(&library, [1, 2, 3, 4]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = ScoreboardServer::new(ServerConfig::default());
    let hub = server.hub();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_task = tokio::spawn(server.run_with_listeners(listener, None, async {
        let _ = shutdown_rx.await;
    }));

    let opener = FnOpener(
        move |_| -> Result<Box<dyn FrameSource>, FrameSourceError> {
            Ok(Box::new(StillFrameSource::new(frame.clone())))
        },
    );
    let (mut pipeline, _events) = Pipeline::new(opener, Arc::clone(&library), hub);
    pipeline.start(scoreboard_config()).unwrap();

    let url = format!("ws://{}", addr);
    let (mut first, _) = connect_async(url.as_str()).await.unwrap();
    let (mut second, _) = connect_async(url.as_str()).await.unwrap();

    let update = next_message(&mut first).await;
    assert_eq!(update.game.clock, "12:34");
    assert_eq!(update.home.info.name, "Hawks");
    assert_eq!(update.guest.info.color, "#0000ff");
    assert_eq!(update.ticker, "Welcome");

    let update = next_message(&mut second).await;
    assert_eq!(update.game.clock, "12:34");

    // One client leaving does not disturb the other
    drop(first);
    let update = next_message(&mut second).await;
    assert_eq!(update.game.clock, "12:34");

    pipeline.stop();
    shutdown_tx.send(()).unwrap();
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_late_client_gets_last_update() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = ScoreboardServer::new(ServerConfig::default());
    let hub = server.hub();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_task = tokio::spawn(server.run_with_listeners(listener, None, async {
        let _ = shutdown_rx.await;
    }));

    let mut message = ScoreboardMessage::default();
    message.game.clock = "04:12".into();
    message.game.shot_clock = "14".into();
    assert!(hub.publish(message));

    // Nothing else is published; the replay is all the client gets
    let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    let update = next_message(&mut ws).await;
    assert_eq!(update.game.clock, "04:12");
    assert_eq!(update.game.shot_clock, "14");

    shutdown_tx.send(()).unwrap();
    server_task.await.unwrap().unwrap();
}
