use log::{error, info, warn};
use std::time::{Duration, Instant};

use beatsocket::{ArgType, ArgValue, ArgumentParser, Args, EventKind, EventQueue, EventSocket, ReconnectPolicy};

/*
    Beat viewer:

    Reads its configuration from a page URL or query string given as the first argument,
    e.g. `viewer "?uri=ws://localhost:8765&fps=30"`, connects to the socket server and prints
    out events once per frame.
*/

const DEFAULT_URI: &str = "ws://localhost:8765";

fn main() {
    env_logger::init();

    info!("Starting...");

    let args = parse_args(std::env::args().nth(1).unwrap_or_default().as_str());

    let uri = args.get_str("uri").unwrap_or(DEFAULT_URI).to_string();
    let policy = ReconnectPolicy::default()
        .with_delay(Duration::from_millis(args.get_int("retry_ms").unwrap_or(1000).max(0) as u64))
        .reconnect_on_close(args.get_str("on_close") == Some("reconnect"));

    let queue = EventQueue::default();
    let socket = match EventSocket::new(&uri, queue.clone(), policy) {
        Ok(socket) => socket,
        Err(err) => {
            error!("Could not start event socket: {}", err);
            std::process::exit(1);
        }
    };

    let fps = args.get_int("fps").unwrap_or(60).max(1) as u64;
    event_loop(&socket, queue, fps);
}

fn parse_args(location: &str) -> Args {
    // Accept a full URL, or just its query string
    let query = location.split_once('?').map_or(location, |(_, query)| query);

    let mut parser = ArgumentParser::new();
    parser
        .add_argument("uri", DEFAULT_URI, ArgType::String, None)
        .add_argument("fps", 60, ArgType::Int, Some(vec![ArgValue::Int(30), ArgValue::Int(60), ArgValue::Int(120)]))
        .add_argument("retry_ms", 1000, ArgType::Int, None)
        .add_argument("on_close", "stay", ArgType::String, Some(vec!["stay".into(), "reconnect".into()]));

    parser.parse_query(query)
}

fn event_loop(socket: &EventSocket, queue: EventQueue, fps: u64) {
    let target_frame_time = Duration::from_nanos(1_000_000_000 / fps);
    let mut bpm = None;

    loop {
        // Save current time
        let frame_start = Instant::now();

        for event in queue.pop_all() {
            match event {
                EventKind::Beat => println!("beat ({})", bpm.map_or("? bpm".to_string(), |bpm| format!("{bpm} bpm"))),
                EventKind::Onset => println!("onset"),
                EventKind::Tempo(value) => bpm = Some(value),
            }
        }

        // Calculate elapsed time
        let elapsed = frame_start.elapsed();

        // Sleep for remaining time to hit target frame rate
        if elapsed < target_frame_time {
            let sleep_time = target_frame_time - elapsed;
            std::thread::sleep(sleep_time);
        } else {
            let lag = elapsed - target_frame_time;
            warn!("Viewer lagged by {} ms (socket {:?})", lag.as_millis(), socket.state());
        }
    }
}
