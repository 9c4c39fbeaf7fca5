mod frames;

use clap::Parser;
use frames::{Environment, ErrorFrame};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

/// Emits air-quality sensor frames over TCP, one JSON object per line, the
/// way the probe firmware writes them over serial.
#[derive(Debug, Parser)]
struct Args {
    /// Address to listen on for monitor connections
    #[arg(long, env = "SIM_LISTEN", default_value = "127.0.0.1:7878")]
    listen: String,

    /// Milliseconds between emission cycles (one frame per sensor per cycle)
    #[arg(long, env = "SIM_INTERVAL_MS", default_value_t = 2000)]
    interval_ms: u64,

    /// Probability per cycle of emitting a firmware error frame
    #[arg(long, default_value_t = 0.02)]
    error_rate: f64,

    /// Probability per cycle of emitting a malformed line
    #[arg(long, default_value_t = 0.01)]
    garble_rate: f64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt::init();

    info!("Starting sensor simulator");
    info!(
        "Listening on {}, interval {}ms",
        args.listen, args.interval_ms
    );

    let listener = match TcpListener::bind(&args.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                info!("Monitor connected from {}", peer);
                let interval = Duration::from_millis(args.interval_ms);
                let error_rate = args.error_rate;
                let garble_rate = args.garble_rate;
                tokio::spawn(async move {
                    run_feed(socket, interval, error_rate, garble_rate).await;
                    info!("Monitor {} disconnected", peer);
                });
            }
            Err(e) => {
                warn!("Accept failed: {}", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

/// Feed one connected monitor until the socket drops.
async fn run_feed(mut socket: TcpStream, interval: Duration, error_rate: f64, garble_rate: f64) {
    let mut rng = StdRng::from_entropy();
    let mut env = Environment::default();

    loop {
        env.step(&mut rng);

        let mut lines = vec![
            frame_line(&env.scd41_frame()),
            frame_line(&env.ccs811_frame()),
            frame_line(&env.sps30_frame()),
        ];

        if rng.gen_bool(error_rate) {
            let frame = ErrorFrame { error: "CCS811 data not ready".to_string() };
            lines.push(frame_line(&frame));
        }
        if rng.gen_bool(garble_rate) {
            lines.push("%%% line noise %%%\n".to_string());
        }

        for line in lines {
            if let Err(e) = socket.write_all(line.as_bytes()).await {
                warn!("Write failed, dropping feed: {}", e);
                return;
            }
        }

        tokio::time::sleep(interval).await;
    }
}

fn frame_line(frame: &impl serde::Serialize) -> String {
    match serde_json::to_string(frame) {
        Ok(mut line) => {
            line.push('\n');
            line
        }
        Err(e) => {
            error!("Failed to serialize frame: {}", e);
            String::new()
        }
    }
}
