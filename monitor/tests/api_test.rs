//! Smoke test against a running monitor instance. Start the simulator and
//! the monitor first, then run with `cargo test -- --ignored`.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn http_get(addr: &str, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("monitor not running");
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

fn body(response: &str) -> &str {
    response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b)
        .unwrap_or(response)
}

#[tokio::test]
#[ignore]
async fn test_live_api_surface() {
    let addr = std::env::var("MONITOR_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_string());

    // Give ingestion a moment to pick up the first frames.
    tokio::time::sleep(Duration::from_secs(3)).await;

    let current = http_get(&addr, "/api/current-data").await;
    assert!(current.starts_with("HTTP/1.1 200"));
    let json: serde_json::Value = serde_json::from_str(body(&current)).unwrap();
    assert_eq!(json["connection_status"], "Connected");
    assert!(json.get("air_quality_status").is_some());
    assert!(json["recommendations"].as_array().is_some());

    let historical = http_get(&addr, "/api/historical-data").await;
    assert!(historical.starts_with("HTTP/1.1 200"));
    let json: serde_json::Value = serde_json::from_str(body(&historical)).unwrap();
    assert!(json.get("timestamps").is_some() || json.get("error").is_some());

    let insights = http_get(&addr, "/api/insights").await;
    assert!(insights.starts_with("HTTP/1.1 200"));

    let metrics = http_get(&addr, "/metrics").await;
    assert!(metrics.contains("monitor_frames_total"));
}
