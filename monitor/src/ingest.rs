use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::errors::{Error, Result};
use crate::frame::{self, FrameOutcome};
use crate::logstore::LogStore;
use crate::metrics::{
    APPEND_FAILURES_TOTAL, DEVICE_ERRORS_TOTAL, FRAMES_TOTAL, PARSE_ERRORS_TOTAL, READINGS_TOTAL,
};
use crate::model::{now_local, LogRow};
use crate::state::SharedState;

/// One blocking read attempt against the sensor link.
#[derive(Debug)]
pub enum ReadEvent {
    Line(String),
    /// The bounded read timeout elapsed with no data. Not an error.
    TimedOut,
}

/// Line-oriented byte stream feeding the ingestion loop. The seam where a
/// retrying transport could be substituted later.
pub trait LineSource {
    async fn read_line(&mut self) -> Result<ReadEvent>;
}

/// Wraps any async reader in line framing plus the bounded read timeout.
pub struct TimedLines<R> {
    lines: Lines<BufReader<R>>,
    timeout: Duration,
}

impl<R: AsyncRead + Unpin + Send> TimedLines<R> {
    pub fn new(reader: R, timeout: Duration) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            timeout,
        }
    }
}

impl<R: AsyncRead + Unpin + Send> LineSource for TimedLines<R> {
    async fn read_line(&mut self) -> Result<ReadEvent> {
        match tokio::time::timeout(self.timeout, self.lines.next_line()).await {
            Err(_) => Ok(ReadEvent::TimedOut),
            Ok(Ok(Some(line))) => Ok(ReadEvent::Line(line)),
            Ok(Ok(None)) => Err(Error::Transport("stream closed".to_string())),
            Ok(Err(e)) => Err(Error::Transport(e.to_string())),
        }
    }
}

/// Concrete sensor link: `tcp://host:port` connects a socket; anything else
/// is opened as a path (a serial device node, or a file replay).
pub enum SensorSource {
    Tcp(TimedLines<TcpStream>),
    Device(TimedLines<File>),
}

impl SensorSource {
    pub async fn open(source: &str, timeout: Duration) -> Result<SensorSource> {
        if let Some(addr) = source.strip_prefix("tcp://") {
            let stream = TcpStream::connect(addr)
                .await
                .map_err(|e| Error::Transport(format!("connect {}: {}", addr, e)))?;
            Ok(SensorSource::Tcp(TimedLines::new(stream, timeout)))
        } else {
            let file = File::open(source)
                .await
                .map_err(|e| Error::Transport(format!("open {}: {}", source, e)))?;
            Ok(SensorSource::Device(TimedLines::new(file, timeout)))
        }
    }
}

impl LineSource for SensorSource {
    async fn read_line(&mut self) -> Result<ReadEvent> {
        match self {
            SensorSource::Tcp(lines) => lines.read_line().await,
            SensorSource::Device(lines) => lines.read_line().await,
        }
    }
}

/// Open the sensor link and run the read loop until the transport dies.
/// There is no reconnect: a failed open or a dead link leaves the process
/// serving last-known values with Disconnected status until restart.
pub async fn run(source: String, timeout: Duration, state: Arc<SharedState>, log: Arc<dyn LogStore>) {
    let link = match SensorSource::open(&source, timeout).await {
        Ok(link) => link,
        Err(e) => {
            error!("Failed to open sensor source {}: {}", source, e);
            state.mark_disconnected();
            return;
        }
    };

    info!("Reading sensor frames from {}", source);
    run_ingest(link, state, log).await;
}

/// The reading state of the ingestion loop, generic over the transport so
/// tests can drive it with a scripted source.
pub async fn run_ingest<S: LineSource>(
    mut source: S,
    state: Arc<SharedState>,
    log: Arc<dyn LogStore>,
) {
    state.mark_connected();

    loop {
        match source.read_line().await {
            Ok(ReadEvent::TimedOut) => continue,
            Ok(ReadEvent::Line(line)) => handle_line(&line, &state, log.as_ref()),
            Err(e) => {
                error!("Sensor link lost: {}", e);
                state.mark_disconnected();
                return;
            }
        }
    }
}

/// Route one line: state update first so live queries see new data even if
/// the log write is still pending, then the append. Parse and append
/// failures are absorbed here.
fn handle_line(line: &str, state: &SharedState, log: &dyn LogStore) {
    if line.trim().is_empty() {
        return;
    }
    FRAMES_TOTAL.inc();

    match frame::parse_line(line) {
        Ok(FrameOutcome::Reading(reading)) => {
            let at = now_local();
            state.update(reading.group, &reading.values, at);
            READINGS_TOTAL.inc();

            let row = LogRow { timestamp: at, values: reading.values };
            if let Err(e) = log.append(reading.group, &row) {
                APPEND_FAILURES_TOTAL.inc();
                error!("Failed to append {} row: {}", reading.group.as_str(), e);
            } else {
                debug!("Logged data for {}", reading.group.as_str());
            }
        }
        Ok(FrameOutcome::DeviceError(message)) => {
            DEVICE_ERRORS_TOTAL.inc();
            warn!("Sensor reported error: {}", message);
        }
        Ok(FrameOutcome::Empty) => {}
        Err(e) => {
            PARSE_ERRORS_TOTAL.inc();
            warn!("Skipping frame: {}", e);
        }
    }
}
