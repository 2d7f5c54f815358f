//! gpsd client source.
//!
//! Connects to a gpsd daemon, enables JSON watch mode and keeps the most
//! recent `TPV` report with a 2D or 3D fix. The reader runs on its own task;
//! the monitor only ever reads the shared snapshot.
//!
//! A fix only lives as long as the session that produced it: a no-fix `TPV`
//! or a dropped connection clears it, and the reader reconnects with an
//! exponential backoff.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use super::{LocationSource, LocationStatus};
use crate::types::LocationFix;

/// Default gpsd address.
pub const DEFAULT_GPSD_ADDRESS: &str = "127.0.0.1:2947";

/// Command enabling streaming JSON reports.
const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";

/// First delay before reconnecting to gpsd.
const RECONNECT_BACKOFF_INITIAL: Duration = Duration::from_secs(1);

/// Upper bound for the reconnect delay.
const RECONNECT_BACKOFF_MAX: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct Shared {
    status: LocationStatus,
    fix: Option<LocationFix>,
}

/// Subset of a gpsd `TPV` report.
#[derive(Debug, Deserialize)]
struct TpvReport {
    class: String,
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
    eph: Option<f64>,
    epx: Option<f64>,
    epy: Option<f64>,
    time: Option<String>,
}

/// What one gpsd line means for the current fix.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Report {
    /// `TPV` with a 2D or 3D fix.
    Fix(LocationFix),
    /// `TPV` reporting that the receiver has no fix.
    NoFix,
    /// Anything else (`VERSION`, `SKY`, garbage).
    Other,
}

/// Parses one gpsd JSON line.
fn parse_report(line: &str) -> Report {
    let Ok(report) = serde_json::from_str::<TpvReport>(line) else {
        return Report::Other;
    };
    if report.class != "TPV" {
        return Report::Other;
    }
    if report.mode < 2 {
        return Report::NoFix;
    }
    let (Some(latitude), Some(longitude)) = (report.lat, report.lon) else {
        return Report::NoFix;
    };
    let accuracy_m = report
        .eph
        .or_else(|| match (report.epx, report.epy) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (x, y) => x.or(y),
        })
        .unwrap_or(0.0);
    let captured_at_utc = report
        .time
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map_or_else(Utc::now, |t| t.with_timezone(&Utc));

    Report::Fix(LocationFix {
        latitude,
        longitude,
        accuracy_m,
        captured_at_utc,
    })
}

/// Why a gpsd session ended.
#[derive(Debug)]
enum SessionEnd {
    /// Never got as far as watch mode.
    Connect(io::Error),
    /// Daemon closed the stream.
    Closed,
    /// Stream failed mid-session.
    Read(io::Error),
}

/// Live fixes from gpsd.
#[derive(Debug)]
pub struct GpsdLocationSource {
    enabled: bool,
    address: String,
    shared: Arc<Mutex<Shared>>,
    reader: Option<JoinHandle<()>>,
}

impl GpsdLocationSource {
    /// Creates a source for the daemon at `address` (`host:port`).
    pub fn new(enabled: bool, address: impl Into<String>) -> Self {
        Self {
            enabled,
            address: address.into(),
            shared: Arc::new(Mutex::new(Shared {
                status: LocationStatus::Initializing,
                fix: None,
            })),
            reader: None,
        }
    }

    fn update<T>(shared: &Mutex<Shared>, apply: impl FnOnce(&mut Shared) -> T) -> T {
        let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard)
    }

    /// Runs one connection until it ends, publishing fixes as they arrive.
    async fn stream_reports(address: &str, shared: &Mutex<Shared>) -> SessionEnd {
        let mut stream = match TcpStream::connect(address).await {
            Ok(stream) => stream,
            Err(e) => return SessionEnd::Connect(e),
        };
        if let Err(e) = stream.write_all(WATCH_COMMAND).await {
            return SessionEnd::Connect(e);
        }

        tracing::info!(address = %address, "Connected to gpsd");
        let mut lines = BufReader::new(stream).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_report(&line) {
                    Report::Fix(fix) => Self::update(shared, |s| {
                        s.fix = Some(fix);
                        s.status = LocationStatus::Running;
                    }),
                    Report::NoFix => {
                        if Self::update(shared, |s| s.fix.take()).is_some() {
                            tracing::warn!(address = %address, "gpsd lost its fix");
                        }
                    }
                    Report::Other => {}
                },
                Ok(None) => return SessionEnd::Closed,
                Err(e) => return SessionEnd::Read(e),
            }
        }
    }

    async fn run_reader(address: String, shared: Arc<Mutex<Shared>>) {
        let mut backoff = RECONNECT_BACKOFF_INITIAL;

        loop {
            let end = Self::stream_reports(&address, &shared).await;
            match &end {
                SessionEnd::Connect(e) => {
                    tracing::warn!(address = %address, error = %e, "Failed to connect to gpsd");
                }
                SessionEnd::Closed => {
                    tracing::warn!(address = %address, "gpsd closed the connection");
                }
                SessionEnd::Read(e) => {
                    tracing::warn!(address = %address, error = %e, "gpsd read failed");
                }
            }

            // A fix from a dead session is stale. A source that never
            // produced one is unusable.
            let ever_ran = Self::update(&shared, |s| {
                s.fix = None;
                if s.status == LocationStatus::Running {
                    true
                } else {
                    s.status = LocationStatus::Failed;
                    false
                }
            });
            if !ever_ran {
                tracing::error!(address = %address, "gpsd never produced a fix, giving up");
                return;
            }

            backoff = match end {
                SessionEnd::Connect(_) => (backoff * 2).min(RECONNECT_BACKOFF_MAX),
                SessionEnd::Closed | SessionEnd::Read(_) => RECONNECT_BACKOFF_INITIAL,
            };
            tracing::info!(
                address = %address,
                delay_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                "Reconnecting to gpsd"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

impl LocationSource for GpsdLocationSource {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn start(&mut self, desired_accuracy_m: f64, update_distance_m: f64) {
        if self.reader.is_some() {
            return;
        }
        tracing::debug!(
            address = %self.address,
            desired_accuracy_m,
            update_distance_m,
            "Starting gpsd reader"
        );
        self.reader = Some(tokio::spawn(Self::run_reader(
            self.address.clone(),
            Arc::clone(&self.shared),
        )));
    }

    fn status(&self) -> LocationStatus {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    fn latest_fix(&mut self) -> Option<LocationFix> {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fix
    }
}

impl Drop for GpsdLocationSource {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
