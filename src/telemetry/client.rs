use std::io::Read;
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;

use super::{decode_latest, IssSample};

/// Upper bound on a telemetry response body
const MAX_BODY_BYTES: u64 = 256 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("backend returned HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("reading response: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed telemetry: {0}")]
    Decode(#[from] simd_json::Error),
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => FetchError::Status(code),
            ureq::Error::Transport(transport) => FetchError::Transport(transport.to_string()),
        }
    }
}

/// Anything that can produce the latest ISS sample
pub trait TelemetrySource {
    /// `Ok(None)` when the source answered but has no sample yet
    fn fetch(&mut self) -> Result<Option<IssSample>, FetchError>;
}

/// Blocking HTTP client for the backend's latest-row endpoint
pub struct HttpSource {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }
}

impl TelemetrySource for HttpSource {
    fn fetch(&mut self) -> Result<Option<IssSample>, FetchError> {
        let response = self.agent.get(&self.endpoint).call()?;

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut body)?;
        debug!("{} answered with {} bytes", self.endpoint, body.len());

        Ok(decode_latest(&mut body)?)
    }
}

/// One fetch with the failure folded into `None`: callers show a loading
/// state instead of an error.
pub fn fetch_latest(source: &mut impl TelemetrySource) -> Option<IssSample> {
    match source.fetch() {
        Ok(sample) => sample,
        Err(e) => {
            warn!("telemetry fetch failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    /// Serve exactly one HTTP response on a loopback port
    fn serve_once(status: &str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let status = status.to_string();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        });

        format!("http://{}/latestdata", addr)
    }

    struct Failing;

    impl TelemetrySource for Failing {
        fn fetch(&mut self) -> Result<Option<IssSample>, FetchError> {
            Err(FetchError::Status(503))
        }
    }

    #[test]
    fn test_http_source_decodes_row() {
        let url = serve_once(
            "200 OK",
            r#"{"last_row":{"latitude":"12.5","longitude":100.25,"altitude":415.2,"velocity":27600,"timestamp":1700000002}}"#,
        );
        let mut source = HttpSource::new(url, Duration::from_secs(5));
        let sample = source.fetch().unwrap().unwrap();
        assert_eq!(sample.latitude, 12.5);
        assert_eq!(sample.longitude, 100.25);
        assert_eq!(sample.timestamp, Some(1_700_000_002.0));
    }

    #[test]
    fn test_http_source_reports_status() {
        let url = serve_once("500 Internal Server Error", r#"{"error":"db down"}"#);
        let mut source = HttpSource::new(url, Duration::from_secs(5));
        match source.fetch() {
            Err(FetchError::Status(500)) => {}
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[test]
    fn test_http_source_unreachable() {
        // Bind then drop to get a port with nothing listening
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let mut source = HttpSource::new(format!("http://127.0.0.1:{}/latestdata", port), Duration::from_secs(2));
        assert!(matches!(source.fetch(), Err(FetchError::Transport(_))));
    }

    #[test]
    fn test_fetch_latest_folds_errors() {
        assert_eq!(fetch_latest(&mut Failing), None);
    }
}
