//! Blocking HTTP access used to fetch bootstrapper artifacts.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use reqwest::blocking::{Client, ClientBuilder, RequestBuilder, Response};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::tls::Version;
use reqwest::{Proxy, Url};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use crate::error::NetworkError;

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Accept any server certificate for every request made by the channel.
    pub trust_all_certificates: bool,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Explicit proxy; `None` keeps the system/environment proxy settings.
    pub proxy: Option<Url>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            trust_all_certificates: false,
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
            user_agent: format!("paket-bootstrapper/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
        }
    }
}

/// Download capability; its trust policy is fixed at construction.
pub struct DownloadChannel {
    client: Client,
    config: ChannelConfig,
}

impl DownloadChannel {
    pub fn new(trust_all_certificates: bool) -> Result<Self, NetworkError> {
        Self::with_config(ChannelConfig {
            trust_all_certificates,
            ..ChannelConfig::default()
        })
    }

    pub fn with_config(config: ChannelConfig) -> Result<Self, NetworkError> {
        // TLS 1.2 is the oldest version still considered safe
        let mut builder = ClientBuilder::new()
            .min_tls_version(Version::TLS_1_2)
            .tcp_keepalive(Duration::from_secs(300))
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy.clone()).map_err(NetworkError::Client)?);
        }

        if config.trust_all_certificates {
            warn!("TLS certificate validation is disabled for every request of this run");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(NetworkError::Client)?;

        Ok(Self { client, config })
    }

    pub fn fetch_text(&self, address: &str) -> Result<String, NetworkError> {
        let response = self.send(address)?;
        response.text().map_err(|source| NetworkError::Transport {
            url: address.to_owned(),
            source,
        })
    }

    /// Opens `address` and hands back its body. Dropping the stream releases
    /// the connection.
    pub fn fetch_stream(&self, address: &str) -> Result<BodyStream, NetworkError> {
        self.send(address).map(BodyStream)
    }

    /// Streams `address` into `destination`. The destination only ever holds
    /// the old file or the complete new one. Missing parent directories of
    /// `destination` are created.
    pub fn fetch_to_file(&self, address: &str, destination: &Path) -> Result<(), NetworkError> {
        let mut response = self.send(address)?;

        let directory = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_error = |source| NetworkError::Io {
            path: destination.to_path_buf(),
            source,
        };

        fs::create_dir_all(&directory).map_err(io_error)?;
        let mut staging = NamedTempFile::new_in(&directory).map_err(io_error)?;

        let written = io::copy(&mut response, staging.as_file_mut()).map_err(io_error)?;
        staging.as_file_mut().flush().map_err(io_error)?;
        staging.as_file().sync_all().map_err(io_error)?;

        staging.persist(destination).map_err(|e| NetworkError::Persist {
            path: destination.to_path_buf(),
            source: e.error,
        })?;
        debug!(url = address, path = %destination.display(), bytes = written, "download stored");

        Ok(())
    }

    fn send(&self, address: &str) -> Result<Response, NetworkError> {
        let response = self.prepare(address)?.send().map_err(|source| NetworkError::Transport {
            url: address.to_owned(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: address.to_owned(),
                status,
            });
        }

        Ok(response)
    }

    /// Common setup shared by every outbound request.
    fn prepare(&self, address: &str) -> Result<RequestBuilder, NetworkError> {
        let url = Url::parse(address).map_err(|source| NetworkError::InvalidAddress {
            address: address.to_owned(),
            source,
        })?;
        debug!(%url, "GET");

        Ok(self
            .client
            .get(url)
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, "*/*")
            .timeout(self.config.timeout))
    }
}

/// Body of a successful response, readable until exhausted.
pub struct BodyStream(Response);

impl Read for BodyStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn text_is_fetched_with_shared_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/version")
                .header_exists("user-agent")
                .header("accept", "*/*");
            then.status(200).body("5.0.0");
        });

        let channel = DownloadChannel::new(false).unwrap();
        let text = channel.fetch_text(&server.url("/version")).unwrap();

        assert_eq!(text, "5.0.0");
        mock.assert();
    }

    #[test]
    fn error_status_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let channel = DownloadChannel::new(false).unwrap();
        let err = channel.fetch_text(&server.url("/missing")).unwrap_err();

        assert!(matches!(err, NetworkError::Status { status, .. } if status.as_u16() == 404));
    }

    #[test]
    fn invalid_address_is_rejected_before_sending() {
        let channel = DownloadChannel::new(false).unwrap();

        assert!(matches!(
            channel.fetch_text("not a url"),
            Err(NetworkError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn stream_yields_the_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/paket.exe");
            then.status(200).body("binary-content");
        });

        let channel = DownloadChannel::new(false).unwrap();
        let mut stream = channel.fetch_stream(&server.url("/paket.exe")).unwrap();
        let mut body = String::new();
        stream.read_to_string(&mut body).unwrap();

        assert_eq!(body, "binary-content");
    }

    #[test]
    fn stream_fails_on_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/paket.exe");
            then.status(500);
        });

        let channel = DownloadChannel::new(false).unwrap();

        assert!(matches!(
            channel.fetch_stream(&server.url("/paket.exe")),
            Err(NetworkError::Status { .. })
        ));
    }

    #[test]
    fn file_is_written_and_replaced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/paket.exe");
            then.status(200).body("new");
        });
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("paket.exe");
        fs::write(&target, "old").unwrap();

        let channel = DownloadChannel::new(false).unwrap();
        channel.fetch_to_file(&server.url("/paket.exe"), &target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn unreachable_address_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("paket.exe");

        let channel = DownloadChannel::new(false).unwrap();
        let err = channel.fetch_to_file("http://127.0.0.1:1/paket.exe", &target).unwrap_err();

        assert!(matches!(err, NetworkError::Transport { .. }));
        assert!(!target.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_download_keeps_previous_file() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/paket.exe");
            then.status(503);
        });
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("paket.exe");
        fs::write(&target, "old").unwrap();

        let channel = DownloadChannel::new(false).unwrap();
        assert!(channel.fetch_to_file(&server.url("/paket.exe"), &target).is_err());

        assert_eq!(fs::read_to_string(&target).unwrap(), "old");
    }

    #[test]
    fn missing_parent_directories_are_created() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/paket.exe");
            then.status(200).body("new");
        });
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("tools").join("paket.exe");

        let channel = DownloadChannel::new(false).unwrap();
        channel.fetch_to_file(&server.url("/paket.exe"), &target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    /// Serves `ok` over TLS with a freshly generated self-signed certificate.
    fn self_signed_server() -> String {
        use std::net::TcpListener;
        use std::sync::Arc;
        use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
        use rustls::{ServerConfig, ServerConnection, StreamOwned};

        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));
        let config = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![certified.cert.der().clone()], key)
            .unwrap();
        let config = Arc::new(config);

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        std::thread::spawn(move || {
            for tcp in listener.incoming().flatten() {
                let Ok(connection) = ServerConnection::new(config.clone()) else { continue };
                let mut tls = StreamOwned::new(connection, tcp);

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                let complete = loop {
                    match tls.read(&mut buf) {
                        Ok(0) | Err(_) => break false,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                    if request.windows(4).any(|w| w == b"\r\n\r\n") {
                        break true;
                    }
                };
                if !complete {
                    continue;
                }

                let _ = tls.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
                tls.conn.send_close_notify();
                let _ = tls.flush();
            }
        });

        format!("https://127.0.0.1:{port}/")
    }

    #[test]
    fn untrusted_certificate_is_a_transport_error() {
        let address = self_signed_server();

        let channel = DownloadChannel::new(false).unwrap();

        assert!(matches!(
            channel.fetch_text(&address),
            Err(NetworkError::Transport { .. })
        ));
    }

    #[test]
    fn trust_all_accepts_untrusted_certificate() {
        let address = self_signed_server();

        let channel = DownloadChannel::new(true).unwrap();

        assert_eq!(channel.fetch_text(&address).unwrap(), "ok");
    }

    #[test]
    fn trust_all_does_not_leak_into_other_channels() {
        let address = self_signed_server();

        let lenient = DownloadChannel::new(true).unwrap();
        let strict = DownloadChannel::new(false).unwrap();

        assert!(lenient.fetch_text(&address).is_ok());
        assert!(strict.fetch_text(&address).is_err());
    }
}
