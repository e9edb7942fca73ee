//! Single-endpoint reachability checks.
//!
//! A relay counts as reachable when a TCP connection to its OR port completes
//! within the timeout. In TLS mode the TLS handshake must finish too, which
//! catches middleboxes that accept the TCP connection and then reset it once
//! they see a Tor handshake. The certificate is never validated: relays use
//! self-signed certificates and the session is dropped right after the
//! handshake.

use crate::error::ProbeError;
use crate::scanner::ScanConfig;
use onionscout_directory::{Candidate, bridge_line};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time;
use tokio_rustls::TlsConnector;

/// What a probe must complete to count as a success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// TCP connect only
    #[default]
    Tcp,
    /// TCP connect followed by a TLS handshake
    Tls,
}

impl fmt::Display for ProbeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Tls => write!(f, "tls"),
        }
    }
}

impl FromStr for ProbeMode {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "tls" => Ok(Self::Tls),
            _ => Err(ProbeError::UnknownMode(s.to_string())),
        }
    }
}

/// Result of probing one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Endpoint answered
    Reachable {
        /// Time until the connection (and handshake) completed
        latency: Duration,
    },
    /// Connection actively refused
    Refused,
    /// No answer within the timeout
    TimedOut,
    /// Any other failure (reset, unreachable network, TLS alert, ...)
    Failed(String),
}

impl ProbeOutcome {
    /// Whether the endpoint answered
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable { .. })
    }

    fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Self::Refused,
            io::ErrorKind::TimedOut => Self::TimedOut,
            _ => Self::Failed(err.to_string()),
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reachable { latency } => write!(f, "reachable in {}ms", latency.as_millis()),
            Self::Refused => write!(f, "refused"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Reachability test for a single endpoint
pub trait Checker: Send + Sync {
    /// Probe `addr` once
    fn check(&self, addr: SocketAddr) -> impl Future<Output = ProbeOutcome> + Send;
}

/// Plain TCP connect check
#[derive(Debug, Clone)]
pub struct TcpChecker {
    timeout: Duration,
}

impl TcpChecker {
    /// Create a checker with a per-attempt timeout
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Checker for TcpChecker {
    async fn check(&self, addr: SocketAddr) -> ProbeOutcome {
        let started = Instant::now();
        match time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                ProbeOutcome::Reachable {
                    latency: started.elapsed(),
                }
            }
            Ok(Err(e)) => ProbeOutcome::from_io(&e),
            Err(_) => ProbeOutcome::TimedOut,
        }
    }
}

/// Accepts any certificate; the handshake is only a reachability signal.
///
/// Handshake signatures are still checked against the offered certificate
/// so a server that cannot complete a real handshake does not count.
#[derive(Debug)]
struct AnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// TCP connect plus TLS handshake check
#[derive(Clone)]
pub struct TlsChecker {
    timeout: Duration,
    connector: TlsConnector,
}

impl fmt::Debug for TlsChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsChecker")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TlsChecker {
    /// Create a checker; `timeout` bounds connect and handshake together
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS client configuration cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());

        let config = ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AnyCertificate { provider }))
            .with_no_client_auth();

        Ok(Self {
            timeout,
            connector: TlsConnector::from(Arc::new(config)),
        })
    }

    async fn handshake(&self, addr: SocketAddr) -> io::Result<()> {
        let stream = TcpStream::connect(addr).await?;
        // IP server name: rustls sends no SNI
        let server_name = ServerName::from(addr.ip());
        let tls = self.connector.connect(server_name, stream).await?;
        drop(tls);
        Ok(())
    }
}

impl Checker for TlsChecker {
    async fn check(&self, addr: SocketAddr) -> ProbeOutcome {
        let started = Instant::now();
        match time::timeout(self.timeout, self.handshake(addr)).await {
            Ok(Ok(())) => ProbeOutcome::Reachable {
                latency: started.elapsed(),
            },
            Ok(Err(e)) => ProbeOutcome::from_io(&e),
            Err(_) => ProbeOutcome::TimedOut,
        }
    }
}

/// Checker selected at runtime from a [`ProbeMode`]
#[derive(Debug, Clone)]
pub enum ConnectChecker {
    /// TCP connect
    Tcp(TcpChecker),
    /// TCP connect plus TLS handshake
    Tls(TlsChecker),
}

impl ConnectChecker {
    /// Build the checker for a mode and timeout
    ///
    /// # Errors
    ///
    /// Returns an error if TLS setup fails.
    pub fn new(mode: ProbeMode, timeout: Duration) -> Result<Self, ProbeError> {
        Ok(match mode {
            ProbeMode::Tcp => Self::Tcp(TcpChecker::new(timeout)),
            ProbeMode::Tls => Self::Tls(TlsChecker::new(timeout)?),
        })
    }

    /// Build the checker described by a scan configuration
    ///
    /// # Errors
    ///
    /// Returns an error if TLS setup fails.
    pub fn from_config(config: &ScanConfig) -> Result<Self, ProbeError> {
        Self::new(config.mode, config.timeout)
    }
}

impl Checker for ConnectChecker {
    async fn check(&self, addr: SocketAddr) -> ProbeOutcome {
        match self {
            Self::Tcp(checker) => checker.check(addr).await,
            Self::Tls(checker) => checker.check(addr).await,
        }
    }
}

/// Endpoint that answered, with its latency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReachableAddress {
    /// OR endpoint
    pub addr: SocketAddr,
    /// Connect (and handshake) time
    pub latency: Duration,
}

/// Probe results for one candidate
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// Probed candidate
    pub candidate: Candidate,
    /// Endpoints that answered, in probe order
    pub reachable: Vec<ReachableAddress>,
    /// Number of endpoints that did not answer
    pub failures: usize,
}

impl ProbeReport {
    /// Whether at least one endpoint answered
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        !self.reachable.is_empty()
    }

    /// Bridge lines (`<endpoint> <FINGERPRINT>`) for the reachable endpoints
    #[must_use]
    pub fn bridge_lines(&self) -> Vec<String> {
        self.reachable
            .iter()
            .map(|r| bridge_line(r.addr, &self.candidate.fingerprint))
            .collect()
    }
}

/// Probe every endpoint of a candidate, one after another
pub async fn probe_candidate<C: Checker + ?Sized>(
    checker: &C,
    candidate: Candidate,
) -> ProbeReport {
    let mut reachable = Vec::new();
    let mut failures = 0;

    for &addr in &candidate.addresses {
        match checker.check(addr).await {
            ProbeOutcome::Reachable { latency } => {
                tracing::debug!("{} {} reachable in {:?}", addr, candidate.fingerprint, latency);
                reachable.push(ReachableAddress { addr, latency });
            }
            outcome => {
                tracing::debug!("{} {} {}", addr, candidate.fingerprint, outcome);
                failures += 1;
            }
        }
    }

    ProbeReport {
        candidate,
        reachable,
        failures,
    }
}
