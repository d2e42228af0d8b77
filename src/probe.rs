use anyhow::{Context, Result};
use async_trait::async_trait;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::net::IpAddr;
use std::time::Duration;
use surge_ping::{Client as PingClient, Config as PingConfig, PingIdentifier, PingSequence, ICMP};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::models::ProbeOutcome;

const PAYLOAD: [u8; 56] = [0u8; 56];

/// One reachability measurement. Implementations absorb every failure into a
/// failed [`ProbeOutcome`] and enforce `timeout` themselves.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, target: &str, timeout: Duration) -> ProbeOutcome;
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("name resolution failed for {target}: {reason}")]
    Resolution { target: String, reason: String },
    #[error("no address found for {0}")]
    NoAddress(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("no ICMPv6 socket available for {0}")]
    NoIpv6(IpAddr),
    #[error("echo request failed: {0}")]
    Echo(#[from] surge_ping::SurgeError),
}

pub struct IcmpProbe {
    v4: PingClient,
    v6: Option<PingClient>,
    dns_resolver: TokioResolver,
}

impl IcmpProbe {
    /// Opens the ICMP sockets and the resolver. Must be called from within a
    /// Tokio runtime: the sockets register with its reactor.
    pub fn new() -> Result<Self> {
        let v4 = PingClient::new(&PingConfig::default())
            .context("Failed to create ICMPv4 client (raw socket permission?)")?;

        let v6 = match PingClient::new(&PingConfig::builder().kind(ICMP::V6).build()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("ICMPv6 unavailable, IPv6 targets will report timeouts: {}", e);
                None
            }
        };

        let dns_resolver = TokioResolver::builder_with_config(
            ResolverConfig::cloudflare(),
            TokioConnectionProvider::default(),
        )
        .build();

        info!("DNS resolver configured: Cloudflare 1.1.1.1 / 1.0.0.1");

        Ok(Self { v4, v6, dns_resolver })
    }

    async fn echo(&self, target: &str, timeout: Duration) -> Result<u64, ProbeError> {
        let started = Instant::now();
        let ip = self.resolve(target, timeout).await?;
        let remaining = timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(ProbeError::Timeout(timeout));
        }

        let client = match ip {
            IpAddr::V4(_) => &self.v4,
            IpAddr::V6(_) => self.v6.as_ref().ok_or(ProbeError::NoIpv6(ip))?,
        };

        let mut pinger = client.pinger(ip, PingIdentifier(rand::random())).await;
        pinger.timeout(remaining);

        let (_, rtt) = pinger.ping(PingSequence(0), &PAYLOAD).await?;
        Ok(rtt.as_millis() as u64)
    }

    async fn resolve(&self, target: &str, timeout: Duration) -> Result<IpAddr, ProbeError> {
        if let Ok(ip) = target.parse::<IpAddr>() {
            return Ok(ip);
        }

        let lookup = tokio::time::timeout(timeout, self.dns_resolver.lookup_ip(target))
            .await
            .map_err(|_| ProbeError::Timeout(timeout))?
            .map_err(|e| ProbeError::Resolution {
                target: target.to_string(),
                reason: e.to_string(),
            })?;

        lookup
            .iter()
            .next()
            .ok_or_else(|| ProbeError::NoAddress(target.to_string()))
    }
}

#[async_trait]
impl Probe for IcmpProbe {
    async fn probe(&self, target: &str, timeout: Duration) -> ProbeOutcome {
        match self.echo(target, timeout).await {
            Ok(latency_ms) => ProbeOutcome::success(target, latency_ms),
            Err(e) => {
                debug!("probe {} failed: {}", target, e);
                ProbeOutcome::failure(target)
            }
        }
    }
}
