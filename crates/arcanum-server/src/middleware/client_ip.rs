//! Client address resolution for the `ClientIp` extractor.

use axum::Router;
use axum_client_ip::ClientIpSource;
#[cfg(any(test, feature = "config"))]
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Where the client address is read from.
///
/// Only trust a forwarding header when the service runs behind a proxy that
/// overwrites it; otherwise clients can pick their own rate-limit bucket.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[cfg_attr(any(test, feature = "config"), derive(ValueEnum))]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IpSource {
    /// Peer address of the TCP connection.
    #[default]
    ConnectInfo,
    /// Rightmost entry of `X-Forwarded-For`.
    RightmostXForwardedFor,
    /// `X-Real-Ip` as set by nginx.
    XRealIp,
    /// `CF-Connecting-IP` as set by Cloudflare.
    CfConnectingIp,
}

impl From<IpSource> for ClientIpSource {
    fn from(source: IpSource) -> Self {
        match source {
            IpSource::ConnectInfo => ClientIpSource::ConnectInfo,
            IpSource::RightmostXForwardedFor => ClientIpSource::RightmostXForwardedFor,
            IpSource::XRealIp => ClientIpSource::XRealIp,
            IpSource::CfConnectingIp => ClientIpSource::CfConnectingIp,
        }
    }
}

/// Client address configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ClientIpConfig {
    /// Source of the client address used for anonymous rate limiting.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CLIENT_IP_SOURCE", value_enum, default_value_t = IpSource::ConnectInfo)
    )]
    #[serde(default)]
    pub client_ip_source: IpSource,
}

/// Extension trait for `axum::`[`Router`] to configure client address resolution.
pub trait RouterClientIpExt<S> {
    /// Makes the configured [`ClientIpSource`] available to the `ClientIp` extractor.
    fn with_client_ip(self, config: &ClientIpConfig) -> Self;
}

impl<S> RouterClientIpExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_client_ip(self, config: &ClientIpConfig) -> Self {
        let source = ClientIpSource::from(config.client_ip_source);
        self.layer(source.into_extension())
    }
}
