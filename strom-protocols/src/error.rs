//! Errors recorded while parsing a frame.

use std::fmt;

use thiserror::Error;

/// Header layer a parse error was detected in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Ethernet,
    Vlan,
    Snap,
    Ipv4,
    Ipv6,
    Tcp,
    Udp,
    Ipsec,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Layer::Ethernet => "Ethernet",
            Layer::Vlan => "VLAN",
            Layer::Snap => "LLC/SNAP",
            Layer::Ipv4 => "IPv4",
            Layer::Ipv6 => "IPv6",
            Layer::Tcp => "TCP",
            Layer::Udp => "UDP",
            Layer::Ipsec => "IPsec",
        })
    }
}

/// Errors that can occur while parsing a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("frame truncated inside the {0} header")]
    Truncated(Layer),
    #[error("802.3 length field exceeds the frame")]
    SnapLength,
    #[error("malformed IPv4 header")]
    Ipv4Header,
    #[error("malformed IPv6 header")]
    Ipv6Header,
    #[error("TCP data offset below the minimum header")]
    TcpHeader,
    #[error("UDP length inconsistent with the IP payload")]
    UdpLength,
}

impl ParseError {
    /// Layer the fault was found in.
    pub fn layer(&self) -> Layer {
        match self {
            ParseError::Truncated(layer) => *layer,
            ParseError::SnapLength => Layer::Snap,
            ParseError::Ipv4Header => Layer::Ipv4,
            ParseError::Ipv6Header => Layer::Ipv6,
            ParseError::TcpHeader => Layer::Tcp,
            ParseError::UdpLength => Layer::Udp,
        }
    }
}
