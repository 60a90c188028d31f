//! ## strom-classify::term
//! **Match terms over parsed headers**
//!
//! A term names one header field (or a raw frame offset), a value and a
//! mask. The stored value is pre-masked so a match is a single
//! `field & mask == value` comparison.

use std::fmt;

use strom_protocols::ParsedPacket;

use crate::error::{ClassifyError, ClassifyResult};
use crate::limits::PMR_TERM_BYTES_MAX;

/// Header field a term is tested against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PmrTerm {
    /// Total frame length.
    Len = 0,
    /// Ethertype directly after the MAC addresses.
    EthtypeOuter,
    /// Ethertype past every VLAN tag.
    EthtypeInner,
    VlanIdOuter,
    VlanIdInner,
    Dmac,
    /// IPv4 protocol or IPv6 next header.
    IpProto,
    UdpDport,
    TcpDport,
    UdpSport,
    TcpSport,
    SipAddr,
    DipAddr,
    /// Low 64 bits of the IPv6 source address.
    Sip6Addr,
    /// Low 64 bits of the IPv6 destination address.
    Dip6Addr,
    IpsecSpi,
    /// VXLAN network identifier.
    LdVni,
    /// `val_sz` raw bytes at `offset` from the start of the frame.
    CustomFrame,
}

impl PmrTerm {
    pub const ALL: [PmrTerm; 18] = [
        PmrTerm::Len,
        PmrTerm::EthtypeOuter,
        PmrTerm::EthtypeInner,
        PmrTerm::VlanIdOuter,
        PmrTerm::VlanIdInner,
        PmrTerm::Dmac,
        PmrTerm::IpProto,
        PmrTerm::UdpDport,
        PmrTerm::TcpDport,
        PmrTerm::UdpSport,
        PmrTerm::TcpSport,
        PmrTerm::SipAddr,
        PmrTerm::DipAddr,
        PmrTerm::Sip6Addr,
        PmrTerm::Dip6Addr,
        PmrTerm::IpsecSpi,
        PmrTerm::LdVni,
        PmrTerm::CustomFrame,
    ];

    /// Width of the field in bytes.
    pub fn natural_size(self) -> u32 {
        match self {
            PmrTerm::IpProto => 1,
            PmrTerm::EthtypeOuter
            | PmrTerm::EthtypeInner
            | PmrTerm::VlanIdOuter
            | PmrTerm::VlanIdInner
            | PmrTerm::UdpDport
            | PmrTerm::TcpDport
            | PmrTerm::UdpSport
            | PmrTerm::TcpSport => 2,
            PmrTerm::Len
            | PmrTerm::SipAddr
            | PmrTerm::DipAddr
            | PmrTerm::IpsecSpi
            | PmrTerm::LdVni => 4,
            PmrTerm::Dmac => 6,
            PmrTerm::Sip6Addr | PmrTerm::Dip6Addr | PmrTerm::CustomFrame => 8,
        }
    }

    /// Reads the field this term names, `None` when the packet lacks it.
    fn field(self, pkt: &ParsedPacket<'_>, offset: u32, val_sz: u32) -> Option<u64> {
        match self {
            PmrTerm::Len => Some(pkt.frame_len() as u64),
            PmrTerm::EthtypeOuter => pkt.ethtype_outer().map(u64::from),
            PmrTerm::EthtypeInner => pkt.ethtype().map(u64::from),
            PmrTerm::VlanIdOuter => pkt.vlan_outer().map(u64::from),
            PmrTerm::VlanIdInner => pkt.vlan_inner().map(u64::from),
            PmrTerm::Dmac => pkt.dmac(),
            PmrTerm::IpProto => pkt.ip_proto().map(u64::from),
            PmrTerm::UdpDport => pkt.udp_dport().map(u64::from),
            PmrTerm::TcpDport => pkt.tcp_dport().map(u64::from),
            PmrTerm::UdpSport => pkt.udp_sport().map(u64::from),
            PmrTerm::TcpSport => pkt.tcp_sport().map(u64::from),
            PmrTerm::SipAddr => pkt.ipv4_saddr().map(u64::from),
            PmrTerm::DipAddr => pkt.ipv4_daddr().map(u64::from),
            PmrTerm::Sip6Addr => pkt.ipv6_saddr().map(|addr| addr as u64),
            PmrTerm::Dip6Addr => pkt.ipv6_daddr().map(|addr| addr as u64),
            PmrTerm::IpsecSpi => pkt.ipsec_spi().map(u64::from),
            PmrTerm::LdVni => pkt.vxlan_vni().map(u64::from),
            PmrTerm::CustomFrame => pkt
                .bytes(offset as usize, val_sz as usize)
                .map(|bytes| bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))),
        }
    }
}

impl fmt::Display for PmrTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Bit mask with one bit set per supported [`PmrTerm`], indexed by discriminant.
pub fn terms_capability() -> u64 {
    PmrTerm::ALL
        .iter()
        .fold(0u64, |cap, term| cap | (1u64 << (*term as u8)))
}

/// One term as supplied when creating a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PmrMatch {
    pub term: PmrTerm,
    pub val: u64,
    pub mask: u64,
    /// Bytes of `val` and `mask` that are significant.
    pub val_sz: u32,
    /// Frame offset, custom terms only.
    pub offset: u32,
}

impl PmrMatch {
    /// Term over a named header field, sized to that field.
    pub fn new(term: PmrTerm, val: u64, mask: u64) -> Self {
        Self {
            term,
            val,
            mask,
            val_sz: term.natural_size(),
            offset: 0,
        }
    }

    /// Raw match on `val_sz` bytes at `offset`, read big-endian.
    pub fn custom(offset: u32, val: u64, mask: u64, val_sz: u32) -> Self {
        Self {
            term: PmrTerm::CustomFrame,
            val,
            mask,
            val_sz,
            offset,
        }
    }
}

/// A validated term, value already masked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TermValue {
    term: PmrTerm,
    val: u64,
    mask: u64,
    val_sz: u32,
    offset: u32,
}

impl TermValue {
    pub(crate) fn from_match(m: &PmrMatch) -> ClassifyResult<Self> {
        if m.val_sz as usize > PMR_TERM_BYTES_MAX {
            return Err(ClassifyError::TermTooWide {
                size: m.val_sz,
                max: PMR_TERM_BYTES_MAX,
            });
        }
        if m.term == PmrTerm::CustomFrame && m.val_sz == 0 {
            return Err(ClassifyError::InvalidParams(
                "custom frame term needs a non-zero size".into(),
            ));
        }
        let width = match m.val_sz {
            8 => u64::MAX,
            sz => (1u64 << (sz * 8)) - 1,
        };
        let mask = m.mask & width;
        Ok(Self {
            term: m.term,
            val: m.val & mask,
            mask,
            val_sz: m.val_sz,
            offset: m.offset,
        })
    }

    #[inline]
    pub(crate) fn term(&self) -> PmrTerm {
        self.term
    }

    #[inline]
    pub(crate) fn matches(&self, pkt: &ParsedPacket<'_>) -> bool {
        self.term
            .field(pkt, self.offset, self.val_sz)
            .is_some_and(|field| field & self.mask == self.val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use strom_protocols::{FrameBuilder, PacketParser};

    fn term(m: PmrMatch) -> TermValue {
        TermValue::from_match(&m).unwrap()
    }

    #[test]
    fn port_term_matches_exact_value() {
        let frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .tcp(1234, 80)
            .build();
        let pkt = PacketParser::new().parse(&frame);
        assert!(term(PmrMatch::new(PmrTerm::TcpDport, 80, 0xFFFF)).matches(&pkt));
        assert!(!term(PmrMatch::new(PmrTerm::TcpDport, 8080, 0xFFFF)).matches(&pkt));
        assert!(!term(PmrMatch::new(PmrTerm::UdpDport, 80, 0xFFFF)).matches(&pkt));
    }

    #[test]
    fn value_is_masked_at_creation() {
        let t = term(PmrMatch::new(PmrTerm::SipAddr, 0x0A00_00FF, 0xFFFF_FF00));
        let frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::new(10, 0, 0, 7), Ipv4Addr::LOCALHOST)
            .build();
        assert!(t.matches(&PacketParser::new().parse(&frame)));
    }

    #[test]
    fn custom_frame_reads_raw_bytes() {
        let frame = FrameBuilder::new().ethertype(0x1234).build();
        let pkt = PacketParser::new().parse(&frame);
        assert!(term(PmrMatch::custom(12, 0x1234, 0xFFFF, 2)).matches(&pkt));
        assert!(!term(PmrMatch::custom(59, 0x1234, 0xFFFF, 2)).matches(&pkt));
    }

    #[test]
    fn rejects_wide_values() {
        let err = TermValue::from_match(&PmrMatch::custom(0, 1, 1, 9)).unwrap_err();
        assert!(matches!(err, ClassifyError::TermTooWide { size: 9, .. }));
    }

    #[test]
    fn capability_lists_every_term() {
        let cap = terms_capability();
        assert_eq!(cap.count_ones() as usize, PmrTerm::ALL.len());
        assert_ne!(cap & (1 << PmrTerm::CustomFrame as u8), 0);
    }
}
