//! ## strom-protocols::parser
//! **Single-pass L2-L4 header parser**
//!
//! Walks Ethernet, up to two VLAN tags, LLC/SNAP, IPv4 or IPv6 (skipping
//! hop-by-hop and routing extension headers) and the transport header,
//! recording offsets and flags as it goes. Field accessors read from the
//! frame on demand, so parsing never copies.

use crate::error::{Layer, ParseError};
use crate::headers::*;

/// Layers and options recognised in a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputFlags {
    pub eth: bool,
    pub jumbo: bool,
    pub vlan: bool,
    pub vlan_qinq: bool,
    pub snap: bool,
    pub l3: bool,
    pub ipv4: bool,
    pub ipv6: bool,
    pub arp: bool,
    pub ipopt: bool,
    pub ipfrag: bool,
    pub l4: bool,
    pub tcp: bool,
    pub tcpopt: bool,
    pub udp: bool,
    pub icmp: bool,
    pub ipsec: bool,
    pub vxlan: bool,
}

/// Parse result as zero-copy offsets into the original frame.
#[derive(Clone, Copy, Debug)]
pub struct ParsedPacket<'a> {
    frame: &'a [u8],
    pub flags: InputFlags,
    error: Option<ParseError>,
    ethtype_outer: Option<u16>,
    ethtype: Option<u16>,
    /// Outer then inner tag control information.
    vlan_tci: [Option<u16>; 2],
    l3_offset: Option<usize>,
    l3_len: usize,
    ip_proto: Option<u8>,
    l4_offset: Option<usize>,
    l4_protocol: u8,
    l4_len: usize,
    payload_offset: Option<usize>,
}

impl<'a> ParsedPacket<'a> {
    fn unparsed(frame: &'a [u8]) -> Self {
        Self {
            frame,
            flags: InputFlags::default(),
            error: None,
            ethtype_outer: None,
            ethtype: None,
            vlan_tci: [None; 2],
            l3_offset: None,
            l3_len: 0,
            ip_proto: None,
            l4_offset: None,
            l4_protocol: IPPROTO_INVALID,
            l4_len: 0,
            payload_offset: None,
        }
    }

    fn parse_layers(&mut self) -> Result<(), ParseError> {
        let frame = self.frame;
        let mut ethtype =
            read_be16(frame, ETH_HDR_LEN - 2).ok_or(ParseError::Truncated(Layer::Ethernet))?;
        self.flags.eth = true;
        self.flags.jumbo = frame.len() > ETH_LEN_MAX;
        self.ethtype_outer = Some(ethtype);
        let mut offset = ETH_HDR_LEN;

        if ethtype == ETHTYPE_VLAN_OUTER || ethtype == ETHTYPE_VLAN {
            self.flags.vlan = true;
            self.flags.vlan_qinq = ethtype == ETHTYPE_VLAN_OUTER;
            let (tci, next) = self.vlan_tag(offset)?;
            self.vlan_tci[0] = Some(tci);
            ethtype = next;
            offset += VLAN_HDR_LEN;

            if ethtype == ETHTYPE_VLAN {
                self.flags.vlan_qinq = true;
                let (tci, next) = self.vlan_tag(offset)?;
                self.vlan_tci[1] = Some(tci);
                ethtype = next;
                offset += VLAN_HDR_LEN;
            }
        }

        if ethtype <= ETH_PAYLOAD_MAX {
            self.flags.snap = true;
            if usize::from(ethtype) > frame.len().saturating_sub(offset) {
                return Err(ParseError::SnapLength);
            }
            ethtype = read_be16(frame, offset + SNAP_HDR_LEN - 2)
                .ok_or(ParseError::Truncated(Layer::Snap))?;
            offset += SNAP_HDR_LEN;
        }

        self.ethtype = Some(ethtype);
        self.flags.l3 = true;
        self.l3_offset = Some(offset);

        let proto = match ethtype {
            ETHTYPE_IPV4 => {
                self.flags.ipv4 = true;
                self.parse_ipv4(&mut offset)?
            }
            ETHTYPE_IPV6 => {
                self.flags.ipv6 = true;
                self.parse_ipv6(&mut offset)?
            }
            ETHTYPE_ARP => {
                self.flags.arp = true;
                IPPROTO_INVALID
            }
            _ => {
                self.flags.l3 = false;
                self.l3_offset = None;
                IPPROTO_INVALID
            }
        };

        self.flags.l4 = true;
        self.l4_offset = Some(offset);
        self.l4_protocol = proto;

        match proto {
            IPPROTO_ICMP | IPPROTO_ICMPV6 => self.flags.icmp = true,
            IPPROTO_TCP => {
                self.flags.tcp = true;
                self.parse_tcp(&mut offset)?;
            }
            IPPROTO_UDP => {
                self.flags.udp = true;
                self.parse_udp(&mut offset)?;
            }
            IPPROTO_AH | IPPROTO_ESP => {
                self.flags.ipsec = true;
                let need = if proto == IPPROTO_AH { AH_HDR_LEN } else { ESP_HDR_LEN };
                if frame.len() < offset + need {
                    return Err(ParseError::Truncated(Layer::Ipsec));
                }
            }
            _ => {
                self.flags.l4 = false;
                self.l4_offset = None;
            }
        }

        // Past TCP and UDP this is application payload; otherwise it points
        // at the last header recognised.
        self.payload_offset = Some(offset);
        Ok(())
    }

    fn vlan_tag(&self, offset: usize) -> Result<(u16, u16), ParseError> {
        let tci = read_be16(self.frame, offset).ok_or(ParseError::Truncated(Layer::Vlan))?;
        let next = read_be16(self.frame, offset + 2).ok_or(ParseError::Truncated(Layer::Vlan))?;
        Ok((tci, next))
    }

    fn parse_ipv4(&mut self, offset: &mut usize) -> Result<u8, ParseError> {
        let start = *offset;
        let hdr = self
            .frame
            .get(start..start + IPV4_HDR_LEN)
            .ok_or(ParseError::Truncated(Layer::Ipv4))?;
        let version = hdr[0] >> 4;
        let ihl = hdr[0] & 0x0F;
        let hdr_len = usize::from(ihl) * 4;
        self.l3_len = usize::from(u16::from_be_bytes([hdr[2], hdr[3]]));

        if ihl < IPV4_IHL_MIN
            || version != 4
            || self.l3_len < hdr_len
            || self.l3_len > self.frame.len() - start
        {
            return Err(ParseError::Ipv4Header);
        }

        *offset += hdr_len;
        self.flags.ipopt = ihl > IPV4_IHL_MIN;

        // More-fragments flag or a nonzero fragment offset.
        let frag = u16::from_be_bytes([hdr[6], hdr[7]]);
        self.flags.ipfrag = frag & 0x3FFF != 0;
        let proto = hdr[9];
        self.ip_proto = Some(proto);

        if frag & 0x1FFF != 0 {
            // Only the first fragment carries the transport header.
            return Ok(IPPROTO_INVALID);
        }
        Ok(proto)
    }

    fn parse_ipv6(&mut self, offset: &mut usize) -> Result<u8, ParseError> {
        let start = *offset;
        let hdr = self
            .frame
            .get(start..start + IPV6_HDR_LEN)
            .ok_or(ParseError::Truncated(Layer::Ipv6))?;
        let version = hdr[0] >> 4;
        self.l3_len = IPV6_HDR_LEN + usize::from(u16::from_be_bytes([hdr[4], hdr[5]]));

        if version != 6 || self.l3_len > self.frame.len() - start {
            return Err(ParseError::Ipv6Header);
        }

        *offset += IPV6_HDR_LEN;
        let end = start + self.l3_len;
        let mut next = hdr[6];

        while next == IPPROTO_HOPOPTS || next == IPPROTO_ROUTE {
            self.flags.ipopt = true;
            let ext_next =
                read_u8(self.frame, *offset).ok_or(ParseError::Truncated(Layer::Ipv6))?;
            let ext_len =
                read_u8(self.frame, *offset + 1).ok_or(ParseError::Truncated(Layer::Ipv6))?;
            *offset += 8 + usize::from(ext_len) * 8;
            next = ext_next;
            if *offset > end {
                return Err(ParseError::Ipv6Header);
            }
        }

        if next == IPPROTO_FRAG {
            self.flags.ipopt = true;
            self.flags.ipfrag = true;
        }
        self.ip_proto = Some(next);
        Ok(next)
    }

    fn parse_tcp(&mut self, offset: &mut usize) -> Result<(), ParseError> {
        let start = *offset;
        let hdr = self
            .frame
            .get(start..start + TCP_HDR_LEN)
            .ok_or(ParseError::Truncated(Layer::Tcp))?;
        let data_offset = hdr[12] >> 4;
        self.l4_len = self.l3_end().saturating_sub(start);

        if usize::from(data_offset) * 4 < TCP_HDR_LEN {
            return Err(ParseError::TcpHeader);
        }
        if start + usize::from(data_offset) * 4 > self.frame.len() {
            return Err(ParseError::Truncated(Layer::Tcp));
        }
        self.flags.tcpopt = usize::from(data_offset) * 4 > TCP_HDR_LEN;
        *offset += usize::from(data_offset) * 4;
        Ok(())
    }

    fn parse_udp(&mut self, offset: &mut usize) -> Result<(), ParseError> {
        let start = *offset;
        let hdr = self
            .frame
            .get(start..start + UDP_HDR_LEN)
            .ok_or(ParseError::Truncated(Layer::Udp))?;
        let dport = u16::from_be_bytes([hdr[2], hdr[3]]);
        self.l4_len = usize::from(u16::from_be_bytes([hdr[4], hdr[5]]));

        if self.l4_len < UDP_HDR_LEN || self.l4_len > self.l3_end().saturating_sub(start) {
            return Err(ParseError::UdpLength);
        }
        *offset += UDP_HDR_LEN;

        // VXLAN: flags byte with the valid-VNI bit set.
        if dport == VXLAN_PORT && self.l4_len >= UDP_HDR_LEN + VXLAN_HDR_LEN {
            self.flags.vxlan = read_u8(self.frame, *offset).is_some_and(|f| f & 0x08 != 0);
        }
        Ok(())
    }

    fn l3_end(&self) -> usize {
        self.l3_offset
            .map_or(self.frame.len(), |offset| offset + self.l3_len)
    }

    /// The frame this parse describes.
    #[inline]
    pub fn frame(&self) -> &'a [u8] {
        self.frame
    }

    #[inline]
    pub fn frame_len(&self) -> usize {
        self.frame.len()
    }

    /// First fault found, if the frame is malformed.
    #[inline]
    pub fn error(&self) -> Option<ParseError> {
        self.error
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn l3_offset(&self) -> Option<usize> {
        self.l3_offset
    }

    /// Length of the L3 datagram, header included.
    pub fn l3_len(&self) -> usize {
        self.l3_len
    }

    pub fn l4_offset(&self) -> Option<usize> {
        self.l4_offset
    }

    pub fn l4_len(&self) -> usize {
        self.l4_len
    }

    pub fn payload_offset(&self) -> Option<usize> {
        self.payload_offset
    }

    /// Destination MAC as a 48-bit integer.
    pub fn dmac(&self) -> Option<u64> {
        self.flags
            .eth
            .then(|| read_be_uint(self.frame, 0, ETH_ADDR_LEN))
            .flatten()
    }

    pub fn smac(&self) -> Option<u64> {
        self.flags
            .eth
            .then(|| read_be_uint(self.frame, ETH_ADDR_LEN, ETH_ADDR_LEN))
            .flatten()
    }

    /// Ethertype directly after the MAC addresses.
    pub fn ethtype_outer(&self) -> Option<u16> {
        self.ethtype_outer
    }

    /// Ethertype of the L3 header, past any VLAN tags and LLC/SNAP.
    pub fn ethtype(&self) -> Option<u16> {
        self.ethtype
    }

    pub fn vlan_outer(&self) -> Option<u16> {
        self.vlan_tci[0].map(|tci| tci & 0x0FFF)
    }

    /// Innermost VLAN id; the only tag of a single-tagged frame.
    pub fn vlan_inner(&self) -> Option<u16> {
        self.vlan_tci[1].or(self.vlan_tci[0]).map(|tci| tci & 0x0FFF)
    }

    /// Priority code point of the outer tag.
    pub fn vlan_priority(&self) -> Option<u8> {
        self.vlan_tci[0].map(|tci| (tci >> 13) as u8)
    }

    /// Transport protocol announced by the IP header.
    pub fn ip_proto(&self) -> Option<u8> {
        self.ip_proto
    }

    pub fn ipv4_saddr(&self) -> Option<u32> {
        self.ipv4_field(12)
    }

    pub fn ipv4_daddr(&self) -> Option<u32> {
        self.ipv4_field(16)
    }

    fn ipv4_field(&self, at: usize) -> Option<u32> {
        if !self.flags.ipv4 {
            return None;
        }
        read_be32(self.frame, self.l3_offset? + at)
    }

    pub fn ipv6_saddr(&self) -> Option<u128> {
        self.ipv6_field(8)
    }

    pub fn ipv6_daddr(&self) -> Option<u128> {
        self.ipv6_field(24)
    }

    fn ipv6_field(&self, at: usize) -> Option<u128> {
        if !self.flags.ipv6 {
            return None;
        }
        read_be128(self.frame, self.l3_offset? + at)
    }

    /// Differentiated services code point of an IPv4 or IPv6 header.
    pub fn dscp(&self) -> Option<u8> {
        let l3 = self.l3_offset?;
        if self.flags.ipv4 {
            read_u8(self.frame, l3 + 1).map(|tos| tos >> 2)
        } else if self.flags.ipv6 {
            read_be32(self.frame, l3).map(|word| ((word >> 22) & 0x3F) as u8)
        } else {
            None
        }
    }

    pub fn tcp_sport(&self) -> Option<u16> {
        self.l4_port(self.flags.tcp, 0)
    }

    pub fn tcp_dport(&self) -> Option<u16> {
        self.l4_port(self.flags.tcp, 2)
    }

    pub fn udp_sport(&self) -> Option<u16> {
        self.l4_port(self.flags.udp, 0)
    }

    pub fn udp_dport(&self) -> Option<u16> {
        self.l4_port(self.flags.udp, 2)
    }

    fn l4_port(&self, present: bool, at: usize) -> Option<u16> {
        if !present {
            return None;
        }
        read_be16(self.frame, self.l4_offset? + at)
    }

    /// Security parameter index of an AH or ESP header.
    pub fn ipsec_spi(&self) -> Option<u32> {
        if !self.flags.ipsec {
            return None;
        }
        let l4 = self.l4_offset?;
        match self.l4_protocol {
            IPPROTO_AH => read_be32(self.frame, l4 + 4),
            IPPROTO_ESP => read_be32(self.frame, l4),
            _ => None,
        }
    }

    /// VXLAN network identifier (24 bits).
    pub fn vxlan_vni(&self) -> Option<u32> {
        if !self.flags.vxlan {
            return None;
        }
        read_be32(self.frame, self.l4_offset? + UDP_HDR_LEN + 4).map(|word| word >> 8)
    }

    /// `len` raw bytes at `offset` from the start of the frame.
    pub fn bytes(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        self.frame.get(offset..offset.checked_add(len)?)
    }
}

/// Stateless frame parser.
#[derive(Default, Debug, Copy, Clone)]
pub struct PacketParser;

impl PacketParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses as far as the frame allows. Faults are recorded in the result
    /// rather than returned, together with every layer found before them.
    pub fn parse<'a>(&self, frame: &'a [u8]) -> ParsedPacket<'a> {
        let mut pkt = ParsedPacket::unparsed(frame);
        if let Err(err) = pkt.parse_layers() {
            pkt.error = Some(err);
        }
        pkt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FrameBuilder;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn parse(frame: &[u8]) -> ParsedPacket<'_> {
        PacketParser::new().parse(frame)
    }

    #[test]
    fn test_udp_over_ipv4() {
        let frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
            .dscp(0x2E)
            .udp(5000, 53)
            .payload(b"query")
            .build();
        let pkt = parse(&frame);
        assert_eq!(pkt.error(), None);
        assert!(pkt.flags.eth && pkt.flags.l3 && pkt.flags.ipv4 && pkt.flags.udp);
        assert_eq!(pkt.ethtype(), Some(ETHTYPE_IPV4));
        assert_eq!(pkt.l3_offset(), Some(ETH_HDR_LEN));
        assert_eq!(pkt.l4_offset(), Some(ETH_HDR_LEN + IPV4_HDR_LEN));
        assert_eq!(pkt.ip_proto(), Some(IPPROTO_UDP));
        assert_eq!(pkt.ipv4_saddr(), Some(0x0A00_0001));
        assert_eq!(pkt.ipv4_daddr(), Some(0x0A00_0002));
        assert_eq!(pkt.udp_sport(), Some(5000));
        assert_eq!(pkt.udp_dport(), Some(53));
        assert_eq!(pkt.tcp_dport(), None);
        assert_eq!(pkt.dscp(), Some(0x2E));
        assert_eq!(pkt.l4_len(), UDP_HDR_LEN + 5);
        let payload = pkt.payload_offset().unwrap();
        assert_eq!(pkt.bytes(payload, 5), Some(&b"query"[..]));
    }

    #[test]
    fn test_tcp_over_ipv6() {
        let frame = FrameBuilder::new()
            .ipv6(Ipv6Addr::LOCALHOST, "2001:db8::42".parse().unwrap())
            .dscp(10)
            .tcp(40000, 443)
            .build();
        let pkt = parse(&frame);
        assert_eq!(pkt.error(), None);
        assert!(pkt.flags.ipv6 && pkt.flags.tcp && !pkt.flags.tcpopt);
        assert_eq!(pkt.tcp_sport(), Some(40000));
        assert_eq!(pkt.tcp_dport(), Some(443));
        assert_eq!(pkt.ipv6_saddr(), Some(1));
        assert_eq!(pkt.ipv6_daddr().map(|a| a as u64), Some(0x42));
        assert_eq!(pkt.ipv4_saddr(), None);
        assert_eq!(pkt.dscp(), Some(10));
    }

    #[test]
    fn test_vlan_tags() {
        let single = FrameBuilder::new().vlan(100, 5).build();
        let pkt = parse(&single);
        assert!(pkt.flags.vlan && !pkt.flags.vlan_qinq);
        assert_eq!(pkt.ethtype_outer(), Some(ETHTYPE_VLAN));
        assert_eq!(pkt.ethtype(), Some(ETHTYPE_EXPERIMENTAL));
        assert_eq!(pkt.vlan_outer(), Some(100));
        assert_eq!(pkt.vlan_inner(), Some(100));
        assert_eq!(pkt.vlan_priority(), Some(5));
        assert!(!pkt.flags.l3);

        let double = FrameBuilder::new()
            .qinq(10, 20)
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .build();
        let pkt = parse(&double);
        assert!(pkt.flags.vlan_qinq);
        assert_eq!(pkt.ethtype_outer(), Some(ETHTYPE_VLAN_OUTER));
        assert_eq!(pkt.vlan_outer(), Some(10));
        assert_eq!(pkt.vlan_inner(), Some(20));
        assert_eq!(pkt.l3_offset(), Some(ETH_HDR_LEN + 2 * VLAN_HDR_LEN));
        assert!(pkt.flags.ipv4);
    }

    #[test]
    fn test_ipsec_spi() {
        let esp = FrameBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .esp(0xDEAD_BEEF)
            .build();
        assert_eq!(parse(&esp).ipsec_spi(), Some(0xDEAD_BEEF));

        let ah = FrameBuilder::new()
            .ipv6(Ipv6Addr::LOCALHOST, Ipv6Addr::LOCALHOST)
            .ah(7)
            .build();
        let pkt = parse(&ah);
        assert!(pkt.flags.ipsec);
        assert_eq!(pkt.ipsec_spi(), Some(7));
    }

    #[test]
    fn test_vxlan_vni() {
        let frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .vxlan(0x00AB_CDEF)
            .build();
        let pkt = parse(&frame);
        assert!(pkt.flags.vxlan);
        assert_eq!(pkt.udp_dport(), Some(VXLAN_PORT));
        assert_eq!(pkt.vxlan_vni(), Some(0x00AB_CDEF));
    }

    #[test]
    fn test_truncated_frames() {
        assert_eq!(
            parse(&[0u8; 10]).error(),
            Some(ParseError::Truncated(Layer::Ethernet))
        );

        let frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .tcp(1, 2)
            .build();
        let cut = &frame[..ETH_HDR_LEN + 10];
        let pkt = parse(cut);
        assert_eq!(pkt.error(), Some(ParseError::Truncated(Layer::Ipv4)));
        assert!(pkt.flags.ipv4);
        assert!(!pkt.flags.tcp);
    }

    #[test]
    fn test_bad_ip_headers() {
        let mut frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .udp(1, 2)
            .build()
            .to_vec();
        frame[ETH_HDR_LEN] = 0x44;
        assert_eq!(parse(&frame).error(), Some(ParseError::Ipv4Header));

        frame[ETH_HDR_LEN] = 0x45;
        frame[ETH_HDR_LEN + 2] = 0xFF;
        assert_eq!(parse(&frame).error(), Some(ParseError::Ipv4Header));
    }

    #[test]
    fn test_bad_udp_length() {
        let mut frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .udp(1, 2)
            .build()
            .to_vec();
        let l4 = ETH_HDR_LEN + IPV4_HDR_LEN;
        frame[l4 + 4] = 0;
        frame[l4 + 5] = 4;
        let pkt = parse(&frame);
        assert_eq!(pkt.error(), Some(ParseError::UdpLength));
        assert_eq!(pkt.error().map(|e| e.layer()), Some(Layer::Udp));
    }

    #[test]
    fn test_later_fragment_has_no_transport() {
        let mut frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .udp(1, 2)
            .build()
            .to_vec();
        frame[ETH_HDR_LEN + 7] = 0x10;
        let pkt = parse(&frame);
        assert_eq!(pkt.error(), None);
        assert!(pkt.flags.ipfrag);
        assert!(!pkt.flags.udp && !pkt.flags.l4);
        assert_eq!(pkt.ip_proto(), Some(IPPROTO_UDP));
    }

    #[test]
    fn test_snap_encapsulation() {
        let mut frame = vec![0u8; ETH_LEN_MIN];
        frame[12..14].copy_from_slice(&46u16.to_be_bytes());
        frame[ETH_HDR_LEN..ETH_HDR_LEN + 6].copy_from_slice(&[0xAA, 0xAA, 0x03, 0, 0, 0]);
        frame[ETH_HDR_LEN + 6..ETH_HDR_LEN + 8].copy_from_slice(&ETHTYPE_ARP.to_be_bytes());
        let pkt = parse(&frame);
        assert_eq!(pkt.error(), None);
        assert!(pkt.flags.snap && pkt.flags.arp);
        assert_eq!(pkt.l3_offset(), Some(ETH_HDR_LEN + SNAP_HDR_LEN));

        frame[12..14].copy_from_slice(&1000u16.to_be_bytes());
        assert_eq!(parse(&frame).error(), Some(ParseError::SnapLength));
    }
}
