//! Frame construction for loopback traffic, tests and benchmarks.

use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{BufMut, Bytes, BytesMut};

use crate::headers::*;

#[derive(Clone, Debug)]
enum Network {
    Raw(u16),
    Ipv4 { src: Ipv4Addr, dst: Ipv4Addr },
    Ipv6 { src: Ipv6Addr, dst: Ipv6Addr },
}

#[derive(Clone, Debug)]
enum Transport {
    None,
    Tcp { sport: u16, dport: u16 },
    Udp { sport: u16, dport: u16 },
    Vxlan { vni: u32 },
    Esp { spi: u32 },
    Ah { spi: u32 },
}

/// Builds well-formed Ethernet frames, padded to the wire minimum.
#[derive(Clone, Debug)]
pub struct FrameBuilder {
    dmac: [u8; ETH_ADDR_LEN],
    smac: [u8; ETH_ADDR_LEN],
    /// (TPID, TCI) pairs, outermost first.
    tags: Vec<(u16, u16)>,
    network: Network,
    dscp: u8,
    transport: Transport,
    payload: Vec<u8>,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            dmac: [0x02, 0, 0, 0, 0, 0x02],
            smac: [0x02, 0, 0, 0, 0, 0x01],
            tags: Vec::new(),
            network: Network::Raw(ETHTYPE_EXPERIMENTAL),
            dscp: 0,
            transport: Transport::None,
            payload: Vec::new(),
        }
    }

    pub fn dmac(mut self, mac: [u8; ETH_ADDR_LEN]) -> Self {
        self.dmac = mac;
        self
    }

    pub fn smac(mut self, mac: [u8; ETH_ADDR_LEN]) -> Self {
        self.smac = mac;
        self
    }

    /// Single 802.1Q tag.
    pub fn vlan(mut self, vid: u16, pcp: u8) -> Self {
        self.tags = vec![(ETHTYPE_VLAN, tci(vid, pcp))];
        self
    }

    /// 802.1ad service tag followed by a customer tag.
    pub fn qinq(mut self, outer_vid: u16, inner_vid: u16) -> Self {
        self.tags = vec![
            (ETHTYPE_VLAN_OUTER, tci(outer_vid, 0)),
            (ETHTYPE_VLAN, tci(inner_vid, 0)),
        ];
        self
    }

    /// Non-IP frame with the given ethertype.
    pub fn ethertype(mut self, ethtype: u16) -> Self {
        self.network = Network::Raw(ethtype);
        self
    }

    pub fn ipv4(mut self, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        self.network = Network::Ipv4 { src, dst };
        self
    }

    pub fn ipv6(mut self, src: Ipv6Addr, dst: Ipv6Addr) -> Self {
        self.network = Network::Ipv6 { src, dst };
        self
    }

    pub fn dscp(mut self, dscp: u8) -> Self {
        self.dscp = dscp & 0x3F;
        self
    }

    pub fn tcp(mut self, sport: u16, dport: u16) -> Self {
        self.transport = Transport::Tcp { sport, dport };
        self
    }

    pub fn udp(mut self, sport: u16, dport: u16) -> Self {
        self.transport = Transport::Udp { sport, dport };
        self
    }

    /// UDP to the VXLAN port carrying a VXLAN header.
    pub fn vxlan(mut self, vni: u32) -> Self {
        self.transport = Transport::Vxlan { vni: vni & 0x00FF_FFFF };
        self
    }

    pub fn esp(mut self, spi: u32) -> Self {
        self.transport = Transport::Esp { spi };
        self
    }

    pub fn ah(mut self, spi: u32) -> Self {
        self.transport = Transport::Ah { spi };
        self
    }

    pub fn payload(mut self, data: &[u8]) -> Self {
        self.payload = data.to_vec();
        self
    }

    pub fn build(&self) -> Bytes {
        let (proto, l4) = self.transport_bytes();

        let mut frame = BytesMut::with_capacity(ETH_LEN_MIN.max(64 + l4.len()));
        frame.put_slice(&self.dmac);
        frame.put_slice(&self.smac);
        for (tpid, tci) in &self.tags {
            frame.put_u16(*tpid);
            frame.put_u16(*tci);
        }

        match &self.network {
            Network::Raw(ethtype) => {
                frame.put_u16(*ethtype);
                frame.put_slice(&l4);
            }
            Network::Ipv4 { src, dst } => {
                frame.put_u16(ETHTYPE_IPV4);
                let mut hdr = [0u8; IPV4_HDR_LEN];
                hdr[0] = 0x45;
                hdr[1] = self.dscp << 2;
                hdr[2..4].copy_from_slice(&((IPV4_HDR_LEN + l4.len()) as u16).to_be_bytes());
                hdr[8] = 64;
                hdr[9] = proto;
                hdr[12..16].copy_from_slice(&src.octets());
                hdr[16..20].copy_from_slice(&dst.octets());
                let csum = ipv4_checksum(&hdr);
                hdr[10..12].copy_from_slice(&csum.to_be_bytes());
                frame.put_slice(&hdr);
                frame.put_slice(&l4);
            }
            Network::Ipv6 { src, dst } => {
                frame.put_u16(ETHTYPE_IPV6);
                frame.put_u32((6 << 28) | (u32::from(self.dscp) << 22));
                frame.put_u16(l4.len() as u16);
                frame.put_u8(proto);
                frame.put_u8(64);
                frame.put_slice(&src.octets());
                frame.put_slice(&dst.octets());
                frame.put_slice(&l4);
            }
        }

        if frame.len() < ETH_LEN_MIN {
            frame.resize(ETH_LEN_MIN, 0);
        }
        frame.freeze()
    }

    fn transport_bytes(&self) -> (u8, BytesMut) {
        let mut l4 = BytesMut::new();
        let proto = match self.transport {
            Transport::None => IPPROTO_NONE,
            Transport::Tcp { sport, dport } => {
                l4.put_u16(sport);
                l4.put_u16(dport);
                l4.put_u32(0);
                l4.put_u32(0);
                l4.put_u8(0x50);
                l4.put_u8(0x02);
                l4.put_u16(0xFFFF);
                l4.put_u32(0);
                IPPROTO_TCP
            }
            Transport::Udp { sport, dport } => {
                l4.put_u16(sport);
                l4.put_u16(dport);
                l4.put_u16((UDP_HDR_LEN + self.payload.len()) as u16);
                l4.put_u16(0);
                IPPROTO_UDP
            }
            Transport::Vxlan { vni } => {
                l4.put_u16(VXLAN_PORT);
                l4.put_u16(VXLAN_PORT);
                l4.put_u16((UDP_HDR_LEN + VXLAN_HDR_LEN + self.payload.len()) as u16);
                l4.put_u16(0);
                l4.put_u32(0x0800_0000);
                l4.put_u32(vni << 8);
                IPPROTO_UDP
            }
            Transport::Esp { spi } => {
                l4.put_u32(spi);
                l4.put_u32(1);
                IPPROTO_ESP
            }
            Transport::Ah { spi } => {
                l4.put_u8(IPPROTO_NONE);
                // Length in 32-bit words, minus two.
                l4.put_u8((AH_HDR_LEN / 4 - 2) as u8);
                l4.put_u16(0);
                l4.put_u32(spi);
                l4.put_u32(1);
                IPPROTO_AH
            }
        };
        l4.put_slice(&self.payload);
        (proto, l4)
    }
}

fn tci(vid: u16, pcp: u8) -> u16 {
    (u16::from(pcp & 0x07) << 13) | (vid & 0x0FFF)
}

fn ipv4_checksum(hdr: &[u8; IPV4_HDR_LEN]) -> u16 {
    let mut sum: u32 = hdr
        .chunks_exact(2)
        .map(|pair| u32::from(u16::from_be_bytes([pair[0], pair[1]])))
        .sum();
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_minimum() {
        let frame = FrameBuilder::new().build();
        assert_eq!(frame.len(), ETH_LEN_MIN);
        assert_eq!(&frame[12..14], &ETHTYPE_EXPERIMENTAL.to_be_bytes());
    }

    #[test]
    fn ipv4_checksum_verifies() {
        let frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2))
            .udp(1, 2)
            .build();
        let mut hdr = [0u8; IPV4_HDR_LEN];
        hdr.copy_from_slice(&frame[ETH_HDR_LEN..ETH_HDR_LEN + IPV4_HDR_LEN]);
        // Summing a header that includes its checksum yields zero.
        assert_eq!(ipv4_checksum(&hdr), 0);
    }
}
