use proptest::prelude::*;
use std::net::Ipv4Addr;

use strom_protocols::{FrameBuilder, PacketParser};

proptest! {
    #[test]
    fn parser_never_reads_past_the_frame(frame in proptest::collection::vec(any::<u8>(), 0..256)) {
        let pkt = PacketParser::new().parse(&frame);
        if let Some(offset) = pkt.payload_offset() {
            prop_assert!(offset <= frame.len() || pkt.is_error());
        }
        // Accessors stay within bounds whatever the flags claim.
        let _ = (pkt.dmac(), pkt.ipv4_saddr(), pkt.ipv6_daddr(), pkt.tcp_dport());
        let _ = (pkt.udp_sport(), pkt.ipsec_spi(), pkt.vxlan_vni(), pkt.dscp());
    }

    #[test]
    fn truncation_is_reported(cut in 0usize..42) {
        let frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::new(10, 1, 1, 1), Ipv4Addr::new(10, 1, 1, 2))
            .udp(1234, 80)
            .build();
        let pkt = PacketParser::new().parse(&frame[..cut]);
        prop_assert!(pkt.is_error());
    }

    #[test]
    fn ports_survive_parsing(sport in any::<u16>(), dport in any::<u16>()) {
        let frame = FrameBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .tcp(sport, dport)
            .build();
        let pkt = PacketParser::new().parse(&frame);
        prop_assert_eq!(pkt.tcp_sport(), Some(sport));
        prop_assert_eq!(pkt.tcp_dport(), Some(dport));
    }
}
