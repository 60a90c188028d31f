//! Wire constants and big-endian field readers.

pub const ETH_ADDR_LEN: usize = 6;
pub const ETH_HDR_LEN: usize = 14;
/// Shortest frame on the wire, without FCS.
pub const ETH_LEN_MIN: usize = 60;
/// Largest non-jumbo frame, without FCS.
pub const ETH_LEN_MAX: usize = 1514;
/// Ethertype values up to this are 802.3 length fields.
pub const ETH_PAYLOAD_MAX: u16 = 1500;
pub const VLAN_HDR_LEN: usize = 4;
pub const SNAP_HDR_LEN: usize = 8;

pub const ETHTYPE_IPV4: u16 = 0x0800;
pub const ETHTYPE_ARP: u16 = 0x0806;
pub const ETHTYPE_VLAN: u16 = 0x8100;
pub const ETHTYPE_IPV6: u16 = 0x86DD;
pub const ETHTYPE_VLAN_OUTER: u16 = 0x88A8;
/// IEEE 802 local experimental ethertype.
pub const ETHTYPE_EXPERIMENTAL: u16 = 0x88B5;

pub const IPV4_HDR_LEN: usize = 20;
pub const IPV4_IHL_MIN: u8 = 5;
pub const IPV6_HDR_LEN: usize = 40;

pub const IPPROTO_HOPOPTS: u8 = 0;
pub const IPPROTO_ICMP: u8 = 1;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;
pub const IPPROTO_ROUTE: u8 = 43;
pub const IPPROTO_FRAG: u8 = 44;
pub const IPPROTO_ESP: u8 = 50;
pub const IPPROTO_AH: u8 = 51;
pub const IPPROTO_NONE: u8 = 59;
pub const IPPROTO_ICMPV6: u8 = 58;
/// Reserved by IANA; marks "no transport protocol".
pub const IPPROTO_INVALID: u8 = 255;

pub const TCP_HDR_LEN: usize = 20;
pub const UDP_HDR_LEN: usize = 8;
pub const ESP_HDR_LEN: usize = 8;
pub const AH_HDR_LEN: usize = 12;

pub const VXLAN_PORT: u16 = 4789;
pub const VXLAN_HDR_LEN: usize = 8;

#[inline]
pub fn read_u8(frame: &[u8], at: usize) -> Option<u8> {
    frame.get(at).copied()
}

#[inline]
pub fn read_be16(frame: &[u8], at: usize) -> Option<u16> {
    let bytes = frame.get(at..at.checked_add(2)?)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

#[inline]
pub fn read_be32(frame: &[u8], at: usize) -> Option<u32> {
    let bytes = frame.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Reads up to eight bytes as a big-endian integer.
#[inline]
pub fn read_be_uint(frame: &[u8], at: usize, len: usize) -> Option<u64> {
    if len > 8 {
        return None;
    }
    let bytes = frame.get(at..at.checked_add(len)?)?;
    Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

#[inline]
pub fn read_be128(frame: &[u8], at: usize) -> Option<u128> {
    let bytes = frame.get(at..at.checked_add(16)?)?;
    Some(bytes.iter().fold(0u128, |acc, b| (acc << 8) | u128::from(*b)))
}
