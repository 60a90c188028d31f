//! # Strom Protocol Parsers
//!
//! L2-L4 header parsing for packet classification. The parser never fails
//! outright: malformed frames come back with an error recorded next to
//! whatever layers were recognised before the fault, so the classifier can
//! still route them to an error class of service.

pub mod builder;
pub mod error;
pub mod headers;
pub mod parser;

pub use builder::FrameBuilder;
pub use error::{Layer, ParseError};
pub use parser::{InputFlags, PacketParser, ParsedPacket};
