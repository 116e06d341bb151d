//! Classification of packet header bytes. (Appendix D4.2, Table D4-2)

use bitmatch::bitmatch;

use crate::decoder::GlobalTimestampWidth;
use crate::error::MalformedPacket;
use crate::packet::{
    ExtensionSource, LocalTimestampFormat, PayloadSize, TimestampDataRelation, TracePacket,
};

/// Packets whose header is followed by a fixed number of payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceKind {
    Instrumentation { port: u8 },
    HardwareSource { disc_id: u8 },
}

impl SourceKind {
    pub fn into_packet(self, size: PayloadSize, payload: Vec<u8>) -> TracePacket {
        match self {
            SourceKind::Instrumentation { port } => TracePacket::Instrumentation {
                port,
                size,
                payload,
            },
            SourceKind::HardwareSource { disc_id } => TracePacket::HardwareSource {
                disc_id,
                size,
                payload,
            },
        }
    }
}

/// Packets whose header is followed by a continuation-encoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProtocolKind {
    LocalTimestamp {
        data_relation: TimestampDataRelation,
    },
    GlobalTimestamp1,
    GlobalTimestamp2,
    Extension {
        source: ExtensionSource,
        /// page\[2:0\], carried in the header.
        page: u8,
    },
}

impl ProtocolKind {
    /// Maximum number of bytes after the header.
    pub fn max_len(self, gts_width: GlobalTimestampWidth) -> usize {
        match self {
            ProtocolKind::LocalTimestamp { .. } => 4,
            ProtocolKind::GlobalTimestamp1 => GTS1_MAX_LEN,
            ProtocolKind::GlobalTimestamp2 => gts_width.gts2_len(),
            ProtocolKind::Extension { .. } => 4,
        }
    }
}

pub(crate) const GTS1_MAX_LEN: usize = 4;

/// What a header byte tells about the packet it starts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HeaderDecision {
    /// A zero byte; the packet is decided by the first non-zero byte
    /// that follows.
    Sync,

    /// The header is the whole packet.
    Packet(TracePacket),

    /// A source packet with `size` payload bytes.
    Source { kind: SourceKind, size: PayloadSize },

    /// A protocol packet with a continuation-encoded tail.
    Protocol(ProtocolKind),
}

/// Decodes the first byte of a packet, the header, into a complete
/// packet or the shape of what follows it.
#[allow(clippy::bad_bit_mask)]
#[bitmatch]
pub(crate) fn classify(header: u8) -> Result<HeaderDecision, MalformedPacket> {
    let packet = |p| Ok(HeaderDecision::Packet(p));
    let protocol = |k| Ok(HeaderDecision::Protocol(k));

    #[bitmatch]
    match header {
        // Synchronization packet category
        "0000_0000" => Ok(HeaderDecision::Sync),

        // Protocol packet category
        "0111_0000" => packet(TracePacket::Overflow),
        "11rr_0000" => {
            // Local timestamp, format 1 (LTS1)
            protocol(ProtocolKind::LocalTimestamp {
                data_relation: TimestampDataRelation::from_tc(r),
            })
        }
        "0ttt_0000" => {
            // Local timestamp, format 2 (LTS2)
            packet(TracePacket::LocalTimestamp {
                format: LocalTimestampFormat::Short,
                ts: t.into(),
                data_relation: TimestampDataRelation::Sync,
            })
        }
        "1001_0100" => {
            // Global timestamp, format 1 (GTS1)
            protocol(ProtocolKind::GlobalTimestamp1)
        }
        "1011_0100" => {
            // Global timestamp, format 2 (GTS2)
            protocol(ProtocolKind::GlobalTimestamp2)
        }
        "cppp_1s00" => {
            // Extension packet
            let source = if s == 0 {
                ExtensionSource::Itm
            } else {
                ExtensionSource::Dwt
            };

            if c == 0 {
                packet(TracePacket::Extension {
                    source,
                    page: p.into(),
                })
            } else {
                protocol(ProtocolKind::Extension { source, page: p })
            }
        }

        // Source packet category
        "aaaa_a0ss" => match PayloadSize::from_ss(s) {
            // Instrumentation packet
            Some(size) => Ok(HeaderDecision::Source {
                kind: SourceKind::Instrumentation { port: a },
                size,
            }),
            None => Err(MalformedPacket::InvalidHeader(header)),
        },
        "aaaa_a1ss" => match PayloadSize::from_ss(s) {
            // Hardware source packet
            Some(size) => Ok(HeaderDecision::Source {
                kind: SourceKind::HardwareSource { disc_id: a },
                size,
            }),
            None => Err(MalformedPacket::InvalidHeader(header)),
        },
        #[allow(clippy::identity_op)]
        "hhhh_hhhh" => Err(MalformedPacket::InvalidHeader(h)),
    }
}
