//! Defines ITM/DWT packets and their possible contents.

use crate::dwt::DwtEvent;
use crate::error::MalformedPacket;

/// The set of valid packet types that can be decoded.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TracePacket {
    // Synchronization packet category (Appendix D4, p. 782)
    /// A synchronization packet is a unique pattern in the bitstream:
    /// a run of at least five zero bytes terminated by `0x80`. It is
    /// used to provide the alignment of other packet bytes in the
    /// bitstream. (Appendix D4.2.1)
    Sync {
        /// Number of zero bytes preceding the `0x80` terminator.
        zeros: usize,
    },

    // Protocol packet category (Appendix D4, p. 782)
    /// Found in the bitstream if
    ///
    /// - Software has written to an ITM stimulus port register when the
    /// stimulus port output buffer is full.
    /// - The DWT attempts to generate a hardware source packet when the
    /// DWT output buffer is full.
    /// - The local timestamp counter overflows.
    ///
    /// See (Appendix D4.2.3).
    Overflow,

    /// A delta timestamp that measures the interval since the
    /// generation of the last local timestamp and its relation to the
    /// corresponding ITM/DWT data packets. (Appendix D4.2.4)
    LocalTimestamp {
        /// Whether the value was carried in the header alone or in a
        /// continuation-encoded tail.
        format: LocalTimestampFormat,

        /// Timestamp value.
        ts: u32,

        /// Indicates the relationship between the generation of `ts`
        /// and the corresponding ITM or DWT data packet. Always
        /// [`Sync`](TimestampDataRelation::Sync) for
        /// [`Short`](LocalTimestampFormat::Short) timestamps.
        data_relation: TimestampDataRelation,
    },

    /// An absolute timestamp based on the global timestamp clock that
    /// contain the timestamp's lower-order bits. (Appendix D4.2.5)
    GlobalTimestamp1 {
        /// Lower-order bits of the timestamp; bits\[25:0\]. Compressed
        /// packets omit high-order bits that are unchanged since the
        /// previous GTS1.
        ts: u32,

        /// Set if higher order bits output by the last GTS2 have
        /// changed.
        wrap: bool,

        /// Set if the system has asserted a clock change input to the
        /// processor since the last generated global timestamp.
        clkch: bool,
    },

    /// An absolute timestamp based on the global timestamp clock that
    /// contain the timestamp's higher-order bits. (Appendix D4.2.5)
    GlobalTimestamp2 {
        /// Higher-order bits of the timestamp value; bits\[47:26\] or
        /// bits\[63:26\] depending on
        /// [`DecoderOptions::gts_width`](crate::DecoderOptions::gts_width).
        ts: u64,
    },

    /// A packet that provides additional information about the
    /// identified source. On ARMv7-M this packet selects the page of
    /// the stimulus ports (ITM) or discriminator IDs (DWT) used by
    /// subsequent source packets. (Appendix D4.2.6)
    Extension {
        /// Which unit the page number applies to.
        source: ExtensionSource,

        /// Page number.
        page: u32,
    },

    // Source packet category
    /// Contains the payload written to the ITM stimulus ports.
    /// (Appendix D4.2.8)
    Instrumentation {
        /// Stimulus port number.
        port: u8,

        /// Payload size as encoded in the header.
        size: PayloadSize,

        /// Instrumentation data written to the stimulus port. LSB first.
        payload: Vec<u8>,
    },

    /// A packet generated by the DWT. Its contents are interpreted by
    /// [`dwt_event`](Self::dwt_event). (Appendix D4.3)
    HardwareSource {
        /// Packet type discriminator ID.
        disc_id: u8,

        /// Payload size as encoded in the header.
        size: PayloadSize,

        /// Hardware event data. LSB first.
        payload: Vec<u8>,
    },
}

impl TracePacket {
    /// Returns the little-endian value of the payload of a source
    /// packet, or `None` for protocol packets.
    pub fn payload_value(&self) -> Option<u32> {
        match self {
            TracePacket::Instrumentation { payload, .. }
            | TracePacket::HardwareSource { payload, .. } => Some(
                payload
                    .iter()
                    .rev()
                    .fold(0, |acc, b| (acc << 8) | u32::from(*b)),
            ),
            _ => None,
        }
    }

    /// Interprets a [`HardwareSource`](Self::HardwareSource) packet as
    /// a DWT event. Returns `None` for any other packet.
    pub fn dwt_event(&self) -> Option<Result<DwtEvent, MalformedPacket>> {
        match self {
            TracePacket::HardwareSource {
                disc_id, payload, ..
            } => Some(DwtEvent::decode(*disc_id, payload)),
            _ => None,
        }
    }
}

/// The two encodings of a local timestamp. (Appendix D4.2.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LocalTimestampFormat {
    /// Format 2: a value between 1-6 carried in the header byte.
    Short,

    /// Format 1: a value carried in up to four continuation-encoded
    /// bytes following the header.
    Long,
}

/// Indicates the relationship between the generation of the local
/// timestamp packet and the corresponding ITM or DWT data packet.
/// (Appendix D4.2.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimestampDataRelation {
    /// The local timestamp value is synchronous to the corresponding
    /// ITM or DWT data. The value in the TS field is the timestamp
    /// counter value when the ITM or DWT packet is generated.
    Sync,

    /// The local timestamp value is delayed relative to the ITM or DWT
    /// data. The value in the TS field is the timestamp counter value
    /// when the Local timestamp packet is generated.
    ///
    /// Note: the local timestamp value corresponding to the previous
    /// ITM or DWT packet is unknown, but must be between the previous
    /// and the current local timestamp values.
    UnknownDelay,

    /// Output of the ITM or DWT packet corresponding to this Local
    /// timestamp packet is delayed relative to the associated event.
    /// The value in the TS field is the timestamp counter value when
    /// the ITM or DWT packets is generated.
    ///
    /// This encoding indicates that the ITM or DWT packet was delayed
    /// relative to other trace output packets.
    AssocEventDelay,

    /// Output of the ITM or DWT packet corresponding to this Local
    /// timestamp packet is delayed relative to the associated event,
    /// and this Local timestamp packet is delayed relative to the ITM
    /// or DWT data. This is a combined condition of `UnknownDelay` and
    /// `AssocEventDelay`.
    UnknownAssocEventDelay,
}

impl TimestampDataRelation {
    /// Maps the TC\[1:0\] field of a local timestamp header.
    pub(crate) fn from_tc(tc: u8) -> Self {
        match tc & 0b11 {
            0b00 => TimestampDataRelation::Sync,
            0b01 => TimestampDataRelation::UnknownDelay,
            0b10 => TimestampDataRelation::AssocEventDelay,
            _ => TimestampDataRelation::UnknownAssocEventDelay,
        }
    }
}

/// The unit an [`Extension`](TracePacket::Extension) packet refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExtensionSource {
    /// SH bit clear: stimulus port page.
    Itm,

    /// SH bit set.
    Dwt,
}

/// Payload size of a source packet. (Appendix D4.2.8, Table D4-4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PayloadSize {
    /// One byte (`ss = 0b01`).
    One,

    /// Two bytes, halfword (`ss = 0b10`).
    Two,

    /// Four bytes, word (`ss = 0b11`).
    Four,
}

impl PayloadSize {
    /// Translates the `ss` field of a source packet header. `0b00`
    /// does not denote a source packet.
    pub(crate) fn from_ss(ss: u8) -> Option<Self> {
        match ss {
            0b01 => Some(PayloadSize::One),
            0b10 => Some(PayloadSize::Two),
            0b11 => Some(PayloadSize::Four),
            _ => None,
        }
    }

    /// Number of payload bytes following the header.
    pub fn len(self) -> usize {
        match self {
            PayloadSize::One => 1,
            PayloadSize::Two => 2,
            PayloadSize::Four => 4,
        }
    }
}
