//! Representations of errors returned by this crate.

use crate::decoder::SYNC_MIN_ZEROS;

/// Set of malformed [`TracePacket`](crate::TracePacket)s that can occur
/// during decode or DWT interpretation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MalformedPacket {
    /// Header is invalid (reserved) and cannot be decoded.
    #[error("Header is invalid and cannot be decoded: {}", format!("{:#010b}", .0))]
    InvalidHeader(u8),

    /// A run of zero bytes was not terminated by `0x80`, or was too
    /// short to form a Synchronization packet.
    #[error(
        "Synchronization packet is invalid: {zeros} zero bytes terminated by {terminator:#04x} (expected at least {} zero bytes terminated by 0x80)",
        SYNC_MIN_ZEROS
    )]
    InvalidSync {
        /// Number of zero bytes in the run.
        zeros: usize,

        /// The first non-zero byte after the run.
        terminator: u8,
    },

    /// The type discriminator ID in the hardware source packet header
    /// is invalid.
    #[error("Hardware source packet discriminator ID is invalid: {disc_id}")]
    InvalidHardwareDisc {
        /// The discriminator ID. Potentially invalid.
        disc_id: u8,

        /// Associated payload length.
        size: usize,
    },

    /// The payload of a hardware source packet is of wrong size for its
    /// type discriminator ID.
    #[error("Hardware source packet type discriminator ID ({disc_id}) or payload length ({}) is invalid", .payload.len())]
    InvalidHardwarePacket {
        /// The discriminator ID.
        disc_id: u8,

        /// Associated payload. Potentially invalid length. LSB first.
        payload: Vec<u8>,
    },

    /// An exception trace packet refers to an invalid action.
    #[error("IRQ number {exception} and/or action {function} is invalid")]
    InvalidExceptionTrace {
        /// The exception number.
        exception: u16,

        /// Numerical representation of the function associated with the
        /// exception number.
        function: u8,
    },

    /// The payload length of a PCSample packet is invalid.
    #[error("Payload length of PC sample is invalid: {}", .payload.len())]
    InvalidPCSampleSize {
        /// The payload constituting the PC value, of invalid size. LSB first.
        payload: Vec<u8>,
    },
}

/// A malformed byte sequence that the decoder skipped over.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("{packet} (at stream offset {offset})")]
pub struct DecodeFault {
    /// Offset of the first byte of [`bytes`](Self::bytes) counted from
    /// the first byte ever given to the decoder.
    pub offset: u64,

    /// The bytes discarded by this fault.
    pub bytes: Vec<u8>,

    /// Why the bytes could not be decoded.
    #[source]
    pub packet: MalformedPacket,
}

/// Set of errors that can occur during decode.
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    /// The byte source failed. The decoder state is left intact and
    /// decoding may be resumed.
    #[error("Byte source failed: {0}")]
    Io(#[from] std::io::Error),

    /// Bytes that do not form a valid packet were skipped. Decoding
    /// continues with the byte that follows them.
    #[error("A malformed packet was encountered: {0}")]
    MalformedPacket(#[from] DecodeFault),
}
