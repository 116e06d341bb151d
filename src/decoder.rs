//! Parse ITM/DWT packets from pushed or pulled bytes.

use bitmatch::bitmatch;

use crate::buffer::{Buffer, ByteSource};
use crate::continuation::Field;
use crate::error::{DecodeFault, DecoderError, MalformedPacket};
use crate::header::{self, HeaderDecision, ProtocolKind, SourceKind, GTS1_MAX_LEN};
use crate::iter::Singles;
use crate::packet::{LocalTimestampFormat, PayloadSize, TracePacket};

/// Minimum number of zero bytes before the `0x80` byte of a
/// Synchronization packet; 47 zero bits in total. (Appendix D4.2.1)
pub(crate) const SYNC_MIN_ZEROS: usize = 5;
const SYNC_TERMINATOR: u8 = 0b1000_0000;

const GTS1_TS_MASK: u64 = (1 << 26) - 1;

/// Width of the global timestamp counter. Implementation defined; see
/// (Appendix D4.2.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GlobalTimestampWidth {
    /// GTS2 packets carry bits\[47:26\].
    Bits48,

    /// GTS2 packets carry bits\[63:26\].
    Bits64,
}

impl GlobalTimestampWidth {
    /// Width of the timestamp in bits.
    pub fn bits(self) -> u32 {
        match self {
            GlobalTimestampWidth::Bits48 => 48,
            GlobalTimestampWidth::Bits64 => 64,
        }
    }

    /// Maximum number of bytes following a GTS2 header.
    pub(crate) fn gts2_len(self) -> usize {
        match self {
            GlobalTimestampWidth::Bits48 => 4,
            GlobalTimestampWidth::Bits64 => 6,
        }
    }

    fn gts2_mask(self) -> u64 {
        (1 << (self.bits() - 26)) - 1
    }
}

impl Default for GlobalTimestampWidth {
    fn default() -> Self {
        GlobalTimestampWidth::Bits48
    }
}

/// [`Decoder`](Decoder) configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderOptions {
    /// Width of the target's global timestamp counter. Decides the
    /// maximum length of, and the number of bits kept from, GTS2
    /// packets.
    pub gts_width: GlobalTimestampWidth,
}

/// A packet whose header has been decoded but whose remaining bytes
/// have not all been received. The bytes it refers to are still at the
/// front of the buffer.
#[derive(Debug, Clone, PartialEq)]
enum PacketStub {
    /// Zero bytes counted so far of a potential Synchronization packet.
    Sync { zeros: usize },

    /// Next bytes will be assumed to be part of a source packet until
    /// `size` payload bytes are available.
    Source { kind: SourceKind, size: PayloadSize },

    /// Next bytes will be assumed to be part of a protocol packet's
    /// continuation-encoded tail until a byte with its MSB clear, or
    /// the byte at the cap, is encountered.
    Protocol { kind: ProtocolKind, field: Field },
}

/// ITM/DWT packet protocol decoder.
///
/// Bytes are either [fed](Self::feed) to the decoder or pulled from a
/// [`ByteSource`] given at construction. Packets are decoded on
/// demand, one per [`pull`](Self::pull), and a packet split across
/// several feeds is decoded once its last byte arrives.
pub struct Decoder {
    /// Intermediate buffer to store the not yet decoded trace bytes.
    buffer: Buffer,

    /// The packet currently being decoded, if any.
    stub: Option<PacketStub>,

    options: DecoderOptions,
}

impl Decoder {
    /// A decoder in push mode: bytes are only received via
    /// [`feed`](Self::feed).
    pub fn new(options: DecoderOptions) -> Decoder {
        Decoder {
            buffer: Buffer::new(None),
            stub: None,
            options,
        }
    }

    /// A decoder that pulls bytes from `source` whenever the bytes at
    /// hand do not suffice to decode a packet. Bytes may still be
    /// [fed](Self::feed) as well.
    pub fn with_source<S>(source: S, options: DecoderOptions) -> Decoder
    where
        S: ByteSource + 'static,
    {
        Decoder {
            buffer: Buffer::new(Some(Box::new(source))),
            stub: None,
            options,
        }
    }

    /// Appends `data` to the stream. Nothing is decoded until the next
    /// [`pull`](Self::pull).
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.push(data);
    }

    /// Returns the options this decoder was constructed with.
    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Number of bytes received but not yet consumed by a decoded
    /// packet or a fault.
    pub fn buffered(&self) -> usize {
        self.buffer.bytes().len()
    }

    /// Number of bytes consumed by decoded packets and faults.
    pub fn offset(&self) -> u64 {
        self.buffer.consumed()
    }

    /// Whether the byte source has reported that the stream has ended.
    /// The source is not pulled again once it has. Always `false` in
    /// push mode.
    pub fn is_exhausted(&self) -> bool {
        self.buffer.is_exhausted()
    }

    /// Returns an iterator over [`TracePacket`](TracePacket)s. The
    /// iterator ends when no more packets can be decoded from the bytes
    /// at hand; a new iterator resumes where it left off.
    pub fn singles(&mut self) -> Singles<'_> {
        Singles::new(self)
    }

    /// Decodes the next packet in the stream.
    ///
    /// Returns `Ok(None)` if the available bytes do not contain a
    /// complete packet. A partially received packet is kept and
    /// completed by later calls. Malformed bytes are skipped and
    /// reported as [`DecoderError::MalformedPacket`]; decoding
    /// continues after them on the next call.
    pub fn pull(&mut self) -> Result<Option<TracePacket>, DecoderError> {
        loop {
            match self.advance() {
                Some(Ok(packet)) => {
                    tracing::trace!("decoded {:?}", packet);
                    return Ok(Some(packet));
                }
                Some(Err(fault)) => {
                    tracing::debug!("skipping malformed bytes: {}", fault);
                    return Err(fault.into());
                }
                None => {
                    if !self.buffer.fill()? {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Tries to complete a packet from the buffered bytes. Returns
    /// `None` if more bytes are needed, in which case the progress made
    /// is stored in [`Self::stub`].
    fn advance(&mut self) -> Option<Result<TracePacket, DecodeFault>> {
        let stub = match self.stub.take() {
            Some(stub) => stub,
            None => {
                let header = *self.buffer.bytes().first()?;
                match header::classify(header) {
                    Err(malformed) => return Some(Err(self.fault(1, malformed))),
                    Ok(HeaderDecision::Packet(packet)) => {
                        self.buffer.consume(1);
                        return Some(Ok(packet));
                    }
                    Ok(HeaderDecision::Sync) => PacketStub::Sync { zeros: 0 },
                    Ok(HeaderDecision::Source { kind, size }) => PacketStub::Source { kind, size },
                    Ok(HeaderDecision::Protocol(kind)) => PacketStub::Protocol {
                        kind,
                        field: Field::new(kind.max_len(self.options.gts_width)),
                    },
                }
            }
        };

        match stub {
            PacketStub::Sync { zeros } => self.handle_sync(zeros),
            PacketStub::Source { kind, size } => {
                let len = 1 + size.len();
                if self.buffer.bytes().len() < len {
                    self.stub = Some(PacketStub::Source { kind, size });
                    return None;
                }

                let mut bytes = self.buffer.consume(len);
                let payload = bytes.split_off(1);
                Some(Ok(kind.into_packet(size, payload)))
            }
            PacketStub::Protocol { kind, mut field } => {
                let scanned = 1 + field.len();
                match field.resume(&self.buffer.bytes()[scanned..]) {
                    Some(len) => {
                        let bytes = self.buffer.consume(1 + len);
                        Some(Ok(self.complete_protocol(kind, &field, &bytes)))
                    }
                    None => {
                        self.stub = Some(PacketStub::Protocol { kind, field });
                        None
                    }
                }
            }
        }
    }

    /// Counts zero bytes from the front of the buffer until the first
    /// non-zero byte. This realigns the stream for further processing
    /// if it lost alignment, e.g. after a target-generated overflow.
    fn handle_sync(&mut self, zeros: usize) -> Option<Result<TracePacket, DecodeFault>> {
        let terminator = self.buffer.bytes()[zeros..].iter().position(|b| *b != 0);
        let (zeros, terminator) = match terminator {
            Some(n) => (zeros + n, self.buffer.bytes()[zeros + n]),
            None => {
                self.stub = Some(PacketStub::Sync {
                    zeros: self.buffer.bytes().len(),
                });
                return None;
            }
        };

        if terminator == SYNC_TERMINATOR && zeros >= SYNC_MIN_ZEROS {
            self.buffer.consume(zeros + 1);
            Some(Ok(TracePacket::Sync { zeros }))
        } else {
            Some(Err(self.fault(
                zeros + 1,
                MalformedPacket::InvalidSync { zeros, terminator },
            )))
        }
    }

    /// Builds a protocol packet from its header and complete tail.
    #[bitmatch]
    fn complete_protocol(&self, kind: ProtocolKind, field: &Field, bytes: &[u8]) -> TracePacket {
        let value = field.value();

        match kind {
            ProtocolKind::LocalTimestamp { data_relation } => TracePacket::LocalTimestamp {
                format: LocalTimestampFormat::Long,
                // at most 29 bits; c.f. Appendix D4.2.4
                ts: value as u32,
                data_relation,
            },
            ProtocolKind::GlobalTimestamp1 if field.len() == GTS1_MAX_LEN => {
                // The last byte of a full GTS1 holds the wrap and
                // clock change bits above TS[25:21].
                #[bitmatch]
                let "?wc?_????" = bytes[GTS1_MAX_LEN];

                TracePacket::GlobalTimestamp1 {
                    ts: (value & GTS1_TS_MASK) as u32,
                    wrap: w > 0,
                    clkch: c > 0,
                }
            }
            ProtocolKind::GlobalTimestamp1 => TracePacket::GlobalTimestamp1 {
                // compressed; at most 21 bits
                ts: value as u32,
                wrap: false,
                clkch: false,
            },
            ProtocolKind::GlobalTimestamp2 => TracePacket::GlobalTimestamp2 {
                ts: value & self.options.gts_width.gts2_mask(),
            },
            ProtocolKind::Extension { source, page } => TracePacket::Extension {
                source,
                // at most 3 + 29 bits; c.f. Appendix D4.2.6
                page: ((value << 3) as u32) | u32::from(page),
            },
        }
    }

    /// Discards the first `len` bytes of the buffer as malformed.
    fn fault(&mut self, len: usize, packet: MalformedPacket) -> DecodeFault {
        let offset = self.buffer.consumed();
        let bytes = self.buffer.consume(len);

        DecodeFault {
            offset,
            bytes,
            packet,
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new(DecoderOptions::default())
    }
}
