//! # `itm-swo`
//!
//! A decoder for the ITM and DWT packet protocol as specifed in the
//! [ARMv7-M architecture reference manual, Appendix
//! D4](https://developer.arm.com/documentation/ddi0403/ed/), as received
//! over the Single Wire Output (SWO) pin. Any references in this code
//! base refers to this document.
//!
//! The [`Decoder`](Decoder) is incremental: bytes may arrive in chunks
//! of any size, either [fed](Decoder::feed) by the caller or pulled from
//! a [`ByteSource`](ByteSource), and packets split across chunks are
//! emitted once complete. Malformed bytes are reported and skipped
//! without losing alignment of the packets that follow.
//!
//! Usage is simple:
//! ```
//! use itm_swo::{Decoder, DecoderOptions, TracePacket};
//!
//! let mut decoder = Decoder::new(DecoderOptions::default());
//!
//! // an instrumentation packet on stimulus port 0, split in two
//! decoder.feed(&[0b0000_0011, b'a', b'b']);
//! assert_eq!(decoder.singles().count(), 0);
//!
//! decoder.feed(&[b'c', b'd']);
//! for packet in decoder.singles() {
//!     match packet {
//!         Ok(TracePacket::Instrumentation { port, payload, .. }) => {
//!             assert_eq!(port, 0);
//!             assert_eq!(payload, b"abcd");
//!         }
//!         other => panic!("unexpected {:?}", other),
//!     }
//! }
//! ```
//!
//! Reading from a file, or anything else that implements
//! [`Read`](std::io::Read), is done via [`ReadSource`](ReadSource):
//! ```no_run
//! use itm_swo::{Decoder, DecoderOptions, ReadSource};
//!
//! let file = std::fs::File::open("trace.bin").unwrap();
//! let mut decoder = Decoder::with_source(ReadSource::new(file, false), DecoderOptions::default());
//! for packet in decoder.singles() {
//!     // ...
//! }
//! ```
#![deny(rustdoc::broken_intra_doc_links)]

mod buffer;
pub mod continuation;
mod decoder;
mod dwt;
mod error;
mod header;
mod iter;
mod packet;

pub use buffer::{ByteSource, Pulled, ReadSource};
pub use decoder::{Decoder, DecoderOptions, GlobalTimestampWidth};
pub use dwt::{DwtEvent, ExceptionAction, MemoryAccessType};
pub use error::{DecodeFault, DecoderError, MalformedPacket};
pub use iter::Singles;
pub use packet::{
    ExtensionSource, LocalTimestampFormat, PayloadSize, TimestampDataRelation, TracePacket,
};
