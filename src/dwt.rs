//! Interpretation of hardware source packets generated by the DWT.
//! (Appendix D4.3)

use bitmatch::bitmatch;

use crate::error::MalformedPacket;

/// An event generated by the DWT, decoded from the payload of a
/// [`HardwareSource`](crate::TracePacket::HardwareSource) packet.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DwtEvent {
    /// One or more event counters have wrapped. (Appendix D4.3.1)
    EventCounterWrap {
        /// POSTCNT wrap (see Appendix C1, p. 732).
        cyc: bool,
        /// FOLDCNT wrap (see Appendix C1, p. 734).
        fold: bool,
        /// LSUCNT wrap (see Appendix C1, p. 734).
        lsu: bool,
        /// SLEEPCNT wrap (see Appendix C1, p. 734).
        sleep: bool,
        /// EXCCNT wrap (see Appendix C1, p. 734).
        exc: bool,
        /// CPICNT wrap (see Appendix C1, p. 734).
        cpi: bool,
    },

    /// The processor has entered, exited or returned to an exception.
    /// (Appendix D4.3.2)
    ExceptionTrace {
        /// The exception number.
        exception: u16,

        /// What the processor did with the exception.
        action: ExceptionAction,
    },

    /// Periodic PC sample. (Appendix D4.3.3)
    PCSample {
        /// The value of the PC. `None` if periodic PC sleep packet.
        pc: Option<u32>,
    },

    /// A DWT comparator matched a PC value. (Appendix D4.3.4)
    DataTracePC {
        /// The comparator number that generated the data.
        comparator: u8,

        /// The PC value for the instruction that caused the successful
        /// address comparison.
        pc: u32,
    },

    /// A DWT comparator matched an address. (Appendix D4.3.4)
    DataTraceAddress {
        /// The comparator number that generated the data.
        comparator: u8,

        /// Bits\[15:0\] of the data address that caused the successful
        /// address comparison.
        address: u16,
    },

    /// A data trace packet with a value. (Appendix D4.3.4)
    DataTraceValue {
        /// The comparator number that generated the data.
        comparator: u8,

        /// Whether the data was read or written.
        access_type: MemoryAccessType,

        /// The data value. LSB first.
        value: Vec<u8>,
    },
}

/// Denotes the action taken by the processor by a given exception. (Table D4-6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExceptionAction {
    /// Exception was entered.
    Entered,

    /// Exception was exited.
    Exited,

    /// Exception was returned to.
    Returned,
}

/// Denotes the type of memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryAccessType {
    /// Memory was read.
    Read,

    /// Memory was written.
    Write,
}

impl DwtEvent {
    /// Decodes the payload of a hardware source packet with
    /// discriminator ID `disc_id`.
    ///
    /// ```
    /// use itm_swo::{DwtEvent, ExceptionAction};
    ///
    /// assert_eq!(
    ///     DwtEvent::decode(1, &[0x0f, 0b0001_0000]),
    ///     Ok(DwtEvent::ExceptionTrace {
    ///         exception: 15,
    ///         action: ExceptionAction::Entered,
    ///     }),
    /// );
    /// ```
    #[bitmatch]
    pub fn decode(disc_id: u8, payload: &[u8]) -> Result<Self, MalformedPacket> {
        let invalid = || MalformedPacket::InvalidHardwarePacket {
            disc_id,
            payload: payload.to_vec(),
        };

        match disc_id {
            0 => {
                // event counter wrap
                let b = match payload {
                    [b] => *b,
                    _ => return Err(invalid()),
                };

                #[bitmatch]
                let "??yf_lsec" = b;
                Ok(DwtEvent::EventCounterWrap {
                    cyc: y != 0,
                    fold: f != 0,
                    lsu: l != 0,
                    sleep: s != 0,
                    exc: e != 0,
                    cpi: c != 0,
                })
            }
            1 => {
                // exception trace
                let (lo, hi) = match payload {
                    [lo, hi] => (*lo, *hi),
                    _ => return Err(invalid()),
                };

                #[bitmatch]
                let "??ff_???e" = hi;
                let exception = (u16::from(e) << 8) | u16::from(lo);

                let action = match f {
                    0b01 => ExceptionAction::Entered,
                    0b10 => ExceptionAction::Exited,
                    0b11 => ExceptionAction::Returned,
                    _ => {
                        return Err(MalformedPacket::InvalidExceptionTrace {
                            exception,
                            function: f,
                        })
                    }
                };

                Ok(DwtEvent::ExceptionTrace { exception, action })
            }
            2 => {
                // PC sample
                match *payload {
                    [0] => Ok(DwtEvent::PCSample { pc: None }),
                    [b0, b1, b2, b3] => Ok(DwtEvent::PCSample {
                        pc: Some(u32::from_le_bytes([b0, b1, b2, b3])),
                    }),
                    _ => Err(MalformedPacket::InvalidPCSampleSize {
                        payload: payload.to_vec(),
                    }),
                }
            }
            8..=23 => {
                // data trace
                #[bitmatch]
                let "???t_tccd" = disc_id;
                let comparator = c;

                match (t, d, payload) {
                    (0b01, 0, &[b0, b1, b2, b3]) => Ok(DwtEvent::DataTracePC {
                        comparator,
                        pc: u32::from_le_bytes([b0, b1, b2, b3]),
                    }),
                    (0b01, 1, &[b0, b1]) => Ok(DwtEvent::DataTraceAddress {
                        comparator,
                        address: u16::from_le_bytes([b0, b1]),
                    }),
                    (0b10, d, value) => Ok(DwtEvent::DataTraceValue {
                        comparator,
                        access_type: if d == 0 {
                            MemoryAccessType::Read
                        } else {
                            MemoryAccessType::Write
                        },
                        value: value.to_vec(),
                    }),
                    _ => Err(invalid()),
                }
            }
            _ => Err(MalformedPacket::InvalidHardwareDisc {
                disc_id,
                size: payload.len(),
            }),
        }
    }
}
