use std::io::{self, Cursor, Read};

use itm_swo::*;

#[rustfmt::skip]
const TRACE: &[u8] = &[
    // sync
    0x00, 0x00, 0x00, 0x00, 0x00, 0x80,
    // instrumentation, port 2, "abcd"
    0x13, b'a', b'b', b'c', b'd',
    // LTS1
    0xd0, 0xc4, 0xa2, 0x91, 0x77,
    // overflow
    0x70,
    // GTS1
    0x94, 0xc4, 0xa2, 0x91, 0x57,
    // GTS2
    0xb4, 0xbd, 0xf4, 0x91, 0x01,
    // extension
    0xf8, 0x32,
    // LTS2
    0x30,
    // exception trace
    0x0e, 0x05, 0x21,
    // instrumentation, port 3, "ab"
    0x1a, b'a', b'b',
];

fn expected() -> Vec<TracePacket> {
    vec![
        TracePacket::Sync { zeros: 5 },
        TracePacket::Instrumentation {
            port: 2,
            size: PayloadSize::Four,
            payload: b"abcd".to_vec(),
        },
        TracePacket::LocalTimestamp {
            format: LocalTimestampFormat::Long,
            ts: 0xee45144,
            data_relation: TimestampDataRelation::UnknownDelay,
        },
        TracePacket::Overflow,
        TracePacket::GlobalTimestamp1 {
            ts: 0x2e45144,
            wrap: true,
            clkch: false,
        },
        TracePacket::GlobalTimestamp2 {
            ts: 0b1_0010001_1110100_0111101,
        },
        TracePacket::Extension {
            source: ExtensionSource::Itm,
            page: 0x197,
        },
        TracePacket::LocalTimestamp {
            format: LocalTimestampFormat::Short,
            ts: 3,
            data_relation: TimestampDataRelation::Sync,
        },
        TracePacket::HardwareSource {
            disc_id: 1,
            size: PayloadSize::Two,
            payload: vec![0x05, 0x21],
        },
        TracePacket::Instrumentation {
            port: 3,
            size: PayloadSize::Two,
            payload: b"ab".to_vec(),
        },
    ]
}

/// Feeds `chunks` one at a time, collecting every packet that becomes
/// available in between.
fn decode_chunked<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> Vec<TracePacket> {
    let mut decoder = Decoder::new(DecoderOptions::default());
    let mut packets = vec![];

    for chunk in chunks {
        decoder.feed(chunk);
        for packet in decoder.singles() {
            packets.push(packet.unwrap());
        }
    }

    assert_eq!(decoder.buffered(), 0);
    assert_eq!(decoder.offset(), TRACE.len() as u64);
    packets
}

#[test]
fn single_chunk() {
    assert_eq!(decode_chunked(vec![TRACE]), expected());
}

#[test]
fn every_split_point() {
    for split in 0..=TRACE.len() {
        let (head, tail) = TRACE.split_at(split);
        assert_eq!(
            decode_chunked(vec![head, tail]),
            expected(),
            "split at {}",
            split
        );
    }
}

#[test]
fn byte_by_byte() {
    assert_eq!(decode_chunked(TRACE.chunks(1)), expected());
}

#[test]
fn uneven_chunks() {
    for size in 2..8 {
        assert_eq!(decode_chunked(TRACE.chunks(size)), expected());
    }
}

#[test]
fn sync_round_trip() {
    let mut decoder = Decoder::new(DecoderOptions::default());
    decoder.feed(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x80]);

    assert_eq!(
        decoder.pull().unwrap(),
        Some(TracePacket::Sync { zeros: 5 })
    );
    assert_eq!(decoder.offset(), 6);
    assert!(decoder.pull().unwrap().is_none());
}

#[test]
fn fault_forward_progress() {
    let mut decoder = Decoder::new(DecoderOptions::default());
    decoder.feed(&[0b0000_0100, 0x70]);

    let results: Vec<_> = decoder.singles().collect();
    assert_eq!(results.len(), 2);

    match &results[0] {
        Err(DecoderError::MalformedPacket(fault)) => {
            assert_eq!(fault.offset, 0);
            assert_eq!(fault.bytes, vec![0b0000_0100]);
            assert_eq!(fault.packet, MalformedPacket::InvalidHeader(0b0000_0100));
        }
        other => panic!("unexpected {:?}", other),
    }
    match &results[1] {
        Ok(TracePacket::Overflow) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn faults_carry_stream_offsets() {
    let mut decoder = Decoder::new(DecoderOptions::default());
    decoder.feed(&[0x70, 0x01, 0x10]);
    decoder.feed(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x70]);
    decoder.feed(&[0x00, 0x00, 0x80, 0x70]);

    let mut faults = vec![];
    let mut packets = vec![];
    for result in decoder.singles() {
        match result {
            Ok(packet) => packets.push(packet),
            Err(DecoderError::MalformedPacket(fault)) => faults.push(fault),
            Err(e) => panic!("unexpected {:?}", e),
        }
    }

    assert_eq!(
        faults,
        vec![
            DecodeFault {
                offset: 3,
                bytes: vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x70],
                packet: MalformedPacket::InvalidSync {
                    zeros: 6,
                    terminator: 0x70,
                },
            },
            DecodeFault {
                offset: 10,
                bytes: vec![0x00, 0x00, 0x80],
                packet: MalformedPacket::InvalidSync {
                    zeros: 2,
                    terminator: 0x80,
                },
            },
        ]
    );
    assert_eq!(
        packets,
        vec![
            TracePacket::Overflow,
            TracePacket::Instrumentation {
                port: 0,
                size: PayloadSize::One,
                payload: vec![0x10],
            },
            TracePacket::Overflow,
        ]
    );
    assert_eq!(decoder.offset(), 14);
}

#[test]
fn resumes_after_exhausting_iterator() {
    let mut decoder = Decoder::new(DecoderOptions::default());
    decoder.feed(&[0x70, 0x13, b'a']);

    assert_eq!(decoder.singles().count(), 1);
    assert_eq!(decoder.singles().count(), 0);
    assert!(!decoder.is_exhausted());

    decoder.feed(b"bcd");
    assert_eq!(
        decoder.singles().map(Result::unwrap).collect::<Vec<_>>(),
        vec![TracePacket::Instrumentation {
            port: 2,
            size: PayloadSize::Four,
            payload: b"abcd".to_vec(),
        }]
    );
}

#[test]
fn closure_source() {
    let mut chunks = TRACE.chunks(3).map(<[u8]>::to_vec).collect::<Vec<_>>().into_iter();
    let mut decoder = Decoder::with_source(
        move || -> io::Result<Pulled> {
            Ok(chunks.next().map_or(Pulled::Exhausted, Pulled::Data))
        },
        DecoderOptions::default(),
    );

    let packets = decoder
        .singles()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(packets, expected());
    assert!(decoder.is_exhausted());
}

#[test]
fn pending_is_not_exhausted() {
    let mut pulls = 0;
    let mut decoder = Decoder::with_source(
        move || -> io::Result<Pulled> {
            pulls += 1;
            Ok(match pulls {
                1 => Pulled::Data(vec![0x70, 0x01]),
                2 => Pulled::Pending,
                3 => Pulled::Data(vec![0x10]),
                _ => Pulled::Exhausted,
            })
        },
        DecoderOptions::default(),
    );

    assert_eq!(decoder.pull().unwrap(), Some(TracePacket::Overflow));
    assert!(decoder.pull().unwrap().is_none());
    assert!(!decoder.is_exhausted());

    assert_eq!(
        decoder.pull().unwrap(),
        Some(TracePacket::Instrumentation {
            port: 0,
            size: PayloadSize::One,
            payload: vec![0x10],
        })
    );
    assert!(decoder.pull().unwrap().is_none());
    assert!(decoder.is_exhausted());

    // fed bytes are still decoded once the source is exhausted
    decoder.feed(&[0x70]);
    assert_eq!(decoder.pull().unwrap(), Some(TracePacket::Overflow));
}

#[test]
fn read_source() {
    let mut decoder = Decoder::with_source(
        ReadSource::new(Cursor::new(TRACE.to_vec()), false),
        DecoderOptions::default(),
    );

    let packets = decoder
        .singles()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(packets, expected());
    assert!(decoder.is_exhausted());
}

#[test]
fn read_source_ignore_eof() {
    let mut source = ReadSource::new(&[0x70u8][..], true);
    assert_eq!(source.pull().unwrap(), Pulled::Data(vec![0x70]));
    assert_eq!(source.pull().unwrap(), Pulled::Pending);
    assert_eq!(source.pull().unwrap(), Pulled::Pending);

    let mut source = ReadSource::new(io::empty(), false);
    assert_eq!(source.pull().unwrap(), Pulled::Exhausted);
}

#[test]
fn read_source_accessors() {
    let mut source = ReadSource::new(Cursor::new(vec![0x70, 0x70]), false);
    assert_eq!(source.get_ref().position(), 0);

    source.get_mut().set_position(1);
    assert_eq!(source.pull().unwrap(), Pulled::Data(vec![0x70]));
    assert_eq!(source.into_inner().position(), 2);
}

#[test]
fn fault_split_across_feeds() {
    let stream: &[u8] = &[0x70, 0x00, 0x00, 0x00, 0x01, 0x70];

    for split in 0..=stream.len() {
        let (head, tail) = stream.split_at(split);
        let mut decoder = Decoder::new(DecoderOptions::default());
        let mut results = vec![];

        for chunk in &[head, tail] {
            decoder.feed(chunk);
            for result in decoder.singles() {
                results.push(match result {
                    Ok(packet) => Ok(packet),
                    Err(DecoderError::MalformedPacket(fault)) => Err(fault),
                    Err(e) => panic!("unexpected {:?}", e),
                });
            }
        }

        assert_eq!(
            results,
            vec![
                Ok(TracePacket::Overflow),
                Err(DecodeFault {
                    offset: 1,
                    bytes: vec![0x00, 0x00, 0x00, 0x01],
                    packet: MalformedPacket::InvalidSync {
                        zeros: 3,
                        terminator: 0x01,
                    },
                }),
                Ok(TracePacket::Overflow),
            ],
            "split at {}",
            split
        );
        assert_eq!(decoder.offset(), stream.len() as u64);
    }
}

/// Fails every other read.
struct Flaky {
    inner: Cursor<Vec<u8>>,
    fail: bool,
}

impl Read for Flaky {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fail = !self.fail;
        if self.fail {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "flaky"))
        } else {
            let n = buf.len().min(2);
            self.inner.read(&mut buf[..n])
        }
    }
}

#[test]
fn resumes_after_io_error() {
    let mut decoder = Decoder::with_source(
        ReadSource::new(
            Flaky {
                inner: Cursor::new(TRACE.to_vec()),
                fail: false,
            },
            false,
        ),
        DecoderOptions::default(),
    );

    let mut packets = vec![];
    let mut errors = 0;
    while !decoder.is_exhausted() {
        match decoder.pull() {
            Ok(Some(packet)) => packets.push(packet),
            Ok(None) => {}
            Err(DecoderError::Io(e)) => {
                assert_eq!(e.kind(), io::ErrorKind::ConnectionReset);
                errors += 1;
            }
            Err(e) => panic!("unexpected {:?}", e),
        }
    }

    assert!(errors > 0);
    assert_eq!(packets, expected());
}

#[test]
fn eof() {
    let empty: &[u8] = &[];
    let mut decoder = Decoder::with_source(ReadSource::new(empty, false), DecoderOptions::default());

    assert!(decoder.singles().next().is_none());
    assert!(decoder.is_exhausted());
}
