use crate::decoder::Decoder;
use crate::error::DecoderError;
use crate::packet::TracePacket;

/// Iterator that yield [`TracePacket`](TracePacket).
///
/// Yields `None` once no complete packet can be decoded from the bytes
/// at hand. This is not permanent: after more bytes have been
/// [fed](Decoder::feed) or pulled, a new iterator picks up where this
/// one stopped.
pub struct Singles<'a> {
    decoder: &'a mut Decoder,
}

impl<'a> Singles<'a> {
    pub(crate) fn new(decoder: &'a mut Decoder) -> Self {
        Self { decoder }
    }
}

impl<'a> Iterator for Singles<'a> {
    type Item = Result<TracePacket, DecoderError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.decoder.pull() {
            Ok(None) => None,
            Ok(Some(packet)) => Some(Ok(packet)),
            Err(e) => Some(Err(e)),
        }
    }
}
