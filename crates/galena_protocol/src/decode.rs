use anyhow::{bail, ensure, Context};
use bytes::{Buf, BytesMut};

use crate::var_int::{VarInt, VarIntDecodeError};
use crate::{CompressionThreshold, Decode, Packet, MAX_PACKET_SIZE};

/// Splits a byte stream into packet frames, decompressing payloads once a
/// compression threshold has been negotiated.
///
/// Bytes read off the socket are queued with [`queue_bytes`] /
/// [`queue_slice`]; [`try_next_packet`] yields `Ok(None)` until a whole frame
/// has arrived.
///
/// [`queue_bytes`]: Self::queue_bytes
/// [`queue_slice`]: Self::queue_slice
/// [`try_next_packet`]: Self::try_next_packet
pub struct PacketDecoder {
    buf: BytesMut,
    decompress_buf: BytesMut,
    threshold: CompressionThreshold,
    max_packet_size: i32,
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self {
            buf: BytesMut::new(),
            decompress_buf: BytesMut::new(),
            threshold: CompressionThreshold::default(),
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_next_packet(&mut self) -> anyhow::Result<Option<PacketFrame>> {
        let mut r = &self.buf[..];

        let packet_len = match VarInt::decode_partial(&mut r) {
            Ok(len) => len,
            Err(VarIntDecodeError::Incomplete) => return Ok(None),
            Err(VarIntDecodeError::TooLarge) => bail!("malformed packet length VarInt"),
        };

        ensure!(
            (0..=self.max_packet_size).contains(&packet_len),
            "packet length of {packet_len} is out of bounds"
        );

        if r.len() < packet_len as usize {
            // Not enough data arrived yet.
            return Ok(None);
        }

        let packet_len_len = VarInt(packet_len).written_size();

        let mut data;

        if self.threshold.is_enabled() {
            use std::io::Write;

            use bytes::BufMut;
            use flate2::write::ZlibDecoder;

            r = &r[..packet_len as usize];

            let data_len = VarInt::decode(&mut r)?.0;

            ensure!(
                (0..self.max_packet_size).contains(&data_len),
                "decompressed packet length of {data_len} is out of bounds"
            );

            // Is this packet compressed?
            if data_len > 0 {
                ensure!(
                    data_len > self.threshold.0,
                    "decompressed packet length of {data_len} is <= the compression threshold of \
                     {}",
                    self.threshold.0
                );

                debug_assert!(self.decompress_buf.is_empty());

                self.decompress_buf.put_bytes(0, data_len as usize);

                let mut z = ZlibDecoder::new(&mut self.decompress_buf[..]);

                z.write_all(r)?;

                ensure!(
                    z.finish()?.is_empty(),
                    "decompressed packet length is shorter than expected"
                );

                let total_packet_len = VarInt(packet_len).written_size() + packet_len as usize;

                self.buf.advance(total_packet_len);

                data = self.decompress_buf.split();
            } else {
                debug_assert_eq!(data_len, 0);

                ensure!(
                    r.len() <= self.threshold.0 as usize,
                    "uncompressed packet length of {} exceeds compression threshold of {}",
                    r.len(),
                    self.threshold.0
                );

                let remaining_len = r.len();

                self.buf.advance(packet_len_len + 1);

                data = self.buf.split_to(remaining_len);
            }
        } else {
            self.buf.advance(packet_len_len);
            data = self.buf.split_to(packet_len as usize);
        }

        // Decode the leading packet ID.
        r = &data[..];
        let packet_id = VarInt::decode(&mut r)
            .context("failed to decode packet ID")?
            .0;

        data.advance(data.len() - r.len());

        Ok(Some(PacketFrame {
            id: packet_id,
            body: data,
        }))
    }

    pub fn compression(&self) -> CompressionThreshold {
        self.threshold
    }

    pub fn set_compression(&mut self, threshold: CompressionThreshold) {
        self.threshold = threshold;
    }

    /// Lowers (or raises) the per-frame length cap. Frames whose declared
    /// length exceeds the cap are a protocol error.
    pub fn set_max_packet_size(&mut self, size: i32) {
        self.max_packet_size = size.min(MAX_PACKET_SIZE);
    }

    pub fn queue_bytes(&mut self, bytes: BytesMut) {
        self.buf.unsplit(bytes);
    }

    pub fn queue_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn take_capacity(&mut self) -> BytesMut {
        self.buf.split_off(self.buf.len())
    }

    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }
}

/// One frame read off the wire: the packet's leading VarInt ID and its
/// undecoded body.
#[derive(Clone, Debug)]
pub struct PacketFrame {
    /// The ID of the decoded packet.
    pub id: i32,
    /// The contents of the packet after the leading VarInt ID.
    pub body: BytesMut,
}

impl PacketFrame {
    /// Attempts to decode this packet as type `P`. An error is returned if
    /// the packet ID does not match, the body of the packet failed to decode,
    /// or some input was missed.
    pub fn decode<'a, P>(&'a self) -> anyhow::Result<P>
    where
        P: Packet + Decode<'a>,
    {
        ensure!(
            P::ID == self.id,
            "packet ID mismatch while decoding '{}': expected {}, got {}",
            P::NAME,
            P::ID,
            self.id
        );

        let mut r = &self.body[..];

        let pkt = P::decode(&mut r)?;

        ensure!(
            r.is_empty(),
            "missed {} bytes while decoding '{}'",
            r.len(),
            P::NAME
        );

        Ok(pkt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Decode, Encode, Packet, PacketEncoder, PacketSide};

    #[derive(Encode, Decode, Packet, PartialEq, Debug)]
    #[packet(id = 0x2B, side = PacketSide::Clientbound)]
    struct EchoS2c {
        payload: Vec<u8>,
    }

    #[test]
    fn incomplete_frames_wait_for_more_input() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(&EchoS2c {
            payload: vec![9; 100],
        })
        .unwrap();
        let bytes = enc.take();

        let mut dec = PacketDecoder::new();

        for chunk in bytes.chunks(7) {
            assert!(matches!(dec.try_next_packet(), Ok(None) | Ok(Some(_))));
            dec.queue_slice(chunk);
        }

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(frame.decode::<EchoS2c>().unwrap().payload, vec![9; 100]);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut dec = PacketDecoder::new();
        dec.set_max_packet_size(64);

        // Declared length of 65 exceeds the cap.
        dec.queue_slice(&[65]);

        assert!(dec.try_next_packet().is_err());
    }

    #[test]
    fn malformed_length_prefix_is_rejected() {
        let mut dec = PacketDecoder::new();
        dec.queue_slice(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);

        assert!(dec.try_next_packet().is_err());
    }

    #[test]
    fn below_threshold_payload_travels_inline() {
        let pkt = EchoS2c {
            payload: vec![1, 2, 3],
        };

        let mut enc = PacketEncoder::new();
        enc.set_compression(CompressionThreshold(1000));
        enc.append_packet(&pkt).unwrap();
        let bytes = enc.take();

        // packet_len | data_len == 0 | id | body, all uncompressed.
        assert_eq!(bytes[1], 0);
        assert_eq!(bytes[2], 0x2B);

        let mut dec = PacketDecoder::new();
        dec.set_compression(CompressionThreshold(1000));
        dec.queue_bytes(bytes);

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(frame.decode::<EchoS2c>().unwrap(), pkt);
    }

    #[test]
    fn above_threshold_payload_is_compressed() {
        let pkt = EchoS2c {
            payload: vec![42; 10_000],
        };

        let mut enc = PacketEncoder::new();
        enc.set_compression(CompressionThreshold(256));
        enc.append_packet(&pkt).unwrap();
        let bytes = enc.take();

        // Compressible data shrinks well below its plain encoding.
        assert!(bytes.len() < 10_000);

        let mut dec = PacketDecoder::new();
        dec.set_compression(CompressionThreshold(256));
        dec.queue_bytes(bytes);

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(frame.decode::<EchoS2c>().unwrap(), pkt);
    }
}
