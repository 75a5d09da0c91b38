use std::io::{self, ErrorKind};

use bytes::BytesMut;
use galena_protocol::decode::{PacketDecoder, PacketFrame};
use galena_protocol::encode::PacketEncoder;
use galena_protocol::{CompressionThreshold, Decode, Encode, Packet, PacketState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::connection::{Connection, ConnectionError};
use crate::READ_BUF_SIZE;

/// Packet IO for the sequential phase of a connection: the handshake,
/// status, and login exchanges, where one side always knows which packet
/// comes next.
///
/// Tracks the connection's protocol state so that a frame with the wrong id
/// is reported as an unexpected packet for that state.
pub struct PacketIo {
    stream: TcpStream,
    enc: PacketEncoder,
    dec: PacketDecoder,
    frame: PacketFrame,
    state: PacketState,
}

impl PacketIo {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            enc: PacketEncoder::new(),
            dec: PacketDecoder::new(),
            frame: PacketFrame {
                id: -1,
                body: BytesMut::new(),
            },
            state: PacketState::Handshaking,
        }
    }

    pub fn state(&self) -> PacketState {
        self.state
    }

    /// Advances the protocol state machine.
    pub fn set_state(&mut self, state: PacketState) {
        self.state = state;
    }

    pub async fn send_packet<P>(&mut self, pkt: &P) -> anyhow::Result<()>
    where
        P: Packet + Encode,
    {
        self.enc.append_packet(pkt)?;
        let bytes = self.enc.take();
        self.stream.write_all(&bytes).await?;
        Ok(())
    }

    pub async fn recv_packet<'a, P>(&'a mut self) -> anyhow::Result<P>
    where
        P: Packet + Decode<'a>,
    {
        loop {
            if let Some(frame) = self.dec.try_next_packet()? {
                self.frame = frame;

                if self.frame.id != P::ID {
                    return Err(ConnectionError::UnexpectedPacket {
                        state: self.state,
                        id: self.frame.id,
                    }
                    .into());
                }

                return self.frame.decode();
            }

            self.dec.reserve(READ_BUF_SIZE);
            let mut buf = self.dec.take_capacity();

            if self.stream.read_buf(&mut buf).await? == 0 {
                return Err(io::Error::from(ErrorKind::UnexpectedEof).into());
            }

            // This should always be an O(1) unsplit because we reserved space
            // earlier and the call to `read_buf` shouldn't have grown the
            // allocation.
            self.dec.queue_bytes(buf);
        }
    }

    /// Flips compression for both directions. Takes effect for every frame
    /// after the current one.
    pub fn set_compression(&mut self, threshold: CompressionThreshold) {
        self.enc.set_compression(threshold);
        self.dec.set_compression(threshold);
    }

    /// Hands the stream over to the channelled [`Connection`] driver,
    /// keeping the negotiated compression state.
    pub fn into_connection(self, capacity: usize) -> Connection {
        Connection::spawn(self.stream, self.enc, self.dec, capacity)
    }
}
