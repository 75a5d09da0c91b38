use std::io;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use galena_protocol::decode::{PacketDecoder, PacketFrame};
use galena_protocol::encode::PacketEncoder;
use galena_protocol::{CompressionThreshold, Encode, Packet, PacketState};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::READ_BUF_SIZE;

/// Errors surfaced on a connection's error stream or returned from
/// [`Connection::send`].
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The peer disconnected or the connection was closed locally. Terminal.
    #[error("connection was closed")]
    Closed,
    /// A packet arrived whose id is not valid in the current protocol state.
    #[error("unexpected packet id {id:#04x} in {state:?} state")]
    UnexpectedPacket { state: PacketState, id: i32 },
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A framing or decoding failure. The stream cannot be resynchronized
    /// after one of these.
    #[error(transparent)]
    Protocol(#[from] anyhow::Error),
}

/// The channelled driver for one established connection.
///
/// A spawned reader task parses frames off the socket and delivers them, in
/// strict arrival order, to a bounded channel; under backpressure the reader
/// blocks until the consumer drains. Read-side errors go to a separate
/// best-effort channel, with a terminal [`ConnectionError::Closed`] sentinel
/// pushed at EOF. Writes are serialized by a per-connection mutex and
/// interleave at frame granularity only.
pub struct Connection {
    frames: flume::Receiver<PacketFrame>,
    errors: flume::Receiver<ConnectionError>,
    writer: Arc<Mutex<WriteState>>,
    /// Compression threshold the reader applies between frames. Only updated
    /// while the writer lock is held, so a mode switch cannot interleave with
    /// a frame in either direction.
    read_threshold: Arc<AtomicI32>,
    closed: Arc<AtomicBool>,
    reader_task: JoinHandle<()>,
}

struct WriteState {
    half: OwnedWriteHalf,
    enc: PacketEncoder,
}

impl Connection {
    /// Splits the stream and spawns the reader task. The encoder and decoder
    /// keep whatever compression state was negotiated during login.
    pub(crate) fn spawn(
        stream: TcpStream,
        enc: PacketEncoder,
        dec: PacketDecoder,
        capacity: usize,
    ) -> Self {
        let read_threshold = Arc::new(AtomicI32::new(dec.compression().0));

        let (read_half, write_half) = stream.into_split();

        let (frame_tx, frames) = flume::bounded(capacity);
        let (error_tx, errors) = flume::unbounded();

        let reader_task = tokio::spawn(read_loop(
            read_half,
            dec,
            frame_tx,
            error_tx,
            read_threshold.clone(),
        ));

        Self {
            frames,
            errors,
            writer: Arc::new(Mutex::new(WriteState {
                half: write_half,
                enc,
            })),
            read_threshold,
            closed: Arc::new(AtomicBool::new(false)),
            reader_task,
        }
    }

    /// The stream of decoded inbound frames, in arrival order.
    pub fn frames(&self) -> &flume::Receiver<PacketFrame> {
        &self.frames
    }

    /// The stream of read-side errors. Errors are dropped if nobody drains
    /// this.
    pub fn errors(&self) -> &flume::Receiver<ConnectionError> {
        &self.errors
    }

    /// Receives the next inbound frame.
    pub async fn recv(&self) -> Result<PacketFrame, ConnectionError> {
        self.frames
            .recv_async()
            .await
            .map_err(|_| ConnectionError::Closed)
    }

    /// Encodes and writes one packet. Writes from different tasks are
    /// serialized; a frame is never interleaved with another mid-frame.
    pub async fn send<P>(&self, pkt: &P) -> Result<(), ConnectionError>
    where
        P: Packet + Encode,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed);
        }

        let mut w = self.writer.lock().await;

        w.enc.append_packet(pkt)?;
        let bytes = w.enc.take();

        w.half.write_all(&bytes).await?;

        Ok(())
    }

    /// Switches the compression mode for all subsequent frames in both
    /// directions.
    pub async fn set_compression(&self, threshold: CompressionThreshold) {
        let mut w = self.writer.lock().await;
        w.enc.set_compression(threshold);
        self.read_threshold.store(threshold.0, Ordering::Release);
    }

    /// Closes the connection: cancels the reader, shuts the socket down, and
    /// makes pending and subsequent [`send`](Self::send) calls return
    /// [`ConnectionError::Closed`]. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.reader_task.abort();

            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let writer = self.writer.clone();
                handle.spawn(async move {
                    let mut w = writer.lock().await;
                    if let Err(e) = w.half.shutdown().await {
                        debug!("error shutting down connection: {e}");
                    }
                });
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_loop(
    mut read_half: OwnedReadHalf,
    mut dec: PacketDecoder,
    frames: flume::Sender<PacketFrame>,
    errors: flume::Sender<ConnectionError>,
    threshold: Arc<AtomicI32>,
) {
    let mut buf = BytesMut::new();

    loop {
        // Apply a pending compression switch between frames, never inside
        // one.
        let t = CompressionThreshold(threshold.load(Ordering::Acquire));
        if dec.compression() != t {
            dec.set_compression(t);
        }

        match dec.try_next_packet() {
            Ok(Some(frame)) => {
                if frames.send_async(frame).await.is_err() {
                    // The connection handle is gone.
                    break;
                }
            }
            Ok(None) => {
                // Incomplete frame. Need more data.
                buf.reserve(READ_BUF_SIZE);

                match read_half.read_buf(&mut buf).await {
                    Ok(0) => {
                        let _ = errors.try_send(ConnectionError::Closed);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = errors.try_send(ConnectionError::Io(e));
                        break;
                    }
                }

                dec.queue_bytes(buf.split());
            }
            Err(e) => {
                let _ = errors.try_send(ConnectionError::Protocol(e));
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use galena_protocol::packets::status::{QueryPingC2s, QueryPongS2c};
    use tokio::net::TcpListener;

    use super::*;
    use crate::PacketIo;

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();

        (client, server)
    }

    #[tokio::test]
    async fn frames_arrive_in_order() {
        let (mut client, server) = connected_pair().await;

        let conn = PacketIo::new(server).into_connection(8);

        let mut enc = PacketEncoder::new();
        for payload in 0..10 {
            enc.append_packet(&QueryPingC2s { payload }).unwrap();
        }
        client.write_all(&enc.take()).await.unwrap();

        for payload in 0..10 {
            let frame = conn.recv().await.unwrap();
            assert_eq!(frame.id, 0x01);
            assert_eq!(frame.decode::<QueryPingC2s>().unwrap().payload, payload);
        }
    }

    #[tokio::test]
    async fn eof_pushes_the_closed_sentinel() {
        let (client, server) = connected_pair().await;

        let conn = PacketIo::new(server).into_connection(8);

        drop(client);

        let err = conn.errors().recv_async().await.unwrap();
        assert!(matches!(err, ConnectionError::Closed), "got {err}");
    }

    #[tokio::test]
    async fn garbage_length_prefix_surfaces_a_protocol_error() {
        let (mut client, server) = connected_pair().await;

        let conn = PacketIo::new(server).into_connection(8);

        client
            .write_all(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01])
            .await
            .unwrap();

        let err = conn.errors().recv_async().await.unwrap();
        assert!(matches!(err, ConnectionError::Protocol(_)), "got {err}");
    }

    #[tokio::test]
    async fn send_writes_parseable_frames() {
        let (mut client, server) = connected_pair().await;

        let conn = PacketIo::new(server).into_connection(8);

        conn.send(&QueryPongS2c { payload: 0x55 }).await.unwrap();

        let mut buf = [0_u8; 16];
        let n = client.read(&mut buf).await.unwrap();

        let mut dec = PacketDecoder::new();
        dec.queue_slice(&buf[..n]);

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(frame.decode::<QueryPongS2c>().unwrap().payload, 0x55);
    }

    #[tokio::test]
    async fn compression_switch_applies_to_both_directions() {
        let (mut client, server) = connected_pair().await;

        let conn = PacketIo::new(server).into_connection(8);

        conn.set_compression(CompressionThreshold(0)).await;

        // Server -> client.
        conn.send(&QueryPongS2c { payload: 7 }).await.unwrap();

        let mut buf = [0_u8; 64];
        let n = client.read(&mut buf).await.unwrap();

        let mut dec = PacketDecoder::new();
        dec.set_compression(CompressionThreshold(0));
        dec.queue_slice(&buf[..n]);

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(frame.decode::<QueryPongS2c>().unwrap().payload, 7);

        // Client -> server.
        let mut enc = PacketEncoder::new();
        enc.set_compression(CompressionThreshold(0));
        enc.append_packet(&QueryPingC2s { payload: 9 }).unwrap();
        client.write_all(&enc.take()).await.unwrap();

        let frame = conn.recv().await.unwrap();
        assert_eq!(frame.decode::<QueryPingC2s>().unwrap().payload, 9);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_fails_later_sends() {
        let (_client, server) = connected_pair().await;

        let conn = PacketIo::new(server).into_connection(8);

        conn.close();
        conn.close();

        assert!(conn.is_closed());

        let err = conn.send(&QueryPongS2c { payload: 0 }).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Closed), "got {err}");
    }
}
