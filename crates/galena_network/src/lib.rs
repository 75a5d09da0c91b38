//! Socket handling, the handshake/status/login flows, and the per-connection
//! driver for the galena server.
//!
//! A connection starts out in the sequential phase: [`PacketIo`] owns the
//! socket and the handshake, status, and login exchanges run inline. Once
//! login succeeds the stream is split into the channelled [`Connection`]
//! driver, which feeds decoded frames through a bounded channel while writes
//! stay serialized behind a mutex.

mod connect;
mod connection;
mod packet_io;

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicI32, AtomicUsize};
use std::sync::Arc;

use connect::do_accept_loop;
pub use connect::HandshakeData;
pub use connection::{Connection, ConnectionError};
use galena_protocol::CompressionThreshold;
pub use packet_io::PacketIo;
use tokio::sync::Semaphore;

/// How many bytes the read loops pull off the socket at a time.
pub(crate) const READ_BUF_SIZE: usize = 4096;

/// Settings for [`run_server`].
#[derive(Clone, Debug)]
pub struct NetworkSettings {
    /// The address to bind. Defaults to `127.0.0.1:25565`.
    pub address: SocketAddr,
    /// Compression threshold negotiated during login. A negative value skips
    /// the `SetCompression` exchange entirely.
    pub threshold: CompressionThreshold,
    /// Limits the number of simultaneous connections to the server.
    pub max_connections: usize,
    /// The player cap advertised in status responses.
    pub max_players: usize,
    /// The message of the day shown in the server list.
    pub motd: String,
    /// Capacity of each connection's inbound frame channel. The reader task
    /// blocks once this many frames are waiting.
    pub frame_channel_capacity: usize,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            address: SocketAddrV4::new(Ipv4Addr::LOCALHOST, 25565).into(),
            threshold: CompressionThreshold(256),
            max_connections: 1024,
            max_players: 20,
            motd: "A Galena server".to_owned(),
            frame_channel_capacity: 64,
        }
    }
}

/// State shared between the accept loop and every connection task.
#[derive(Clone)]
pub struct SharedNetworkState(Arc<SharedNetworkStateInner>);

struct SharedNetworkStateInner {
    settings: NetworkSettings,
    /// Limits the number of simultaneous connections to the server.
    connection_sema: Arc<Semaphore>,
    /// The number of clients in the play state, past the login state.
    player_count: AtomicUsize,
    /// Source of entity ids for joining players.
    entity_ids: AtomicI32,
}

impl SharedNetworkState {
    pub fn new(settings: NetworkSettings) -> Self {
        let max_connections = settings.max_connections.min(Semaphore::MAX_PERMITS);

        Self(Arc::new(SharedNetworkStateInner {
            settings,
            connection_sema: Arc::new(Semaphore::new(max_connections)),
            player_count: AtomicUsize::new(0),
            entity_ids: AtomicI32::new(0),
        }))
    }

    pub fn settings(&self) -> &NetworkSettings {
        &self.0.settings
    }

    pub fn player_count(&self) -> &AtomicUsize {
        &self.0.player_count
    }

    fn connection_sema(&self) -> &Arc<Semaphore> {
        &self.0.connection_sema
    }

    fn entity_ids(&self) -> &AtomicI32 {
        &self.0.entity_ids
    }
}

/// Binds the configured address and serves connections until the returned
/// future is dropped.
pub async fn run_server(settings: NetworkSettings) {
    do_accept_loop(SharedNetworkState::new(settings)).await
}
