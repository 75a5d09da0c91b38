//! Handles new connections to the server and the log-in process.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;

use anyhow::{ensure, Context};
use galena_protocol::packets::handshaking::{HandshakeC2s, NextState};
use galena_protocol::packets::login::{
    LoginCompressionS2c, LoginDisconnectS2c, LoginHelloC2s, LoginSuccessS2c,
};
use galena_protocol::packets::play::{DimensionType, GameJoinS2c, RegistryCodec};
use galena_protocol::packets::status::{
    QueryPingC2s, QueryPongS2c, QueryRequestC2s, QueryResponseS2c,
};
use galena_protocol::{
    Bounded, Nbt, PacketState, VarInt, MINECRAFT_VERSION, PROTOCOL_VERSION,
};
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::connection::ConnectionError;
use crate::packet_io::PacketIo;
use crate::SharedNetworkState;

/// Accepts new connections to the server as they occur.
pub(super) async fn do_accept_loop(shared: SharedNetworkState) {
    let listener = match TcpListener::bind(shared.settings().address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to start TCP listener: {e}");
            return;
        }
    };

    info!("listening on {}", shared.settings().address);

    loop {
        match shared.connection_sema().clone().acquire_owned().await {
            Ok(permit) => match listener.accept().await {
                Ok((stream, remote_addr)) => {
                    let shared = shared.clone();

                    tokio::spawn(async move {
                        handle_connection(shared, stream, remote_addr).await;
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!("failed to accept incoming connection: {e}");
                }
            },
            // Closed semaphore indicates server shutdown.
            Err(_) => return,
        }
    }
}

async fn handle_connection(shared: SharedNetworkState, stream: TcpStream, remote_addr: SocketAddr) {
    trace!("handling connection");

    if let Err(e) = stream.set_nodelay(true) {
        error!("failed to set TCP_NODELAY: {e}");
    }

    let io = PacketIo::new(stream);

    if let Err(e) = handle_handshake(shared, io, remote_addr).await {
        // EOF can happen if the client disconnects while joining, which isn't
        // very erroneous.
        if let Some(e) = e.downcast_ref::<io::Error>() {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                return;
            }
        }
        warn!("connection ended with error: {e:#}");
    }
}

/// The contents of the first packet on the wire, kept for the rest of the
/// connection's life.
#[derive(Clone, Debug)]
pub struct HandshakeData {
    pub protocol_version: i32,
    pub server_address: String,
    pub next_state: NextState,
}

async fn handle_handshake(
    shared: SharedNetworkState,
    mut io: PacketIo,
    remote_addr: SocketAddr,
) -> anyhow::Result<()> {
    let handshake = io.recv_packet::<HandshakeC2s>().await?;

    let handshake = HandshakeData {
        protocol_version: handshake.protocol_version.0,
        server_address: handshake.server_address.0.to_owned(),
        next_state: handshake.next_state,
    };

    match handshake.next_state {
        NextState::Status => {
            io.set_state(PacketState::Status);
            handle_status(shared, io, handshake)
                .await
                .context("error handling status")
        }
        NextState::Login => {
            io.set_state(PacketState::Login);

            match handle_login(&shared, &mut io, &handshake).await {
                Ok(Some(info)) => {
                    io.set_state(PacketState::Play);
                    handle_play(&shared, io, info)
                        .await
                        .context("error handling play state")
                }
                Ok(None) => Ok(()),
                Err(e) => {
                    // A protocol error in the login state still permits a
                    // textual goodbye.
                    let reason = json!({ "text": "protocol error" }).to_string();
                    let _ = io
                        .send_packet(&LoginDisconnectS2c { reason: &reason })
                        .await;
                    Err(e).context(format!("error handling login from {remote_addr}"))
                }
            }
        }
    }
}

async fn handle_status(
    shared: SharedNetworkState,
    mut io: PacketIo,
    handshake: HandshakeData,
) -> anyhow::Result<()> {
    io.recv_packet::<QueryRequestC2s>().await?;

    debug!(
        protocol_version = handshake.protocol_version,
        "responding to status query"
    );

    let json = json!({
        "version": {
            "name": MINECRAFT_VERSION,
            "protocol": PROTOCOL_VERSION,
        },
        "players": {
            "online": shared.player_count().load(Ordering::Relaxed),
            "max": shared.settings().max_players,
            "sample": [],
        },
        "description": {
            "text": shared.settings().motd,
        },
    });

    io.send_packet(&QueryResponseS2c {
        json: &json.to_string(),
    })
    .await?;

    let QueryPingC2s { payload } = io.recv_packet().await?;

    io.send_packet(&QueryPongS2c { payload }).await?;

    Ok(())
}

/// Contains information about a new client joining the server.
#[derive(Clone, Debug)]
pub(crate) struct NewClientInfo {
    pub(crate) username: String,
    pub(crate) uuid: Uuid,
}

/// Handle the login process and return the new client's data if successful.
async fn handle_login(
    shared: &SharedNetworkState,
    io: &mut PacketIo,
    handshake: &HandshakeData,
) -> anyhow::Result<Option<NewClientInfo>> {
    if handshake.protocol_version != PROTOCOL_VERSION {
        let reason = json!({
            "text": format!("This server runs Minecraft {MINECRAFT_VERSION}."),
        })
        .to_string();

        io.send_packet(&LoginDisconnectS2c { reason: &reason })
            .await?;

        return Ok(None);
    }

    let LoginHelloC2s { username } = io.recv_packet().await?;

    ensure!(is_valid_username(username.0), "invalid username");

    let username = username.0.to_owned();

    let threshold = shared.settings().threshold;
    if threshold.is_enabled() {
        io.send_packet(&LoginCompressionS2c {
            threshold: VarInt(threshold.0),
        })
        .await?;

        // Effective immediately: every frame after this one is compressed,
        // in both directions.
        io.set_compression(threshold);
    }

    let uuid = offline_uuid(&username)?;

    io.send_packet(&LoginSuccessS2c {
        uuid,
        username: Bounded(&username),
    })
    .await?;

    info!(username = %username, uuid = %uuid, "client logged in");

    Ok(Some(NewClientInfo { username, uuid }))
}

/// Joins the client into the (empty) world, then drives the channelled
/// connection until it ends. This early-stage server logs play packets and
/// otherwise lets them fall on the floor.
async fn handle_play(
    shared: &SharedNetworkState,
    io: PacketIo,
    info: NewClientInfo,
) -> anyhow::Result<()> {
    let entity_id = shared.entity_ids().fetch_add(1, Ordering::Relaxed) + 1;

    let game_join = GameJoinS2c {
        entity_id,
        is_hardcore: false,
        game_mode: 1,
        previous_game_mode: -1,
        world_count: VarInt(1),
        world_names: vec!["minecraft:overworld".to_owned()],
        registry_codec: Nbt(RegistryCodec::default()),
        dimension: Nbt(DimensionType::default()),
        world_name: "minecraft:overworld".to_owned(),
        hashed_seed: 0,
        max_players: VarInt(shared.settings().max_players as i32),
        view_distance: VarInt(10),
        reduced_debug_info: false,
        enable_respawn_screen: true,
        is_debug: false,
        is_flat: false,
    };

    let conn = io.into_connection(shared.settings().frame_channel_capacity);

    conn.send(&game_join).await?;

    shared.player_count().fetch_add(1, Ordering::Relaxed);

    let result = drive_play(&conn, &info).await;

    shared.player_count().fetch_sub(1, Ordering::Relaxed);
    conn.close();

    result
}

async fn drive_play(conn: &crate::Connection, info: &NewClientInfo) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            frame = conn.recv() => {
                match frame {
                    Ok(frame) => {
                        trace!(
                            username = %info.username,
                            id = frame.id,
                            len = frame.body.len(),
                            "play packet",
                        );
                    }
                    Err(_) => return Ok(()),
                }
            }
            err = conn.errors().recv_async() => {
                match err {
                    Ok(ConnectionError::Closed) | Err(_) => {
                        info!(username = %info.username, "client disconnected");
                        return Ok(());
                    }
                    Ok(e) => return Err(e.into()),
                }
            }
        }
    }
}

/// Usernames are 1 to 16 characters of `[A-Za-z0-9_]`.
fn is_valid_username(username: &str) -> bool {
    (1..=16).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Derives an offline-mode UUID from a hash of the username.
fn offline_uuid(username: &str) -> anyhow::Result<Uuid> {
    Ok(Uuid::from_slice(&Sha256::digest(username)[..16])?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_validation() {
        assert!(is_valid_username("Notch"));
        assert!(is_valid_username("jeb_"));
        assert!(is_valid_username("a"));
        assert!(is_valid_username("sixteen_chars_ab"));

        assert!(!is_valid_username(""));
        assert!(!is_valid_username("seventeen_chars_a"));
        assert!(!is_valid_username("space name"));
        assert!(!is_valid_username("héllo"));
    }

    #[test]
    fn offline_uuid_is_stable() {
        let a = offline_uuid("Notch").unwrap();
        let b = offline_uuid("Notch").unwrap();
        let c = offline_uuid("notch").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
