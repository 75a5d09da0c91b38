use crate::{Decode, Encode, Packet, PacketState};

#[derive(Copy, Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x00, state = PacketState::Status)]
pub struct QueryRequestC2s;

#[derive(Copy, Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x01, state = PacketState::Status)]
pub struct QueryPingC2s {
    pub payload: i64,
}

#[derive(Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x00, state = PacketState::Status)]
pub struct QueryResponseS2c<'a> {
    /// The JSON server-list payload: version, player counts, description.
    pub json: &'a str,
}

#[derive(Copy, Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x01, state = PacketState::Status)]
pub struct QueryPongS2c {
    pub payload: i64,
}
