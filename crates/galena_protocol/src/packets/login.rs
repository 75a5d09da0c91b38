use uuid::Uuid;

use crate::{Bounded, Decode, Encode, Packet, PacketState, RawBytes, VarInt};

#[derive(Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x00, state = PacketState::Login)]
pub struct LoginHelloC2s<'a> {
    pub username: Bounded<&'a str, 16>,
}

/// The encryption response shape. The server carries this packet's layout
/// without implementing the key exchange itself.
#[derive(Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x01, state = PacketState::Login)]
pub struct LoginKeyC2s<'a> {
    pub shared_secret_len: VarInt,
    #[packet(len = "shared_secret_len")]
    pub shared_secret: &'a [u8],
    pub verify_token_len: VarInt,
    #[packet(len = "verify_token_len")]
    pub verify_token: &'a [u8],
}

#[derive(Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x02, state = PacketState::Login)]
pub struct LoginQueryResponseC2s<'a> {
    pub message_id: VarInt,
    pub successful: bool,
    #[packet(present = "successful")]
    pub data: Option<RawBytes<'a>>,
}

#[derive(Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x00, state = PacketState::Login)]
pub struct LoginDisconnectS2c<'a> {
    /// A JSON chat component explaining the disconnect.
    pub reason: &'a str,
}

/// The encryption request shape, carried for wire compatibility only.
#[derive(Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x01, state = PacketState::Login)]
pub struct LoginHelloS2c<'a> {
    pub server_id: Bounded<&'a str, 20>,
    pub public_key_len: VarInt,
    #[packet(len = "public_key_len")]
    pub public_key: &'a [u8],
    pub verify_token_len: VarInt,
    #[packet(len = "verify_token_len")]
    pub verify_token: &'a [u8],
}

#[derive(Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x02, state = PacketState::Login)]
pub struct LoginSuccessS2c<'a> {
    pub uuid: Uuid,
    pub username: Bounded<&'a str, 16>,
}

/// Optionally sent by the server to enable compression for the connection.
/// A negative threshold disables compression again.
#[derive(Copy, Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x03, state = PacketState::Login)]
pub struct LoginCompressionS2c {
    pub threshold: VarInt,
}

#[derive(Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x04, state = PacketState::Login)]
pub struct LoginQueryRequestS2c<'a> {
    pub message_id: VarInt,
    pub channel: &'a str,
    pub data: RawBytes<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counted_key_fields_round_trip() {
        let pkt = LoginKeyC2s {
            shared_secret_len: VarInt(3),
            shared_secret: &[1, 2, 3],
            verify_token_len: VarInt(4),
            verify_token: &[9, 8, 7, 6],
        };

        let mut buf = vec![];
        pkt.encode(&mut buf).unwrap();

        // Lengths travel ahead of their bytes, with no inline prefixes on the
        // byte runs themselves.
        assert_eq!(buf, [3, 1, 2, 3, 4, 9, 8, 7, 6]);

        let mut slice = buf.as_slice();
        let decoded = LoginKeyC2s::decode(&mut slice).unwrap();
        assert!(slice.is_empty());

        assert_eq!(decoded.shared_secret, pkt.shared_secret);
        assert_eq!(decoded.verify_token, pkt.verify_token);
    }

    #[test]
    fn plugin_response_data_follows_its_flag() {
        let mut buf = vec![];
        LoginQueryResponseC2s {
            message_id: VarInt(0),
            successful: false,
            data: None,
        }
        .encode(&mut buf)
        .unwrap();

        assert_eq!(buf, [0, 0]);

        buf.clear();
        LoginQueryResponseC2s {
            message_id: VarInt(0),
            successful: true,
            data: Some(RawBytes(&[0xAA, 0xBB])),
        }
        .encode(&mut buf)
        .unwrap();

        assert_eq!(buf, [0, 1, 0xAA, 0xBB]);

        let mut slice = buf.as_slice();
        let decoded = LoginQueryResponseC2s::decode(&mut slice).unwrap();
        assert_eq!(decoded.data.unwrap().0, [0xAA, 0xBB]);
    }
}
