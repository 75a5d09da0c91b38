use crate::{Bounded, Decode, Encode, Packet, PacketState, VarInt};

/// The first packet of every connection. The requested next state decides
/// whether the connection continues with a status query or a login.
#[derive(Clone, Debug, Encode, Decode, Packet)]
#[packet(id = 0x00, state = PacketState::Handshaking)]
pub struct HandshakeC2s<'a> {
    pub protocol_version: VarInt,
    pub server_address: Bounded<&'a str, 255>,
    pub server_port: u16,
    pub next_state: NextState,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Encode, Decode)]
pub enum NextState {
    #[packet(tag = 1)]
    Status,
    Login,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PacketDecoder, PacketEncoder, PROTOCOL_VERSION};

    #[test]
    fn handshake_frame_bytes() {
        let pkt = HandshakeC2s {
            protocol_version: VarInt(PROTOCOL_VERSION),
            server_address: Bounded("localhost"),
            server_port: 25565,
            next_state: NextState::Login,
        };

        let mut enc = PacketEncoder::new();
        enc.append_packet(&pkt).unwrap();
        let bytes = enc.take();

        let mut expected = vec![0x10, 0x00, 0xF2, 0x05, 0x09];
        expected.extend(b"localhost");
        expected.extend([0x63, 0xDD, 0x02]);

        assert_eq!(&bytes[..], expected);

        let mut dec = PacketDecoder::new();
        dec.queue_bytes(bytes);

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(frame.id, 0x00);

        let decoded = frame.decode::<HandshakeC2s>().unwrap();
        assert_eq!(decoded.protocol_version, VarInt(754));
        assert_eq!(decoded.server_address.0, "localhost");
        assert_eq!(decoded.server_port, 25565);
        assert_eq!(decoded.next_state, NextState::Login);
    }

    #[test]
    fn next_state_discriminants() {
        let mut buf = vec![];
        NextState::Status.encode(&mut buf).unwrap();
        NextState::Login.encode(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);
    }
}
