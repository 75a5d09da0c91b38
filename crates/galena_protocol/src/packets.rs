//! The packet surface for protocol 754.
//!
//! Packets are grouped in submodules according to the protocol stage they're
//! used in. Each packet's wire layout is fully described by its annotated
//! struct definition; the `C2s`/`S2c` suffix marks the direction.

pub mod handshaking;
pub mod login;
pub mod play;
pub mod status;
