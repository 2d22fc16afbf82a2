#![warn(missing_docs)]
//! Wire protocol shared by the inventory server and client.
//!
//! Transport is out of scope: callers move the framed byte buffers produced
//! here over whatever reliable, ordered channel they have.

mod codec;
mod protocol;

pub use codec::{
    compute_schema_hash, decode_client_message, decode_server_message, encode_client_message,
    encode_server_message, frame_len, MAX_FRAME_LEN,
};
pub use protocol::{
    ClientMessage, Sequence, ServerMessage, MAX_ID_LEN, MAX_REASON_LEN, MAX_SNAPSHOT_ITEMS,
    MAX_TAGGED_SLOTS, MAX_UNLOCKED_RECIPES, PROTOCOL_MAGIC, PROTOCOL_VERSION,
};
