pub mod builder;
pub mod cipher;
pub mod codec;
pub mod compression;
pub mod error;
pub mod framing;
pub mod mode;
pub mod packets;
pub mod table;
pub mod version;

pub use builder::*;
pub use cipher::CipherStream;
pub use codec::*;
pub use compression::CompressionCodec;
pub use error::*;
pub use framing::{encode_frame, Frame, FrameReader, MAX_FRAME_LENGTH};
pub use mode::*;
pub use packets::*;
pub use table::*;
pub use version::*;
