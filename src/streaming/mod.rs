//! Peer-facing streaming: outbound encoding and the transport abstraction

pub mod encoder;
pub mod mock;
pub mod transport;

pub use encoder::{FrameEncoder, Framing, IMAGE_TAG, encode_image, encode_pose};
pub use mock::MockTransport;
pub use transport::{Received, TcpTransport, Transport};
