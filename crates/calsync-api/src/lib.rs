// calsync-api: Async client for the calendar server's live event stream

pub mod auth;
pub mod error;
pub mod frame;
pub mod message;
pub mod stream;
pub mod transport;

pub use auth::{CredentialProvider, SharedToken, StaticToken};
pub use error::Error;
pub use frame::{Frame, FrameParser, decode_frame};
pub use message::{DeletedEvent, EventPayload, ParticipantPayload, StreamMessage, UserInfoPayload};
pub use stream::{ConnectionState, MessageStream, StreamClient, StreamItem, StreamOptions};
pub use transport::{TlsMode, TransportConfig};
