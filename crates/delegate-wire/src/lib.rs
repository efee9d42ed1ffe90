//! Wire types for the orchestrator ↔ worker delegation protocol.
//!
//! Every message sent to a worker is a [`RequestEnvelope`]. The first message of
//! an exchange names the operation through `type`; follow-up messages inside the
//! same exchange omit it and are matched by `uuid` alone. Worker replies are
//! either a render callback or a terminal result, see [`WorkerReply`].
//!
//! Binary content never travels raw: [`content`] holds the base64 codec and the
//! serde adapter used by response types that carry bytes.

pub mod content;
mod envelope;
mod reply;

pub use envelope::{EnvelopeKind, RequestEnvelope};
pub use reply::{CompletedReply, RENDER_ACTION, RenderCallback, WorkerReply};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid base64 content: {0}")]
    Content(#[from] base64::DecodeError),
    #[error("malformed worker reply: {message}")]
    Malformed { message: String },
}

impl WireError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}
