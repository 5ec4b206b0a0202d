//! Provider-independent types shared by the room generation engine, the HTTP
//! boundary and the terminal entry points.

pub mod description;
pub mod envelope;
pub mod events;
pub mod models;
pub mod runs;

pub use description::{CustomPrompt, InputError, RoomDescription};
pub use envelope::ResultEnvelope;
