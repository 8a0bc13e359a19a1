//! The dataset-configuration dialogue core.
//!
//! A session accumulates one value per configuration field across model
//! turns: the prompt embeds only what is still missing, the model's
//! streamed reply is reassembled and its JSON recovered (with a lenient
//! repair fallback), the recovered context is normalized to the fixed
//! field set, and the merge adopts each field at most once. The dialogue
//! is complete when every field is set.

pub mod extract;
pub mod fields;
pub mod merge;
pub mod normalize;
pub mod prompt;
pub mod session;
pub mod store;
pub mod turn;

pub use fields::{FieldState, REQUIRED_KEYS};
pub use session::{Phase, Session, SessionState};
pub use store::SessionRegistry;
pub use turn::{DialogueEngine, TurnReply, COMPLETION_MESSAGE, REPAIR_NOTICE};
