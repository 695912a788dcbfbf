//! Booking dialogue: per-phone state, intent classification, prompts and the
//! transition table.

pub mod engine;
pub mod intent;
pub mod prompts;
pub mod state;

pub use engine::{Command, Transition, TransitionEngine};
pub use intent::Intent;
pub use state::{AddressCandidate, ConversationState, Coordinates, Step, TempData};
