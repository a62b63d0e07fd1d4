pub mod direction;
pub mod input;
pub mod movement;
pub mod time;

pub use direction::Direction;
pub use input::{Action, HeldKeys, InputTracker, Key};
pub use movement::{MovementConfig, MovementLoop, PlayerState, WorldBounds};
pub use time::FixedStepClock;
