pub mod queue;
pub mod sequencer;

pub use queue::{QueueSnapshot, TrackQueue};
pub use sequencer::{spawn_player, PlayerEvent, PlayerHandle};
