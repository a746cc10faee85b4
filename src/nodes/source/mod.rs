mod audio_input;
mod sine;
mod slider;

pub use audio_input::*;
pub use sine::*;
pub use slider::*;
