pub mod advisory;
pub mod ai_runner;
pub mod change_feed;
pub mod puzzles;
pub mod sessions;

mod paths;

// Re-export main components
pub use advisory::*;
pub use ai_runner::*;
pub use change_feed::*;
pub use puzzles::*;
pub use sessions::*;
