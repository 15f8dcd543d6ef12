pub mod messages;
pub mod puzzle;
pub mod session;

// Re-export all types
pub use messages::*;
pub use puzzle::*;
pub use session::*;
