pub mod document;
pub mod error;
pub mod memory;
pub mod subscription;

// Re-export the store surface
pub use document::*;
pub use error::*;
pub use memory::*;
pub use subscription::*;
