//! Ports - Trait definitions for the external collaborators.

pub mod extractor;
pub mod session;

pub use extractor::FrameExtractor;
pub use session::{Session, SessionFactory};
