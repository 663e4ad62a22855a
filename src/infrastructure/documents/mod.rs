//! Document rendering and storage

mod renderer;
mod storage;

pub use renderer::PlainTextRenderer;
pub use storage::{InMemoryObjectStorage, LocalFileStorage};
