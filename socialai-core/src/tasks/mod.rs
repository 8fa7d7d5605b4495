// socialai-core/src/tasks/mod.rs
pub mod status_viewer;

pub use status_viewer::spawn_status_ticker;
