// Export modules for use in tests
pub mod app;
pub mod event_source;
pub mod export;
pub mod note_editor;
pub mod notes;
pub mod notification;
pub mod panic_handler;
pub mod pdf;
pub mod sample;
pub mod settings;
pub mod theme;
pub mod viewer;
pub mod widget;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main app components
pub use app::{App, AppAction, run_app_with_event_source};
pub use viewer::{Viewer, ViewerEvent};
