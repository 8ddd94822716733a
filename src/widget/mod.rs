pub mod help_popup;
pub mod notes_panel;
pub mod page_view;
pub mod prompt;
pub mod status_bar;
