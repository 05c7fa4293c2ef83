pub mod actions;
pub mod editor;
pub mod validation;

pub use actions::EditAction;
pub use editor::CaptionEditor;
pub use validation::{
    check_time_range, is_track_valid, resolve_caption, resolve_track, validate_document, ValidityChecks,
};
