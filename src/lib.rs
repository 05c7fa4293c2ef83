//! Библиотека для редактирования субтитров сообщества
//!
//! Состоит из трех частей:
//! - каноническая модель документа субтитров (`captions`);
//! - движок чистых правок с проверкой инвариантов (`editing`);
//! - кодеки SRT, WebVTT, SBV, SSA и ASS (`formats`).
//!
//! ```no_run
//! use caption_engine::{CaptionEditor, CaptionFormat, ValidityChecks};
//!
//! # fn main() -> caption_engine::Result<()> {
//! let document = caption_engine::parse(CaptionFormat::Srt, "1\n00:00:01,000 --> 00:00:02,000\nHi\n")?;
//! let editor = CaptionEditor::default();
//! let document = editor.modify_caption_text(&document, 0, 0, "Hello")?;
//! let document = editor.add_caption_to_track_time(&document, 0, 5000, None, ValidityChecks::Enforce)?;
//! let srt = caption_engine::serialize(CaptionFormat::Srt, &document)?;
//! # Ok(())
//! # }
//! ```

pub mod captions;
pub mod config;
pub mod editing;
pub mod error;
pub mod formats;
pub mod logging;
pub mod time;

pub use captions::{
    Alignment, CaptionDocument, Cue, HorizontalAnchor, LayoutSettings, Position, RawCaptionSource,
    ResolvedLayout, Track, VerticalAnchor, MAX_TRACKS,
};
pub use config::{CodecOptions, EditorOptions};
pub use editing::{validate_document, CaptionEditor, EditAction, ValidityChecks};
pub use error::{Error, ErrorType, Result};
pub use formats::{
    detect_format, export_file_name, load_caption, parse, parse_file, serialize, CaptionFormat,
    LoadedCaption, SubtitleCodec,
};
pub use logging::{log_debug, log_error, log_info, log_trace, log_warning, setup_logging, setup_test_logging};
pub use time::{format_time_ms, parse_time_lenient};
