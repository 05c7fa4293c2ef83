pub mod models;

pub use models::{
    Alignment, CaptionDocument, Cue, HorizontalAnchor, LayoutSettings, Position,
    RawCaptionSource, ResolvedLayout, Track, VerticalAnchor, MAX_TRACKS,
};
