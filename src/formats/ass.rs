//! Кодек SubStation Alpha (.ssa) и Advanced SubStation Alpha (.ass)
//!
//! Конвертация в модель выполняется по возможности: берутся время и текст
//! строк `Dialogue:`, встроенные теги `{\...}` удаляются, стили и
//! позиционирование отбрасываются. Каждый слой (`Layer`) становится
//! отдельной дорожкой. Круговая конвертация сложного ASS через модель
//! теряет данные; точный рендер возможен только через `RawCaptionSource`.

use crate::captions::{CaptionDocument, Cue, Track, MAX_TRACKS};
use crate::error::{Error, Result};
use crate::formats::{empty_document, CaptionFormat, SubtitleCodec};
use crate::logging::log_debug;
use crate::time::{format_centiseconds, parse_timestamp};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Встроенные теги переопределения `{\...}`
static OVERRIDE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").expect("valid override tag regex"));

const ASS_EVENT_FORMAT: &str = "Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";
const SSA_EVENT_FORMAT: &str = "Marked, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

const PLAY_RES_X: f64 = 384.0;
const PLAY_RES_Y: f64 = 288.0;

/// Вариант формата
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssVariant {
    /// SSA v4
    Ssa,
    /// ASS (v4+)
    Ass,
}

/// Кодек SSA/ASS
#[derive(Debug, Clone, Copy)]
pub struct AssCodec {
    variant: AssVariant,
}

impl AssCodec {
    pub const fn ssa() -> Self {
        Self { variant: AssVariant::Ssa }
    }

    pub const fn ass() -> Self {
        Self { variant: AssVariant::Ass }
    }

    pub fn variant(&self) -> AssVariant {
        self.variant
    }

    fn format(&self) -> CaptionFormat {
        match self.variant {
            AssVariant::Ssa => CaptionFormat::Ssa,
            AssVariant::Ass => CaptionFormat::Ass,
        }
    }
}

fn parse_format_line(line: &str) -> Vec<String> {
    line.trim_start_matches("Format:")
        .split(',')
        .map(|field| field.trim().to_lowercase())
        .collect()
}

/// Убирает теги переопределения и переводит escape-последовательности в текст
fn plain_text(text: &str) -> String {
    OVERRIDE_TAG_REGEX
        .replace_all(text, "")
        .replace("\\N", "\n")
        .replace("\\n", "\n")
        .replace("\\h", " ")
}

/// Разбирает строку `Dialogue:` по полям из `Format:`
///
/// Текст - последнее поле и может содержать запятые.
fn parse_dialogue(content: &str, format: &[String]) -> Option<(i64, Cue)> {
    let fields: Vec<&str> = content.splitn(format.len(), ',').collect();
    if fields.len() < format.len() {
        return None;
    }

    let mut layer = 0;
    let mut start = None;
    let mut end = None;
    let mut text = "";

    for (name, value) in format.iter().zip(fields.iter()) {
        match name.as_str() {
            "layer" => layer = value.trim().parse().unwrap_or(0),
            "start" => start = parse_timestamp(value),
            "end" => end = parse_timestamp(value),
            "text" => text = *value,
            _ => {}
        }
    }

    let (start, end) = (start?, end?);
    if start >= end {
        return None;
    }
    Some((layer, Cue::new(start, end, plain_text(text))))
}

/// Разносит субтитры по дорожкам: одна дорожка на слой
///
/// Слои сверх `MAX_TRACKS` складываются в последнюю дорожку.
fn tracks_from_layers(layers: BTreeMap<i64, Vec<Cue>>) -> Vec<Track> {
    let mut grouped: Vec<Vec<Cue>> = Vec::new();
    for (index, (_, cues)) in layers.into_iter().enumerate() {
        if index < MAX_TRACKS {
            grouped.push(cues);
        } else if let Some(last) = grouped.last_mut() {
            last.extend(cues);
        }
    }
    grouped.into_iter().map(Track::from_cues).collect()
}

/// Экранирует текст субтитра для строки `Dialogue:`
fn escape_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\\N")
}

impl AssCodec {
    fn override_prefix(&self, cue: &Cue) -> String {
        if self.variant == AssVariant::Ssa {
            return String::new();
        }
        let Some(layout) = cue.layout else {
            return String::new();
        };

        let mut tags = String::new();
        if let Some(alignment) = layout.alignment {
            tags.push_str(&format!("\\an{}", alignment.numpad()));
        }
        if let Some(position) = layout.position {
            tags.push_str(&format!(
                "\\pos({},{})",
                (position.x * PLAY_RES_X).round(),
                (position.y * PLAY_RES_Y).round()
            ));
        }
        if tags.is_empty() {
            tags
        } else {
            format!("{{{}}}", tags)
        }
    }

    fn write_header(&self, output: &mut String) {
        output.push_str("[Script Info]\n");
        output.push_str("; Script generated by caption-engine\n");
        match self.variant {
            AssVariant::Ssa => output.push_str("ScriptType: v4.00\n"),
            AssVariant::Ass => output.push_str("ScriptType: v4.00+\n"),
        }
        output.push_str(&format!("PlayResX: {}\nPlayResY: {}\n\n", PLAY_RES_X, PLAY_RES_Y));

        match self.variant {
            AssVariant::Ssa => {
                output.push_str("[V4 Styles]\n");
                output.push_str("Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, TertiaryColour, BackColour, Bold, Italic, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, AlphaLevel, Encoding\n");
                output.push_str("Style: Default,Arial,20,16777215,255,0,0,0,0,1,2,2,2,10,10,10,0,1\n\n");
            }
            AssVariant::Ass => {
                output.push_str("[V4+ Styles]\n");
                output.push_str("Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n");
                output.push_str("Style: Default,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,10,1\n\n");
            }
        }

        output.push_str("[Events]\n");
        match self.variant {
            AssVariant::Ssa => output.push_str(&format!("Format: {}\n", SSA_EVENT_FORMAT)),
            AssVariant::Ass => output.push_str(&format!("Format: {}\n", ASS_EVENT_FORMAT)),
        }
    }
}

impl SubtitleCodec for AssCodec {
    fn parse(&self, text: &str) -> Result<CaptionDocument> {
        let mut current_section = String::new();
        let mut saw_events = false;
        let mut event_format: Vec<String> = Vec::new();
        let mut layers: BTreeMap<i64, Vec<Cue>> = BTreeMap::new();

        for line in text.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with("!:") {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].to_lowercase();
                saw_events |= current_section == "events";
                continue;
            }

            if current_section != "events" {
                continue;
            }

            if line.starts_with("Format:") {
                event_format = parse_format_line(line);
            } else if let Some(content) = line.strip_prefix("Dialogue:") {
                if event_format.is_empty() {
                    // без строки Format используется порядок полей по умолчанию
                    let default_format = match self.variant {
                        AssVariant::Ssa => SSA_EVENT_FORMAT,
                        AssVariant::Ass => ASS_EVENT_FORMAT,
                    };
                    event_format = parse_format_line(default_format);
                }
                match parse_dialogue(content.trim_start(), &event_format) {
                    Some((layer, cue)) => layers.entry(layer).or_default().push(cue),
                    None => log_debug(&format!("{}: пропущена строка Dialogue: {}", self.format(), line)),
                }
            }
        }

        if !saw_events {
            return Err(Error::MalformedSourceDocument(format!(
                "Invalid {} file: missing [Events] section",
                self.format()
            )));
        }
        if layers.is_empty() {
            return Ok(empty_document(self.format()));
        }

        CaptionDocument::from_tracks(tracks_from_layers(layers))
    }

    fn serialize(&self, document: &CaptionDocument) -> String {
        let mut output = String::new();
        self.write_header(&mut output);

        for (track_index, track) in document.tracks.iter().enumerate() {
            for cue in track.iter() {
                let leading = match self.variant {
                    AssVariant::Ssa => "Marked=0".to_string(),
                    AssVariant::Ass => track_index.to_string(),
                };
                // после округления конец должен остаться позже начала
                let start_cs = cue.start.max(0).saturating_add(5) / 10;
                let end = cue.end.max(start_cs.saturating_add(1).saturating_mul(10));
                output.push_str(&format!(
                    "Dialogue: {},{},{},Default,,0,0,0,,{}{}\n",
                    leading,
                    format_centiseconds(cue.start),
                    format_centiseconds(end),
                    self.override_prefix(cue),
                    escape_text(&cue.text)
                ));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::{Alignment, LayoutSettings};

    const SAMPLE: &str = "[Script Info]\nTitle: Sample\nScriptType: v4.00+\n\n[V4+ Styles]\nFormat: Name, Fontname, Fontsize\nStyle: Default,Arial,20\n\n[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: 0,0:00:01.00,0:00:03.50,Default,,0,0,0,,{\\b1}Hello{\\b0}, world\\Nsecond line\nComment: 0,0:00:02.00,0:00:03.00,Default,,0,0,0,,ignored\nDialogue: 1,0:00:02.00,0:00:04.00,Default,,0,0,0,,{\\an8}Sign\nDialogue: 0,0:00:05.00,0:00:04.00,Default,,0,0,0,,backwards\n";

    #[test]
    fn test_parse_ass_layers_become_tracks() {
        let document = AssCodec::ass().parse(SAMPLE).unwrap();

        assert_eq!(document.track_count(), 2);
        let dialogue = document.track(0).unwrap();
        assert_eq!(dialogue.len(), 1);
        assert_eq!(dialogue[0], Cue::new(1000, 3500, "Hello, world\nsecond line"));

        let signs = document.track(1).unwrap();
        assert_eq!(signs[0].text, "Sign");
        // позиционирование из тегов не переносится в модель
        assert!(signs[0].layout.is_none());
    }

    #[test]
    fn test_parse_ssa_default_format_and_marked_field() {
        let ssa = "[Script Info]\nScriptType: v4.00\n\n[Events]\nDialogue: Marked=0,0:00:01.00,0:00:02.00,Default,,0000,0000,0000,,Text, with comma\n";
        let document = AssCodec::ssa().parse(ssa).unwrap();

        assert_eq!(document.track_count(), 1);
        assert_eq!(document.track(0).unwrap()[0], Cue::new(1000, 2000, "Text, with comma"));
    }

    #[test]
    fn test_parse_missing_events_section() {
        let result = AssCodec::ass().parse("[Script Info]\nTitle: nothing\n");
        assert!(matches!(result, Err(Error::MalformedSourceDocument(_))));
    }

    #[test]
    fn test_parse_events_without_dialogue_is_empty_document() {
        let document = AssCodec::ass().parse("[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n").unwrap();
        assert_eq!(document.track_count(), 1);
        assert!(document.is_empty());
    }

    #[test]
    fn test_too_many_layers_fold_into_last_track() {
        let mut ass = String::from("[Events]\n");
        for layer in 0..12 {
            ass.push_str(&format!(
                "Dialogue: {},0:00:{:02}.00,0:00:{:02}.50,Default,,0,0,0,,L{}\n",
                layer, layer, layer, layer
            ));
        }
        let document = AssCodec::ass().parse(&ass).unwrap();

        assert_eq!(document.track_count(), MAX_TRACKS);
        assert_eq!(document.track(MAX_TRACKS - 1).unwrap().len(), 3);
    }

    #[test]
    fn test_serialize_ass_rounds_to_centiseconds() {
        let mut document = CaptionDocument::single_track(vec![
            Cue::new(1_234, 3_235, "Line one\nLine two")
                .with_layout(LayoutSettings::default().with_alignment(Alignment::TopCenter)),
        ]);
        document.tracks.push(std::sync::Arc::new(Track::from_cues(vec![Cue::new(0, 500, "Second track")])));

        let output = AssCodec::ass().serialize(&document);
        assert!(output.contains("[V4+ Styles]"));
        assert!(output.contains("Dialogue: 0,0:00:01.23,0:00:03.24,Default,,0,0,0,,{\\an8}Line one\\NLine two\n"));
        assert!(output.contains("Dialogue: 1,0:00:00.00,0:00:00.50,Default,,0,0,0,,Second track\n"));

        let reparsed = AssCodec::ass().parse(&output).unwrap();
        assert_eq!(reparsed.track_count(), 2);
        assert_eq!(reparsed.track(0).unwrap()[0].start, 1_230);
    }

    #[test]
    fn test_serialize_ass_keeps_very_short_cues() {
        let document = CaptionDocument::single_track(vec![
            Cue::new(1_000, 1_004, "tiny"),
            Cue::new(2_000, 3_000, "normal"),
        ]);

        let output = AssCodec::ass().serialize(&document);
        assert!(output.contains("Dialogue: 0,0:00:01.00,0:00:01.01,Default,,0,0,0,,tiny\n"));

        let reparsed = AssCodec::ass().parse(&output).unwrap();
        let track = reparsed.track(0).unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track[0], Cue::new(1_000, 1_010, "tiny"));
    }

    #[test]
    fn test_serialize_ssa_uses_marked_field() {
        let document = CaptionDocument::single_track(vec![Cue::new(1_000, 2_000, "Hi")]);
        let output = AssCodec::ssa().serialize(&document);

        assert!(output.contains("[V4 Styles]"));
        assert!(output.contains("Dialogue: Marked=0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Hi\n"));
    }
}
