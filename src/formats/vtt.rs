use crate::captions::{
    Alignment, CaptionDocument, Cue, HorizontalAnchor, LayoutSettings, Position, VerticalAnchor,
};
use crate::error::{Error, Result};
use crate::formats::srt::parse_arrow_timing;
use crate::formats::{block_text, empty_document, CaptionFormat, SubtitleCodec};
use crate::logging::log_debug;
use crate::time::format_with_separator;

/// Кодек WebVTT (.vtt)
///
/// Из настроек субтитра распознаются только `align`, `position` и `line`
/// в процентах, остальные настройки отбрасываются.
#[derive(Debug, Clone, Copy, Default)]
pub struct VttCodec;

/// Разбирает значение в процентах (`"50%"`, `"10%,line-left"`)
fn parse_percent(value: &str) -> Option<f64> {
    let value = value.split(',').next()?;
    let number = value.strip_suffix('%')?;
    let number: f64 = number.trim().parse().ok()?;
    if (0.0..=100.0).contains(&number) {
        Some(number)
    } else {
        None
    }
}

fn format_percent(fraction: f64) -> String {
    let formatted = format!("{:.2}", fraction * 100.0);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{}%", trimmed)
}

fn vertical_from_line(percent: f64) -> VerticalAnchor {
    if percent < 100.0 / 3.0 {
        VerticalAnchor::Top
    } else if percent < 200.0 / 3.0 {
        VerticalAnchor::Middle
    } else {
        VerticalAnchor::Bottom
    }
}

/// Переводит настройки субтитра WebVTT в `LayoutSettings`
fn parse_cue_settings(settings: &str) -> Option<LayoutSettings> {
    let mut horizontal = None;
    let mut line = None;
    let mut position = None;

    for setting in settings.split_whitespace() {
        let Some((key, value)) = setting.split_once(':') else {
            continue;
        };
        match key {
            "align" => {
                horizontal = match value {
                    "start" | "left" => Some(HorizontalAnchor::Left),
                    "center" | "middle" => Some(HorizontalAnchor::Center),
                    "end" | "right" => Some(HorizontalAnchor::Right),
                    _ => None,
                }
            }
            "line" => line = parse_percent(value),
            "position" => position = parse_percent(value),
            _ => {}
        }
    }

    let mut layout = LayoutSettings::default();
    if let (Some(x), Some(y)) = (position, line) {
        layout.position = Some(Position::new(x / 100.0, y / 100.0));
    }
    let vertical = if layout.position.is_none() { line.map(vertical_from_line) } else { None };
    if horizontal.is_some() || vertical.is_some() {
        layout.alignment = Some(Alignment::from_anchors(
            vertical.unwrap_or(VerticalAnchor::Bottom),
            horizontal.unwrap_or(HorizontalAnchor::Center),
        ));
    }

    if layout.is_empty() {
        None
    } else {
        Some(layout)
    }
}

/// Переводит `LayoutSettings` в настройки субтитра WebVTT
fn format_cue_settings(layout: &LayoutSettings) -> String {
    let mut settings = Vec::new();

    if let Some(alignment) = layout.alignment {
        settings.push(match alignment.horizontal() {
            HorizontalAnchor::Left => "align:start".to_string(),
            HorizontalAnchor::Center => "align:center".to_string(),
            HorizontalAnchor::Right => "align:end".to_string(),
        });
    }

    if let Some(position) = layout.position {
        settings.push(format!("position:{}", format_percent(position.x)));
        settings.push(format!("line:{}", format_percent(position.y)));
    } else if let Some(alignment) = layout.alignment {
        match alignment.vertical() {
            VerticalAnchor::Top => settings.push("line:0%".to_string()),
            VerticalAnchor::Middle => settings.push("line:50%".to_string()),
            VerticalAnchor::Bottom => {}
        }
    }

    settings.join(" ")
}

/// Разбирает один блок (строки между пустыми строками)
fn parse_block(block: &[&str]) -> Option<Cue> {
    let first = block.first()?.trim();
    if first.starts_with("NOTE") || first == "STYLE" || first == "REGION" {
        return None;
    }

    // необязательный идентификатор субтитра перед строкой времени
    let timing_index = if first.contains("-->") { 0 } else { 1 };
    let timing_line = block.get(timing_index)?.trim();
    if !timing_line.contains("-->") {
        log_debug(&format!("WebVTT: пропущен блок без строки времени: {}", first));
        return None;
    }

    let Some((start, end)) = parse_arrow_timing(timing_line) else {
        log_debug(&format!("WebVTT: пропущен блок с неверным временем: {}", timing_line));
        return None;
    };
    if start >= end {
        log_debug(&format!("WebVTT: пропущен блок с пустым интервалом: {}", timing_line));
        return None;
    }

    let settings = timing_line
        .split_once("-->")
        .map(|(_, rest)| rest.split_whitespace().skip(1).collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    let text = block[timing_index + 1..].join("\n");

    let mut cue = Cue::new(start, end, text);
    cue.layout = parse_cue_settings(&settings);
    Some(cue)
}

impl SubtitleCodec for VttCodec {
    fn parse(&self, text: &str) -> Result<CaptionDocument> {
        let mut lines = text.lines().peekable();

        // Проверка заголовка WebVTT
        match lines.next() {
            Some(first_line) if first_line.trim_end().starts_with("WEBVTT") => {}
            _ => {
                return Err(Error::MalformedSourceDocument(
                    "Invalid WebVTT file: missing WEBVTT header".to_string(),
                ))
            }
        }

        // метаданные заголовка идут до первой пустой строки
        while let Some(line) = lines.peek() {
            if line.trim().is_empty() || line.contains("-->") {
                break;
            }
            lines.next();
        }

        let mut cues = Vec::new();
        let mut block: Vec<&str> = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                if !block.is_empty() {
                    cues.extend(parse_block(&block));
                    block.clear();
                }
            } else {
                block.push(line);
            }
        }
        if !block.is_empty() {
            cues.extend(parse_block(&block));
        }

        if cues.is_empty() {
            return Ok(empty_document(CaptionFormat::Vtt));
        }
        Ok(CaptionDocument::single_track(cues))
    }

    fn serialize(&self, document: &CaptionDocument) -> String {
        let mut output = String::from("WEBVTT\n\n");

        for cue in document.merged_cues() {
            output.push_str(&format!(
                "{} --> {}",
                format_with_separator(cue.start, '.'),
                format_with_separator(cue.end, '.')
            ));
            if let Some(layout) = &cue.layout {
                let settings = format_cue_settings(layout);
                if !settings.is_empty() {
                    output.push(' ');
                    output.push_str(&settings);
                }
            }
            output.push('\n');
            output.push_str(&block_text(&cue.text));
            output.push_str("\n\n");
        }

        output
    }
}
