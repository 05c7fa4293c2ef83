use crate::captions::{Alignment, CaptionDocument, Cue, LayoutSettings};
use crate::error::Result;
use crate::formats::{block_text, empty_document, CaptionFormat, SubtitleCodec};
use crate::logging::log_debug;
use crate::time::{format_with_separator, parse_timestamp};
use once_cell::sync::Lazy;
use regex::Regex;

/// Тег привязки `{\anN}` в начале текста, который понимают большинство плееров
static ALIGNMENT_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\\an([1-9])\}").expect("valid alignment tag regex"));

/// Кодек SubRip (.srt)
///
/// ```text
/// 1
/// 00:00:01,000 --> 00:00:04,000
/// First caption text
///
/// 2
/// 00:00:05,500 --> 00:00:08,000
/// Second caption text
/// with multiple lines
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SrtCodec;

/// Разбирает строку `start --> end [X1:.. Y1:..]`
pub(crate) fn parse_arrow_timing(line: &str) -> Option<(i64, i64)> {
    let (start, rest) = line.split_once("-->")?;
    let end = rest.split_whitespace().next()?;
    Some((parse_timestamp(start)?, parse_timestamp(end)?))
}

/// Является ли строка номером блока, за которым сразу идет строка времени
fn is_index_before_timing(lines: &[&str], i: usize) -> bool {
    let line = lines[i].trim();
    !line.is_empty()
        && line.bytes().all(|b| b.is_ascii_digit())
        && lines.get(i + 1).map_or(false, |next| next.contains("-->"))
}

fn split_alignment_tag(text: &str) -> (Option<Alignment>, &str) {
    if let Some(caps) = ALIGNMENT_TAG_REGEX.captures(text) {
        let code: u8 = caps[1].parse().unwrap_or(2);
        let tag_len = caps[0].len();
        (Alignment::from_numpad(code), &text[tag_len..])
    } else {
        (None, text)
    }
}

impl SubtitleCodec for SrtCodec {
    fn parse(&self, text: &str) -> Result<CaptionDocument> {
        let lines: Vec<&str> = text.lines().collect();
        let mut cues = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].trim();
            i += 1;

            if !line.contains("-->") {
                // номер блока или мусор между блоками
                continue;
            }

            let mut text_lines: Vec<&str> = Vec::new();
            while i < lines.len() && !lines[i].trim().is_empty() {
                if lines[i].contains("-->") || is_index_before_timing(&lines, i) {
                    break;
                }
                text_lines.push(lines[i]);
                i += 1;
            }

            let Some((start, end)) = parse_arrow_timing(line) else {
                log_debug(&format!("SRT: пропущен блок с неверным временем: {}", line));
                continue;
            };
            if start >= end {
                log_debug(&format!("SRT: пропущен блок с пустым интервалом: {}", line));
                continue;
            }

            let joined = text_lines.join("\n");
            let (alignment, body) = split_alignment_tag(&joined);
            let mut cue = Cue::new(start, end, body);
            if let Some(alignment) = alignment {
                cue.layout = Some(LayoutSettings::default().with_alignment(alignment));
            }
            cues.push(cue);
        }

        if cues.is_empty() {
            return Ok(empty_document(CaptionFormat::Srt));
        }
        Ok(CaptionDocument::single_track(cues))
    }

    fn serialize(&self, document: &CaptionDocument) -> String {
        let mut output = String::new();

        for (index, cue) in document.merged_cues().iter().enumerate() {
            output.push_str(&format!("{}\n", index + 1));
            output.push_str(&format!(
                "{} --> {}\n",
                format_with_separator(cue.start, ','),
                format_with_separator(cue.end, ',')
            ));
            if let Some(alignment) = cue.layout.and_then(|layout| layout.alignment) {
                output.push_str(&format!("{{\\an{}}}", alignment.numpad()));
            }
            output.push_str(&block_text(&cue.text));
            output.push_str("\n\n");
        }

        output
    }
}
