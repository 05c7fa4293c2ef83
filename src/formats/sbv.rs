use crate::captions::{CaptionDocument, Cue};
use crate::error::Result;
use crate::formats::{block_text, empty_document, CaptionFormat, SubtitleCodec};
use crate::logging::log_debug;
use crate::time::{format_sbv_time, parse_timestamp};

/// Кодек YouTube SBV (.sbv)
///
/// ```text
/// 0:00:01.000,0:00:04.000
/// First caption text
///
/// 0:00:05.500,0:00:08.000
/// Second caption text
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SbvCodec;

/// Разбирает строку времени `start,end`
pub(crate) fn parse_timing_line(line: &str) -> Option<(i64, i64)> {
    let (start, end) = line.split_once(',')?;
    Some((parse_timestamp(start)?, parse_timestamp(end)?))
}

impl SubtitleCodec for SbvCodec {
    fn parse(&self, text: &str) -> Result<CaptionDocument> {
        let mut cues = Vec::new();
        let mut block: Vec<&str> = Vec::new();

        let mut flush = |block: &mut Vec<&str>| {
            if let Some((first, rest)) = block.split_first() {
                match parse_timing_line(first.trim()) {
                    Some((start, end)) if start < end => {
                        let text = rest.join("\n");
                        cues.push(Cue::new(start, end, text));
                    }
                    _ => log_debug(&format!("SBV: пропущен блок с неверным временем: {}", first)),
                }
            }
            block.clear();
        };

        for line in text.lines() {
            if line.trim().is_empty() {
                flush(&mut block);
            } else {
                block.push(line);
            }
        }
        flush(&mut block);

        if cues.is_empty() {
            return Ok(empty_document(CaptionFormat::Sbv));
        }
        Ok(CaptionDocument::single_track(cues))
    }

    fn serialize(&self, document: &CaptionDocument) -> String {
        let mut output = String::new();

        for cue in document.merged_cues() {
            output.push_str(&format!("{},{}\n", format_sbv_time(cue.start), format_sbv_time(cue.end)));
            output.push_str(&block_text(&cue.text));
            output.push_str("\n\n");
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sbv() {
        let sbv = "0:00:01.000,0:00:03.000\nHello\n\n0:00:03.500,0:00:05.000\nMulti\nline\n";
        let document = SbvCodec.parse(sbv).unwrap();
        let track = document.track(0).unwrap();

        assert_eq!(track.len(), 2);
        assert_eq!(track[0], Cue::new(1000, 3000, "Hello"));
        assert_eq!(track[1], Cue::new(3500, 5000, "Multi\nline"));
    }

    #[test]
    fn test_parse_sbv_skips_bad_timing() {
        let sbv = "nonsense\ntext\n\n0:00:01.000,0:00:00.500\nBackwards\n\n0:00:02.000,0:00:03.000\nKept\n";
        let document = SbvCodec.parse(sbv).unwrap();
        let track = document.track(0).unwrap();

        assert_eq!(track.len(), 1);
        assert_eq!(track[0].text, "Kept");
    }

    #[test]
    fn test_serialize_sbv() {
        let document = CaptionDocument::single_track(vec![Cue::new(3_723_045, 3_724_000, "Late")]);
        assert_eq!(SbvCodec.serialize(&document), "1:02:03.045,1:02:04.000\nLate\n\n");
    }
}
