//! Настройки редактора и кодеков
//!
//! Значения по умолчанию подходят для браузерного редактора. Внешний
//! "процессор" страницы может передать длительность видео, чтобы ограничить
//! время вставляемых субтитров.

use crate::captions::MAX_TRACKS;
use serde::{Deserialize, Serialize};

/// Длительность нового субтитра по умолчанию в миллисекундах
pub const DEFAULT_CAPTION_DURATION_MS: i64 = 2000;

/// Размер исходника, начиная с которого SSA/ASS не конвертируется в модель
pub const DEFAULT_RAW_ONLY_THRESHOLD_BYTES: usize = 1024 * 1024;

/// Настройки движка правок
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorOptions {
    /// Длительность нового субтитра
    pub default_caption_duration_ms: i64,
    /// Максимальное количество дорожек
    pub max_tracks: usize,
    /// Длительность видео, если она известна
    pub video_duration_ms: Option<i64>,
    /// Уровень логирования
    #[serde(skip)]
    pub log_level: log::LevelFilter,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            default_caption_duration_ms: DEFAULT_CAPTION_DURATION_MS,
            max_tracks: MAX_TRACKS,
            video_duration_ms: None,
            log_level: log::LevelFilter::Info,
        }
    }
}

impl EditorOptions {
    /// Устанавливает длительность нового субтитра
    pub fn with_default_caption_duration_ms(mut self, duration_ms: i64) -> Self {
        self.default_caption_duration_ms = duration_ms.max(1);
        self
    }

    /// Устанавливает максимальное количество дорожек (не больше `MAX_TRACKS`)
    pub fn with_max_tracks(mut self, max_tracks: usize) -> Self {
        self.max_tracks = max_tracks.clamp(1, MAX_TRACKS);
        self
    }

    /// Устанавливает длительность видео
    pub fn with_video_duration_ms(mut self, duration_ms: i64) -> Self {
        self.video_duration_ms = Some(duration_ms.max(0));
        self
    }

    /// Устанавливает уровень логирования
    pub fn with_log_level(mut self, level: log::LevelFilter) -> Self {
        self.log_level = level;
        self
    }
}

/// Настройки загрузки субтитров
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodecOptions {
    /// SSA/ASS больше этого размера передаются только как исходный текст
    pub raw_only_threshold_bytes: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            raw_only_threshold_bytes: DEFAULT_RAW_ONLY_THRESHOLD_BYTES,
        }
    }
}

impl CodecOptions {
    pub fn with_raw_only_threshold_bytes(mut self, bytes: usize) -> Self {
        self.raw_only_threshold_bytes = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_options_builders_clamp() {
        let options = EditorOptions::default()
            .with_default_caption_duration_ms(0)
            .with_max_tracks(42)
            .with_video_duration_ms(-5);

        assert_eq!(options.default_caption_duration_ms, 1);
        assert_eq!(options.max_tracks, MAX_TRACKS);
        assert_eq!(options.video_duration_ms, Some(0));
    }

    #[test]
    fn test_editor_options_from_partial_json() {
        let options: EditorOptions =
            serde_json::from_str(r#"{"defaultCaptionDurationMs": 3000}"#).unwrap();
        assert_eq!(options.default_caption_duration_ms, 3000);
        assert_eq!(options.max_tracks, MAX_TRACKS);
        assert_eq!(options.log_level, log::LevelFilter::Info);
    }
}
