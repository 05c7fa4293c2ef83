//! Кодеки форматов субтитров
//!
//! Каждый формат реализует трейт [`SubtitleCodec`], выбор кодека идет через
//! перечисление [`CaptionFormat`]. Разбор мягкий: поврежденные блоки
//! пропускаются, ошибка возвращается только при отсутствии обязательных
//! структурных маркеров (заголовок `WEBVTT`, секция `[Events]`).

mod ass;
mod sbv;
mod srt;
mod vtt;

pub use ass::AssCodec;
pub use sbv::SbvCodec;
pub use srt::SrtCodec;
pub use vtt::VttCodec;

use crate::captions::{CaptionDocument, RawCaptionSource};
use crate::config::CodecOptions;
use crate::error::{Error, Result};
use crate::logging::{log_debug, log_info, log_trace, log_warning};
use std::fs;
use std::path::Path;

/// Общий интерфейс кодека субтитров
pub trait SubtitleCodec: Send + Sync {
    /// Разбирает текст в каноническую модель
    fn parse(&self, text: &str) -> Result<CaptionDocument>;

    /// Сериализует документ в текст формата
    fn serialize(&self, document: &CaptionDocument) -> String;
}

/// Поддерживаемые форматы субтитров
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptionFormat {
    /// SubRip
    Srt,
    /// WebVTT
    Vtt,
    /// YouTube SBV
    Sbv,
    /// SubStation Alpha
    Ssa,
    /// Advanced SubStation Alpha
    Ass,
}

static SRT: SrtCodec = SrtCodec;
static VTT: VttCodec = VttCodec;
static SBV: SbvCodec = SbvCodec;
static SSA: AssCodec = AssCodec::ssa();
static ASS: AssCodec = AssCodec::ass();

impl CaptionFormat {
    pub const ALL: [CaptionFormat; 5] = [Self::Srt, Self::Vtt, Self::Sbv, Self::Ssa, Self::Ass];

    /// Определяет формат по тегу или расширению (без учета регистра, точка допускается)
    pub fn from_tag(tag: &str) -> Result<Self> {
        let normalized = tag.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "srt" => Ok(Self::Srt),
            "vtt" | "webvtt" => Ok(Self::Vtt),
            "sbv" => Ok(Self::Sbv),
            "ssa" => Ok(Self::Ssa),
            "ass" => Ok(Self::Ass),
            _ => Err(Error::UnsupportedFormat(tag.to_string())),
        }
    }

    /// Определяет формат по расширению имени файла
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        Self::from_tag(extension)
    }

    /// Расширение файла без точки
    pub fn extension(self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Sbv => "sbv",
            Self::Ssa => "ssa",
            Self::Ass => "ass",
        }
    }

    /// Кодек для формата
    pub fn codec(self) -> &'static dyn SubtitleCodec {
        match self {
            Self::Srt => &SRT,
            Self::Vtt => &VTT,
            Self::Sbv => &SBV,
            Self::Ssa => &SSA,
            Self::Ass => &ASS,
        }
    }

    /// Может ли формат содержать эффекты, которые модель не представляет
    pub fn is_effect_rich(self) -> bool {
        matches!(self, Self::Ssa | Self::Ass)
    }
}

impl std::fmt::Display for CaptionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for CaptionFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s)
    }
}

/// Готовит текст субтитра для форматов, где пустая строка завершает блок
///
/// Пустые и пробельные строки внутри текста выбрасываются, остальные строки
/// пишутся как есть.
pub(crate) fn block_text(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Убирает BOM в начале текста
pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Разбирает текст субтитров указанного формата
pub fn parse(format: CaptionFormat, text: &str) -> Result<CaptionDocument> {
    let document = format.codec().parse(strip_bom(text))?;
    log_debug(&format!(
        "Разобрано {} субтитров формата {} в {} дорожках",
        document.cue_count(),
        format,
        document.track_count()
    ));
    Ok(document)
}

/// Сериализует документ в указанный формат
///
/// Документ без дорожек не экспортируется.
pub fn serialize(format: CaptionFormat, document: &CaptionDocument) -> Result<String> {
    if document.tracks.is_empty() {
        return Err(Error::MalformedSourceDocument(
            "cannot export a caption document without tracks".to_string(),
        ));
    }
    let output = format.codec().serialize(document);
    log_trace(&format!("Сериализовано {} байт в формате {}", output.len(), format));
    Ok(output)
}

/// Имя файла для экспорта: `{videoId}.{ext}`
pub fn export_file_name(video_id: &str, format: CaptionFormat) -> String {
    format!("{}.{}", video_id, format.extension())
}

/// Определяет формат по имени файла, а если расширение неизвестно - по содержимому
pub fn detect_format(file_name: &str, text: &str) -> Result<CaptionFormat> {
    if let Ok(format) = CaptionFormat::from_extension(file_name) {
        return Ok(format);
    }

    let text = strip_bom(text);
    let first_line = text.lines().find(|line| !line.trim().is_empty()).unwrap_or("");
    let first_line = first_line.trim();

    if first_line.starts_with("WEBVTT") {
        return Ok(CaptionFormat::Vtt);
    }
    if first_line.eq_ignore_ascii_case("[script info]") {
        let is_v4_plus = text.lines().any(|line| {
            let line = line.trim().to_ascii_lowercase();
            line == "[v4+ styles]" || line.starts_with("scripttype: v4.00+")
        });
        return Ok(if is_v4_plus { CaptionFormat::Ass } else { CaptionFormat::Ssa });
    }
    if text.lines().any(|line| line.contains("-->")) {
        return Ok(CaptionFormat::Srt);
    }
    if text.lines().any(|line| sbv::parse_timing_line(line.trim()).is_some()) {
        return Ok(CaptionFormat::Sbv);
    }

    Err(Error::UnsupportedFormat(file_name.to_string()))
}

/// Результат загрузки субтитров
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCaption {
    /// Каноническая модель (пустая, если конвертация пропущена)
    pub document: CaptionDocument,
    /// Исходный текст для форматов с эффектами
    pub raw: Option<RawCaptionSource>,
    converted: bool,
}

impl LoadedCaption {
    /// Можно ли редактировать субтитры через модель
    ///
    /// `false`, если доступен только исходный текст: редактор должен
    /// отключиться или предупредить пользователя.
    pub fn is_editable(&self) -> bool {
        self.converted
    }
}

/// Загружает субтитры для редактора и рендерера
///
/// Для SSA/ASS исходный текст сохраняется всегда. Крупные SSA/ASS файлы
/// не конвертируются в модель вовсе, чтобы не блокировать UI.
pub fn load_caption(format: CaptionFormat, text: &str, options: &CodecOptions) -> Result<LoadedCaption> {
    let text = strip_bom(text);

    if !format.is_effect_rich() {
        return Ok(LoadedCaption {
            document: parse(format, text)?,
            raw: None,
            converted: true,
        });
    }

    let raw = Some(RawCaptionSource::new(format.extension(), text));
    if text.len() > options.raw_only_threshold_bytes {
        log_warning(&format!(
            "Файл {} размером {} байт передан только как исходный текст (порог {} байт)",
            format,
            text.len(),
            options.raw_only_threshold_bytes
        ));
        return Ok(LoadedCaption {
            document: CaptionDocument::new(),
            raw,
            converted: false,
        });
    }

    Ok(LoadedCaption {
        document: parse(format, text)?,
        raw,
        converted: true,
    })
}

/// Читает и разбирает файл субтитров, формат определяется по расширению
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<CaptionDocument> {
    let path = path.as_ref();
    let format = CaptionFormat::from_extension(path)?;
    let text = fs::read_to_string(path)?;
    log_info(&format!("Чтение субтитров из файла: {}", path.display()));
    parse(format, &text)
}

/// Пустой документ для исходника, в котором не нашлось ни одного субтитра
pub(crate) fn empty_document(format: CaptionFormat) -> CaptionDocument {
    log_debug(&format!("В исходнике {} не найдено ни одного субтитра", format));
    CaptionDocument::new()
}
