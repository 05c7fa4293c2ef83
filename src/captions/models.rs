use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Максимальное количество дорожек в документе
pub const MAX_TRACKS: usize = 10;

/// Точка привязки субтитра на сетке 3×3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alignment {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

/// Горизонтальная составляющая привязки
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

/// Вертикальная составляющая привязки
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAnchor {
    Top,
    Middle,
    Bottom,
}

impl Alignment {
    /// Собирает привязку из вертикальной и горизонтальной составляющих
    pub fn from_anchors(vertical: VerticalAnchor, horizontal: HorizontalAnchor) -> Self {
        use HorizontalAnchor as H;
        use VerticalAnchor as V;
        match (vertical, horizontal) {
            (V::Top, H::Left) => Self::TopLeft,
            (V::Top, H::Center) => Self::TopCenter,
            (V::Top, H::Right) => Self::TopRight,
            (V::Middle, H::Left) => Self::MiddleLeft,
            (V::Middle, H::Center) => Self::MiddleCenter,
            (V::Middle, H::Right) => Self::MiddleRight,
            (V::Bottom, H::Left) => Self::BottomLeft,
            (V::Bottom, H::Center) => Self::BottomCenter,
            (V::Bottom, H::Right) => Self::BottomRight,
        }
    }

    /// Привязка по "цифровой клавиатуре" (`\anN` в SSA/ASS и SRT): 1 - низ слева, 9 - верх справа
    pub fn from_numpad(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::BottomLeft),
            2 => Some(Self::BottomCenter),
            3 => Some(Self::BottomRight),
            4 => Some(Self::MiddleLeft),
            5 => Some(Self::MiddleCenter),
            6 => Some(Self::MiddleRight),
            7 => Some(Self::TopLeft),
            8 => Some(Self::TopCenter),
            9 => Some(Self::TopRight),
            _ => None,
        }
    }

    pub fn numpad(self) -> u8 {
        match self {
            Self::BottomLeft => 1,
            Self::BottomCenter => 2,
            Self::BottomRight => 3,
            Self::MiddleLeft => 4,
            Self::MiddleCenter => 5,
            Self::MiddleRight => 6,
            Self::TopLeft => 7,
            Self::TopCenter => 8,
            Self::TopRight => 9,
        }
    }

    pub fn vertical(self) -> VerticalAnchor {
        match self {
            Self::TopLeft | Self::TopCenter | Self::TopRight => VerticalAnchor::Top,
            Self::MiddleLeft | Self::MiddleCenter | Self::MiddleRight => VerticalAnchor::Middle,
            Self::BottomLeft | Self::BottomCenter | Self::BottomRight => VerticalAnchor::Bottom,
        }
    }

    pub fn horizontal(self) -> HorizontalAnchor {
        match self {
            Self::TopLeft | Self::MiddleLeft | Self::BottomLeft => HorizontalAnchor::Left,
            Self::TopCenter | Self::MiddleCenter | Self::BottomCenter => HorizontalAnchor::Center,
            Self::TopRight | Self::MiddleRight | Self::BottomRight => HorizontalAnchor::Right,
        }
    }
}

/// Нормализованная позиция на кадре (0.0..=1.0 по обеим осям)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Создает позицию, ограничивая координаты диапазоном 0..=1
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }
}

/// Настройки расположения субтитров
///
/// Используются на трех уровнях: документ, дорожка и отдельный субтитр.
/// Отсутствие `position` означает размещение по привязке, а не координаты (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl LayoutSettings {
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Поверхностное слияние: заданные поля `partial` заменяют текущие
    pub fn merged_with(&self, partial: &LayoutSettings) -> LayoutSettings {
        LayoutSettings {
            alignment: partial.alignment.or(self.alignment),
            position: partial.position.or(self.position),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alignment.is_none() && self.position.is_none()
    }
}

/// Итоговое расположение субтитра после применения приоритетов
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLayout {
    pub alignment: Alignment,
    pub position: Option<Position>,
}

/// Один субтитр: интервал времени в миллисекундах и текст
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    /// Время начала в миллисекундах
    pub start: i64,
    /// Время окончания в миллисекундах
    pub end: i64,
    /// Текст субтитра (может быть пустым сразу после создания)
    #[serde(default)]
    pub text: String,
    /// Переопределение расположения только для этого субтитра
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutSettings>,
}

impl Cue {
    /// Создает новый субтитр
    pub fn new(start: i64, end: i64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            layout: None,
        }
    }

    pub fn with_layout(mut self, layout: LayoutSettings) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Возвращает длительность субтитра в миллисекундах
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Середина интервала, используется для повторного поиска субтитра после правок
    pub fn midpoint(&self) -> i64 {
        self.start + (self.end - self.start) / 2
    }

    /// Проверяет, попадает ли момент времени внутрь субтитра (`start <= t < end`)
    pub fn contains(&self, time_ms: i64) -> bool {
        self.start <= time_ms && time_ms < self.end
    }

    /// Проверяет пересечение двух интервалов
    pub fn overlaps(&self, other: &Cue) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Дорожка субтитров
///
/// Субтитры отсортированы по времени начала и не пересекаются,
/// если только вызывающий код явно не отключил проверки.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(default)]
    pub cues: Vec<Cue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<LayoutSettings>,
}

impl Track {
    /// Создает новую пустую дорожку
    pub fn new() -> Self {
        Self::default()
    }

    /// Создает дорожку из субтитров, сортируя их по времени начала
    pub fn from_cues(mut cues: Vec<Cue>) -> Self {
        cues.sort_by_key(|cue| cue.start);
        Self { cues, settings: None }
    }

    /// Возвращает количество субтитров на дорожке
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Проверяет, пуста ли дорожка
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Возвращает итератор по субтитрам
    pub fn iter(&self) -> impl Iterator<Item = &Cue> {
        self.cues.iter()
    }

    /// Индекс субтитра, который покрывает момент времени
    pub fn find_caption_index_at(&self, time_ms: i64) -> Option<usize> {
        self.cues.iter().position(|cue| cue.contains(time_ms))
    }

    /// Повторно находит субтитр по середине его прежнего интервала
    ///
    /// Индексы субтитров позиционные и устаревают после вставки, удаления
    /// или пересортировки, поэтому UI ищет субтитр заново по значению.
    pub fn find_caption_index_by_midpoint(&self, start: i64, end: i64) -> Option<usize> {
        let midpoint = start + (end - start) / 2;
        self.find_caption_index_at(midpoint)
    }

    /// Индексы субтитров, которые UI должен подсветить
    ///
    /// Сюда попадают субтитры нулевой или отрицательной длительности и
    /// субтитры, пересекающиеся со следующим.
    pub fn flagged_caption_indices(&self) -> Vec<usize> {
        let mut flagged = Vec::new();
        for (i, cue) in self.cues.iter().enumerate() {
            let collapsed = cue.end <= cue.start;
            let overlaps_next = self.cues.get(i + 1).map_or(false, |next| cue.end > next.start);
            if collapsed || overlaps_next {
                flagged.push(i);
            }
        }
        flagged
    }

    /// Время окончания последнего субтитра
    pub fn end_time(&self) -> i64 {
        self.cues.iter().map(|cue| cue.end).max().unwrap_or(0)
    }
}

impl std::ops::Index<usize> for Track {
    type Output = Cue;

    fn index(&self, index: usize) -> &Self::Output {
        &self.cues[index]
    }
}

/// Документ субтитров: глобальные настройки и упорядоченный список дорожек
///
/// Дорожки хранятся за `Arc`, поэтому каждая правка разделяет с исходным
/// документом все дорожки, которых она не касалась.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_settings: Option<LayoutSettings>,
    pub tracks: Vec<Arc<Track>>,
}

impl Default for CaptionDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptionDocument {
    /// Создает новый документ с одной пустой дорожкой
    pub fn new() -> Self {
        Self {
            global_settings: None,
            tracks: vec![Arc::new(Track::new())],
        }
    }

    /// Создает документ из дорожек
    ///
    /// Документ без дорожек или с числом дорожек больше `MAX_TRACKS` недопустим.
    pub fn from_tracks(tracks: Vec<Track>) -> Result<Self> {
        Self::check_track_count(tracks.len())?;
        Ok(Self {
            global_settings: None,
            tracks: tracks.into_iter().map(Arc::new).collect(),
        })
    }

    /// Создает документ из одной дорожки
    pub fn single_track(cues: Vec<Cue>) -> Self {
        Self {
            global_settings: None,
            tracks: vec![Arc::new(Track::from_cues(cues))],
        }
    }

    fn check_track_count(count: usize) -> Result<()> {
        if count == 0 {
            return Err(Error::MalformedSourceDocument(
                "caption document has no tracks".to_string(),
            ));
        }
        if count > MAX_TRACKS {
            return Err(Error::MalformedSourceDocument(format!(
                "caption document has {} tracks, at most {} are allowed",
                count, MAX_TRACKS
            )));
        }
        Ok(())
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track(&self, track_id: usize) -> Option<&Track> {
        self.tracks.get(track_id).map(|track| track.as_ref())
    }

    /// Общее количество субтитров во всех дорожках
    pub fn cue_count(&self) -> usize {
        self.tracks.iter().map(|track| track.len()).sum()
    }

    /// Проверяет, есть ли в документе хотя бы один субтитр
    pub fn is_empty(&self) -> bool {
        self.tracks.iter().all(|track| track.is_empty())
    }

    /// Все субтитры документа, отсортированные по времени начала
    ///
    /// Сортировка устойчивая: при равном начале порядок дорожек сохраняется.
    pub fn merged_cues(&self) -> Vec<Cue> {
        let mut cues: Vec<Cue> = self
            .tracks
            .iter()
            .flat_map(|track| track.cues.iter().cloned())
            .collect();
        cues.sort_by_key(|cue| cue.start);
        cues
    }

    /// Вычисляет итоговое расположение субтитра
    ///
    /// Приоритет: субтитр, затем дорожка, затем документ, затем значение
    /// по умолчанию. Поля разрешаются независимо друг от друга.
    pub fn resolve_layout(&self, track_id: usize, caption_id: usize) -> Option<ResolvedLayout> {
        let track = self.tracks.get(track_id)?;
        let cue = track.cues.get(caption_id)?;
        let levels = [cue.layout, track.settings, self.global_settings];

        let alignment = levels
            .iter()
            .flatten()
            .find_map(|layout| layout.alignment)
            .unwrap_or_default();
        let position = levels.iter().flatten().find_map(|layout| layout.position);

        Some(ResolvedLayout { alignment, position })
    }

    /// Сериализует документ в JSON (формат обмена с сервером и локальных сохранений)
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Загружает документ из JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let document: CaptionDocument = serde_json::from_str(json)?;
        Self::check_track_count(document.tracks.len())?;
        Ok(document)
    }
}

/// Исходный текст субтитров, который нельзя без потерь перевести в модель
///
/// Передается внешнему рендереру как есть (в основном SSA/ASS с эффектами).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCaptionSource {
    pub format_tag: String,
    pub raw_text: String,
}

impl RawCaptionSource {
    pub fn new(format_tag: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            format_tag: format_tag.into(),
            raw_text: raw_text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_has_one_empty_track() {
        let document = CaptionDocument::new();
        assert_eq!(document.track_count(), 1);
        assert!(document.is_empty());
        assert!(document.global_settings.is_none());
    }

    #[test]
    fn test_from_tracks_rejects_bad_counts() {
        assert!(CaptionDocument::from_tracks(vec![]).is_err());
        assert!(CaptionDocument::from_tracks(vec![Track::new(); MAX_TRACKS + 1]).is_err());
        assert!(CaptionDocument::from_tracks(vec![Track::new(); MAX_TRACKS]).is_ok());
    }

    #[test]
    fn test_track_from_cues_sorts() {
        let track = Track::from_cues(vec![Cue::new(5000, 6000, "b"), Cue::new(1000, 2000, "a")]);
        assert_eq!(track[0].text, "a");
        assert_eq!(track[1].text, "b");
    }

    #[test]
    fn test_find_caption_index() {
        let track = Track::from_cues(vec![Cue::new(0, 1000, "a"), Cue::new(2000, 3000, "b")]);
        assert_eq!(track.find_caption_index_at(0), Some(0));
        assert_eq!(track.find_caption_index_at(1000), None);
        assert_eq!(track.find_caption_index_at(2500), Some(1));
        assert_eq!(track.find_caption_index_by_midpoint(2000, 3000), Some(1));
    }

    #[test]
    fn test_flagged_caption_indices() {
        let track = Track {
            cues: vec![
                Cue::new(0, 2000, "overlaps next"),
                Cue::new(1000, 1000, "collapsed"),
                Cue::new(3000, 4000, "fine"),
            ],
            settings: None,
        };
        assert_eq!(track.flagged_caption_indices(), vec![0, 1]);
    }

    #[test]
    fn test_resolve_layout_merges_fields_independently() {
        let mut track = Track::from_cues(vec![
            Cue::new(0, 1000, "a").with_layout(LayoutSettings::default().with_alignment(Alignment::TopLeft)),
            Cue::new(2000, 3000, "b"),
        ]);
        track.settings = Some(LayoutSettings::default().with_position(Position::new(0.25, 0.75)));

        let mut document = CaptionDocument::from_tracks(vec![track]).unwrap();
        document.global_settings = Some(LayoutSettings::default().with_alignment(Alignment::MiddleRight));

        let first = document.resolve_layout(0, 0).unwrap();
        assert_eq!(first.alignment, Alignment::TopLeft);
        assert_eq!(first.position, Some(Position::new(0.25, 0.75)));

        let second = document.resolve_layout(0, 1).unwrap();
        assert_eq!(second.alignment, Alignment::MiddleRight);

        assert!(document.resolve_layout(0, 5).is_none());
    }

    #[test]
    fn test_resolve_layout_default_is_bottom_center() {
        let document = CaptionDocument::single_track(vec![Cue::new(0, 1000, "a")]);
        let layout = document.resolve_layout(0, 0).unwrap();
        assert_eq!(layout.alignment, Alignment::BottomCenter);
        assert!(layout.position.is_none());
    }

    #[test]
    fn test_alignment_anchor_round_trip() {
        for alignment in [Alignment::TopRight, Alignment::MiddleLeft, Alignment::BottomCenter] {
            assert_eq!(Alignment::from_anchors(alignment.vertical(), alignment.horizontal()), alignment);
        }
    }

    #[test]
    fn test_json_round_trip_and_empty_rejection() {
        let document = CaptionDocument::single_track(vec![Cue::new(1000, 3000, "Hello")]);
        let json = document.to_json().unwrap();
        assert!(json.contains("\"tracks\""));
        assert_eq!(CaptionDocument::from_json(&json).unwrap(), document);

        assert!(CaptionDocument::from_json("{\"tracks\":[]}").is_err());
    }
}
