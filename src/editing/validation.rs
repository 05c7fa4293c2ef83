//! Проверка инвариантов дорожек
//!
//! Общая логика для всех операций правки: сортировка по времени начала,
//! проверка интервалов и пересечений, разрешение позиционных индексов.

use crate::captions::{CaptionDocument, Cue, Track};
use crate::error::{Error, Result};

/// Режим проверок для операций, меняющих время субтитров
///
/// `Skip` используется массовыми путями (импорт, сдвиг времени), которые
/// временно допускают пересечения и исправляют их позже через `fix_overlaps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidityChecks {
    #[default]
    Enforce,
    Skip,
}

impl ValidityChecks {
    pub fn is_enforced(self) -> bool {
        self == Self::Enforce
    }
}

/// Проверяет интервал: `0 <= start < end`
pub fn check_time_range(start: i64, end: i64) -> Result<()> {
    if start < 0 || start >= end {
        return Err(Error::InvalidTimeRange { start, end });
    }
    Ok(())
}

/// Устойчиво сортирует субтитры по времени начала
pub fn sort_track(track: &mut Track) {
    track.cues.sort_by_key(|cue| cue.start);
}

/// Находит первую пару пересекающихся соседних субтитров
pub fn find_overlap(track: &Track) -> Option<(usize, usize)> {
    track
        .cues
        .windows(2)
        .position(|pair| pair[0].end > pair[1].start)
        .map(|i| (i, i + 1))
}

fn overlap_error(track: &Track, track_id: usize, first: usize, second: usize) -> Error {
    Error::OverlapConflict(format!(
        "track {}: caption {} ({}..{} ms) overlaps caption {} ({}..{} ms)",
        track_id,
        first,
        track.cues[first].start,
        track.cues[first].end,
        second,
        track.cues[second].start,
        track.cues[second].end
    ))
}

/// Проверяет, что на дорожке нет пересечений
pub fn check_track_overlaps(track: &Track, track_id: usize) -> Result<()> {
    match find_overlap(track) {
        Some((first, second)) => Err(overlap_error(track, track_id, first, second)),
        None => Ok(()),
    }
}

/// Проверяет пересечения субтитра с его соседями
///
/// Пересечения в других местах дорожки (после импорта без проверок)
/// не мешают правке: их исправляет `fix_overlaps`.
pub fn check_neighbors(track: &Track, track_id: usize, index: usize) -> Result<()> {
    if index > 0 && track.cues[index - 1].end > track.cues[index].start {
        return Err(overlap_error(track, track_id, index - 1, index));
    }
    if index + 1 < track.cues.len() && track.cues[index].end > track.cues[index + 1].start {
        return Err(overlap_error(track, track_id, index, index + 1));
    }
    Ok(())
}

/// Проверяет сортировку и отсутствие пересечений
pub fn is_track_valid(track: &Track) -> bool {
    track.cues.windows(2).all(|pair| pair[0].start <= pair[1].start) && find_overlap(track).is_none()
}

/// Вставляет субтитр в отсортированную дорожку и возвращает его индекс
///
/// Субтитр встает после всех субтитров с тем же временем начала.
pub fn insert_sorted(track: &mut Track, cue: Cue) -> usize {
    let index = track.cues.partition_point(|existing| existing.start <= cue.start);
    track.cues.insert(index, cue);
    index
}

/// Вставляет субтитр и, если проверки включены, проверяет соседей
pub fn place_cue(track: &mut Track, track_id: usize, cue: Cue, checks: ValidityChecks) -> Result<usize> {
    let index = insert_sorted(track, cue);
    if checks.is_enforced() {
        check_neighbors(track, track_id, index)?;
    }
    Ok(index)
}

/// Проверяет инварианты всего документа
///
/// Документ должен иметь хотя бы одну дорожку, у каждого субтитра
/// `0 <= start < end`, дорожки отсортированы и без пересечений.
pub fn validate_document(document: &CaptionDocument) -> Result<()> {
    if document.tracks.is_empty() {
        return Err(Error::MalformedSourceDocument("caption document has no tracks".to_string()));
    }
    for (track_id, track) in document.tracks.iter().enumerate() {
        for cue in track.iter() {
            check_time_range(cue.start, cue.end)?;
        }
        if !track.cues.windows(2).all(|pair| pair[0].start <= pair[1].start) {
            return Err(Error::MalformedSourceDocument(format!("track {} is not sorted", track_id)));
        }
        check_track_overlaps(track, track_id)?;
    }
    Ok(())
}

/// Возвращает дорожку по позиционному индексу
pub fn resolve_track(document: &CaptionDocument, track_id: usize) -> Result<&Track> {
    document.track(track_id).ok_or_else(|| {
        Error::IndexOutOfRange(format!(
            "track {} does not exist (document has {} tracks)",
            track_id,
            document.track_count()
        ))
    })
}

/// Возвращает субтитр по позиционным индексам
pub fn resolve_caption(document: &CaptionDocument, track_id: usize, caption_id: usize) -> Result<&Cue> {
    let track = resolve_track(document, track_id)?;
    track.cues.get(caption_id).ok_or_else(|| {
        Error::IndexOutOfRange(format!(
            "caption {} does not exist in track {} ({} captions)",
            caption_id,
            track_id,
            track.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_time_range() {
        assert!(check_time_range(0, 1).is_ok());
        assert!(matches!(check_time_range(1000, 1000), Err(Error::InvalidTimeRange { .. })));
        assert!(check_time_range(-1, 10).is_err());
    }

    #[test]
    fn test_find_overlap_touching_is_not_overlap() {
        let touching = Track::from_cues(vec![Cue::new(0, 1000, "a"), Cue::new(1000, 2000, "b")]);
        assert!(find_overlap(&touching).is_none());
        assert!(is_track_valid(&touching));

        let overlapping = Track::from_cues(vec![Cue::new(0, 1500, "a"), Cue::new(1000, 2000, "b")]);
        assert_eq!(find_overlap(&overlapping), Some((0, 1)));
        assert!(matches!(check_track_overlaps(&overlapping, 0), Err(Error::OverlapConflict(_))));
    }

    #[test]
    fn test_place_cue_checks_only_neighbors() {
        let mut track = Track {
            cues: vec![Cue::new(0, 1500, "a"), Cue::new(1000, 2000, "b"), Cue::new(5000, 6000, "d")],
            settings: None,
        };
        // пересечение a/b не мешает вставке далеко от него
        let index = place_cue(&mut track, 0, Cue::new(3000, 4000, "c"), ValidityChecks::Enforce).unwrap();
        assert_eq!(index, 2);

        let mut blocked = track.clone();
        let result = place_cue(&mut blocked, 0, Cue::new(3500, 5500, "x"), ValidityChecks::Enforce);
        assert!(matches!(result, Err(Error::OverlapConflict(_))));

        let index = place_cue(&mut track, 0, Cue::new(3500, 5500, "x"), ValidityChecks::Skip).unwrap();
        assert_eq!(index, 3);
        assert!(!is_track_valid(&track));
    }

    #[test]
    fn test_insert_sorted_after_equal_starts() {
        let mut track = Track::from_cues(vec![Cue::new(0, 1000, "a"), Cue::new(2000, 3000, "b")]);
        assert_eq!(insert_sorted(&mut track, Cue::new(0, 500, "a2")), 1);
        assert_eq!(insert_sorted(&mut track, Cue::new(9000, 9500, "z")), 3);
    }

    #[test]
    fn test_resolve_caption_out_of_range() {
        let document = CaptionDocument::single_track(vec![Cue::new(0, 1000, "a")]);
        assert!(resolve_caption(&document, 0, 0).is_ok());
        assert!(matches!(resolve_caption(&document, 0, 1), Err(Error::IndexOutOfRange(_))));
        assert!(matches!(resolve_caption(&document, 3, 0), Err(Error::IndexOutOfRange(_))));
    }
}
