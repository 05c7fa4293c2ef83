use crate::captions::{CaptionDocument, Cue, LayoutSettings, Track};
use crate::config::EditorOptions;
use crate::editing::validation::{
    check_time_range, insert_sorted, place_cue, resolve_caption, resolve_track, sort_track,
    ValidityChecks,
};
use crate::error::{Error, Result};
use crate::logging::{log_debug, log_error, log_info};
#[cfg(not(test))]
use crate::logging::setup_logging;
#[cfg(test)]
use crate::logging::setup_test_logging;
use crate::time::parse_time_lenient;
use std::sync::Arc;

/// Движок правок документа субтитров
///
/// Все операции чистые: принимают документ по ссылке и возвращают новый.
/// При ошибке исходный документ остается прежним, и вызывающий код просто
/// не сохраняет результат. Неизмененные дорожки разделяются между старым
/// и новым документом через `Arc`.
///
/// Субтитры адресуются позиционно (индекс дорожки и индекс в дорожке).
/// После вставки, удаления или пересортировки индексы устаревают, и их нужно
/// найти заново, например через `Track::find_caption_index_by_midpoint`.
#[derive(Debug, Clone)]
pub struct CaptionEditor {
    options: EditorOptions,
}

impl CaptionEditor {
    /// Создает новый движок с заданными настройками
    pub fn new(options: EditorOptions) -> Self {
        #[cfg(test)]
        {
            setup_test_logging(options.log_level);
        }
        #[cfg(not(test))]
        {
            setup_logging(options.log_level);
        }

        log_debug(&format!("Создан CaptionEditor с настройками: {:?}", options));
        Self { options }
    }

    /// Возвращает настройки движка
    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// Клонирует документ и применяет изменение к одной дорожке
    fn with_track<F, T>(&self, document: &CaptionDocument, track_id: usize, edit: F) -> Result<(CaptionDocument, T)>
    where
        F: FnOnce(&mut Track) -> Result<T>,
    {
        resolve_track(document, track_id)?;
        let mut updated = document.clone();
        let track = Arc::make_mut(&mut updated.tracks[track_id]);
        let value = edit(track)?;
        Ok((updated, value))
    }

    /// Ограничивает конец субтитра длительностью видео, если она известна
    fn clamp_to_video(&self, cue: &mut Cue) {
        if let Some(duration) = self.options.video_duration_ms {
            cue.end = cue.end.min(duration);
        }
    }

    /// Добавляет пустую дорожку в конец списка
    pub fn add_track(&self, document: &CaptionDocument) -> Result<CaptionDocument> {
        if document.track_count() >= self.options.max_tracks {
            return log_error(Error::TrackLimitReached(self.options.max_tracks), "add_track");
        }
        let mut updated = document.clone();
        updated.tracks.push(Arc::new(Track::new()));
        Ok(updated)
    }

    /// Удаляет дорожку; последнюю дорожку удалить нельзя
    pub fn remove_track(&self, document: &CaptionDocument, track_id: usize) -> Result<CaptionDocument> {
        let result = resolve_track(document, track_id).and_then(|_| {
            if document.track_count() <= 1 {
                return Err(Error::LastTrackRemoval);
            }
            let mut updated = document.clone();
            updated.tracks.remove(track_id);
            Ok(updated)
        });
        result.or_else(|err| log_error(err, "remove_track"))
    }

    /// Вставляет субтитр, начинающийся в `time_ms`
    ///
    /// Длительность берется из переданного субтитра или из настроек. Текст и
    /// расположение переданного субтитра сохраняются. При включенных проверках
    /// вставка внутрь существующего субтитра запрещена, а конец нового субтитра
    /// обрезается по началу следующего.
    pub fn add_caption_to_track_time(
        &self,
        document: &CaptionDocument,
        track_id: usize,
        time_ms: i64,
        cue: Option<Cue>,
        checks: ValidityChecks,
    ) -> Result<CaptionDocument> {
        let result = self.with_track(document, track_id, |track| {
            let duration = cue
                .as_ref()
                .map(Cue::duration)
                .filter(|duration| *duration > 0)
                .unwrap_or(self.options.default_caption_duration_ms);

            let mut new_cue = cue.unwrap_or_else(|| Cue::new(0, 0, ""));
            new_cue.start = time_ms;
            new_cue.end = time_ms.saturating_add(duration);
            self.clamp_to_video(&mut new_cue);

            if checks.is_enforced() {
                if let Some(index) = track.find_caption_index_at(time_ms) {
                    return Err(Error::OverlapConflict(format!(
                        "track {}: {} ms falls inside caption {}",
                        track_id, time_ms, index
                    )));
                }
                if let Some(next) = track.iter().find(|existing| existing.start > time_ms) {
                    new_cue.end = new_cue.end.min(next.start);
                }
            }

            check_time_range(new_cue.start, new_cue.end)?;
            place_cue(track, track_id, new_cue, checks)
        });
        result
            .map(|(updated, _)| updated)
            .or_else(|err| log_error(err, "add_caption_to_track_time"))
    }

    /// Вставляет новый субтитр сразу после указанного
    ///
    /// Новый субтитр начинается в конце указанного и занимает промежуток до
    /// следующего, но не дольше длительности по умолчанию.
    pub fn add_caption_to_track_relative(
        &self,
        document: &CaptionDocument,
        track_id: usize,
        caption_id: usize,
    ) -> Result<CaptionDocument> {
        let result = resolve_caption(document, track_id, caption_id).and_then(|anchor| {
            let start = anchor.end;
            let default_end = start.saturating_add(self.options.default_caption_duration_ms);

            let end = match document.tracks[track_id].cues.get(caption_id + 1) {
                Some(next) => {
                    let gap = next.start - start;
                    if gap <= 0 {
                        return Err(Error::OverlapConflict(format!(
                            "track {}: no room after caption {} (gap {} ms)",
                            track_id, caption_id, gap
                        )));
                    }
                    default_end.min(next.start)
                }
                None => default_end,
            };

            let mut new_cue = Cue::new(start, end, "");
            self.clamp_to_video(&mut new_cue);
            check_time_range(new_cue.start, new_cue.end)?;

            self.with_track(document, track_id, |track| {
                track.cues.insert(caption_id + 1, new_cue);
                Ok(())
            })
        });
        result
            .map(|(updated, _)| updated)
            .or_else(|err| log_error(err, "add_caption_to_track_relative"))
    }

    /// Заменяет запись субтитра целиком (время, текст и расположение)
    pub fn modify_caption(
        &self,
        document: &CaptionDocument,
        track_id: usize,
        caption_id: usize,
        new_cue: Cue,
        checks: ValidityChecks,
    ) -> Result<CaptionDocument> {
        let result = resolve_caption(document, track_id, caption_id)
            .and_then(|_| check_time_range(new_cue.start, new_cue.end))
            .and_then(|_| {
                self.with_track(document, track_id, |track| {
                    track.cues.remove(caption_id);
                    place_cue(track, track_id, new_cue, checks)
                })
            });
        result
            .map(|(updated, _)| updated)
            .or_else(|err| log_error(err, "modify_caption"))
    }

    /// Заменяет только текст субтитра
    pub fn modify_caption_text(
        &self,
        document: &CaptionDocument,
        track_id: usize,
        caption_id: usize,
        text: &str,
    ) -> Result<CaptionDocument> {
        let result = resolve_caption(document, track_id, caption_id).and_then(|_| {
            self.with_track(document, track_id, |track| {
                track.cues[caption_id].text = text.to_string();
                Ok(())
            })
        });
        result
            .map(|(updated, _)| updated)
            .or_else(|err| log_error(err, "modify_caption_text"))
    }

    /// Устанавливает время начала в миллисекундах
    ///
    /// Значение не подгоняется: `start >= end` возвращает ошибку.
    pub fn modify_caption_start_time_ms(
        &self,
        document: &CaptionDocument,
        track_id: usize,
        caption_id: usize,
        start_ms: i64,
        checks: ValidityChecks,
    ) -> Result<CaptionDocument> {
        match resolve_caption(document, track_id, caption_id) {
            Ok(cue) => self.modify_caption_time(document, track_id, caption_id, start_ms, cue.end, checks),
            Err(err) => log_error(err, "modify_caption_start_time_ms"),
        }
    }

    /// Устанавливает время окончания в миллисекундах
    pub fn modify_caption_end_time_ms(
        &self,
        document: &CaptionDocument,
        track_id: usize,
        caption_id: usize,
        end_ms: i64,
        checks: ValidityChecks,
    ) -> Result<CaptionDocument> {
        match resolve_caption(document, track_id, caption_id) {
            Ok(cue) => self.modify_caption_time(document, track_id, caption_id, cue.start, end_ms, checks),
            Err(err) => log_error(err, "modify_caption_end_time_ms"),
        }
    }

    /// Устанавливает время начала из строки, введенной пользователем
    pub fn modify_caption_start_time(
        &self,
        document: &CaptionDocument,
        track_id: usize,
        caption_id: usize,
        formatted: &str,
        checks: ValidityChecks,
    ) -> Result<CaptionDocument> {
        match parse_time_lenient(formatted) {
            Some(start_ms) => self.modify_caption_start_time_ms(document, track_id, caption_id, start_ms, checks),
            None => log_error(
                Error::UnparsableFormattedTime(formatted.to_string()),
                "modify_caption_start_time",
            ),
        }
    }

    /// Устанавливает время окончания из строки, введенной пользователем
    pub fn modify_caption_end_time(
        &self,
        document: &CaptionDocument,
        track_id: usize,
        caption_id: usize,
        formatted: &str,
        checks: ValidityChecks,
    ) -> Result<CaptionDocument> {
        match parse_time_lenient(formatted) {
            Some(end_ms) => self.modify_caption_end_time_ms(document, track_id, caption_id, end_ms, checks),
            None => log_error(
                Error::UnparsableFormattedTime(formatted.to_string()),
                "modify_caption_end_time",
            ),
        }
    }

    /// Атомарно устанавливает начало и конец субтитра
    pub fn modify_caption_time(
        &self,
        document: &CaptionDocument,
        track_id: usize,
        caption_id: usize,
        start_ms: i64,
        end_ms: i64,
        checks: ValidityChecks,
    ) -> Result<CaptionDocument> {
        let result = resolve_caption(document, track_id, caption_id)
            .and_then(|_| check_time_range(start_ms, end_ms))
            .and_then(|_| {
                self.with_track(document, track_id, |track| {
                    let mut cue = track.cues.remove(caption_id);
                    cue.start = start_ms;
                    cue.end = end_ms;
                    place_cue(track, track_id, cue, checks)
                })
            });
        result
            .map(|(updated, _)| updated)
            .or_else(|err| log_error(err, "modify_caption_time"))
    }

    /// Переносит субтитр на другую дорожку с новым временем
    ///
    /// Если `final_track_id == track_id`, работает как `modify_caption_time`.
    #[allow(clippy::too_many_arguments)]
    pub fn change_caption_track_id(
        &self,
        document: &CaptionDocument,
        track_id: usize,
        caption_id: usize,
        start_ms: i64,
        end_ms: i64,
        final_track_id: usize,
        checks: ValidityChecks,
    ) -> Result<CaptionDocument> {
        if final_track_id == track_id {
            return self.modify_caption_time(document, track_id, caption_id, start_ms, end_ms, checks);
        }

        let result = resolve_caption(document, track_id, caption_id)
            .and_then(|_| resolve_track(document, final_track_id))
            .and_then(|_| check_time_range(start_ms, end_ms))
            .and_then(|_| {
                let mut updated = document.clone();
                let mut cue = Arc::make_mut(&mut updated.tracks[track_id]).cues.remove(caption_id);
                cue.start = start_ms;
                cue.end = end_ms;
                let destination = Arc::make_mut(&mut updated.tracks[final_track_id]);
                place_cue(destination, final_track_id, cue, checks)?;
                Ok(updated)
            });
        result.or_else(|err| log_error(err, "change_caption_track_id"))
    }

    /// Удаляет субтитр
    pub fn delete_caption(&self, document: &CaptionDocument, track_id: usize, caption_id: usize) -> Result<CaptionDocument> {
        let result = resolve_caption(document, track_id, caption_id).and_then(|_| {
            self.with_track(document, track_id, |track| {
                track.cues.remove(caption_id);
                Ok(())
            })
        });
        result
            .map(|(updated, _)| updated)
            .or_else(|err| log_error(err, "delete_caption"))
    }

    /// Сливает частичные настройки расположения с настройками дорожки
    pub fn modify_caption_track_settings(
        &self,
        document: &CaptionDocument,
        track_id: usize,
        settings: &LayoutSettings,
    ) -> Result<CaptionDocument> {
        let result = self.with_track(document, track_id, |track| {
            track.settings = Some(track.settings.unwrap_or_default().merged_with(settings));
            Ok(())
        });
        result
            .map(|(updated, _)| updated)
            .or_else(|err| log_error(err, "modify_caption_track_settings"))
    }

    /// Сливает частичные настройки расположения с глобальными настройками документа
    pub fn modify_caption_global_settings(&self, document: &CaptionDocument, settings: &LayoutSettings) -> CaptionDocument {
        let mut updated = document.clone();
        updated.global_settings = Some(document.global_settings.unwrap_or_default().merged_with(settings));
        updated
    }

    /// Устраняет пересечения на всех дорожках
    ///
    /// Конец субтитра обрезается по началу следующего, начало никогда не
    /// сдвигается. Если после обрезки длительность становится нулевой,
    /// конец ставится на 1 мс после начала; субтитры не удаляются.
    /// Повторное применение не меняет результат.
    pub fn fix_overlaps(&self, document: &CaptionDocument) -> CaptionDocument {
        let mut updated = document.clone();
        let mut fixed_count = 0;

        for track in updated.tracks.iter_mut() {
            let mut fixed = (**track).clone();
            sort_track(&mut fixed);
            for i in 0..fixed.cues.len().saturating_sub(1) {
                let next_start = fixed.cues[i + 1].start;
                let cue = &mut fixed.cues[i];
                if cue.end > next_start {
                    cue.end = next_start;
                    if cue.end <= cue.start {
                        cue.end = cue.start.saturating_add(1);
                    }
                    fixed_count += 1;
                }
            }
            if fixed != **track {
                *track = Arc::new(fixed);
            }
        }

        log_info(&format!("fix_overlaps: обработано пересечений: {}", fixed_count));
        updated
    }

    /// Сдвигает все субтитры, начало которых попадает в `[range_start_ms, range_end_ms]`
    ///
    /// Начало ограничивается снизу нулем, конец сдвигается на ту же величину,
    /// но остается хотя бы на 1 мс позже начала. Новые пересечения не
    /// проверяются: их исправляет последующий `fix_overlaps`.
    pub fn shift_timings(
        &self,
        document: &CaptionDocument,
        duration_ms: i64,
        range_start_ms: i64,
        range_end_ms: i64,
    ) -> Result<CaptionDocument> {
        if range_start_ms > range_end_ms {
            return log_error(
                Error::InvalidTimeRange {
                    start: range_start_ms,
                    end: range_end_ms,
                },
                "shift_timings",
            );
        }

        let in_range = |cue: &Cue| cue.start >= range_start_ms && cue.start <= range_end_ms;
        let mut updated = document.clone();
        let mut shifted_count = 0;

        for track in updated.tracks.iter_mut() {
            if !track.iter().any(in_range) {
                continue;
            }
            let track = Arc::make_mut(track);
            for cue in track.cues.iter_mut().filter(|cue| in_range(cue)) {
                // начало оставляет место хотя бы для 1 мс длительности
                let start = cue.start.saturating_add(duration_ms).clamp(0, i64::MAX - 1);
                let end = cue.end.saturating_add(duration_ms).max(start + 1);
                cue.start = start;
                cue.end = end;
                shifted_count += 1;
            }
            sort_track(track);
        }

        log_debug(&format!(
            "shift_timings: сдвинуто {} субтитров на {} мс",
            shifted_count, duration_ms
        ));
        Ok(updated)
    }

    /// Вставляет субтитр в дорожку без проверок и возвращает новый документ и индекс
    ///
    /// Используется массовыми путями импорта, где пересечения допустимы до `fix_overlaps`.
    pub fn insert_caption_unchecked(
        &self,
        document: &CaptionDocument,
        track_id: usize,
        cue: Cue,
    ) -> Result<(CaptionDocument, usize)> {
        let result = check_time_range(cue.start, cue.end)
            .and_then(|_| self.with_track(document, track_id, |track| Ok(insert_sorted(track, cue))));
        result.or_else(|err| log_error(err, "insert_caption_unchecked"))
    }
}

impl Default for CaptionEditor {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cue_document() -> CaptionDocument {
        CaptionDocument::single_track(vec![Cue::new(0, 1000, "a"), Cue::new(5000, 6000, "b")])
    }

    #[test]
    fn test_untouched_tracks_are_shared() {
        let editor = CaptionEditor::default();
        let document = editor.add_track(&two_cue_document()).unwrap();
        let edited = editor.modify_caption_text(&document, 0, 0, "changed").unwrap();

        assert!(Arc::ptr_eq(&document.tracks[1], &edited.tracks[1]));
        assert!(!Arc::ptr_eq(&document.tracks[0], &edited.tracks[0]));
        assert_eq!(document.track(0).unwrap()[0].text, "a");
    }

    #[test]
    fn test_add_caption_clamps_end_to_next_caption() {
        let editor = CaptionEditor::default();
        let document = editor
            .add_caption_to_track_time(&two_cue_document(), 0, 4000, None, ValidityChecks::Enforce)
            .unwrap();
        let track = document.track(0).unwrap();

        assert_eq!(track.len(), 3);
        assert_eq!(track[1], Cue::new(4000, 5000, ""));
    }

    #[test]
    fn test_add_caption_respects_video_duration() {
        let editor = CaptionEditor::new(EditorOptions::default().with_video_duration_ms(7000));
        let document = editor
            .add_caption_to_track_time(&two_cue_document(), 0, 6500, None, ValidityChecks::Enforce)
            .unwrap();
        assert_eq!(document.track(0).unwrap()[2], Cue::new(6500, 7000, ""));

        let result = editor.add_caption_to_track_time(&two_cue_document(), 0, 7000, None, ValidityChecks::Enforce);
        assert!(matches!(result, Err(Error::InvalidTimeRange { .. })));
    }

    #[test]
    fn test_shift_timings_saturates_at_extremes() {
        let editor = CaptionEditor::default();
        let document = CaptionDocument::single_track(vec![Cue::new(1000, 3000, "x")]);

        let shifted = editor.shift_timings(&document, i64::MAX, 0, 10_000).unwrap();
        assert_eq!(shifted.track(0).unwrap()[0], Cue::new(i64::MAX - 1, i64::MAX, "x"));

        let shifted = editor.shift_timings(&document, i64::MIN, 0, 10_000).unwrap();
        assert_eq!(shifted.track(0).unwrap()[0], Cue::new(0, 1, "x"));
    }

    #[test]
    fn test_fix_overlaps_at_max_time() {
        let editor = CaptionEditor::default();
        let document = CaptionDocument::single_track(vec![
            Cue::new(i64::MAX - 1, i64::MAX, "a"),
            Cue::new(i64::MAX - 1, i64::MAX, "b"),
        ]);

        let fixed = editor.fix_overlaps(&document);
        assert_eq!(fixed.track(0).unwrap()[0], Cue::new(i64::MAX - 1, i64::MAX, "a"));
    }

    #[test]
    fn test_insert_caption_unchecked_returns_index() {
        let editor = CaptionEditor::default();
        let (document, index) = editor
            .insert_caption_unchecked(&two_cue_document(), 0, Cue::new(500, 5500, "wide"))
            .unwrap();
        assert_eq!(index, 1);
        assert_eq!(document.track(0).unwrap().flagged_caption_indices(), vec![0, 1]);
    }
}
