//! Пакетное применение правок
//!
//! Каждая операция движка описана вариантом `EditAction`, который можно
//! сериализовать в JSON и применить позже (например, для повтора правок
//! или отправки их с клиента).

use crate::captions::{CaptionDocument, Cue, LayoutSettings};
use crate::editing::editor::CaptionEditor;
use crate::editing::validation::ValidityChecks;
use crate::error::Result;
use crate::logging::{log_debug, log_error};
use serde::{Deserialize, Serialize};

/// Одна правка документа субтитров
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditAction {
    AddTrack,
    RemoveTrack {
        track_id: usize,
    },
    AddCaptionToTrackTime {
        track_id: usize,
        time_ms: i64,
        #[serde(default)]
        cue: Option<Cue>,
        #[serde(default)]
        checks: ValidityChecks,
    },
    AddCaptionToTrackRelative {
        track_id: usize,
        caption_id: usize,
    },
    ModifyCaption {
        track_id: usize,
        caption_id: usize,
        cue: Cue,
        #[serde(default)]
        checks: ValidityChecks,
    },
    ModifyCaptionText {
        track_id: usize,
        caption_id: usize,
        text: String,
    },
    ModifyCaptionStartTime {
        track_id: usize,
        caption_id: usize,
        start_ms: i64,
        #[serde(default)]
        checks: ValidityChecks,
    },
    ModifyCaptionEndTime {
        track_id: usize,
        caption_id: usize,
        end_ms: i64,
        #[serde(default)]
        checks: ValidityChecks,
    },
    ModifyCaptionTime {
        track_id: usize,
        caption_id: usize,
        start_ms: i64,
        end_ms: i64,
        #[serde(default)]
        checks: ValidityChecks,
    },
    ChangeCaptionTrackId {
        track_id: usize,
        caption_id: usize,
        start_ms: i64,
        end_ms: i64,
        final_track_id: usize,
        #[serde(default)]
        checks: ValidityChecks,
    },
    DeleteCaption {
        track_id: usize,
        caption_id: usize,
    },
    ModifyCaptionTrackSettings {
        track_id: usize,
        settings: LayoutSettings,
    },
    ModifyCaptionGlobalSettings {
        settings: LayoutSettings,
    },
    FixOverlaps,
    ShiftTimings {
        duration_ms: i64,
        range_start_ms: i64,
        range_end_ms: i64,
    },
}

impl EditAction {
    /// Имя операции для логов
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddTrack => "addTrack",
            Self::RemoveTrack { .. } => "removeTrack",
            Self::AddCaptionToTrackTime { .. } => "addCaptionToTrackTime",
            Self::AddCaptionToTrackRelative { .. } => "addCaptionToTrackRelative",
            Self::ModifyCaption { .. } => "modifyCaption",
            Self::ModifyCaptionText { .. } => "modifyCaptionText",
            Self::ModifyCaptionStartTime { .. } => "modifyCaptionStartTime",
            Self::ModifyCaptionEndTime { .. } => "modifyCaptionEndTime",
            Self::ModifyCaptionTime { .. } => "modifyCaptionTime",
            Self::ChangeCaptionTrackId { .. } => "changeCaptionTrackId",
            Self::DeleteCaption { .. } => "deleteCaption",
            Self::ModifyCaptionTrackSettings { .. } => "modifyCaptionTrackSettings",
            Self::ModifyCaptionGlobalSettings { .. } => "modifyCaptionGlobalSettings",
            Self::FixOverlaps => "fixOverlaps",
            Self::ShiftTimings { .. } => "shiftTimings",
        }
    }
}

impl CaptionEditor {
    /// Применяет одну правку
    pub fn apply(&self, document: &CaptionDocument, action: &EditAction) -> Result<CaptionDocument> {
        match action {
            EditAction::AddTrack => self.add_track(document),
            EditAction::RemoveTrack { track_id } => self.remove_track(document, *track_id),
            EditAction::AddCaptionToTrackTime {
                track_id,
                time_ms,
                cue,
                checks,
            } => self.add_caption_to_track_time(document, *track_id, *time_ms, cue.clone(), *checks),
            EditAction::AddCaptionToTrackRelative { track_id, caption_id } => {
                self.add_caption_to_track_relative(document, *track_id, *caption_id)
            }
            EditAction::ModifyCaption {
                track_id,
                caption_id,
                cue,
                checks,
            } => self.modify_caption(document, *track_id, *caption_id, cue.clone(), *checks),
            EditAction::ModifyCaptionText {
                track_id,
                caption_id,
                text,
            } => self.modify_caption_text(document, *track_id, *caption_id, text),
            EditAction::ModifyCaptionStartTime {
                track_id,
                caption_id,
                start_ms,
                checks,
            } => self.modify_caption_start_time_ms(document, *track_id, *caption_id, *start_ms, *checks),
            EditAction::ModifyCaptionEndTime {
                track_id,
                caption_id,
                end_ms,
                checks,
            } => self.modify_caption_end_time_ms(document, *track_id, *caption_id, *end_ms, *checks),
            EditAction::ModifyCaptionTime {
                track_id,
                caption_id,
                start_ms,
                end_ms,
                checks,
            } => self.modify_caption_time(document, *track_id, *caption_id, *start_ms, *end_ms, *checks),
            EditAction::ChangeCaptionTrackId {
                track_id,
                caption_id,
                start_ms,
                end_ms,
                final_track_id,
                checks,
            } => self.change_caption_track_id(
                document,
                *track_id,
                *caption_id,
                *start_ms,
                *end_ms,
                *final_track_id,
                *checks,
            ),
            EditAction::DeleteCaption { track_id, caption_id } => {
                self.delete_caption(document, *track_id, *caption_id)
            }
            EditAction::ModifyCaptionTrackSettings { track_id, settings } => {
                self.modify_caption_track_settings(document, *track_id, settings)
            }
            EditAction::ModifyCaptionGlobalSettings { settings } => {
                Ok(self.modify_caption_global_settings(document, settings))
            }
            EditAction::FixOverlaps => Ok(self.fix_overlaps(document)),
            EditAction::ShiftTimings {
                duration_ms,
                range_start_ms,
                range_end_ms,
            } => self.shift_timings(document, *duration_ms, *range_start_ms, *range_end_ms),
        }
    }

    /// Применяет правки по порядку
    ///
    /// Остановка на первой ошибке: промежуточные результаты отбрасываются,
    /// исходный документ не меняется.
    pub fn apply_actions(&self, document: &CaptionDocument, actions: &[EditAction]) -> Result<CaptionDocument> {
        let mut current = document.clone();
        for (index, action) in actions.iter().enumerate() {
            current = match self.apply(&current, action) {
                Ok(updated) => updated,
                Err(err) => return log_error(err, &format!("apply_actions[{}] {}", index, action.name())),
            };
        }
        log_debug(&format!("apply_actions: применено правок: {}", actions.len()));
        Ok(current)
    }
}
