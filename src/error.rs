use thiserror::Error;

/// Типы ошибок, которые могут возникнуть при работе с субтитрами
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Ошибка ввода/вывода
    Io,
    /// Ошибка сериализации JSON
    JsonSerialization,
    /// Неверный интервал времени (start >= end или отрицательное время)
    InvalidTimeRange,
    /// Пересечение с соседним субтитром
    OverlapConflict,
    /// Неверный индекс дорожки или субтитра
    IndexOutOfRange,
    /// Достигнуто максимальное количество дорожек
    TrackLimitReached,
    /// Попытка удалить последнюю дорожку
    LastTrackRemoval,
    /// Не удалось разобрать время, введенное пользователем
    UnparsableFormattedTime,
    /// Структурно поврежденный исходный документ
    MalformedSourceDocument,
    /// Неподдерживаемый формат субтитров
    UnsupportedFormat,
}

/// Ошибки, которые могут возникнуть при работе с субтитрами
#[derive(Debug, Error)]
pub enum Error {
    #[error("Ошибка ввода/вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка сериализации JSON: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Неверный интервал времени: {start}..{end} мс")]
    InvalidTimeRange { start: i64, end: i64 },

    #[error("Пересечение субтитров: {0}")]
    OverlapConflict(String),

    #[error("Индекс вне диапазона: {0}")]
    IndexOutOfRange(String),

    #[error("Достигнуто максимальное количество дорожек: {0}")]
    TrackLimitReached(usize),

    #[error("Нельзя удалить последнюю дорожку")]
    LastTrackRemoval,

    #[error("Не удалось разобрать время: {0}")]
    UnparsableFormattedTime(String),

    #[error("Поврежденный документ субтитров: {0}")]
    MalformedSourceDocument(String),

    #[error("Неподдерживаемый формат субтитров: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// Создает новую ошибку указанного типа с сообщением
    ///
    /// Варианты без текстового поля (`InvalidTimeRange`, `TrackLimitReached`,
    /// `LastTrackRemoval`) создаются с нулевыми значениями.
    pub fn new(error_type: ErrorType, message: &str) -> Self {
        match error_type {
            ErrorType::Io => Self::Io(std::io::Error::new(std::io::ErrorKind::Other, message)),
            ErrorType::JsonSerialization => {
                Self::JsonSerialization(<serde_json::Error as serde::de::Error>::custom(message))
            }
            ErrorType::InvalidTimeRange => Self::InvalidTimeRange { start: 0, end: 0 },
            ErrorType::OverlapConflict => Self::OverlapConflict(message.to_string()),
            ErrorType::IndexOutOfRange => Self::IndexOutOfRange(message.to_string()),
            ErrorType::TrackLimitReached => Self::TrackLimitReached(0),
            ErrorType::LastTrackRemoval => Self::LastTrackRemoval,
            ErrorType::UnparsableFormattedTime => Self::UnparsableFormattedTime(message.to_string()),
            ErrorType::MalformedSourceDocument => Self::MalformedSourceDocument(message.to_string()),
            ErrorType::UnsupportedFormat => Self::UnsupportedFormat(message.to_string()),
        }
    }

    /// Возвращает тип ошибки (тег для UI)
    pub fn error_type(&self) -> ErrorType {
        match self {
            Self::Io(_) => ErrorType::Io,
            Self::JsonSerialization(_) => ErrorType::JsonSerialization,
            Self::InvalidTimeRange { .. } => ErrorType::InvalidTimeRange,
            Self::OverlapConflict(_) => ErrorType::OverlapConflict,
            Self::IndexOutOfRange(_) => ErrorType::IndexOutOfRange,
            Self::TrackLimitReached(_) => ErrorType::TrackLimitReached,
            Self::LastTrackRemoval => ErrorType::LastTrackRemoval,
            Self::UnparsableFormattedTime(_) => ErrorType::UnparsableFormattedTime,
            Self::MalformedSourceDocument(_) => ErrorType::MalformedSourceDocument,
            Self::UnsupportedFormat(_) => ErrorType::UnsupportedFormat,
        }
    }
}

/// Результат с обработкой ошибок
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_matches_variant() {
        let err = Error::new(ErrorType::OverlapConflict, "cue 1 overlaps cue 2");
        assert_eq!(err.error_type(), ErrorType::OverlapConflict);
        assert!(err.to_string().contains("cue 1 overlaps cue 2"));

        let err = Error::InvalidTimeRange { start: 3000, end: 1000 };
        assert_eq!(err.error_type(), ErrorType::InvalidTimeRange);
        assert!(err.to_string().contains("3000..1000"));

        assert_eq!(Error::LastTrackRemoval.error_type(), ErrorType::LastTrackRemoval);
    }
}
