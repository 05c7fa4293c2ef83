use crate::error::{Error, Result};
use env_logger::Builder;
use log::{debug, info, trace, warn, LevelFilter, Log};
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Логгер для тестов: пишет в stdout, чтобы вывод перехватывался `cargo test`
#[derive(Clone)]
pub struct TestLogger {
    level: LevelFilter,
}

impl TestLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }
}

impl Log for TestLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            println!(
                "{} [{}] {} - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

/// Настраивает логирование для библиотеки
///
/// Повторный вызов безопасен: если логгер уже установлен, настройка пропускается.
pub fn setup_logging(level: LevelFilter) {
    let mut builder = Builder::new();

    builder.filter_module("caption_engine", level);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if builder.try_init().is_ok() {
        info!("Логирование caption-engine настроено с уровнем: {}", level);
    }
}

/// Настраивает логирование для тестов
pub fn setup_test_logging(level: LevelFilter) {
    INIT.call_once(|| {
        let logger = TestLogger::new(level);
        if log::set_boxed_logger(Box::new(logger)).is_ok() {
            log::set_max_level(level);
        }
    });
}

/// Логирует отклоненную операцию и возвращает ошибку вызывающему коду
///
/// Ошибки редактирования ожидаемы (UI повторит ввод), поэтому пишутся на уровне debug.
pub fn log_error<T>(err: Error, context: &str) -> Result<T> {
    debug!("{}: {}", context, err);
    Err(err)
}

/// Логирует предупреждение
pub fn log_warning(message: &str) {
    warn!("{}", message);
}

/// Логирует информационное сообщение
pub fn log_info(message: &str) {
    info!("{}", message);
}

/// Логирует отладочное сообщение
pub fn log_debug(message: &str) {
    debug!("{}", message);
}

/// Логирует трассировочное сообщение
pub fn log_trace(message: &str) {
    trace!("{}", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;

    #[test]
    fn test_log_error_passes_error_through() {
        setup_test_logging(LevelFilter::Debug);

        let result: Result<()> = log_error(Error::LastTrackRemoval, "remove_track rejected");
        match result {
            Err(err) => assert_eq!(err.error_type(), ErrorType::LastTrackRemoval),
            Ok(_) => panic!("Expected LastTrackRemoval error"),
        }
    }
}
