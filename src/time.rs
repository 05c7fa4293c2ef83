//! Утилиты для работы со временем субтитров
//!
//! Все времена внутри библиотеки хранятся как целые миллисекунды (`i64`).
//! Здесь собраны преобразования в строковые представления форматов и обратно,
//! а также мягкий разбор времени, введенного пользователем в редакторе.

use once_cell::sync::Lazy;
use regex::Regex;

const MS_PER_SECOND: i64 = 1000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Строгий формат таймкода: `[H:]MM:SS(.|,)fff`, дробная часть из 1-3 цифр
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d+):)?(\d{1,2}):(\d{1,2})[.,](\d{1,3})$").expect("valid timestamp regex")
});

/// Разбивает миллисекунды на (часы, минуты, секунды, миллисекунды)
fn split_ms(ms: i64) -> (i64, i64, i64, i64) {
    let ms = ms.max(0);
    (
        ms / MS_PER_HOUR,
        (ms % MS_PER_HOUR) / MS_PER_MINUTE,
        (ms % MS_PER_MINUTE) / MS_PER_SECOND,
        ms % MS_PER_SECOND,
    )
}

/// Форматирует миллисекунды как `HH:mm:ss.mmm` (формат полей ввода редактора)
pub fn format_time_ms(ms: i64) -> String {
    format_with_separator(ms, '.')
}

/// Форматирует миллисекунды как `HH:MM:SS<sep>mmm`
///
/// SRT использует `,`, WebVTT использует `.`. Отрицательные значения
/// выводятся как ноль.
pub fn format_with_separator(ms: i64, separator: char) -> String {
    let (h, m, s, f) = split_ms(ms);
    format!("{:02}:{:02}:{:02}{}{:03}", h, m, s, separator, f)
}

/// Форматирует миллисекунды как `H:MM:SS.mmm` (SBV)
pub fn format_sbv_time(ms: i64) -> String {
    let (h, m, s, f) = split_ms(ms);
    format!("{}:{:02}:{:02}.{:03}", h, m, s, f)
}

/// Форматирует миллисекунды как `H:MM:SS.cc` (SSA/ASS)
///
/// Точность формата - сотые доли секунды, значение округляется
/// до ближайшей сотой, а не отбрасывается.
pub fn format_centiseconds(ms: i64) -> String {
    let total_cs = ms.max(0).saturating_add(5) / 10;
    let h = total_cs / 360_000;
    let m = (total_cs % 360_000) / 6000;
    let s = (total_cs % 6000) / 100;
    let cs = total_cs % 100;
    format!("{}:{:02}:{:02}.{:02}", h, m, s, cs)
}

/// Переводит дробную часть секунды (строку цифр) в миллисекунды
///
/// "5" -> 500, "05" -> 50, "1234" -> 123 (округление по четвертой цифре).
fn fraction_to_ms(digits: &str) -> Option<i64> {
    if digits.is_empty() {
        return Some(0);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut padded: String = digits.chars().take(4).collect();
    while padded.len() < 4 {
        padded.push('0');
    }
    let tenths_of_ms: i64 = padded.parse().ok()?;
    Some((tenths_of_ms + 5) / 10)
}

/// Разбирает строгий таймкод `[H:]MM:SS.fff` или `[H:]MM:SS,fff`
///
/// Используется кодеками. Возвращает `None` для любых отклонений от формата.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    let caps = TIMESTAMP_REGEX.captures(text.trim())?;
    let hours: i64 = match caps.get(1) {
        Some(h) => h.as_str().parse().ok()?,
        None => 0,
    };
    let minutes: i64 = caps[2].parse().ok()?;
    let seconds: i64 = caps[3].parse().ok()?;
    if minutes > 59 || seconds > 59 {
        return None;
    }
    let fraction = fraction_to_ms(&caps[4])?;
    hours
        .checked_mul(MS_PER_HOUR)?
        .checked_add(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + fraction)
}

/// Мягко разбирает время, введенное пользователем
///
/// Принимает частичный ввод: `"5"`, `"5.5"`, `"1:05"`, `"1:2:3,4"`, `"00:01:02.500"`.
/// Пробелы игнорируются, разделителем дробной части может быть `.` или `,`.
/// Минуты и секунды больше 59 допускаются и переносятся в старшие разряды.
/// Возвращает `None`, если в строке есть посторонние символы или она пуста.
pub fn parse_time_lenient(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    let cleaned = cleaned.replace(',', ".");

    let (whole, fraction) = match cleaned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (cleaned.as_str(), ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    let parts: Vec<&str> = if whole.is_empty() { vec!["0"] } else { whole.split(':').collect() };
    if parts.len() > 3 {
        return None;
    }

    let mut total: i64 = 0;
    for part in &parts {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: i64 = part.parse().ok()?;
        total = total.checked_mul(60)?.checked_add(value)?;
    }

    let fraction_ms = fraction_to_ms(fraction)?;
    total.checked_mul(MS_PER_SECOND)?.checked_add(fraction_ms)
}
