//! 시간 관련 유틸리티
//!
//! 와이어 프로토콜의 `time` 필드는 소수점이 있는 Unix 타임스탬프(초)입니다.

use chrono::{DateTime, Local, TimeZone, Utc};

/// 현재 Unix 타임스탬프 (초, 소수점 포함)
pub fn unix_time() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// 프로토콜 타임스탬프를 로컬 시간 문자열로 변환합니다.
///
/// 범위를 벗어난 값은 원래 숫자를 그대로 보여줍니다.
pub fn format_unix_time(timestamp: f64) -> String {
    let secs = timestamp.trunc() as i64;
    let nanos = (timestamp.fract().abs() * 1_000_000_000.0) as u32;
    match Local.timestamp_opt(secs, nanos).single() {
        Some(local) => local.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{timestamp}"),
    }
}

/// 관리 콘솔 출력용 시간 문자열
pub fn format_datetime(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_time_is_current() {
        let now = unix_time();
        let secs = Utc::now().timestamp() as f64;
        assert!((now - secs).abs() < 2.0);
    }

    #[test]
    fn test_format_unix_time_handles_out_of_range() {
        assert!(!format_unix_time(f64::MAX).is_empty());
        assert_eq!(format_unix_time(0.0).len(), "1970-01-01 00:00:00".len());
    }
}
