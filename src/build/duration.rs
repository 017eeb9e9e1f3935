//! 时间跨度格式化，例如 `1 min 5 sec`、`2.3 sec`、`3 days 4 hr`

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;
const MS_PER_MONTH: u64 = 30 * MS_PER_DAY;
const MS_PER_YEAR: u64 = 365 * MS_PER_DAY;

fn days(n: u64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", n)
    }
}

/// 大单位 < 10 时附带小单位
fn span(big: u64, big_text: String, small_text: String) -> String {
    if big < 10 {
        format!("{} {}", big_text, small_text)
    } else {
        big_text
    }
}

/// 将毫秒数格式化为人类可读的时间跨度（负值按 0 处理）
pub fn time_span_string(duration_ms: i64) -> String {
    let ms = duration_ms.max(0) as u64;

    let years = ms / MS_PER_YEAR;
    let months = (ms % MS_PER_YEAR) / MS_PER_MONTH;
    let day_count = (ms % MS_PER_MONTH) / MS_PER_DAY;
    let hours = (ms % MS_PER_DAY) / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = ms % MS_PER_SECOND;

    if years > 0 {
        span(years, format!("{} yr", years), format!("{} mo", months))
    } else if months > 0 {
        span(months, format!("{} mo", months), days(day_count))
    } else if day_count > 0 {
        span(day_count, days(day_count), format!("{} hr", hours))
    } else if hours > 0 {
        span(hours, format!("{} hr", hours), format!("{} min", minutes))
    } else if minutes > 0 {
        span(minutes, format!("{} min", minutes), format!("{} sec", seconds))
    } else if seconds >= 10 {
        format!("{} sec", seconds)
    } else if seconds >= 1 {
        format!("{}.{} sec", seconds, millis / 100)
    } else if millis >= 100 {
        format!("0.{:02} sec", millis / 10)
    } else {
        format!("{} ms", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_second_spans() {
        assert_eq!(time_span_string(0), "0 ms");
        assert_eq!(time_span_string(42), "42 ms");
        assert_eq!(time_span_string(450), "0.45 sec");
    }

    #[test]
    fn test_second_spans() {
        assert_eq!(time_span_string(2_300), "2.3 sec");
        assert_eq!(time_span_string(12_900), "12 sec");
    }

    #[test]
    fn test_compound_spans_drop_small_unit_from_ten() {
        assert_eq!(time_span_string(65_000), "1 min 5 sec");
        assert_eq!(time_span_string(12 * MS_PER_MINUTE as i64 + 5_000), "12 min");
        assert_eq!(time_span_string(2 * MS_PER_HOUR as i64 + 3 * MS_PER_MINUTE as i64), "2 hr 3 min");
        assert_eq!(time_span_string(MS_PER_DAY as i64 + MS_PER_HOUR as i64), "1 day 1 hr");
        assert_eq!(time_span_string(3 * MS_PER_DAY as i64), "3 days 0 hr");
    }

    #[test]
    fn test_negative_span_clamps() {
        assert_eq!(time_span_string(-5_000), "0 ms");
    }
}
