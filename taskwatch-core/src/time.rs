//! 本地時間：解析使用者輸入、過去/未來判斷、最早可選時間。
//!
//! 輸入一律視為牆上時間（本地時區），不是 UTC。

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike};
use std::{fmt::Display, sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle, time::Instant};
use tokio_stream::{wrappers::IntervalStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TimeParseError;

/// `<input type="datetime-local">` 的格式
pub const LOCAL_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// 最早可選時間多久重算一次
pub const MIN_SELECTABLE_REFRESH: Duration = Duration::from_millis(60_000);

const NEXT_RUN_FORMAT: &str = "%A, %B %-d at %I:%M %p";

pub fn parse_local_naive(input: &str) -> Result<NaiveDateTime, TimeParseError> {
    let s = input.trim();
    NaiveDateTime::parse_from_str(s, LOCAL_INPUT_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| TimeParseError::Malformed(input.to_string()))
}

/// 以 `tz` 的牆上時間解析；DST 重疊取較早者，DST 缺口回報 Nonexistent
pub fn parse_local_in<Tz: TimeZone>(input: &str, tz: &Tz) -> Result<DateTime<Tz>, TimeParseError> {
    let naive = parse_local_naive(input)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| TimeParseError::Nonexistent(input.trim().to_string()))
}

pub fn parse_local(input: &str) -> Result<DateTime<Local>, TimeParseError> {
    parse_local_in(input, &Local)
}

/// 嚴格早於 now 才算過去
pub fn is_past<Tz: TimeZone, Tz2: TimeZone>(instant: &DateTime<Tz>, now: &DateTime<Tz2>) -> bool {
    instant < now
}

pub fn min_selectable_naive<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDateTime {
    let local = now.naive_local();
    local
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(local)
}

pub fn min_selectable<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    min_selectable_naive(now).format(LOCAL_INPUT_FORMAT).to_string()
}

/// 後端回來的 next_time 可能是 RFC 3339、HTTP-date 或不帶時區的 ISO 字串；
/// 解析不了就原樣顯示
pub fn format_next_run_in<Tz>(raw: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match parse_backend_instant(raw, tz) {
        Some(t) => t.format(NEXT_RUN_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

pub fn format_next_run(raw: &str) -> String {
    format_next_run_in(raw, &Local)
}

fn parse_backend_instant<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let s = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(tz));
    }
    if let Ok(t) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(t.with_timezone(tz));
    }
    if let Ok(t) = DateTime::parse_from_rfc2822(s) {
        return Some(t.with_timezone(tz));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", LOCAL_INPUT_FORMAT]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
}

/// 全域共享的「最早可選時間」；由背景任務定期重算
#[derive(Clone)]
pub struct MinSelectable {
    tx: Arc<watch::Sender<NaiveDateTime>>,
}

impl MinSelectable {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(min_selectable_naive(&Local::now()));
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> NaiveDateTime {
        *self.tx.borrow()
    }

    pub fn current_input(&self) -> String {
        self.current().format(LOCAL_INPUT_FORMAT).to_string()
    }

    pub fn subscribe(&self) -> watch::Receiver<NaiveDateTime> {
        self.tx.subscribe()
    }

    pub fn refresh(&self) {
        self.tx.send_replace(min_selectable_naive(&Local::now()));
    }

    /// 每 `every` 重算一次，直到 cancel
    pub fn spawn_refresher(&self, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticks = IntervalStream::new(tokio::time::interval_at(Instant::now() + every, every));
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    tick = ticks.next() => {
                        if tick.is_none() { break; }
                        this.refresh();
                        debug!(min = %this.current_input(), "min selectable refreshed");
                    }
                }
            }
        })
    }
}

impl Default for MinSelectable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Utc};

    fn plus8() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn parses_as_wall_clock_not_utc() {
        let t = parse_local_in("2030-06-01T09:30", &plus8()).unwrap();
        assert_eq!(t.with_timezone(&Utc).to_rfc3339(), "2030-06-01T01:30:00+00:00");
    }

    #[test]
    fn accepts_seconds_suffix() {
        let t = parse_local_naive("2030-06-01T09:30:15").unwrap();
        assert_eq!(t.second(), 15);
    }

    #[test]
    fn malformed_input_is_an_error_not_a_panic() {
        for bad in ["", "tomorrow", "2030-06-01", "2030-13-01T00:00", "2030-06-01T25:00", "T:"] {
            assert_eq!(
                parse_local_in(bad, &plus8()),
                Err(TimeParseError::Malformed(bad.to_string())),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn past_is_strict() {
        let now = plus8().with_ymd_and_hms(2030, 6, 1, 9, 30, 0).unwrap();
        let same = parse_local_in("2030-06-01T09:30", &plus8()).unwrap();
        let before = parse_local_in("2030-06-01T09:29", &plus8()).unwrap();
        assert!(!is_past(&same, &now));
        assert!(is_past(&before, &now));
    }

    #[test]
    fn min_selectable_truncates_to_minute() {
        let now = plus8().with_ymd_and_hms(2030, 6, 1, 9, 30, 59).unwrap();
        assert_eq!(min_selectable(&now), "2030-06-01T09:30");
    }

    #[test]
    fn next_run_formats() {
        let tz = plus8();
        // Sat 2030-06-01 14:05 +08
        let expect = "Saturday, June 1 at 02:05 PM";
        assert_eq!(format_next_run_in("2030-06-01T06:05:00+00:00", &tz), expect);
        assert_eq!(format_next_run_in("Sat, 01 Jun 2030 06:05:00 GMT", &tz), expect);
        assert_eq!(format_next_run_in("2030-06-01T14:05:00", &tz), expect);
        assert_eq!(format_next_run_in("2030-06-01 14:05:00.250000", &tz), expect);
        assert_eq!(format_next_run_in("whenever", &tz), "whenever");
    }

    #[test]
    fn naive_helper_matches_input_format() {
        let d = NaiveDate::from_ymd_opt(2030, 1, 2).unwrap().and_hms_opt(3, 4, 0).unwrap();
        assert_eq!(parse_local_naive("2030-01-02T03:04").unwrap(), d);
    }

    #[tokio::test(start_paused = true)]
    async fn refresher_ticks_and_stops_on_cancel() {
        let min = MinSelectable::new();
        let mut rx = min.subscribe();
        let cancel = CancellationToken::new();
        let handle = min.spawn_refresher(MIN_SELECTABLE_REFRESH, cancel.clone());

        tokio::time::advance(MIN_SELECTABLE_REFRESH).await;
        rx.changed().await.unwrap();

        cancel.cancel();
        handle.await.unwrap();
    }
}
