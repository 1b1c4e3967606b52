use thiserror::Error;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Failure to read a `ps` elapsed-time column
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("empty elapsed time")]
    Empty,
    #[error("invalid elapsed time component {0:?}")]
    Component(String),
    #[error("too many elapsed time components in {0:?}")]
    TooManyComponents(String),
    #[error("elapsed time {0:?} out of range")]
    Overflow(String),
}

/// Parse an elapsed-time string (`D-HH:MM:SS`, `HH:MM:SS`, `MM:SS` or `SS`) into seconds.
pub fn parse_elapsed(raw: &str) -> Result<u64, DurationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DurationError::Empty);
    }

    let (days, clock) = match raw.split_once('-') {
        Some((days, clock)) => (parse_component(days)?, clock),
        None => (0, raw),
    };

    let parts = clock
        .split(':')
        .map(parse_component)
        .collect::<Result<Vec<_>, _>>()?;

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        [s] => (0, 0, *s),
        _ => return Err(DurationError::TooManyComponents(raw.to_string())),
    };

    [(days, DAY), (hours, HOUR), (minutes, MINUTE), (seconds, 1)]
        .into_iter()
        .try_fold(0u64, |total, (value, unit)| {
            value.checked_mul(unit)?.checked_add(total)
        })
        .ok_or_else(|| DurationError::Overflow(raw.to_string()))
}

fn parse_component(part: &str) -> Result<u64, DurationError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DurationError::Component(part.to_string()));
    }
    part.parse()
        .map_err(|_| DurationError::Component(part.to_string()))
}

/// Format seconds as a compact two-unit string: `45s`, `12m`, `3h 5m`, `1d 2h`.
pub fn format_duration(secs: u64) -> String {
    if secs < MINUTE {
        format!("{}s", secs)
    } else if secs < HOUR {
        format!("{}m", secs / MINUTE)
    } else if secs < DAY {
        let h = secs / HOUR;
        let m = (secs % HOUR) / MINUTE;
        if m > 0 {
            format!("{}h {}m", h, m)
        } else {
            format!("{}h", h)
        }
    } else {
        let d = secs / DAY;
        let h = (secs % DAY) / HOUR;
        if h > 0 {
            format!("{}d {}h", d, h)
        } else {
            format!("{}d", d)
        }
    }
}
