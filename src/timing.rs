//! Race clock parsing and display formats.
//!
//! TFRRS prints finish times on a fixed-width `MM:SS.d` clock. Anything
//! else in the TIME column (DNF leftovers, times past 100 minutes, blank
//! cells) is kept as raw text and excluded from every numeric aggregation.

use regex::Regex;

/// A value from the TIME column of a results page.
///
/// `Parsed` carries canonical seconds; `Unparsed` carries the original
/// text so a caller can report what it refused to aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum RaceTime {
    Parsed(f64),
    Unparsed(String),
}

impl RaceTime {
    /// Parse a clock string against the fixed-width `MM:SS.d` pattern.
    ///
    /// `"05:23.4"` becomes `Parsed(323.4)`. Strings of any other shape,
    /// including `H:MM:SS.d` times past 100 minutes, come back `Unparsed`.
    pub fn parse(raw: &str) -> RaceTime {
        let clock_re = Regex::new(r"^(\d{2}):(\d{2}\.\d)$").unwrap();
        if let Some(caps) = clock_re.captures(raw) {
            if let (Ok(minutes), Ok(seconds)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) {
                return RaceTime::Parsed(minutes * 60.0 + seconds);
            }
        }
        RaceTime::Unparsed(raw.to_string())
    }

    /// Canonical seconds, if the clock string parsed.
    pub fn seconds(&self) -> Option<f64> {
        match self {
            RaceTime::Parsed(secs) => Some(*secs),
            RaceTime::Unparsed(_) => None,
        }
    }
}

/// Format seconds as `M:SS` with whole seconds, the prediction format.
pub fn format_race_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as i64;
    let secs = (seconds % 60.0).floor() as i64;
    format!("{}:{:02}", minutes, secs)
}

/// Format seconds as `M:S.d` with one truncated decimal, the virtual-race
/// format. Seconds are not zero-padded.
pub fn format_virtual_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as i64;
    let secs = ((seconds % 60.0) * 10.0).floor() / 10.0;
    format!("{}:{:.1}", minutes, secs)
}
