use chrono::Local;

// Timestamps are stored and compared as entered, in the admin's local wall
// clock. The format sorts lexicographically, which is what the status
// resolver relies on.
pub const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";
pub const SECOND_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn now_minute() -> String {
    Local::now().format(MINUTE_FORMAT).to_string()
}

pub fn now_seconds() -> String {
    Local::now().format(SECOND_FORMAT).to_string()
}
