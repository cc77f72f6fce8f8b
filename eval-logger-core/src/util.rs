//! Utilities.
use chrono::{DateTime, Local};

/// Makes an identifier of a run from its start time.
///
/// The identifier looks like `20240105_134501`. With `random_str`, six random
/// digits are appended (`20240105_134501_rnd042913`) so that runs started
/// within the same second do not collide.
pub fn make_unique_identifier(time: &DateTime<Local>, random_str: bool) -> String {
    let mut id = time.format("%Y%m%d_%H%M%S").to_string();
    if random_str {
        id.push_str(&format!("_rnd{:06}", fastrand::u32(0..1_000_000)));
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unique_identifier() {
        let time = Local.with_ymd_and_hms(2024, 1, 5, 13, 45, 1).unwrap();
        assert_eq!(make_unique_identifier(&time, false), "20240105_134501");

        let id = make_unique_identifier(&time, true);
        assert!(id.starts_with("20240105_134501_rnd"));
        assert_eq!(id.len(), "20240105_134501_rnd".len() + 6);
    }
}
