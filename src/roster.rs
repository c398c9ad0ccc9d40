use std::collections::HashSet;

use tracing::debug;

use crate::models::ClassConfig;

/// Expands `[starting_roll, ending_roll]` into roll ids, skipping excluded ones.
///
/// Bounds that do not parse, or a start past the end, give an empty roster.
pub fn generate_roster(
    starting_roll: &str,
    ending_roll: &str,
    excluded_rolls: Option<&str>,
) -> Vec<String> {
    let (Some(start), Some(end)) = (parse_roll_bound(starting_roll), parse_roll_bound(ending_roll))
    else {
        debug!(starting_roll, ending_roll, "roll bounds not numeric, roster empty");
        return Vec::new();
    };

    let excluded = excluded_set(excluded_rolls);
    (start..=end)
        .map(|roll| roll.to_string())
        .filter(|roll| !excluded.contains(roll.as_str()))
        .collect()
}

pub fn roster_for(config: &ClassConfig) -> Vec<String> {
    generate_roster(
        &config.starting_roll,
        &config.ending_roll,
        config.excluded_rolls.as_deref(),
    )
}

fn excluded_set(excluded_rolls: Option<&str>) -> HashSet<&str> {
    excluded_rolls
        .map(|raw| raw.split(',').map(str::trim).filter(|t| !t.is_empty()).collect())
        .unwrap_or_default()
}

/// Leading-integer parse: surrounding whitespace and trailing junk are
/// ignored, so `"2107001 "` and `"15a"` both yield numbers.
fn parse_roll_bound(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|n| n * sign)
}
