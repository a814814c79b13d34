use anyhow::{Context, anyhow};
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};

/// The editable representation shown in drafts and accepted on the CLI,
/// interpreted in the local timezone.
pub const LOCAL_EDIT_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub fn parse_local(input: &str) -> anyhow::Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), LOCAL_EDIT_FORMAT)
        .with_context(|| format!("invalid deadline: {input} (expected YYYY-MM-DDTHH:MM)"))?;

    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("deadline does not exist in the local timezone: {input}"))?;

    Ok(local.with_timezone(&Utc))
}

pub fn format_local(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format(LOCAL_EDIT_FORMAT)
        .to_string()
}

/// Default deadline for a fresh draft: one day out.
pub fn default_deadline(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(24)
}
