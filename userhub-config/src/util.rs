use std::{str::FromStr, time::Duration};

use crate::ConfigLoadError;

/// Treat unset and blank values the same.
pub fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_number<T>(
    key: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigLoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|err| ConfigLoadError::InvalidValue {
            key,
            reason: err.to_string(),
            value: raw,
        })
}

/// Parse a humantime duration (`30s`, `1m 30s`).
///
/// `0` disables the feature and yields `Some(None)`; an unset variable
/// yields `None` so the caller can apply its default.
pub fn parse_optional_duration(
    key: &'static str,
    raw: Option<String>,
) -> Result<Option<Option<Duration>>, ConfigLoadError> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };
    if raw == "0" {
        return Ok(Some(None));
    }
    match humantime::parse_duration(&raw) {
        Ok(duration) if duration.is_zero() => Ok(Some(None)),
        Ok(duration) => Ok(Some(Some(duration))),
        Err(err) => Err(ConfigLoadError::InvalidValue {
            key,
            reason: err.to_string(),
            value: raw,
        }),
    }
}
