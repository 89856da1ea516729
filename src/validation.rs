use crate::error::{MatchdayError, Result};

/// Trimmed value, or an error when it is missing or blank.
pub fn non_empty<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    let Some(value) = value else {
        return Err(MatchdayError::validation(field, "is required"));
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MatchdayError::validation(field, "cannot be empty"));
    }
    Ok(trimmed)
}

/// Blank input yields `default`; anything else must parse.
pub fn parse_int(value: Option<&str>, field: &str, default: Option<i64>) -> Result<Option<i64>> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(default);
    };
    raw.parse::<i64>().map(Some).map_err(|err| {
        tracing::warn!(field, value = raw, %err, "integer parse failed");
        MatchdayError::validation(field, "must be a valid integer")
    })
}

pub fn int_in_range(value: i64, min: Option<i64>, max: Option<i64>, field: &str) -> Result<i64> {
    if let Some(min) = min {
        if value < min {
            return Err(MatchdayError::validation(field, format!("must be at least {min}")));
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(MatchdayError::validation(field, format!("must be at most {max}")));
        }
    }
    Ok(value)
}

pub fn required_int(
    value: Option<&str>,
    field: &str,
    min: Option<i64>,
    max: Option<i64>,
) -> Result<i64> {
    let raw = non_empty(value, field)?;
    let parsed = parse_int(Some(raw), field, None)?
        .ok_or_else(|| MatchdayError::validation(field, "is required"))?;
    int_in_range(parsed, min, max, field)
}

pub fn one_of<'a>(value: Option<&'a str>, valid: &[&str], field: &str) -> Result<&'a str> {
    let value = non_empty(value, field)?;
    if !valid.contains(&value) {
        return Err(MatchdayError::validation(
            field,
            format!("must be one of: {}", valid.join(", ")),
        ));
    }
    Ok(value)
}
