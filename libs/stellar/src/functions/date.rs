//! Date functions. All conversions are in UTC and timestamps are epoch
//! milliseconds. Formats use `strftime` syntax.

use super::helpers::{check_arity, opt_int, opt_str};
use super::Builtin;
use crate::error::Result;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub(super) const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "TO_EPOCH_TIMESTAMP",
        description: "Returns the epoch timestamp of the date using the format provided",
        params: &[
            "dateTime - DateTime in string format",
            "format - DateTime format as a strftime string",
        ],
        returns: "Epoch timestamp in milliseconds",
        func: to_epoch_timestamp,
    },
    Builtin {
        name: "DATE_FORMAT",
        description: "Takes an epoch timestamp and converts it to a date format",
        params: &[
            "format - DateTime format as a strftime string",
            "timestampField - Epoch timestamp in milliseconds",
        ],
        returns: "Formatted date",
        func: date_format,
    },
];

fn to_epoch_timestamp(args: &[Value]) -> Result<Value> {
    check_arity("TO_EPOCH_TIMESTAMP", args, 2, Some(2))?;
    let (Some(text), Some(format)) = (
        opt_str("TO_EPOCH_TIMESTAMP", args, 0)?,
        opt_str("TO_EPOCH_TIMESTAMP", args, 1)?,
    ) else {
        return Ok(Value::Null);
    };

    let parsed = NaiveDateTime::parse_from_str(text, format).ok().or_else(|| {
        NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    });
    Ok(parsed
        .map(|dt| Value::Int(Utc.from_utc_datetime(&dt).timestamp_millis()))
        .unwrap_or(Value::Null))
}

fn date_format(args: &[Value]) -> Result<Value> {
    check_arity("DATE_FORMAT", args, 2, Some(2))?;
    let (Some(format), Some(millis)) = (
        opt_str("DATE_FORMAT", args, 0)?,
        opt_int("DATE_FORMAT", args, 1)?,
    ) else {
        return Ok(Value::Null);
    };

    let Some(instant) = DateTime::<Utc>::from_timestamp_millis(millis) else {
        return Ok(Value::Null);
    };
    // strftime items are validated up front; `format!` on a bad item panics.
    let items: Vec<_> = chrono::format::StrftimeItems::new(format).collect();
    if items
        .iter()
        .any(|item| matches!(item, chrono::format::Item::Error))
    {
        return Ok(Value::Null);
    }
    Ok(Value::String(
        instant.format_with_items(items.into_iter()).to_string(),
    ))
}
