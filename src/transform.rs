//! Clean, filter and cast stages of the job.
//!
//! Every stage takes a [`Dataset`] by reference and returns a new value; the
//! input is never mutated. Column types are inferred once over the whole
//! dataset before any row is dropped, and cast semantics follow that type.

use anyhow::Result;
use tracing::debug;

use crate::config::AGE_THRESHOLD;
use crate::error::EtlError;
use crate::models::{ColumnType, Dataset, Record};

const NUMERIC_ORDER: [ColumnType; 4] = [
    ColumnType::Integer,
    ColumnType::Long,
    ColumnType::Double,
    ColumnType::Boolean,
];

/// Runs clean → filter → project over `ds`.
pub fn transform(ds: &Dataset) -> Result<Vec<Record>> {
    let name = require_column(ds, "name")?;
    let age = require_column(ds, "age")?;
    let city = require_column(ds, "city")?;

    let schema = infer_schema(ds);
    let cleaned = drop_nulls(ds);
    let adults = filter_by_age(&cleaned, age, schema[age], AGE_THRESHOLD);
    let records = project(&adults, [name, age, city], &schema);

    debug!(
        read = ds.len(),
        non_null = cleaned.len(),
        over_threshold = adults.len(),
        projected = records.len(),
        "transform stages"
    );

    Ok(records)
}

fn require_column(ds: &Dataset, name: &str) -> Result<usize> {
    ds.column_index(name)
        .ok_or_else(|| EtlError::MissingColumn(name.to_string()).into())
}

/// One type per column, inferred from every non-null cell.
pub fn infer_schema(ds: &Dataset) -> Vec<ColumnType> {
    (0..ds.columns.len())
        .map(|i| {
            let mut current: Option<ColumnType> = None;
            for value in ds.rows.iter().filter_map(|r| r.get(i).and_then(|c| c.as_deref())) {
                current = Some(widen(current, value));
                if current == Some(ColumnType::Text) {
                    break;
                }
            }
            current.unwrap_or(ColumnType::Text)
        })
        .collect()
}

fn rank(t: ColumnType) -> usize {
    NUMERIC_ORDER.iter().position(|n| *n == t).unwrap_or(NUMERIC_ORDER.len())
}

fn is_numeric(t: ColumnType) -> bool {
    matches!(t, ColumnType::Integer | ColumnType::Long | ColumnType::Double)
}

fn widen(current: Option<ColumnType>, value: &str) -> ColumnType {
    let start = rank(current.unwrap_or(ColumnType::Integer));
    let found = NUMERIC_ORDER
        .iter()
        .skip(start)
        .copied()
        .find(|t| parses_as(*t, value))
        .unwrap_or(ColumnType::Text);

    match current {
        None => found,
        Some(c) if c == found => c,
        Some(c) if is_numeric(c) && is_numeric(found) => {
            if rank(c) > rank(found) { c } else { found }
        }
        Some(_) => ColumnType::Text,
    }
}

fn parses_as(t: ColumnType, value: &str) -> bool {
    match t {
        ColumnType::Integer => value.parse::<i32>().is_ok(),
        ColumnType::Long => value.parse::<i64>().is_ok(),
        ColumnType::Double => parse_double(value).is_some(),
        ColumnType::Boolean => parse_bool(value).is_some(),
        ColumnType::Text => true,
    }
}

fn parse_double(value: &str) -> Option<f64> {
    match value {
        "NaN" => Some(f64::NAN),
        "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ if value
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E')) =>
        {
            value.parse().ok()
        }
        _ => None,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Drops every row holding a null in any column.
pub fn drop_nulls(ds: &Dataset) -> Dataset {
    Dataset {
        columns: ds.columns.clone(),
        rows: ds
            .rows
            .iter()
            .filter(|row| row.iter().all(Option::is_some))
            .cloned()
            .collect(),
    }
}

/// Keeps rows whose `age` casts to an integer strictly above `threshold`.
pub fn filter_by_age(ds: &Dataset, age: usize, age_type: ColumnType, threshold: i32) -> Dataset {
    Dataset {
        columns: ds.columns.clone(),
        rows: ds
            .rows
            .iter()
            .filter(|row| {
                cell(row, age)
                    .and_then(|v| cast_to_int(v, age_type))
                    .is_some_and(|a| a > threshold)
            })
            .cloned()
            .collect(),
    }
}

/// Projects `[name, age, city]`; rows whose age does not cast are skipped.
pub fn project(ds: &Dataset, [name, age, city]: [usize; 3], schema: &[ColumnType]) -> Vec<Record> {
    ds.rows
        .iter()
        .filter_map(|row| {
            Some(Record {
                name: render_text(cell(row, name)?, schema[name]),
                age: cast_to_int(cell(row, age)?, schema[age])?,
                city: render_text(cell(row, city)?, schema[city]),
            })
        })
        .collect()
}

fn cell(row: &[Option<String>], idx: usize) -> Option<&str> {
    row.get(idx).and_then(|c| c.as_deref())
}

/// Integer cast of a cell read as `t`. `None` when the value has no integer form.
pub fn cast_to_int(value: &str, t: ColumnType) -> Option<i32> {
    match t {
        ColumnType::Integer => value.parse().ok(),
        // narrowing wraps, as a 64 → 32 bit cast does
        ColumnType::Long => value.parse::<i64>().ok().map(|v| v as i32),
        ColumnType::Double => parse_double(value).map(|v| v as i32),
        ColumnType::Boolean => parse_bool(value).map(i32::from),
        ColumnType::Text => text_to_int(value),
    }
}

/// Trimmed, optional sign, digits, optional `.digits` which are truncated.
fn text_to_int(value: &str) -> Option<i32> {
    let s = value.trim();
    let (negative, body) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let (whole, fraction) = match body.split_once('.') {
        Some((w, f)) => (w, f),
        None => (body, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut acc: i64 = 0;
    for b in whole.bytes() {
        acc = acc.checked_mul(10)?.checked_add(i64::from(b - b'0'))?;
        if acc > i64::from(i32::MAX) + 1 {
            return None;
        }
    }

    let signed = if negative { -acc } else { acc };
    i32::try_from(signed).ok()
}

fn render_text(value: &str, t: ColumnType) -> String {
    match t {
        ColumnType::Integer | ColumnType::Long => value
            .parse::<i64>()
            .map(|v| v.to_string())
            .unwrap_or_else(|_| value.to_string()),
        ColumnType::Double => parse_double(value)
            .map(java_double)
            .unwrap_or_else(|| value.to_string()),
        ColumnType::Boolean => value.to_ascii_lowercase(),
        ColumnType::Text => value.to_string(),
    }
}

// Double → text the way the JVM prints it: `25.0`, `1.0E7`, `1.5E-4`
fn java_double(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let abs = v.abs();
    if v == 0.0 || (1e-3..1e7).contains(&abs) {
        let s = format!("{v}");
        return if s.contains('.') { s } else { format!("{s}.0") };
    }

    let s = format!("{v:e}");
    let (mantissa, exp) = s.split_once('e').unwrap_or((s.as_str(), "0"));
    if mantissa.contains('.') {
        format!("{mantissa}E{exp}")
    } else {
        format!("{mantissa}.0E{exp}")
    }
}
