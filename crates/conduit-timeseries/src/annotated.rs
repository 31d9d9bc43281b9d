// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Annotated CSV decoding.
//!
//! Query responses arrive as one or more tables. Each table section starts
//! with annotation rows, followed by a header row and data rows:
//!
//! ```text
//! #datatype,string,long,dateTime:RFC3339,double,string,string
//! #group,false,false,false,false,true,true
//! #default,_result,,,,,
//! ,result,table,_time,_value,_field,_measurement
//! ,,0,2024-05-01T00:00:00Z,21.5,temp,boiler
//! ```
//!
//! A new annotation row after data rows opens a new section. Tables are
//! returned in response order. A section with an `error` column reports a
//! query failure that happened after the response status was sent.

use chrono::{DateTime, Utc};
use conduit_core::error::{DriverError, DriverResult};
use conduit_core::output::SeriesRecord;
use csv::{ReaderBuilder, StringRecord};
use serde_json::{Number, Value};

// =============================================================================
// Column types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataType {
    String,
    Long,
    UnsignedLong,
    Double,
    Boolean,
    DateTime,
    Duration,
}

impl DataType {
    fn parse(annotation: &str) -> Self {
        match annotation {
            "long" => DataType::Long,
            "unsignedLong" => DataType::UnsignedLong,
            "double" => DataType::Double,
            "boolean" => DataType::Boolean,
            "duration" => DataType::Duration,
            a if a.starts_with("dateTime") => DataType::DateTime,
            _ => DataType::String,
        }
    }

    fn convert(self, raw: &str) -> DriverResult<Value> {
        if raw.is_empty() {
            return Ok(Value::Null);
        }
        let invalid = || DriverError::invalid_response(format!("cannot read '{}' as {:?}", raw, self));
        let value = match self {
            DataType::String | DataType::Duration => Value::String(raw.to_string()),
            DataType::Long => Value::from(raw.parse::<i64>().map_err(|_| invalid())?),
            DataType::UnsignedLong => Value::from(raw.parse::<u64>().map_err(|_| invalid())?),
            // NaN and infinities have no JSON form.
            DataType::Double => {
                let v = raw.parse::<f64>().map_err(|_| invalid())?;
                Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
            }
            DataType::Boolean => match raw {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Err(invalid()),
            },
            DataType::DateTime => Value::String(parse_time(raw)?.to_rfc3339()),
        };
        Ok(value)
    }
}

fn parse_time(raw: &str) -> DriverResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DriverError::invalid_response(format!("invalid timestamp '{}': {}", raw, e)))
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Default)]
struct Section {
    datatypes: Vec<DataType>,
    defaults: Vec<String>,
    header: Option<Vec<String>>,
    has_rows: bool,
}

impl Section {
    fn column(&self, name: &str) -> Option<usize> {
        self.header
            .as_ref()
            .and_then(|h| h.iter().position(|c| c == name))
    }

    fn cell<'r>(&'r self, record: &'r StringRecord, index: usize) -> &'r str {
        match record.get(index) {
            Some(value) if !value.is_empty() => value,
            _ => self.defaults.get(index).map(String::as_str).unwrap_or(""),
        }
    }

    fn datatype(&self, index: usize) -> DataType {
        self.datatypes.get(index).copied().unwrap_or(DataType::String)
    }
}

fn annotation_values(record: &StringRecord) -> impl Iterator<Item = &str> {
    // The first cell holds the annotation name; values line up with the header.
    std::iter::once("").chain(record.iter().skip(1))
}

/// Decodes an annotated CSV body into records.
///
/// # Errors
///
/// - `DriverError::QueryError` when the body carries an error table
/// - `DriverError::InvalidResponse` when rows cannot be decoded
pub fn parse_records(body: &str) -> DriverResult<Vec<SeriesRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut records = Vec::new();
    let mut section = Section::default();

    for row in reader.records() {
        let row = row.map_err(|e| DriverError::invalid_response(format!("malformed CSV: {}", e)))?;
        let first = row.get(0).unwrap_or("");

        if first.starts_with('#') {
            if section.has_rows || section.header.is_some() {
                section = Section::default();
            }
            match first {
                "#datatype" => section.datatypes = annotation_values(&row).map(DataType::parse).collect(),
                "#default" => section.defaults = annotation_values(&row).map(str::to_string).collect(),
                _ => {}
            }
            continue;
        }

        if section.header.is_none() {
            section.header = Some(row.iter().map(str::to_string).collect());
            continue;
        }

        if row.iter().all(str::is_empty) {
            continue;
        }
        section.has_rows = true;

        if let Some(index) = section.column("error") {
            let message = section.cell(&row, index);
            if !message.is_empty() {
                return Err(DriverError::query(message));
            }
            continue;
        }

        records.push(decode_row(&section, &row)?);
    }

    Ok(records)
}

fn decode_row(section: &Section, row: &StringRecord) -> DriverResult<SeriesRecord> {
    let index = |name: &str| {
        section
            .column(name)
            .ok_or_else(|| DriverError::invalid_response(format!("missing column '{}'", name)))
    };

    let time_index = index("_time")?;
    let value_index = index("_value")?;

    let time = parse_time(section.cell(row, time_index))?;
    let value = section
        .datatype(value_index)
        .convert(section.cell(row, value_index))?;
    let field = section
        .column("_field")
        .map(|i| section.cell(row, i).to_string())
        .unwrap_or_default();
    let measurement = section
        .column("_measurement")
        .map(|i| section.cell(row, i).to_string())
        .unwrap_or_default();

    Ok(SeriesRecord {
        time,
        value,
        field,
        measurement,
    })
}
