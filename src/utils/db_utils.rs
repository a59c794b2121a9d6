use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlDatabaseError, MySqlQueryResult};

use crate::leave::LeaveError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Column a PATCH-style payload may touch, and how its JSON value is read.
///
/// Only `NullableText` columns accept `null`.
#[derive(Debug, Clone, Copy)]
pub enum Column {
    Text(&'static str),
    NullableText(&'static str),
    Number(&'static str),
    Id(&'static str),
    Date(&'static str),
    Flag(&'static str),
}

impl Column {
    fn name(&self) -> &'static str {
        match self {
            Column::Text(n)
            | Column::NullableText(n)
            | Column::Number(n)
            | Column::Id(n)
            | Column::Date(n)
            | Column::Flag(n) => n,
        }
    }

    fn convert(&self, value: &Value) -> Result<SqlValue, LeaveError> {
        let name = self.name();
        let bad = |expected: &str| LeaveError::invalid(format!("{name} must be {expected}"));

        match (self, value) {
            (Column::NullableText(_), Value::Null) => Ok(SqlValue::Null),
            (_, Value::Null) => Err(LeaveError::invalid(format!("{name} cannot be null"))),
            (Column::Text(_) | Column::NullableText(_), Value::String(s)) => {
                Ok(SqlValue::String(s.trim().to_string()))
            }
            (Column::Number(_), value) => number_from_json(value).map(SqlValue::F64).ok_or_else(|| bad("numeric")),
            (Column::Id(_), Value::Number(n)) => n.as_u64().map(SqlValue::U64).ok_or_else(|| bad("a positive integer")),
            (Column::Date(_), Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(SqlValue::Date)
                .map_err(|_| bad("an ISO 8601 date")),
            (Column::Flag(_), Value::Bool(b)) => Ok(SqlValue::Bool(*b)),
            (Column::Text(_) | Column::NullableText(_), _) => Err(bad("a string")),
            (Column::Id(_), _) => Err(bad("a positive integer")),
            (Column::Date(_), _) => Err(bad("an ISO 8601 date")),
            (Column::Flag(_), _) => Err(bad("a boolean")),
        }
    }
}

/// A finite JSON number, or a string holding one.
pub fn number_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

pub fn payload_object(payload: &Value) -> Result<&Map<String, Value>, LeaveError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| LeaveError::invalid("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(LeaveError::invalid("No fields provided for update"));
    }
    Ok(obj)
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Only columns listed in `allowed` may appear in the payload; anything else
/// is rejected rather than interpolated into SQL.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[Column],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, LeaveError> {
    let obj = payload_object(payload)?;

    let mut set_parts = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let column = allowed
            .iter()
            .find(|c| c.name() == key)
            .ok_or_else(|| LeaveError::invalid(format!("Field '{key}' cannot be updated")))?;

        set_parts.push(format!("{} = ?", column.name()));
        values.push(column.convert(value)?);
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        set_parts.join(", "),
        id_column
    );

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(
    pool: &MySqlPool,
    update: SqlUpdate,
) -> Result<MySqlQueryResult, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    query.execute(pool).await
}

// MySQL server error numbers; SQLSTATE 23000 alone covers all three
const ER_BAD_NULL_ERROR: u16 = 1048;
const ER_DUP_ENTRY: u16 = 1062;
const ER_NO_REFERENCED_ROW_2: u16 = 1452;

fn mysql_error_number(err: &sqlx::Error) -> Option<u16> {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(|e| e.number()),
        _ => None,
    }
}

/// Maps a failed INSERT or UPDATE to a client error where the caller is at fault.
///
/// Duplicate keys become `conflict` with `duplicate` as the message; missing
/// references and nulls in required columns become `invalid`.
pub fn write_error(err: sqlx::Error, duplicate: &str) -> LeaveError {
    match mysql_error_number(&err) {
        Some(ER_DUP_ENTRY) => LeaveError::conflict(duplicate),
        Some(ER_NO_REFERENCED_ROW_2) => LeaveError::invalid("Referenced record does not exist"),
        Some(ER_BAD_NULL_ERROR) => LeaveError::invalid("A required field is missing"),
        _ => LeaveError::from(err),
    }
}
