//! Translation between JSON values and MySQL parameters/columns.

use serde_json::{Map, Number, Value};
use sqlx::{
    Column, Row as _, TypeInfo, ValueRef,
    mysql::{MySql, MySqlArguments, MySqlRow},
    query::Query,
    types::{
        Decimal, Json,
        chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc},
    },
};

/// One result row: column name to value.
pub type Row = Map<String, Value>;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Bind positional parameters in order.
///
/// Arrays and objects are sent as JSON text.
pub(crate) fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [Value],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(flag) => query.bind(*flag),
            Value::Number(number) => {
                if let Some(signed) = number.as_i64() {
                    query.bind(signed)
                } else if let Some(unsigned) = number.as_u64() {
                    query.bind(unsigned)
                } else {
                    query.bind(number.as_f64())
                }
            }
            Value::String(text) => query.bind(text.as_str()),
            other => query.bind(other.to_string()),
        };
    }
    query
}

pub(crate) fn row_to_map(row: &MySqlRow) -> Result<Row, sqlx::Error> {
    let mut map = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let value =
            decode_column(row, column.ordinal(), column.type_info().name())?;
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

fn decode_column(
    row: &MySqlRow,
    index: usize,
    type_name: &str,
) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::from(row.try_get::<i64, _>(index)?)
        }
        unsigned if unsigned.ends_with("UNSIGNED") => {
            Value::from(row.try_get::<u64, _>(index)?)
        }
        "YEAR" => Value::from(row.try_get::<u16, _>(index)?),
        "BIT" => Value::from(row.try_get::<u64, _>(index)?),
        "FLOAT" | "DOUBLE" => {
            Number::from_f64(row.try_get::<f64, _>(index)?)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        "DECIMAL" => {
            Value::String(row.try_get::<Decimal, _>(index)?.to_string())
        }
        "DATETIME" => Value::String(
            row.try_get::<NaiveDateTime, _>(index)?
                .format(DATETIME_FORMAT)
                .to_string(),
        ),
        "TIMESTAMP" => Value::String(
            row.try_get::<DateTime<Utc>, _>(index)?
                .format(DATETIME_FORMAT)
                .to_string(),
        ),
        "DATE" => {
            Value::String(row.try_get::<NaiveDate, _>(index)?.to_string())
        }
        "TIME" => {
            Value::String(row.try_get::<NaiveTime, _>(index)?.to_string())
        }
        "JSON" => row.try_get::<Json<Value>, _>(index)?.0,
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY"
        | "VARBINARY" => bytes_to_value(row.try_get::<Vec<u8>, _>(index)?),
        _ => match row.try_get::<String, _>(index) {
            Ok(text) => Value::String(text),
            Err(_) => bytes_to_value(row.try_get::<Vec<u8>, _>(index)?),
        },
    };
    Ok(value)
}

/// UTF-8 payloads become strings, anything else a byte array.
fn bytes_to_value(bytes: Vec<u8>) -> Value {
    match String::from_utf8(bytes) {
        Ok(text) => Value::String(text),
        Err(err) => Value::Array(
            err.into_bytes().into_iter().map(Value::from).collect(),
        ),
    }
}
