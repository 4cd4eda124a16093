//! Statement execution and JSON rendering of result rows.

use std::io::Write;

use eyre::{bail, Result};
use serde_json::{Map, Value};
use sqlbridge_core::{ColumnType, ConnectionHandle, Provider, ResultCode, StatementHandle};
use tracing::debug;

/// Prepares `sql`, writes each result row to `out` and finalizes.
pub fn run<W: Write>(
    provider: &mut Provider,
    db: ConnectionHandle,
    sql: &str,
    out: &mut W,
) -> Result<()> {
    let stmt = match provider.prepare_v2(db, sql).into_result() {
        Ok(stmt) => stmt,
        Err(code) => bail!("prepare failed with {code}: {}", provider.errmsg(db)?),
    };
    let written = write_rows(provider, db, stmt, out);
    let code = provider.finalize(stmt);
    let count = written?;
    debug!("{count} rows from `{sql}`");
    if !code.is_ok() {
        bail!("finalize failed with {code}");
    }
    Ok(())
}

fn write_rows<W: Write>(
    provider: &mut Provider,
    db: ConnectionHandle,
    stmt: StatementHandle,
    out: &mut W,
) -> Result<usize> {
    let mut names = Vec::new();
    for column in 0..provider.column_count(stmt)? {
        let name = provider.column_name(stmt, column)?;
        names.push(name.unwrap_or_else(|| format!("column{column}")));
    }

    let mut count = 0;
    loop {
        match provider.step(stmt) {
            ResultCode::ROW => {
                let mut row = Map::new();
                for (column, name) in (0..).zip(&names) {
                    row.insert(name.clone(), column_value(provider, stmt, column)?);
                }
                serde_json::to_writer(&mut *out, &row)?;
                writeln!(out)?;
                count += 1;
            }
            ResultCode::DONE => return Ok(count),
            code => bail!("step failed with {code}: {}", provider.errmsg(db)?),
        }
    }
}

/// Blobs render as lowercase hex, text as a JSON string.
fn column_value(provider: &mut Provider, stmt: StatementHandle, column: i32) -> Result<Value> {
    Ok(match provider.column_type(stmt, column)? {
        ColumnType::Integer => Value::from(provider.column_int64(stmt, column)?),
        ColumnType::Float => Value::from(provider.column_double(stmt, column)?),
        ColumnType::Text => provider
            .column_text(stmt, column)?
            .map_or(Value::Null, Value::String),
        ColumnType::Blob => Value::String(hex::encode(provider.column_blob(stmt, column)?)),
        ColumnType::Null => Value::Null,
    })
}
