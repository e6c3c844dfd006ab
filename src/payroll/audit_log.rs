use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use sqlx::mysql::MySqlConnection;
use tracing::error;

use crate::error::PayrollError;
use crate::model::component_log::{ComponentAction, ComponentChange, ComponentUpdateLog};
use crate::model::payroll::{ComponentType, PayrollMonth};

#[derive(FromRow)]
struct LogRow {
    log_id: u64,
    employee_id: String,
    month: String,
    component_name: String,
    component_type: String,
    amount: Decimal,
    action: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<LogRow> for ComponentUpdateLog {
    type Error = PayrollError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let corrupt =
            |field: &str| PayrollError::Fatal(format!("log {} has malformed {field}", row.log_id));

        Ok(ComponentUpdateLog {
            log_id: row.log_id,
            month: PayrollMonth::parse(&row.month).map_err(|_| corrupt("month"))?,
            component_type: ComponentType::from_str(&row.component_type)
                .map_err(|_| corrupt("component_type"))?,
            action: ComponentAction::from_str(&row.action).map_err(|_| corrupt("action"))?,
            employee_id: row.employee_id,
            component_name: row.component_name,
            amount: row.amount,
            created_at: row.created_at,
        })
    }
}

/// Journals one change inside the caller's transaction; returns the new `log_id`.
pub async fn append(
    conn: &mut MySqlConnection,
    employee_id: &str,
    month: &PayrollMonth,
    change: &ComponentChange,
) -> Result<u64, PayrollError> {
    let result = sqlx::query(
        r#"
        INSERT INTO component_update_logs
            (employee_id, month, component_name, component_type, amount, action)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(month.as_str())
    .bind(&change.component_name)
    .bind(change.component_type.as_ref())
    .bind(change.amount)
    .bind(change.action.as_ref())
    .execute(conn)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, month = %month, "Failed to append component log");
        e
    })?;

    Ok(result.last_insert_id())
}

/// Oldest first.
pub async fn history(
    conn: &mut MySqlConnection,
    employee_id: &str,
    month: &PayrollMonth,
) -> Result<Vec<ComponentUpdateLog>, PayrollError> {
    let rows = sqlx::query_as::<_, LogRow>(
        r#"
        SELECT log_id, employee_id, month, component_name, component_type,
               amount, action, created_at
        FROM component_update_logs
        WHERE employee_id = ? AND month = ?
        ORDER BY log_id ASC
        "#,
    )
    .bind(employee_id)
    .bind(month.as_str())
    .fetch_all(conn)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, month = %month, "Failed to fetch component log");
        e
    })?;

    rows.into_iter().map(ComponentUpdateLog::try_from).collect()
}
