use rust_decimal::Decimal;
use sqlx::mysql::MySqlConnection;
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::{error, warn};

use crate::error::PayrollError;
use crate::model::payroll::{PayrollMonth, PayrollRecord, PayrollTotals, SalaryComponents, money};

#[derive(FromRow)]
struct PayrollRow {
    payroll_id: u64,
    employee_id: String,
    month: String,
    basic_salary: Decimal,
    salary_components: Option<String>,
    total_earnings: Decimal,
    total_deductions: Decimal,
    net_salary: Decimal,
}

impl PayrollRow {
    fn into_record(self) -> Result<PayrollRecord, PayrollError> {
        let month = PayrollMonth::parse(&self.month).map_err(|_| {
            PayrollError::Fatal(format!(
                "payroll {} has malformed month '{}'",
                self.payroll_id, self.month
            ))
        })?;

        let salary_components = match self.salary_components.as_deref() {
            None | Some("") | Some("null") => SalaryComponents::new(),
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                PayrollError::Fatal(format!(
                    "payroll {} has unreadable salary_components: {e}",
                    self.payroll_id
                ))
            })?,
        };

        let record = PayrollRecord {
            payroll_id: self.payroll_id,
            employee_id: self.employee_id,
            month,
            basic_salary: self.basic_salary,
            salary_components,
            total_earnings: self.total_earnings,
            total_deductions: self.total_deductions,
            net_salary: self.net_salary,
        };

        if !record.has_consistent_totals() {
            warn!(
                payroll_id = record.payroll_id,
                employee_id = %record.employee_id,
                month = %record.month,
                "Cached payroll totals drifted from components"
            );
        }

        Ok(record)
    }
}

// JSON columns come back as binary strings; CAST keeps the decode a plain String.
const SELECT_PAYROLL: &str = r#"
    SELECT payroll_id, employee_id, month, basic_salary,
           CAST(salary_components AS CHAR) AS salary_components,
           total_earnings, total_deductions, net_salary
    FROM payroll_setup
    WHERE employee_id = ? AND month = ?
"#;

pub async fn get(
    conn: &mut MySqlConnection,
    employee_id: &str,
    month: &PayrollMonth,
) -> Result<Option<PayrollRecord>, PayrollError> {
    let row = sqlx::query_as::<_, PayrollRow>(SELECT_PAYROLL)
        .bind(employee_id)
        .bind(month.as_str())
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, month = %month, "Failed to fetch payroll");
            e
        })?;

    row.map(PayrollRow::into_record).transpose()
}

/// Same as [`get`], holding a row lock until the surrounding transaction ends.
pub async fn get_for_update(
    conn: &mut MySqlConnection,
    employee_id: &str,
    month: &PayrollMonth,
) -> Result<Option<PayrollRecord>, PayrollError> {
    let sql = format!("{SELECT_PAYROLL} FOR UPDATE");

    let row = sqlx::query_as::<_, PayrollRow>(&sql)
        .bind(employee_id)
        .bind(month.as_str())
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, month = %month, "Failed to lock payroll");
            e
        })?;

    row.map(PayrollRow::into_record).transpose()
}

/// Cached totals as the store holds them, read back inside the caller's
/// transaction.
pub async fn stored_totals(
    conn: &mut MySqlConnection,
    employee_id: &str,
    month: &PayrollMonth,
) -> Result<Option<PayrollTotals>, PayrollError> {
    let row: Option<(Decimal, Decimal, Decimal)> = sqlx::query_as(
        r#"
        SELECT total_earnings, total_deductions, net_salary
        FROM payroll_setup
        WHERE employee_id = ? AND month = ?
        "#,
    )
    .bind(employee_id)
    .bind(month.as_str())
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, month = %month, "Failed to read back payroll totals");
        e
    })?;

    Ok(row.map(|(total_earnings, total_deductions, net_salary)| PayrollTotals {
        total_earnings,
        total_deductions,
        net_salary,
    }))
}

/// Inserts an empty record. A second record for the same key is a conflict.
pub async fn create(
    conn: &mut MySqlConnection,
    employee_id: &str,
    month: &PayrollMonth,
    basic_salary: Decimal,
) -> Result<PayrollRecord, PayrollError> {
    let mut record = PayrollRecord {
        payroll_id: 0,
        employee_id: employee_id.to_string(),
        month: month.clone(),
        basic_salary: money(basic_salary),
        salary_components: SalaryComponents::new(),
        total_earnings: Decimal::ZERO,
        total_deductions: Decimal::ZERO,
        net_salary: Decimal::ZERO,
    };
    record.recompute()?;

    let result = sqlx::query(
        r#"
        INSERT INTO payroll_setup
            (employee_id, month, basic_salary, salary_components,
             total_earnings, total_deductions, net_salary)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.employee_id)
    .bind(record.month.as_str())
    .bind(record.basic_salary)
    .bind(Json(&record.salary_components))
    .bind(record.total_earnings)
    .bind(record.total_deductions)
    .bind(record.net_salary)
    .execute(conn)
    .await
    .map_err(|e| match PayrollError::from(e) {
        PayrollError::Conflict(_) => PayrollError::Conflict(format!(
            "Payroll for {employee_id} {month} already exists"
        )),
        other => other,
    })?;

    record.payroll_id = result.last_insert_id();
    Ok(record)
}

/// Writes back components and cached totals.
pub async fn upsert(conn: &mut MySqlConnection, record: &PayrollRecord) -> Result<(), PayrollError> {
    sqlx::query(
        r#"
        INSERT INTO payroll_setup
            (employee_id, month, basic_salary, salary_components,
             total_earnings, total_deductions, net_salary)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            basic_salary = VALUES(basic_salary),
            salary_components = VALUES(salary_components),
            total_earnings = VALUES(total_earnings),
            total_deductions = VALUES(total_deductions),
            net_salary = VALUES(net_salary)
        "#,
    )
    .bind(&record.employee_id)
    .bind(record.month.as_str())
    .bind(record.basic_salary)
    .bind(Json(&record.salary_components))
    .bind(record.total_earnings)
    .bind(record.total_deductions)
    .bind(record.net_salary)
    .execute(conn)
    .await
    .map_err(|e| {
        error!(error = %e, payroll_id = record.payroll_id, "Failed to write payroll");
        e
    })?;

    Ok(())
}
