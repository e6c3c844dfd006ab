use sqlx::MySqlPool;
use tracing::{debug, error, instrument};

use crate::error::PayrollError;
use crate::model::leave::{Entitlements, LeaveBalance, LeaveRecord, LeaveUsage};
use crate::model::payroll::validate_employee_id;

/// Read-only view over `leave_management`. Request lifecycle lives elsewhere.
#[derive(Clone)]
pub struct LeaveLedger {
    pool: MySqlPool,
}

impl LeaveLedger {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn approved_records(&self, employee_id: &str) -> Result<Vec<LeaveRecord>, PayrollError> {
        let records = sqlx::query_as::<_, LeaveRecord>(
            r#"
            SELECT employee_id, LOWER(TRIM(leave_type)) AS leave_type, status
            FROM leave_management
            WHERE employee_id = ?
              AND UPPER(status) = 'APPROVED'
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to fetch approved leaves");
            e
        })?;

        Ok(records)
    }

    #[instrument(skip_all, fields(employee_id = %employee_id))]
    pub async fn used_by_type(&self, employee_id: &str) -> Result<LeaveUsage, PayrollError> {
        let employee_id = validate_employee_id(employee_id)?;
        let records = self.approved_records(&employee_id).await?;
        let usage = LeaveUsage::tally(&records);

        debug!(
            casual = usage.casual,
            sick = usage.sick,
            earned = usage.earned,
            other = usage.other,
            "Leave usage tallied"
        );
        Ok(usage)
    }

    #[instrument(skip_all, fields(employee_id = %employee_id))]
    pub async fn balance(
        &self,
        employee_id: &str,
        entitlements: &Entitlements,
    ) -> Result<LeaveBalance, PayrollError> {
        let usage = self.used_by_type(employee_id).await?;
        Ok(LeaveBalance::compute(employee_id.trim(), &usage, entitlements))
    }
}
