use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

use crate::db::UnitOfWork;
use crate::error::PayrollError;
use crate::model::component_log::{ComponentChange, replay, same_projection};
use crate::model::payroll::{
    ComponentType, PayrollMonth, PayrollRecord, PayrollTotals, validate_amount, validate_component_name,
    validate_employee_id, validate_percentage,
};
use crate::payroll::catalog::ComponentCatalog;
use crate::payroll::response::{
    self, ComponentHistory, PayrollComponentDeleteResponse, PayrollComponentsView, UpdatedPayroll,
};
use crate::payroll::{audit_log, store};

/// Component to add, as the caller described it.
#[derive(Debug, Clone)]
pub struct NewComponent {
    pub name: String,
    pub amount: Decimal,
    pub component_type: Option<ComponentType>,
    pub original_percentage: Option<Decimal>,
}

#[derive(Clone)]
pub struct PayrollEngine {
    pool: MySqlPool,
    catalog: Arc<ComponentCatalog>,
}

fn payroll_not_found() -> PayrollError {
    PayrollError::NotFound("Payroll record not found".into())
}

/// The totals the store now holds must be exactly the ones derived from the
/// components just written.
fn verify_written(
    record: &PayrollRecord,
    stored: Option<PayrollTotals>,
) -> Result<(), PayrollError> {
    let derived = record.derived_totals()?;
    match stored {
        Some(stored) if stored == derived => Ok(()),
        Some(stored) => Err(PayrollError::Fatal(format!(
            "stored totals {stored:?} differ from derived {derived:?} for {} {}",
            record.employee_id, record.month
        ))),
        None => Err(PayrollError::Fatal(format!(
            "payroll {} {} vanished inside its own unit of work",
            record.employee_id, record.month
        ))),
    }
}

fn log_failure(err: &PayrollError) {
    match err {
        PayrollError::Fatal(msg) => error!(alert = true, error = %msg, "Payroll invariant violated"),
        PayrollError::Database(e) => error!(error = %e, "Payroll database failure"),
        other => debug!(error = %other, kind = other.kind(), "Payroll operation rejected"),
    }
}

impl PayrollEngine {
    pub fn new(pool: MySqlPool, catalog: Arc<ComponentCatalog>) -> Self {
        Self { pool, catalog }
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    #[instrument(skip_all, fields(employee_id = %employee_id, month = %month))]
    pub async fn create_payroll(
        &self,
        employee_id: &str,
        month: &PayrollMonth,
        basic_salary: Decimal,
    ) -> Result<PayrollComponentsView, PayrollError> {
        let employee_id = validate_employee_id(employee_id)?;
        let basic_salary = validate_amount("basic_salary", basic_salary)?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let record = store::create(uow.conn(), &employee_id, month, basic_salary)
            .await
            .inspect_err(log_failure)?;
        uow.commit().await?;

        info!(payroll_id = record.payroll_id, "Payroll record created");
        Ok(response::view(&record))
    }

    #[instrument(skip_all, fields(employee_id = %employee_id, month = %month, component = %component.name))]
    pub async fn add_component(
        &self,
        employee_id: &str,
        month: &PayrollMonth,
        component: NewComponent,
    ) -> Result<UpdatedPayroll, PayrollError> {
        let employee_id = validate_employee_id(employee_id)?;
        let name = validate_component_name(&component.name)?;
        let amount = validate_amount("amount", component.amount)?;
        let percentage = validate_percentage(component.original_percentage)?;
        let component_type = self
            .catalog
            .resolve_type(&name, component.component_type)
            .inspect_err(log_failure)?;

        self.mutate(&employee_id, month, |record| {
            record.add_component(&name, amount, component_type, percentage)
        })
        .await
        .map(|(record, change)| response::updated(&record, &change))
    }

    #[instrument(skip_all, fields(employee_id = %employee_id, month = %month, component = %name))]
    pub async fn update_component(
        &self,
        employee_id: &str,
        month: &PayrollMonth,
        name: &str,
        new_amount: Decimal,
        new_percentage: Option<Decimal>,
    ) -> Result<UpdatedPayroll, PayrollError> {
        let employee_id = validate_employee_id(employee_id)?;
        let name = validate_component_name(name)?;
        let amount = validate_amount("amount", new_amount)?;
        let percentage = validate_percentage(new_percentage)?;

        self.mutate(&employee_id, month, |record| {
            record.update_component(&name, amount, percentage)
        })
        .await
        .map(|(record, change)| response::updated(&record, &change))
    }

    #[instrument(skip_all, fields(employee_id = %employee_id, month = %month, component = %name))]
    pub async fn delete_component(
        &self,
        employee_id: &str,
        month: &PayrollMonth,
        name: &str,
    ) -> Result<PayrollComponentDeleteResponse, PayrollError> {
        let employee_id = validate_employee_id(employee_id)?;
        let name = validate_component_name(name)?;

        self.mutate(&employee_id, month, |record| record.remove_component(&name))
            .await
            .map(|(record, _)| response::deleted(&record, &name))
    }

    /// Lock-free read of the current components and totals.
    #[instrument(skip_all, fields(employee_id = %employee_id, month = %month))]
    pub async fn read_components(
        &self,
        employee_id: &str,
        month: &PayrollMonth,
    ) -> Result<PayrollComponentsView, PayrollError> {
        let employee_id = validate_employee_id(employee_id)?;

        let mut conn = self.pool.acquire().await?;
        let record = store::get(&mut conn, &employee_id, month)
            .await
            .inspect_err(log_failure)?
            .ok_or_else(payroll_not_found)?;

        Ok(response::view(&record))
    }

    /// Journal for one record, oldest first, checked against the live components.
    #[instrument(skip_all, fields(employee_id = %employee_id, month = %month))]
    pub async fn history(
        &self,
        employee_id: &str,
        month: &PayrollMonth,
    ) -> Result<ComponentHistory, PayrollError> {
        let employee_id = validate_employee_id(employee_id)?;

        let mut conn = self.pool.acquire().await?;
        let entries = audit_log::history(&mut conn, &employee_id, month)
            .await
            .inspect_err(log_failure)?;
        let record = store::get(&mut conn, &employee_id, month)
            .await
            .inspect_err(log_failure)?;

        let reconciled = match &record {
            Some(record) => {
                let changes: Vec<ComponentChange> = entries.iter().map(|e| e.change()).collect();
                same_projection(&replay(&changes), &record.salary_components)
            }
            None => entries.is_empty(),
        };

        Ok(ComponentHistory {
            employee_id,
            month: month.to_string(),
            entries,
            reconciled,
        })
    }

    /// Lock, mutate, write back and journal the record in one unit of work.
    async fn mutate<F>(
        &self,
        employee_id: &str,
        month: &PayrollMonth,
        apply: F,
    ) -> Result<(PayrollRecord, ComponentChange), PayrollError>
    where
        F: FnOnce(&mut PayrollRecord) -> Result<ComponentChange, PayrollError>,
    {
        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let mut record = match store::get_for_update(uow.conn(), employee_id, month).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                uow.rollback().await?;
                return Err(payroll_not_found());
            }
            Err(e) => {
                log_failure(&e);
                return Err(e);
            }
        };

        let change = match apply(&mut record) {
            Ok(change) => change,
            Err(e) => {
                log_failure(&e);
                uow.rollback().await?;
                return Err(e);
            }
        };

        store::upsert(uow.conn(), &record).await?;
        let stored = store::stored_totals(uow.conn(), employee_id, month).await?;
        // dropping the unit of work rolls the write back
        verify_written(&record, stored).inspect_err(log_failure)?;
        let log_id = audit_log::append(uow.conn(), employee_id, month, &change).await?;
        uow.commit().await?;

        info!(
            payroll_id = record.payroll_id,
            log_id,
            action = %change.action,
            component_type = %change.component_type,
            amount = %change.amount,
            net_salary = %record.net_salary,
            "Payroll component change committed"
        );

        Ok((record, change))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::payroll::SalaryComponents;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn record() -> PayrollRecord {
        let mut rec = PayrollRecord {
            payroll_id: 3,
            employee_id: "EMP001".into(),
            month: PayrollMonth::parse("2026-01").unwrap(),
            basic_salary: dec("50000.00"),
            salary_components: SalaryComponents::new(),
            total_earnings: Decimal::ZERO,
            total_deductions: Decimal::ZERO,
            net_salary: Decimal::ZERO,
        };
        rec.add_component("PF", dec("1800"), ComponentType::Deductions, None)
            .unwrap();
        rec
    }

    #[test]
    fn written_totals_matching_derivation_pass() {
        let rec = record();
        assert!(verify_written(&rec, Some(rec.totals())).is_ok());
    }

    #[test]
    fn written_totals_that_differ_are_fatal() {
        let rec = record();
        let mut stored = rec.totals();
        stored.net_salary = dec("48200.01");

        let err = verify_written(&rec, Some(stored)).unwrap_err();
        assert!(matches!(err, PayrollError::Fatal(_)));
        assert_eq!(err.kind(), "internal");
    }

    #[test]
    fn vanished_record_is_fatal() {
        assert!(matches!(
            verify_written(&record(), None),
            Err(PayrollError::Fatal(_))
        ));
    }
}
