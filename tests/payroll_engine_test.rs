//! Scenarios against a real MySQL. Run with
//! `TEST_DATABASE_URL=mysql://… cargo test -- --ignored`.

mod common;

use std::str::FromStr;

use hrm_payroll::error::PayrollError;
use hrm_payroll::leave::ledger::LeaveLedger;
use hrm_payroll::model::component_log::ComponentAction;
use hrm_payroll::model::leave::{Entitlements, LeaveUsage};
use hrm_payroll::model::payroll::{ComponentType, PayrollMonth};
use hrm_payroll::payroll::engine::{NewComponent, PayrollEngine};
use rust_decimal::Decimal;
use sqlx::MySqlPool;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn month() -> PayrollMonth {
    PayrollMonth::parse("2026-01").unwrap()
}

fn component(name: &str, amount: &str, ty: ComponentType) -> NewComponent {
    NewComponent {
        name: name.into(),
        amount: dec(amount),
        component_type: Some(ty),
        original_percentage: None,
    }
}

async fn setup() -> (MySqlPool, PayrollEngine, String) {
    let pool = common::test_pool().await;
    let engine = common::engine(pool.clone());
    let employee = common::seed_employee(&pool).await;

    engine
        .create_payroll(&employee, &month(), dec("50000"))
        .await
        .expect("create payroll");

    (pool, engine, employee)
}

async fn log_count(pool: &MySqlPool, employee: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM component_update_logs WHERE employee_id = ?")
        .bind(employee)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[actix_web::test]
#[ignore]
async fn add_then_delete_recomputes_totals() {
    let (_pool, engine, emp) = setup().await;

    engine
        .add_component(&emp, &month(), component("Transport Allowance", "5000", ComponentType::Earnings))
        .await
        .unwrap();
    let updated = engine
        .add_component(&emp, &month(), component("PF", "1800", ComponentType::Deductions))
        .await
        .unwrap();

    assert_eq!(updated.action, ComponentAction::Added);
    assert_eq!(updated.new_totals.total_earnings, dec("5000"));
    assert_eq!(updated.new_totals.total_deductions, dec("1800"));
    assert_eq!(updated.new_totals.net_salary, dec("53200"));

    let deleted = engine
        .delete_component(&emp, &month(), "Transport Allowance")
        .await
        .unwrap();

    assert_eq!(deleted.deleted_component, "Transport Allowance");
    assert_eq!(deleted.new_totals.total_earnings, Decimal::ZERO);
    assert_eq!(deleted.new_totals.total_deductions, dec("1800"));
    assert_eq!(deleted.new_totals.net_salary, dec("48200"));
    assert!(deleted.remaining_components.earnings.is_empty());
    assert_eq!(deleted.remaining_components.deductions.len(), 1);
    assert_eq!(deleted.remaining_components.deductions[0].name, "PF");
    assert_eq!(deleted.remaining_components.deductions[0].amount, dec("1800"));

    let view = engine.read_components(&emp, &month()).await.unwrap();
    assert_eq!(view.totals.net_salary, dec("48200"));
}

#[actix_web::test]
#[ignore]
async fn percentage_component_keeps_provenance() {
    let (_pool, engine, emp) = setup().await;

    let mut hra = component("HRA", "10000", ComponentType::Earnings);
    hra.original_percentage = Some(dec("20"));
    let updated = engine.add_component(&emp, &month(), hra).await.unwrap();

    let line = &updated.components.earnings[0];
    assert_eq!(line.name, "HRA");
    assert_eq!(line.original_percentage, Some(dec("20")));
    assert_eq!(updated.new_totals.net_salary, dec("60000"));

    let mut off = component("Medical Allowance", "1234", ComponentType::Earnings);
    off.original_percentage = Some(dec("5"));
    let err = engine.add_component(&emp, &month(), off).await.unwrap_err();
    assert!(matches!(err, PayrollError::Validation(_)));
}

#[actix_web::test]
#[ignore]
async fn history_is_ordered_and_reconciles() {
    let (_pool, engine, emp) = setup().await;

    engine
        .add_component(&emp, &month(), component("PF", "1800", ComponentType::Deductions))
        .await
        .unwrap();
    let mut hra = component("HRA", "10000", ComponentType::Earnings);
    hra.original_percentage = Some(dec("20"));
    engine.add_component(&emp, &month(), hra).await.unwrap();
    let updated = engine
        .update_component(&emp, &month(), "PF", dec("2000"), None)
        .await
        .unwrap();
    assert_eq!(updated.action, ComponentAction::Updated);
    assert_eq!(updated.new_totals.total_deductions, dec("2000"));

    let history = engine.history(&emp, &month()).await.unwrap();
    let steps: Vec<(&str, ComponentAction)> = history
        .entries
        .iter()
        .map(|e| (e.component_name.as_str(), e.action))
        .collect();
    assert_eq!(
        steps,
        vec![
            ("PF", ComponentAction::Added),
            ("HRA", ComponentAction::Added),
            ("PF", ComponentAction::Updated),
        ]
    );
    assert!(history.entries.windows(2).all(|w| w[0].log_id < w[1].log_id));
    assert_eq!(history.entries[2].amount, dec("2000"));
    assert!(history.reconciled);
}

#[actix_web::test]
#[ignore]
async fn deleting_missing_component_changes_nothing() {
    let (pool, engine, emp) = setup().await;

    engine
        .add_component(&emp, &month(), component("PF", "1800", ComponentType::Deductions))
        .await
        .unwrap();
    let before = engine.read_components(&emp, &month()).await.unwrap();
    let logs_before = log_count(&pool, &emp).await;

    let err = engine
        .delete_component(&emp, &month(), "Transport Allowance")
        .await
        .unwrap_err();
    assert!(matches!(err, PayrollError::NotFound(_)));

    let after = engine.read_components(&emp, &month()).await.unwrap();
    assert_eq!(log_count(&pool, &emp).await, logs_before);
    assert_eq!(after.totals, before.totals);
    assert_eq!(after.components.deductions.len(), 1);
}

#[actix_web::test]
#[ignore]
async fn missing_record_and_duplicate_record() {
    let (_pool, engine, emp) = setup().await;
    let other_month = PayrollMonth::parse("2026-02").unwrap();

    let err = engine
        .add_component(&emp, &other_month, component("PF", "1", ComponentType::Deductions))
        .await
        .unwrap_err();
    assert!(matches!(err, PayrollError::NotFound(_)));

    let err = engine
        .create_payroll(&emp, &month(), dec("1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PayrollError::Conflict(_)));

    let err = engine
        .create_payroll("NO-SUCH-EMPLOYEE", &month(), dec("1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PayrollError::NotFound(_)));
}

#[actix_web::test]
#[ignore]
async fn concurrent_adds_are_serialized() {
    let (pool, engine, emp) = setup().await;
    let m = month();

    let (a, b) = futures::join!(
        engine.add_component(&emp, &m, component("Bonus", "100", ComponentType::Earnings)),
        engine.add_component(&emp, &m, component("Loan", "40", ComponentType::Deductions)),
    );
    a.unwrap();
    b.unwrap();

    let view = engine.read_components(&emp, &month()).await.unwrap();
    assert!(view.components.contains("Bonus"));
    assert!(view.components.contains("Loan"));
    assert_eq!(view.totals.net_salary, dec("50060"));

    let (a, b) = futures::join!(
        engine.add_component(&emp, &m, component("Gift", "10", ComponentType::Earnings)),
        engine.add_component(&emp, &m, component("Gift", "10", ComponentType::Earnings)),
    );
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(PayrollError::Conflict(_)))));

    assert_eq!(log_count(&pool, &emp).await, 3);
}

#[actix_web::test]
#[ignore]
async fn approved_leaves_are_bucketed() {
    let pool = common::test_pool().await;
    let ledger = LeaveLedger::new(pool.clone());
    let emp = common::unique_employee_code();

    for (leave_type, status) in [
        ("Casual", "APPROVED"),
        ("sick", "APPROVED"),
        ("SICK", "approved"),
        ("Earned", "APPROVED"),
        ("Casual", "PENDING"),
        ("Earned", "REJECTED"),
    ] {
        sqlx::query("INSERT INTO leave_management (employee_id, leave_type, status) VALUES (?, ?, ?)")
            .bind(&emp)
            .bind(leave_type)
            .bind(status)
            .execute(&pool)
            .await
            .unwrap();
    }

    let usage = ledger.used_by_type(&emp).await.unwrap();
    assert_eq!(
        usage,
        LeaveUsage {
            casual: 1,
            sick: 2,
            earned: 1,
            other: 0,
        }
    );

    let balance = ledger
        .balance(&emp, &Entitlements::default().overridden_by("sick:1").unwrap())
        .await
        .unwrap();
    assert_eq!(balance.casual.remaining, 11);
    assert_eq!(balance.sick.remaining, 0);
    assert_eq!(balance.earned.remaining, 14);
}
