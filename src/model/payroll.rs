use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use derive_more::Display;
use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::error::PayrollError;
use crate::model::component_log::{ComponentAction, ComponentChange};

const MAX_EMPLOYEE_ID_LEN: usize = 64;
const MAX_COMPONENT_NAME_LEN: usize = 100;

/// Largest value a `DECIMAL(12, 2)` column holds: 9,999,999,999.99.
pub const MAX_MONEY: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, EnumString, AsRefStr,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ComponentType {
    Earnings,
    Deductions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComponentEntry {
    #[schema(example = "5000.00")]
    pub amount: Decimal,
    pub component_type: ComponentType,
    /// Provenance only; the amount is authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "20", nullable = true)]
    pub original_percentage: Option<Decimal>,
}

/// Canonical `YYYY-MM` payroll month.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PayrollMonth(String);

impl PayrollMonth {
    pub fn parse(raw: &str) -> Result<Self, PayrollError> {
        let raw = raw.trim();
        let well_formed = raw.len() == 7
            && raw.as_bytes()[4] == b'-'
            && NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").is_ok();

        if !well_formed {
            return Err(PayrollError::Validation(format!(
                "month '{raw}' must be in YYYY-MM form"
            )));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PayrollMonth {
    type Error = PayrollError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PayrollMonth> for String {
    fn from(month: PayrollMonth) -> Self {
        month.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PayrollTotals {
    #[schema(example = "5000.00")]
    pub total_earnings: Decimal,
    #[schema(example = "1800.00")]
    pub total_deductions: Decimal,
    /// May be negative; deductions are not capped.
    #[schema(example = "53200.00")]
    pub net_salary: Decimal,
}

impl PayrollTotals {
    /// Sums the components with checked arithmetic; overflow is an invariant
    /// violation, never a panic.
    pub fn derive(
        basic_salary: Decimal,
        components: &SalaryComponents,
    ) -> Result<Self, PayrollError> {
        let overflow =
            || PayrollError::Fatal("payroll totals overflowed while summing components".into());

        let mut total_earnings = money(Decimal::ZERO);
        let mut total_deductions = money(Decimal::ZERO);

        for (_, entry) in components.iter() {
            let total = match entry.component_type {
                ComponentType::Earnings => &mut total_earnings,
                ComponentType::Deductions => &mut total_deductions,
            };
            *total = total.checked_add(entry.amount).ok_or_else(overflow)?;
        }

        let net_salary = basic_salary
            .checked_add(total_earnings)
            .and_then(|v| v.checked_sub(total_deductions))
            .ok_or_else(overflow)?;

        Ok(Self {
            total_earnings,
            total_deductions,
            net_salary: money(net_salary),
        })
    }

    /// Every total must fit the `DECIMAL(12, 2)` columns it is written to.
    pub fn ensure_storable(&self) -> Result<(), PayrollError> {
        for (field, value) in [
            ("total_earnings", self.total_earnings),
            ("total_deductions", self.total_deductions),
            ("net_salary", self.net_salary),
        ] {
            if value.abs() > MAX_MONEY {
                return Err(PayrollError::Validation(format!(
                    "{field} {value} would exceed the storable limit of {MAX_MONEY}"
                )));
            }
        }
        Ok(())
    }
}

/// Components of one payroll record, keyed by name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalaryComponents {
    entries: Vec<(String, ComponentEntry)>,
}

impl SalaryComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&ComponentEntry> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComponentEntry)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Appends a new component; `false` if the name is already taken.
    pub fn insert(&mut self, name: String, entry: ComponentEntry) -> bool {
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, entry));
        true
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ComponentEntry> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, entry)| entry)
    }

    pub fn remove(&mut self, name: &str) -> Option<ComponentEntry> {
        let idx = self.position(name)?;
        Some(self.entries.remove(idx).1)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }
}

// MySQL normalises JSON object key order, so the stored form carries an
// explicit position for each entry.
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    amount: Decimal,
    component_type: ComponentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_percentage: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<u32>,
}

impl Serialize for SalaryComponents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (idx, (name, entry)) in self.entries.iter().enumerate() {
            let stored = StoredEntry {
                amount: entry.amount,
                component_type: entry.component_type,
                original_percentage: entry.original_percentage,
                position: Some(idx as u32),
            };
            map.serialize_entry(name, &stored)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SalaryComponents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ComponentsVisitor;

        impl<'de> Visitor<'de> for ComponentsVisitor {
            type Value = SalaryComponents;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of component name to component entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut seen = HashSet::new();
                let mut stored: Vec<(String, StoredEntry)> = Vec::new();

                while let Some((name, entry)) = access.next_entry::<String, StoredEntry>()? {
                    if !seen.insert(name.clone()) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate component '{name}'"
                        )));
                    }
                    stored.push((name, entry));
                }

                // stable: entries without a position keep document order
                stored.sort_by_key(|(_, e)| e.position.unwrap_or(u32::MAX));

                Ok(SalaryComponents {
                    entries: stored
                        .into_iter()
                        .map(|(name, e)| {
                            let entry = ComponentEntry {
                                amount: e.amount,
                                component_type: e.component_type,
                                original_percentage: e.original_percentage,
                            };
                            (name, entry)
                        })
                        .collect(),
                })
            }
        }

        deserializer.deserialize_map(ComponentsVisitor)
    }
}

/// One row of `payroll_setup`, with its components decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollRecord {
    pub payroll_id: u64,
    pub employee_id: String,
    pub month: PayrollMonth,
    pub basic_salary: Decimal,
    pub salary_components: SalaryComponents,
    pub total_earnings: Decimal,
    pub total_deductions: Decimal,
    pub net_salary: Decimal,
}

impl PayrollRecord {
    pub fn totals(&self) -> PayrollTotals {
        PayrollTotals {
            total_earnings: self.total_earnings,
            total_deductions: self.total_deductions,
            net_salary: self.net_salary,
        }
    }

    pub fn derived_totals(&self) -> Result<PayrollTotals, PayrollError> {
        PayrollTotals::derive(self.basic_salary, &self.salary_components)
    }

    pub fn has_consistent_totals(&self) -> bool {
        self.derived_totals()
            .is_ok_and(|derived| derived == self.totals())
    }

    /// Rewrites the cached totals from the components.
    pub fn recompute(&mut self) -> Result<(), PayrollError> {
        let totals = self.derived_totals()?;
        totals.ensure_storable()?;
        self.set_totals(totals);
        Ok(())
    }

    fn set_totals(&mut self, totals: PayrollTotals) {
        self.total_earnings = totals.total_earnings;
        self.total_deductions = totals.total_deductions;
        self.net_salary = totals.net_salary;
    }

    /// Swaps in the new components only if their totals derive and fit
    /// storage; on error the record is left as it was.
    fn replace_components(&mut self, components: SalaryComponents) -> Result<(), PayrollError> {
        let totals = PayrollTotals::derive(self.basic_salary, &components)?;
        totals.ensure_storable()?;
        self.salary_components = components;
        self.set_totals(totals);
        Ok(())
    }

    pub fn add_component(
        &mut self,
        name: &str,
        amount: Decimal,
        component_type: ComponentType,
        original_percentage: Option<Decimal>,
    ) -> Result<ComponentChange, PayrollError> {
        if self.salary_components.contains(name) {
            return Err(PayrollError::Conflict(format!(
                "Component '{name}' already exists for {} {}",
                self.employee_id, self.month
            )));
        }
        check_percentage_matches(self.basic_salary, amount, original_percentage)?;

        let entry = ComponentEntry {
            amount: money(amount),
            component_type,
            original_percentage,
        };
        let mut components = self.salary_components.clone();
        components.insert(name.to_string(), entry.clone());
        self.replace_components(components)?;

        Ok(ComponentChange::new(name, &entry, ComponentAction::Added))
    }

    pub fn update_component(
        &mut self,
        name: &str,
        amount: Decimal,
        original_percentage: Option<Decimal>,
    ) -> Result<ComponentChange, PayrollError> {
        let mut components = self.salary_components.clone();
        let entry = components
            .get_mut(name)
            .ok_or_else(|| component_not_found(name))?;
        check_percentage_matches(self.basic_salary, amount, original_percentage)?;

        entry.amount = money(amount);
        entry.original_percentage = original_percentage;
        let entry = entry.clone();

        self.replace_components(components)?;
        Ok(ComponentChange::new(name, &entry, ComponentAction::Updated))
    }

    pub fn remove_component(&mut self, name: &str) -> Result<ComponentChange, PayrollError> {
        let mut components = self.salary_components.clone();
        let entry = components
            .remove(name)
            .ok_or_else(|| component_not_found(name))?;

        self.replace_components(components)?;
        Ok(ComponentChange::new(name, &entry, ComponentAction::Deleted))
    }
}

fn component_not_found(name: &str) -> PayrollError {
    PayrollError::NotFound(format!("Component '{name}' not found"))
}

/// Two fractional digits, for storage and display.
pub fn money(value: Decimal) -> Decimal {
    let mut value = value.round_dp(2);
    value.rescale(2);
    value
}

pub fn percentage_of(basic_salary: Decimal, percentage: Decimal) -> Decimal {
    money(basic_salary * percentage / Decimal::ONE_HUNDRED)
}

fn check_percentage_matches(
    basic_salary: Decimal,
    amount: Decimal,
    original_percentage: Option<Decimal>,
) -> Result<(), PayrollError> {
    let Some(pct) = original_percentage else {
        return Ok(());
    };

    let expected = percentage_of(basic_salary, pct);
    if amount != expected {
        return Err(PayrollError::Validation(format!(
            "amount {amount} does not match {pct}% of basic salary {basic_salary} (expected {expected})"
        )));
    }
    Ok(())
}

pub fn validate_employee_id(raw: &str) -> Result<String, PayrollError> {
    let id = raw.trim();
    if id.is_empty() || id.len() > MAX_EMPLOYEE_ID_LEN {
        return Err(PayrollError::Validation(format!(
            "employee_id must be 1 to {MAX_EMPLOYEE_ID_LEN} characters"
        )));
    }
    Ok(id.to_string())
}

pub fn validate_component_name(raw: &str) -> Result<String, PayrollError> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > MAX_COMPONENT_NAME_LEN {
        return Err(PayrollError::Validation(format!(
            "component name must be 1 to {MAX_COMPONENT_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

pub fn validate_amount(field: &str, value: Decimal) -> Result<Decimal, PayrollError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(PayrollError::Validation(format!(
            "{field} must not be negative"
        )));
    }
    if value.normalize().scale() > 2 {
        return Err(PayrollError::Validation(format!(
            "{field} must have at most two fractional digits"
        )));
    }
    if value > MAX_MONEY {
        return Err(PayrollError::Validation(format!(
            "{field} must not exceed {MAX_MONEY}"
        )));
    }
    Ok(money(value))
}

pub fn validate_percentage(value: Option<Decimal>) -> Result<Option<Decimal>, PayrollError> {
    match value {
        Some(pct) if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED => Err(
            PayrollError::Validation("original_percentage must be between 0 and 100".into()),
        ),
        other => Ok(other.map(|p| p.normalize())),
    }
}
