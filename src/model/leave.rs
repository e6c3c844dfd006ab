use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::error::PayrollError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LeaveBucket {
    Casual,
    Sick,
    Earned,
    Other,
}

impl LeaveBucket {
    /// Free-text leave type to bucket; casing and surrounding blanks are ignored.
    pub fn from_leave_type(raw: &str) -> Self {
        match LeaveBucket::from_str(raw.trim()) {
            Ok(bucket) => bucket,
            Err(_) => LeaveBucket::Other,
        }
    }
}

/// `leave_management` row as the ledger reads it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LeaveRecord {
    pub employee_id: String,
    pub leave_type: String,
    pub status: String,
}

impl LeaveRecord {
    pub fn status(&self) -> Option<LeaveStatus> {
        LeaveStatus::from_str(self.status.trim()).ok()
    }

    pub fn bucket(&self) -> LeaveBucket {
        LeaveBucket::from_leave_type(&self.leave_type)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({"casual": 1, "sick": 2, "earned": 1, "other": 0}))]
pub struct LeaveUsage {
    pub casual: i64,
    pub sick: i64,
    pub earned: i64,
    pub other: i64,
}

impl LeaveUsage {
    /// Counts APPROVED records per bucket; every other status is ignored.
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a LeaveRecord>) -> Self {
        let mut usage = Self::default();
        for record in records {
            if record.status() == Some(LeaveStatus::Approved) {
                *usage.slot(record.bucket()) += 1;
            }
        }
        usage
    }

    pub fn get(&self, bucket: LeaveBucket) -> i64 {
        match bucket {
            LeaveBucket::Casual => self.casual,
            LeaveBucket::Sick => self.sick,
            LeaveBucket::Earned => self.earned,
            LeaveBucket::Other => self.other,
        }
    }

    fn slot(&mut self, bucket: LeaveBucket) -> &mut i64 {
        match bucket {
            LeaveBucket::Casual => &mut self.casual,
            LeaveBucket::Sick => &mut self.sick,
            LeaveBucket::Earned => &mut self.earned,
            LeaveBucket::Other => &mut self.other,
        }
    }
}

/// Days granted per bucket. `other` is never entitled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Entitlements {
    pub casual: i64,
    pub sick: i64,
    pub earned: i64,
}

impl Default for Entitlements {
    fn default() -> Self {
        Self {
            casual: 12,
            sick: 10,
            earned: 15,
        }
    }
}

impl Entitlements {
    /// Parses `casual:12,sick:10,earned:15`; buckets left out keep `self`'s value.
    pub fn overridden_by(&self, raw: &str) -> Result<Self, PayrollError> {
        let mut result = *self;

        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once(':').ok_or_else(|| {
                PayrollError::Validation(format!("entitlement '{part}' must look like casual:12"))
            })?;

            let days: i64 = value.trim().parse().map_err(|_| {
                PayrollError::Validation(format!("entitlement '{part}' has a non-numeric value"))
            })?;
            if days < 0 {
                return Err(PayrollError::Validation(format!(
                    "entitlement '{part}' must not be negative"
                )));
            }

            match LeaveBucket::from_str(key.trim()) {
                Ok(LeaveBucket::Casual) => result.casual = days,
                Ok(LeaveBucket::Sick) => result.sick = days,
                Ok(LeaveBucket::Earned) => result.earned = days,
                _ => {
                    return Err(PayrollError::Validation(format!(
                        "unknown entitlement bucket '{}'",
                        key.trim()
                    )));
                }
            }
        }

        Ok(result)
    }

    pub fn get(&self, bucket: LeaveBucket) -> i64 {
        match bucket {
            LeaveBucket::Casual => self.casual,
            LeaveBucket::Sick => self.sick,
            LeaveBucket::Earned => self.earned,
            LeaveBucket::Other => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct BucketBalance {
    pub entitlement: i64,
    pub used: i64,
    pub remaining: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({
    "employee_id": "EMP004",
    "casual": {"entitlement": 12, "used": 1, "remaining": 11},
    "sick": {"entitlement": 10, "used": 2, "remaining": 8},
    "earned": {"entitlement": 15, "used": 1, "remaining": 14},
    "other": {"entitlement": 0, "used": 0, "remaining": 0}
}))]
pub struct LeaveBalance {
    pub employee_id: String,
    pub casual: BucketBalance,
    pub sick: BucketBalance,
    pub earned: BucketBalance,
    pub other: BucketBalance,
}

impl LeaveBalance {
    pub fn compute(employee_id: &str, usage: &LeaveUsage, entitlements: &Entitlements) -> Self {
        let bucket = |b: LeaveBucket| {
            let entitlement = entitlements.get(b);
            let used = usage.get(b);
            BucketBalance {
                entitlement,
                used,
                remaining: (entitlement - used).max(0),
            }
        };

        Self {
            employee_id: employee_id.to_string(),
            casual: bucket(LeaveBucket::Casual),
            sick: bucket(LeaveBucket::Sick),
            earned: bucket(LeaveBucket::Earned),
            other: bucket(LeaveBucket::Other),
        }
    }
}
