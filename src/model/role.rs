use strum::{AsRefStr, Display};

/// Role id carried in the access token's `role` claim.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, AsRefStr)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    System = 4,
    ApiUser = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::System),
            5 => Some(Role::ApiUser),
            _ => None,
        }
    }

    /// May change payroll records and read any employee's data.
    pub fn manages_payroll(self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for role in [Role::Admin, Role::Hr, Role::Employee, Role::System, Role::ApiUser] {
            assert_eq!(Role::from_id(role as u8), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(6), None);
    }

    #[test]
    fn only_admin_and_hr_manage_payroll() {
        assert!(Role::Admin.manages_payroll());
        assert!(Role::Hr.manages_payroll());
        assert!(!Role::Employee.manages_payroll());
        assert!(!Role::System.manages_payroll());
        assert!(!Role::ApiUser.manages_payroll());
    }
}
