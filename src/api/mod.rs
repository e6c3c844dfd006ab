pub mod leave;
pub mod payroll;
