pub mod component_log;
pub mod leave;
pub mod payroll;
pub mod role;
