pub mod audits;
pub mod publications;
