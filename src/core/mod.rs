pub mod accumulator;
pub mod engine;
pub mod formatter;
pub mod reducer;
pub mod run_loop;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::domain::model::{AuditOptions, AuditResult, PageRow};
pub use crate::domain::ports::{Auditor, ConfigProvider, Storage};
pub use crate::utils::error::Result;
