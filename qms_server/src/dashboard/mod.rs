//! Cross-module dashboard figures.

pub mod kpi;
pub mod pareto;
