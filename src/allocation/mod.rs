/// Per-member totals across plants.
pub mod aggregate;
/// Multi-plant calculation run for a community and period.
pub mod run;
pub mod split;
pub mod types;
