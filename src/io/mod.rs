/// CSV export of calculation results.
pub mod export;
