//! CSV export for calculation results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::allocation::types::{AggregatedResult, AllocationResult};

/// Column header for per-member totals.
const MEMBERS_HEADER: [&str; 2] = ["member_id", "total_kwh"];

/// Column header for per-plant shares.
const SHARES_HEADER: [&str; 4] = ["plant_id", "role", "member_id", "kwh"];

/// Exports aggregated member totals to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_members_csv(members: &AggregatedResult, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_members_csv(members, io::BufWriter::new(file))
}

/// Writes member totals as CSV, one row per member in member-id order.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_members_csv(members: &AggregatedResult, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(MEMBERS_HEADER)?;
    for (member, kwh) in members.iter() {
        let kwh = format!("{kwh:.6}");
        wtr.write_record([member.as_str(), kwh.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Exports every plant's member shares to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_shares_csv(results: &[AllocationResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_shares_csv(results, io::BufWriter::new(file))
}

/// Writes per-plant shares as CSV, in result order then role order.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_shares_csv(results: &[AllocationResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SHARES_HEADER)?;
    for result in results {
        for (role, share) in result.shares() {
            let role = role.to_string();
            let kwh = format!("{:.6}", share.kwh);
            wtr.write_record([
                result.plant_id.as_str(),
                role.as_str(),
                share.member.as_str(),
                kwh.as_str(),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}
