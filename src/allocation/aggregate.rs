//! Cross-plant aggregation of split results.

use super::types::{AggregatedResult, AllocationResult};

/// Sums kWh per member across every role of every result.
///
/// A member appearing in several plants, or in several roles within one
/// plant, receives the sum of all its shares. An empty batch yields an empty
/// mapping.
pub fn aggregate(results: &[AllocationResult]) -> AggregatedResult {
    let mut aggregated = AggregatedResult::default();
    for result in results {
        for (_, share) in result.shares() {
            aggregated.add(&share.member, share.kwh);
        }
    }
    aggregated
}
