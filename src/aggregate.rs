//! Sum aggregation over observed image counts.
//!
//! This module derives synthetic entities whose count is the sum of the
//! latest counts of a named group of images. Sums are fed back through
//! the history store like any other entity.

use crate::models::{ImageCount, SumSpec};
use std::collections::HashMap;

/// Namespace prefix for derived sum entities, so report consumers can
/// separate raw images from sums.
pub const SUM_PREFIX: &str = "SUM/";

/// Compute the summed count of a group.
///
/// Members without an observed count contribute 0: a sum referencing a
/// not-yet-observed image must not abort the run. An empty member list
/// yields 0.
pub fn compute_group_count(members: &[String], latest: &HashMap<String, u64>) -> u64 {
    members
        .iter()
        .filter_map(|name| latest.get(name))
        .sum()
}

/// Resolve every configured sum into a derived [`ImageCount`] with a
/// `SUM/`-prefixed name.
///
/// Must run only after all raw images have been resolved, so that
/// `latest` holds every count observed this run.
pub fn resolve_sums(sums: &[SumSpec], latest: &HashMap<String, u64>) -> Vec<ImageCount> {
    sums.iter()
        .map(|sum| ImageCount {
            name: format!("{}{}", SUM_PREFIX, sum.name),
            count: compute_group_count(&sum.images, latest),
        })
        .collect()
}
