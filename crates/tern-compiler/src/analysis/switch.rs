// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Switch dispatch descriptors and the table-vs-lookup cost model.

use serde::Serialize;

/// The two multi-way dispatch encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DispatchKind {
    /// Dense jump table indexed by `selector - lo`
    Table,
    /// Sorted (value, target) pairs
    Lookup,
}

/// Estimated space and time of both encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchCost {
    /// Table size in words
    pub table_space: i64,
    /// Table dispatch steps
    pub table_time: i64,
    /// Lookup size in words
    pub lookup_space: i64,
    /// Lookup dispatch steps
    pub lookup_time: i64,
}

impl DispatchCost {
    /// Costs for case values spanning `lo..=hi` with `n_labels` labels.
    pub fn estimate(lo: i32, hi: i32, n_labels: usize) -> Self {
        let n = n_labels as i64;
        Self {
            table_space: 5 + i64::from(hi) - i64::from(lo),
            table_time: 3,
            lookup_space: 3 + 2 * n,
            lookup_time: n,
        }
    }

    /// Time is weighted three times as heavily as space.
    pub fn table_wins(&self) -> bool {
        self.table_space + 3 * self.table_time <= self.lookup_space + 3 * self.lookup_time
    }
}

impl DispatchKind {
    /// Picks an encoding. A switch without case labels always uses a lookup.
    pub fn choose(lo: i32, hi: i32, n_labels: usize) -> Self {
        if n_labels > 0 && DispatchCost::estimate(lo, hi, n_labels).table_wins() {
            DispatchKind::Table
        } else {
            DispatchKind::Lookup
        }
    }
}

/// How one switch dispatches its selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchDispatch {
    /// Smallest case value (0 without cases)
    pub lo: i32,
    /// Largest case value (0 without cases)
    pub hi: i32,
    /// Number of case labels, default excluded
    pub n_labels: usize,
    /// (case value, group index) in source order
    pub cases: Vec<(i32, usize)>,
    /// Group holding `default:`
    pub default_group: Option<usize>,
    /// Chosen encoding
    pub kind: DispatchKind,
}

impl SwitchDispatch {
    /// Builds the descriptor from distinct case values.
    pub fn new(cases: Vec<(i32, usize)>, default_group: Option<usize>) -> Self {
        let lo = cases.iter().map(|(v, _)| *v).min().unwrap_or(0);
        let hi = cases.iter().map(|(v, _)| *v).max().unwrap_or(0);
        let n_labels = cases.len();
        let kind = DispatchKind::choose(lo, hi, n_labels);
        let cost = DispatchCost::estimate(lo, hi, n_labels);
        tracing::debug!(
            lo,
            hi,
            n_labels,
            table = cost.table_space + 3 * cost.table_time,
            lookup = cost.lookup_space + 3 * cost.lookup_time,
            ?kind,
            "switch dispatch chosen"
        );
        Self {
            lo,
            hi,
            n_labels,
            cases,
            default_group,
            kind,
        }
    }

    /// Group selected by `value`, or `None` to fall to default/end.
    pub fn group_for(&self, value: i32) -> Option<usize> {
        self.cases.iter().find(|(v, _)| *v == value).map(|(_, g)| *g)
    }
}
