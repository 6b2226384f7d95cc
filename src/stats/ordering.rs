//! Completion-order disorder metrics
//!
//! The input is the sequence of attempt numbers in the order their results
//! arrived. Perfect ordering is the ascending dispatch order.

use serde::{Deserialize, Serialize};

/// How far completion order strayed from dispatch order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingMetrics {
    /// Pairs (i, j) with i completing before j although i was dispatched after j
    pub inversions: u64,
    /// Length of the longest strictly increasing subsequence of completions
    pub lis_length: usize,
    /// Completions that would have to move to restore dispatch order (`n - lis_length`)
    pub lis_disorder: usize,
    /// Completions with an attempt number below one already seen
    pub out_of_order_count: usize,
}

impl OrderingMetrics {
    pub fn from_completion_order(order: &[u32]) -> Self {
        let lis_length = longest_increasing_subsequence(order);

        Self {
            inversions: count_inversions(order),
            lis_length,
            lis_disorder: order.len() - lis_length,
            out_of_order_count: out_of_order_count(order),
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.inversions == 0
    }
}

/// Number of inverted pairs, by merge sort in O(n log n)
pub fn count_inversions(order: &[u32]) -> u64 {
    fn sort_count(values: &mut [u32], scratch: &mut Vec<u32>) -> u64 {
        let len = values.len();
        if len < 2 {
            return 0;
        }

        let mid = len / 2;
        let mut inversions = sort_count(&mut values[..mid], scratch) + sort_count(&mut values[mid..], scratch);

        scratch.clear();
        let (mut i, mut j) = (0, mid);
        while i < mid && j < len {
            if values[i] <= values[j] {
                scratch.push(values[i]);
                i += 1;
            } else {
                // Every remaining left element is greater than values[j]
                inversions += (mid - i) as u64;
                scratch.push(values[j]);
                j += 1;
            }
        }
        scratch.extend_from_slice(&values[i..mid]);
        scratch.extend_from_slice(&values[j..]);
        values.copy_from_slice(scratch);

        inversions
    }

    let mut values = order.to_vec();
    let mut scratch = Vec::with_capacity(values.len());
    sort_count(&mut values, &mut scratch)
}

/// Longest strictly increasing subsequence length (patience sorting)
pub fn longest_increasing_subsequence(order: &[u32]) -> usize {
    let mut tails: Vec<u32> = Vec::new();

    for &value in order {
        match tails.binary_search(&value) {
            Ok(_) => {}
            Err(pos) if pos == tails.len() => tails.push(value),
            Err(pos) => tails[pos] = value,
        }
    }

    tails.len()
}

/// Completions arriving after a higher attempt number had already arrived
pub fn out_of_order_count(order: &[u32]) -> usize {
    let mut highest = None;
    let mut count = 0;

    for &value in order {
        match highest {
            Some(max) if value < max => count += 1,
            _ => highest = Some(value),
        }
    }

    count
}
