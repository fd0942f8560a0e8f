//! Bounded recursive search for a value reachable through pointer hops
//!
//! Starting from a root address, each visited record window is scanned at a
//! fixed alignment for a caller-supplied byte predicate; 8-byte-aligned
//! slots that look like valid pointers are followed recursively. The walk
//! is bounded by a depth limit, a visited set and the finite window size.

use super::source::MemoryRead;
use crate::core::types::{Addr, MemSize};
use std::collections::HashSet;

/// A found path: the byte offsets to apply from the root, one per hop,
/// ending at the matching offset. Feeding the path into a pointer-chain
/// read with the final offset left undereferenced reproduces the hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub path: Vec<MemSize>,
}

/// Configuration for a recursive value search
pub struct Searcher<F: Fn(&[u8]) -> bool> {
    max_struct_size: MemSize,
    max_depth: usize,
    min_alignment: u64,
    predicate: F,
}

impl<F: Fn(&[u8]) -> bool> Searcher<F> {
    /// Creates a searcher with the given predicate and default bounds:
    /// 256-byte windows, depth 3, 4-byte alignment
    pub fn new(predicate: F) -> Self {
        Searcher {
            max_struct_size: MemSize::new(256),
            max_depth: 3,
            min_alignment: 4,
            predicate,
        }
    }

    /// Sets the record window size read at each visited address
    pub fn with_max_struct_size(mut self, size: MemSize) -> Self {
        self.max_struct_size = size;
        self
    }

    /// Sets the maximum recursion depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the scan stride within each window
    pub fn with_min_alignment(mut self, alignment: u64) -> Self {
        self.min_alignment = alignment.max(1);
        self
    }

    /// Walks the pointer graph from `base` and collects every path whose
    /// final offset satisfies the predicate
    pub fn run<S: MemoryRead + ?Sized>(&self, source: &S, base: Addr) -> Vec<SearchHit> {
        let mut results = Vec::new();
        let mut visited = HashSet::new();
        self.visit(source, base, 0, &[], &mut visited, &mut results);
        results
    }

    fn visit<S: MemoryRead + ?Sized>(
        &self,
        source: &S,
        addr: Addr,
        depth: usize,
        path: &[MemSize],
        visited: &mut HashSet<Addr>,
        results: &mut Vec<SearchHit>,
    ) {
        if depth > self.max_depth || !visited.insert(addr) {
            return;
        }

        // best effort: a short or failed read terminates this branch
        let Ok(data) = source.read_bytes(addr, self.max_struct_size) else {
            return;
        };

        let mut offset = 0u64;
        while offset < self.max_struct_size.as_u64() {
            let at = offset as usize;
            if at >= data.len() {
                break;
            }

            if (self.predicate)(&data[at..]) {
                let mut hit = path.to_vec();
                hit.push(MemSize::new(offset));
                results.push(SearchHit { path: hit });
            }

            if offset % 8 == 0 && depth < self.max_depth && at + 8 <= data.len() {
                let candidate = Addr::new(u64::from_le_bytes(
                    data[at..at + 8].try_into().unwrap_or_default(),
                ));
                if !candidate.is_null() && source.is_valid_address(candidate) {
                    let mut next = path.to_vec();
                    next.push(MemSize::new(offset));
                    self.visit(source, candidate, depth + 1, &next, visited, results);
                }
            }

            offset += self.min_alignment;
        }
    }
}

/// Builds a searcher matching the little-endian encoding of `value`
pub fn search_for_bytes(value: Vec<u8>) -> Searcher<impl Fn(&[u8]) -> bool> {
    Searcher::new(move |data: &[u8]| data.len() >= value.len() && data[..value.len()] == value[..])
}
