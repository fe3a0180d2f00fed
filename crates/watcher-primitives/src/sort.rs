//! Deterministic merge-and-sort for both nomination flavors.
//!
//! Nominations merge by pubkey (summing counts), then sort by count
//! descending with ties broken by pubkey ascending. That tie-break is
//! implemented as a two-pass *stable* sort — ascending pubkey first, then
//! stable descending count — rather than a single comparator, so the
//! ordering is exercised the same way a reader would reason about it: two
//! independent builds over the same input multiset must produce
//! byte-identical output.

use std::collections::HashMap;

use crate::{
    block::MainchainBlock,
    nomination::{CcNomination, Nomination},
};

pub fn merge_nominations(blocks: &[&MainchainBlock]) -> Vec<Nomination> {
    let mut counts: HashMap<_, u64> = HashMap::new();
    for block in blocks {
        for nom in &block.nominations {
            *counts.entry(nom.pubkey).or_insert(0) += nom.count;
        }
    }

    let mut merged: Vec<_> = counts.into_iter().collect();
    merged.sort_by(|a, b| a.0.cmp(&b.0));
    merged.sort_by(|a, b| b.1.cmp(&a.1));

    merged
        .into_iter()
        .map(|(pubkey, count)| Nomination { pubkey, count })
        .collect()
}

pub fn merge_cc_nominations(blocks: &[&MainchainBlock]) -> Vec<CcNomination> {
    let mut counts: HashMap<_, (u64, Vec<u8>)> = HashMap::new();
    for block in blocks {
        for nom in &block.cc_nominations {
            let entry = counts
                .entry(nom.pubkey)
                .or_insert_with(|| (0, nom.metadata.clone()));
            entry.0 += nom.count;
            entry.1 = nom.metadata.clone();
        }
    }

    let mut merged: Vec<_> = counts.into_iter().collect();
    merged.sort_by(|a, b| a.0.cmp(&b.0));
    merged.sort_by(|a, b| b.1 .0.cmp(&a.1 .0));

    merged
        .into_iter()
        .map(|(pubkey, (count, metadata))| CcNomination {
            pubkey,
            count,
            metadata,
        })
        .collect()
}
