//! Two-tier duplicate grouping.
//!
//! Tier one groups photos whose content checksums are identical. Tier two
//! groups the remaining photos whose perceptual hashes lie within
//! `max_hamming_distance` bits of each other (inclusive).
//!
//! Near-duplicate clustering is greedy: photos are visited in id order and the
//! first unclaimed photo becomes a seed that claims every unclaimed photo
//! within the distance of the seed. The result depends only on the set of
//! candidates, never on input order.
//!
//! Candidate pairs are found by splitting the hash into `max_distance + 1`
//! bands. Two hashes within the distance differ in at most `max_distance`
//! bits, so at least one band is identical and the pair shares a bucket.
//! Bucketing therefore never drops a qualifying pair.

mod checksum;

pub use checksum::{ChecksumBasis, ContentChecksum};

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::DuplicatesConfig;
use crate::fingerprint::{BitHash, HASH_BITS};
use crate::pipeline::PhotoRecord;
use crate::types::PhotoId;

/// What the detector needs to know about one photo.
#[derive(Debug, Clone)]
pub struct DuplicateCandidate {
    pub id: PhotoId,
    pub checksum: ContentChecksum,
    pub perceptual_hash: BitHash,
}

impl DuplicateCandidate {
    pub fn from_record(record: &PhotoRecord, basis: ChecksumBasis) -> Self {
        Self {
            id: record.id.clone(),
            checksum: record.checksum(basis).clone(),
            perceptual_hash: record.fingerprint().perceptual_hash,
        }
    }
}

/// Why the members of a group belong together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchKind {
    /// Identical content checksum
    Exact { checksum: ContentChecksum },
    /// Perceptual hash within the distance of the seed (the first member).
    /// `max_distance` is the largest seed-to-member distance in the group.
    Near { max_distance: u32 },
}

/// A set of at least two photos judged to be copies of one another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub kind: MatchKind,
    /// Sorted by id
    pub members: Vec<PhotoId>,
}

impl DuplicateGroup {
    pub fn is_exact(&self) -> bool {
        matches!(self.kind, MatchKind::Exact { .. })
    }

    /// Members beyond the first, i.e. the copies a merge would retire.
    pub fn redundant(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Stable eight-hex-digit name: the checksum prefix for exact groups, a
    /// digest of the member ids for near groups.
    pub fn label(&self) -> String {
        match &self.kind {
            MatchKind::Exact { checksum } => checksum.short().to_string(),
            MatchKind::Near { .. } => {
                let joined = self
                    .members
                    .iter()
                    .map(PhotoId::as_str)
                    .collect::<Vec<_>>()
                    .join("\n");
                ContentChecksum::of_bytes(joined.as_bytes()).short().to_string()
            }
        }
    }
}

/// Groups exact and near-duplicate photos.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateDetector {
    max_distance: u32,
}

impl DuplicateDetector {
    pub fn new(config: &DuplicatesConfig) -> Self {
        Self {
            max_distance: config.max_hamming_distance,
        }
    }

    pub fn with_max_distance(max_distance: u32) -> Self {
        Self { max_distance }
    }

    pub fn max_distance(&self) -> u32 {
        self.max_distance
    }

    /// Group `candidates`. Photos without a match form no group. Groups are
    /// sorted by their first member. Repeated ids are considered once.
    pub fn detect(&self, candidates: &[DuplicateCandidate]) -> Vec<DuplicateGroup> {
        let mut ordered: Vec<&DuplicateCandidate> = candidates.iter().collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));
        ordered.dedup_by(|a, b| a.id == b.id);

        let mut groups = Vec::new();

        let mut by_checksum: BTreeMap<&ContentChecksum, Vec<&DuplicateCandidate>> = BTreeMap::new();
        for &candidate in &ordered {
            by_checksum.entry(&candidate.checksum).or_default().push(candidate);
        }

        let mut remaining = Vec::new();
        for (checksum, members) in by_checksum {
            if members.len() > 1 {
                tracing::debug!(
                    "Exact duplicate group {} ({} photos)",
                    checksum.short(),
                    members.len()
                );
                groups.push(DuplicateGroup {
                    kind: MatchKind::Exact {
                        checksum: checksum.clone(),
                    },
                    members: members.iter().map(|c| c.id.clone()).collect(),
                });
            } else {
                remaining.extend(members);
            }
        }
        remaining.sort_by(|a, b| a.id.cmp(&b.id));

        groups.extend(self.near_groups(&remaining));
        groups.sort_by(|a, b| a.members.cmp(&b.members));

        tracing::info!(
            "Found {} duplicate groups among {} photos",
            groups.len(),
            ordered.len()
        );
        groups
    }

    /// Greedy clustering over candidates sorted by id.
    fn near_groups(&self, sorted: &[&DuplicateCandidate]) -> Vec<DuplicateGroup> {
        let neighbours = self.neighbours(sorted);

        let mut claimed = vec![false; sorted.len()];
        let mut groups = Vec::new();
        for seed in 0..sorted.len() {
            if claimed[seed] {
                continue;
            }
            let mut members = vec![seed];
            members.extend(neighbours[seed].iter().copied().filter(|&j| !claimed[j]));
            if members.len() < 2 {
                continue;
            }

            let seed_hash = &sorted[seed].perceptual_hash;
            let max_distance = members[1..]
                .iter()
                .map(|&j| seed_hash.hamming(&sorted[j].perceptual_hash))
                .max()
                .unwrap_or(0);
            for &j in &members {
                claimed[j] = true;
            }
            members.sort_unstable();
            groups.push(DuplicateGroup {
                kind: MatchKind::Near { max_distance },
                members: members.iter().map(|&j| sorted[j].id.clone()).collect(),
            });
        }
        groups
    }

    /// For each candidate, the sorted indices of all others within the distance.
    fn neighbours(&self, sorted: &[&DuplicateCandidate]) -> Vec<Vec<usize>> {
        let bands = (self.max_distance as usize + 1).min(HASH_BITS);
        let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
        for band in 0..bands {
            let start = band * HASH_BITS / bands;
            let end = (band + 1) * HASH_BITS / bands;
            let mut buckets: HashMap<BitHash, Vec<usize>> = HashMap::new();
            for (i, candidate) in sorted.iter().enumerate() {
                buckets
                    .entry(candidate.perceptual_hash.masked(start, end))
                    .or_default()
                    .push(i);
            }
            for bucket in buckets.values().filter(|b| b.len() > 1) {
                for (k, &i) in bucket.iter().enumerate() {
                    for &j in &bucket[k + 1..] {
                        pairs.insert((i, j));
                    }
                }
            }
        }

        let pairs: Vec<(usize, usize)> = pairs.into_iter().collect();
        let max_distance = self.max_distance;
        let matching: Vec<(usize, usize)> = pairs
            .into_par_iter()
            .filter(|&(i, j)| {
                sorted[i].perceptual_hash.hamming(&sorted[j].perceptual_hash) <= max_distance
            })
            .collect();
        tracing::trace!("{} near-duplicate pairs verified", matching.len());

        let mut neighbours = vec![Vec::new(); sorted.len()];
        for (i, j) in matching {
            neighbours[i].push(j);
            neighbours[j].push(i);
        }
        for list in &mut neighbours {
            list.sort_unstable();
        }
        neighbours
    }
}
