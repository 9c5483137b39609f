use crate::config::CompilerConfig;
use schema_model::ShapeId;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Name of the designated base group that absorbs too-widely-used shapes
pub const BASE_GROUP_NAME: &str = "Common";

/// A named, size-bounded partition of shapes keyed by shared operation
/// usage
#[derive(Debug, Clone, Serialize)]
pub struct Group {
    /// Monotonically increasing, first-seen group id; the base group is 0
    pub id: u32,

    /// Derived human-legible name
    pub name: String,

    /// Stable digest of the canonical operation-set key
    pub digest: u64,

    /// The operation-usage set this group is keyed by; empty for the base
    /// group
    pub operations: BTreeSet<ShapeId>,

    /// Shapes assigned to this group
    pub members: BTreeSet<ShapeId>,
}

/// Complete shape-to-group assignment for one compilation
#[derive(Debug)]
pub struct GroupAssignment {
    groups: Vec<Group>,
    assignment: BTreeMap<ShapeId, u32>,
}

impl GroupAssignment {
    /// All groups, base group first
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// The designated base group
    pub fn base_group(&self) -> &Group {
        &self.groups[0]
    }

    /// Group a shape was assigned to
    pub fn group_of(&self, id: &ShapeId) -> Option<&Group> {
        self.assignment
            .get(id)
            .map(|&index| &self.groups[index as usize])
    }

    /// Name of the group a shape was assigned to
    pub fn group_name_of(&self, id: &ShapeId) -> Option<&str> {
        self.group_of(id).map(|group| group.name.as_str())
    }

    /// Check whether two shapes landed in the same group
    pub fn same_group(&self, a: &ShapeId, b: &ShapeId) -> bool {
        match (self.assignment.get(a), self.assignment.get(b)) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }

    /// Reverse mapping: members of a group by name
    pub fn members_of(&self, name: &str) -> Option<&BTreeSet<ShapeId>> {
        self.groups
            .iter()
            .find(|group| group.name == name)
            .map(|group| &group.members)
    }

    /// Number of groups, including the base group
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check if only the base group exists
    pub fn is_empty(&self) -> bool {
        self.groups.len() <= 1
    }
}

/// Partitions shapes into bounded groups by their operation-usage sets
pub struct GroupPartitioner<'a> {
    config: &'a CompilerConfig,
}

impl<'a> GroupPartitioner<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self { config }
    }

    /// Assign every shape in the usage mapping to a group
    ///
    /// Shapes are considered in walk order, so operations register their
    /// own groups before the data shapes they reach. A shape joins the
    /// largest previously-registered usage set that is a superset of its
    /// own (within the cap); otherwise its own set registers a new group.
    /// Sets over the cap collapse into the base group.
    pub fn partition(
        &self,
        order: &[ShapeId],
        usage: &BTreeMap<ShapeId, BTreeSet<ShapeId>>,
    ) -> GroupAssignment {
        let cap = self.config.max_group_operations;
        let mut groups = vec![Group {
            id: 0,
            name: BASE_GROUP_NAME.to_string(),
            digest: usage_digest(&BTreeSet::new()),
            operations: BTreeSet::new(),
            members: BTreeSet::new(),
        }];
        let mut registered: Vec<u32> = Vec::new();
        let mut assignment = BTreeMap::new();

        // walk order first, then any stragglers in id order
        let ordered: Vec<&ShapeId> = order
            .iter()
            .filter(|shape| usage.contains_key(*shape))
            .chain(usage.keys().filter(|shape| !order.contains(*shape)))
            .collect();

        for shape in ordered {
            if assignment.contains_key(shape) {
                continue;
            }
            let operations = &usage[shape];
            let group_id = if operations.len() > cap {
                0
            } else {
                self.candidate_group(&groups, &registered, operations, cap)
                    .unwrap_or_else(|| {
                        let id = groups.len() as u32;
                        groups.push(Group {
                            id,
                            name: String::new(),
                            digest: usage_digest(operations),
                            operations: operations.clone(),
                            members: BTreeSet::new(),
                        });
                        registered.push(id);
                        id
                    })
            };
            groups[group_id as usize].members.insert(shape.clone());
            assignment.insert(shape.clone(), group_id);
        }

        self.name_groups(&mut groups);

        log::info!(
            "Partitioned {} shapes into {} groups ({} in the base group)",
            assignment.len(),
            groups.len(),
            groups[0].members.len()
        );

        GroupAssignment { groups, assignment }
    }

    /// Largest registered superset within the cap; ties go to the first
    /// registered
    fn candidate_group(
        &self,
        groups: &[Group],
        registered: &[u32],
        operations: &BTreeSet<ShapeId>,
        cap: usize,
    ) -> Option<u32> {
        let mut best: Option<u32> = None;
        for &id in registered {
            let candidate = &groups[id as usize].operations;
            if candidate.len() > cap || !candidate.is_superset(operations) {
                continue;
            }
            match best {
                Some(current) if groups[current as usize].operations.len() >= candidate.len() => {}
                _ => best = Some(id),
            }
        }
        best
    }

    fn name_groups(&self, groups: &mut [Group]) {
        let mut used: BTreeSet<String> = BTreeSet::new();
        used.insert(BASE_GROUP_NAME.to_string());

        for group in groups.iter_mut().skip(1) {
            let mut name = derive_group_name(&group.operations, self.config.min_phrase_len);
            if used.contains(&name) {
                name = format!("{}{}", name, group.id);
            }
            while used.contains(&name) {
                name.push('_');
            }
            used.insert(name.clone());
            group.name = name;
        }
    }
}

/// Stable digest over the canonical usage-set key
fn usage_digest(operations: &BTreeSet<ShapeId>) -> u64 {
    let mut hasher = Sha256::new();
    for operation in operations {
        hasher.update(operation.to_string().as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Single-operation groups are named after the operation; multi-operation
/// groups mine the most recurring common phrase across the operation
/// names
fn derive_group_name(operations: &BTreeSet<ShapeId>, min_phrase_len: usize) -> String {
    let names: Vec<&str> = operations.iter().map(|op| op.name.as_str()).collect();
    match names.as_slice() {
        [] => BASE_GROUP_NAME.to_string(),
        [single] => (*single).to_string(),
        _ => mine_common_phrase(&names, min_phrase_len)
            .unwrap_or_else(|| format!("{}Common", names[0])),
    }
}

/// Most frequently recurring word-aligned common substring across all
/// pairs of names; ties broken by first-encountered order
fn mine_common_phrase(names: &[&str], min_phrase_len: usize) -> Option<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();

    for (position, left) in names.iter().enumerate() {
        let phrases = word_aligned_phrases(left, min_phrase_len);
        for right in &names[position + 1..] {
            for phrase in &phrases {
                if !right.contains(phrase.as_str()) {
                    continue;
                }
                match counts.iter_mut().find(|(candidate, _)| candidate == phrase) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((phrase.clone(), 1)),
                }
            }
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (phrase, count) in counts {
        match &best {
            Some((_, best_count)) if *best_count >= count => {}
            _ => best = Some((phrase, count)),
        }
    }
    best.map(|(phrase, _)| phrase)
}

/// All substrings of a concatenated-word name that start with an
/// uppercase letter and end at the string boundary or immediately before
/// another uppercase letter or digit
fn word_aligned_phrases(name: &str, min_len: usize) -> Vec<String> {
    let chars: Vec<(usize, char)> = name.char_indices().collect();
    let mut starts = Vec::new();
    let mut ends = Vec::new();

    for (position, &(offset, c)) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            starts.push(offset);
        }
        if position > 0 && (c.is_ascii_uppercase() || c.is_ascii_digit()) {
            ends.push(offset);
        }
    }
    ends.push(name.len());

    let mut seen = HashSet::new();
    let mut phrases = Vec::new();
    for &start in &starts {
        for &end in &ends {
            if end <= start {
                continue;
            }
            let phrase = &name[start..end];
            if phrase.chars().count() >= min_len && seen.insert(phrase.to_string()) {
                phrases.push(phrase.to_string());
            }
        }
    }
    phrases
}
