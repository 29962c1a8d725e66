//! Section-level Merkle tree over the canonical document fields.
//!
//! The flat fingerprint says *whether* a document changed; the Merkle tree
//! says *which canonical section* changed, and lets a single section be proven
//! against a root without shipping the rest of the document.
//!
//! | Item | Definition |
//! |------|------------|
//! | leaf | `sha256("leaf:" + canonical JSON of the section)` |
//! | node | `sha256("node:{left}:{right}")` over hex children |
//! | odd level | last hash is duplicated |
//!
//! Leaves follow [`CanonicalSection::ALL`] order, which matches the order of
//! the flat fingerprint.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::IdentityDocument;
use crate::error::IdentityResult;
use crate::integrity::{compute_fingerprint, sha256_hex};

/// A canonical section of an identity document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalSection {
    /// `id`, `name`, `version` and `origin_tags`.
    Header,
    Values,
    BehavioralPatterns,
    KnowledgeDomains,
    CommunicationStyle,
    EthicalCommitments,
}

impl CanonicalSection {
    pub const ALL: [CanonicalSection; 6] = [
        CanonicalSection::Header,
        CanonicalSection::Values,
        CanonicalSection::BehavioralPatterns,
        CanonicalSection::KnowledgeDomains,
        CanonicalSection::CommunicationStyle,
        CanonicalSection::EthicalCommitments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalSection::Header => "header",
            CanonicalSection::Values => "values",
            CanonicalSection::BehavioralPatterns => "behavioral_patterns",
            CanonicalSection::KnowledgeDomains => "knowledge_domains",
            CanonicalSection::CommunicationStyle => "communication_style",
            CanonicalSection::EthicalCommitments => "ethical_commitments",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    fn canonical_json(&self, doc: &IdentityDocument) -> IdentityResult<Vec<u8>> {
        let bytes = match self {
            CanonicalSection::Header => serde_json::to_vec(&(
                &doc.id,
                &doc.name,
                doc.version,
                &doc.origin_tags,
            ))?,
            CanonicalSection::Values => serde_json::to_vec(&doc.values)?,
            CanonicalSection::BehavioralPatterns => serde_json::to_vec(&doc.behavioral_patterns)?,
            CanonicalSection::KnowledgeDomains => serde_json::to_vec(&doc.knowledge_domains)?,
            CanonicalSection::CommunicationStyle => serde_json::to_vec(&doc.communication_style)?,
            CanonicalSection::EthicalCommitments => serde_json::to_vec(&doc.ethical_commitments)?,
        };
        Ok(bytes)
    }
}

impl fmt::Display for CanonicalSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the path a sibling hash sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingSide {
    Left,
    Right,
}

/// Proof that one section's leaf hash belongs under `root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub section: CanonicalSection,
    pub leaf_hash: String,
    pub siblings: Vec<(String, SiblingSide)>,
    pub root: String,
}

impl MerkleProof {
    /// Fold the sibling path and compare against the root.
    pub fn verify(&self) -> bool {
        let folded = self
            .siblings
            .iter()
            .fold(self.leaf_hash.clone(), |current, (sibling, side)| match side {
                SiblingSide::Right => node_hash(&current, sibling),
                SiblingSide::Left => node_hash(sibling, &current),
            });
        folded == self.root
    }

    /// Also checks that `doc`'s section hashes to the proven leaf.
    pub fn verify_against(&self, doc: &IdentityDocument) -> bool {
        match section_leaf(doc, self.section) {
            Ok(leaf) => leaf == self.leaf_hash && self.verify(),
            Err(_) => false,
        }
    }
}

/// Compact integrity summary stored next to a persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub fingerprint: String,
    pub merkle_root: String,
    pub section_count: usize,
}

fn leaf_hash(canonical: &[u8]) -> String {
    let mut data = Vec::with_capacity(canonical.len() + 5);
    data.extend_from_slice(b"leaf:");
    data.extend_from_slice(canonical);
    sha256_hex(&data)
}

fn node_hash(left: &str, right: &str) -> String {
    sha256_hex(format!("node:{}:{}", left, right).as_bytes())
}

pub fn section_leaf(doc: &IdentityDocument, section: CanonicalSection) -> IdentityResult<String> {
    Ok(leaf_hash(&section.canonical_json(doc)?))
}

/// Leaf hashes in [`CanonicalSection::ALL`] order.
pub fn section_leaves(doc: &IdentityDocument) -> IdentityResult<Vec<(CanonicalSection, String)>> {
    CanonicalSection::ALL
        .iter()
        .map(|s| section_leaf(doc, *s).map(|h| (*s, h)))
        .collect()
}

fn next_level(level: &[String]) -> Vec<String> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => node_hash(left, right),
            [single] => node_hash(single, single),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

fn build_root(mut level: Vec<String>) -> String {
    while level.len() > 1 {
        level = next_level(&level);
    }
    level.pop().unwrap_or_default()
}

pub fn merkle_root(doc: &IdentityDocument) -> IdentityResult<String> {
    let leaves = section_leaves(doc)?;
    Ok(build_root(leaves.into_iter().map(|(_, h)| h).collect()))
}

/// Build the sibling path from `section`'s leaf to the root.
pub fn prove_section(doc: &IdentityDocument, section: CanonicalSection) -> IdentityResult<MerkleProof> {
    let mut level: Vec<String> = section_leaves(doc)?.into_iter().map(|(_, h)| h).collect();
    let mut index = section.index();
    let leaf = level[index].clone();
    let mut siblings = Vec::new();

    while level.len() > 1 {
        let sibling_index = index ^ 1;
        let sibling = level
            .get(sibling_index)
            .cloned()
            .unwrap_or_else(|| level[index].clone());
        let side = if index % 2 == 0 {
            SiblingSide::Right
        } else {
            SiblingSide::Left
        };
        siblings.push((sibling, side));
        level = next_level(&level);
        index /= 2;
    }

    Ok(MerkleProof {
        section,
        leaf_hash: leaf,
        siblings,
        root: level.pop().unwrap_or_default(),
    })
}

/// Sections whose canonical content differs between two documents.
pub fn changed_sections(
    before: &IdentityDocument,
    after: &IdentityDocument,
) -> IdentityResult<Vec<CanonicalSection>> {
    let left = section_leaves(before)?;
    let right = section_leaves(after)?;
    let changed: Vec<CanonicalSection> = left
        .into_iter()
        .zip(right)
        .filter(|((_, a), (_, b))| a != b)
        .map(|((s, _), _)| s)
        .collect();
    debug!(
        target: "ipseity::integrity",
        id = %after.id,
        changed = changed.len(),
        "Section diff computed"
    );
    Ok(changed)
}

pub fn integrity_manifest(doc: &IdentityDocument) -> IdentityResult<IntegrityManifest> {
    Ok(IntegrityManifest {
        fingerprint: compute_fingerprint(doc)?,
        merkle_root: merkle_root(doc)?,
        section_count: CanonicalSection::ALL.len(),
    })
}
