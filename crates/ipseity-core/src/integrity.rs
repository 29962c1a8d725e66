//! Canonical fingerprints (documents) and checksums (snapshots).
//!
//! ## Canonical form
//!
//! The document fingerprint covers, in this order: `id`, `name`, `version`,
//! `origin_tags`, `values`, `behavioral_patterns`, `knowledge_domains`,
//! `communication_style`, `ethical_commitments`. The fingerprint itself and
//! both timestamps are excluded, so re-sealing or touching `updated_at` never
//! changes the digest.
//!
//! Serialization is compact JSON. Maps and sets are `BTreeMap`/`BTreeSet`,
//! which fixes key order; struct fields serialize in declaration order.
//! The digest is SHA-256, hex-encoded (64 chars).
//!
//! A snapshot checksum covers every snapshot field except `checksum`.
//!
//! Verification returns `bool`: a mismatch is an integrity *signal*, not an
//! error, and callers decide whether it is fatal.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::document::{
    BehavioralPattern, CommunicationStyle, EthicalCommitment, IdentityDocument, KnowledgeDomain,
};
use crate::error::IdentityResult;
use crate::snapshot::{ActiveGoal, StateSnapshot, WorkingMemoryItem};

#[derive(Serialize)]
struct CanonicalIdentity<'a> {
    id: &'a str,
    name: &'a str,
    version: u64,
    origin_tags: &'a [String],
    values: &'a BTreeMap<String, String>,
    behavioral_patterns: &'a [BehavioralPattern],
    knowledge_domains: &'a [KnowledgeDomain],
    communication_style: &'a CommunicationStyle,
    ethical_commitments: &'a [EthicalCommitment],
}

impl<'a> From<&'a IdentityDocument> for CanonicalIdentity<'a> {
    fn from(doc: &'a IdentityDocument) -> Self {
        Self {
            id: &doc.id,
            name: &doc.name,
            version: doc.version,
            origin_tags: &doc.origin_tags,
            values: &doc.values,
            behavioral_patterns: &doc.behavioral_patterns,
            knowledge_domains: &doc.knowledge_domains,
            communication_style: &doc.communication_style,
            ethical_commitments: &doc.ethical_commitments,
        }
    }
}

#[derive(Serialize)]
struct CanonicalSnapshot<'a> {
    document_id: &'a str,
    captured_at: &'a DateTime<Utc>,
    active_goals: &'a [ActiveGoal],
    recent_decisions: &'a [String],
    working_memory: &'a [WorkingMemoryItem],
    open_questions: &'a [String],
    summary: &'a Option<String>,
    emotional_tone: &'a Option<String>,
}

impl<'a> From<&'a StateSnapshot> for CanonicalSnapshot<'a> {
    fn from(s: &'a StateSnapshot) -> Self {
        Self {
            document_id: &s.document_id,
            captured_at: &s.captured_at,
            active_goals: &s.active_goals,
            recent_decisions: &s.recent_decisions,
            working_memory: &s.working_memory,
            open_questions: &s.open_questions,
            summary: &s.summary,
            emotional_tone: &s.emotional_tone,
        }
    }
}

/// Hex SHA-256 of the compact JSON encoding of `value`.
pub fn digest_json<T: Serialize + ?Sized>(value: &T) -> IdentityResult<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(sha256_hex(&bytes))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// First 12 chars of a digest for log fields; stored values may be corrupt.
fn digest_prefix(digest: &str) -> &str {
    digest
        .char_indices()
        .nth(12)
        .map_or(digest, |(end, _)| &digest[..end])
}

/// Digest over the canonical document fields.
pub fn compute_fingerprint(doc: &IdentityDocument) -> IdentityResult<String> {
    digest_json(&CanonicalIdentity::from(doc))
}

/// `false` when the fingerprint is absent or does not match.
pub fn verify_fingerprint(doc: &IdentityDocument) -> bool {
    let Some(stored) = doc.fingerprint.as_deref() else {
        return false;
    };
    match compute_fingerprint(doc) {
        Ok(computed) if computed == stored => true,
        Ok(computed) => {
            warn!(
                target: "ipseity::integrity",
                id = %doc.id,
                version = doc.version,
                stored = digest_prefix(stored),
                computed = digest_prefix(&computed),
                "Fingerprint mismatch"
            );
            false
        }
        Err(e) => {
            warn!(target: "ipseity::integrity", id = %doc.id, error = %e, "Fingerprint recompute failed");
            false
        }
    }
}

/// Digest over every snapshot field except the checksum.
pub fn compute_checksum(snapshot: &StateSnapshot) -> IdentityResult<String> {
    digest_json(&CanonicalSnapshot::from(snapshot))
}

/// `false` when the checksum is absent or does not match.
pub fn verify_checksum(snapshot: &StateSnapshot) -> bool {
    let Some(stored) = snapshot.checksum.as_deref() else {
        return false;
    };
    match compute_checksum(snapshot) {
        Ok(computed) if computed == stored => true,
        Ok(_) => {
            warn!(
                target: "ipseity::integrity",
                document_id = %snapshot.document_id,
                "Snapshot checksum mismatch"
            );
            false
        }
        Err(e) => {
            warn!(
                target: "ipseity::integrity",
                document_id = %snapshot.document_id,
                error = %e,
                "Snapshot checksum recompute failed"
            );
            false
        }
    }
}
