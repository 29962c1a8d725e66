//! ipseity-core: the identity data model and its integrity substrate.
//!
//! - [`IdentityDocument`] / [`StateSnapshot`] with builders, validation and
//!   immutable bump/merge.
//! - Canonical SHA-256 fingerprints and snapshot checksums ([`integrity`]),
//!   plus a section-level Merkle tree ([`merkle`]) that localizes tampering.
//! - Similarity primitives ([`similarity`]) used by the drift analyzers and
//!   the consistency probes.
//! - Threshold configuration ([`IpseityConfig`]) and the shared error type.

mod config;
mod document;
mod error;
pub mod integrity;
pub mod merkle;
pub mod similarity;
mod snapshot;

pub use config::{ContinuityConfig, DriftConfig, IpseityConfig};
pub use document::{
    slugify, Absoluteness, BehavioralPattern, CommunicationStyle, EthicalCommitment,
    IdentityDelta, IdentityDocument, IdentityDocumentBuilder, KnowledgeDomain, Proficiency,
    Verbosity,
};
pub use error::{IdentityError, IdentityResult};
pub use integrity::{compute_checksum, compute_fingerprint, verify_checksum, verify_fingerprint};
pub use merkle::{
    changed_sections, integrity_manifest, merkle_root, prove_section, CanonicalSection,
    IntegrityManifest, MerkleProof, SiblingSide,
};
pub use snapshot::{ActiveGoal, GoalPriority, StateSnapshot, StateSnapshotBuilder, WorkingMemoryItem};
