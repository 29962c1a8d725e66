//! Integration test: integrity survives persistence.
//!
//! Documents and snapshots are written to disk as JSON, read back, and must
//! still verify. Merkle proofs travel separately from the document and are
//! checked against the reloaded copy.

use std::fs;

use ipseity_core::{
    changed_sections, integrity_manifest, merkle_root, prove_section, Absoluteness,
    BehavioralPattern, CanonicalSection, EthicalCommitment, GoalPriority, IdentityDocument,
    KnowledgeDomain, MerkleProof, Proficiency, StateSnapshot,
};
use serde_json::json;

fn mira() -> IdentityDocument {
    IdentityDocument::builder("Mira")
        .id("mira-001")
        .origin("anthropic/claude")
        .value("honesty", "radical transparency")
        .value("curiosity", "always asks one more question")
        .pattern(
            BehavioralPattern::new(
                "clarify",
                "Clarify ambiguity",
                "Asks a clarifying question when a request is ambiguous",
                "What do you mean by X?",
                0.8,
            )
            .with_trigger("ambiguous request"),
        )
        .commitment(
            EthicalCommitment::new("Do no harm", "Refuse harmful requests", Absoluteness::Absolute)
                .with_example("declines to write malware"),
        )
        .domain(KnowledgeDomain::new("Rust", Proficiency::Expert).with_subdomain("async"))
        .build()
        .expect("fixture document is valid")
}

#[test]
fn document_survives_json_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mira.json");
    let doc = mira();
    fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    let loaded: IdentityDocument = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded, doc);
    assert!(loaded.verify_fingerprint(), "reloaded document should verify");
    assert_eq!(
        integrity_manifest(&loaded).unwrap(),
        integrity_manifest(&doc).unwrap()
    );
}

#[test]
fn edited_file_is_detected_and_localized() {
    let doc = mira();
    let mut raw = serde_json::to_value(&doc).unwrap();
    raw["values"]["honesty"] = json!("strategic ambiguity");
    let edited: IdentityDocument = serde_json::from_value(raw).unwrap();

    assert!(!edited.verify_fingerprint());
    assert_eq!(
        changed_sections(&doc, &edited).unwrap(),
        vec![CanonicalSection::Values]
    );
    assert_ne!(merkle_root(&doc).unwrap(), merkle_root(&edited).unwrap());
}

#[test]
fn serialized_proof_verifies_against_reloaded_document() {
    let doc = mira();
    let proof = prove_section(&doc, CanonicalSection::EthicalCommitments).unwrap();
    let wire = serde_json::to_string(&proof).unwrap();

    let received: MerkleProof = serde_json::from_str(&wire).unwrap();
    assert!(received.verify());
    assert_eq!(received.root, merkle_root(&doc).unwrap());

    let reloaded: IdentityDocument =
        serde_json::from_str(&serde_json::to_string(&doc).unwrap()).unwrap();
    assert!(received.verify_against(&reloaded));

    let mut weakened = reloaded;
    weakened.ethical_commitments[0].absoluteness = Absoluteness::Contextual;
    assert!(!received.verify_against(&weakened));
}

#[test]
fn merged_document_reseals() {
    let doc = mira();
    let merged = doc
        .merge(ipseity_core::IdentityDelta {
            origin_tags: vec!["migrated:local".into()],
            ..Default::default()
        })
        .unwrap();
    assert!(merged.verify_fingerprint());
    assert_eq!(
        changed_sections(&doc, &merged).unwrap(),
        vec![CanonicalSection::Header]
    );
}

#[test]
fn snapshot_survives_json_persistence() {
    let snapshot = StateSnapshot::builder("mira-001")
        .goal("g1", "Finish the migration", GoalPriority::Critical, 0.75)
        .decision("Keep the original baseline for drift tracking")
        .memory("last_user", json!({"name": "Ada", "visits": 3}), 0.6)
        .question("Was the restore complete?")
        .summary("Mid-way through a migration")
        .build()
        .unwrap();
    assert!(snapshot.verify_checksum());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();
    let loaded: StateSnapshot = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();

    assert_eq!(loaded, snapshot);
    assert!(loaded.verify_checksum());

    let mut tampered = loaded;
    tampered.recent_decisions.clear();
    assert!(!tampered.verify_checksum());
}
