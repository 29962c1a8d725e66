//! Point-in-time state snapshots of an agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{check_digest, check_unit};
use crate::error::{IdentityError, IdentityResult};
use crate::integrity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveGoal {
    pub id: String,
    pub description: String,
    pub priority: GoalPriority,
    /// Completion in `[0, 1]`.
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingMemoryItem {
    pub key: String,
    pub value: serde_json::Value,
    /// Importance in `[0, 1]`.
    pub importance: f64,
}

/// What the agent was doing when the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Identifier of the [`IdentityDocument`](crate::IdentityDocument) this state belongs to.
    pub document_id: String,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub active_goals: Vec<ActiveGoal>,
    #[serde(default)]
    pub recent_decisions: Vec<String>,
    #[serde(default)]
    pub working_memory: Vec<WorkingMemoryItem>,
    #[serde(default)]
    pub open_questions: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub emotional_tone: Option<String>,
    /// SHA-256 over every other field.
    #[serde(default)]
    pub checksum: Option<String>,
}

impl StateSnapshot {
    pub fn builder(document_id: impl Into<String>) -> StateSnapshotBuilder {
        StateSnapshotBuilder::new(document_id)
    }

    pub fn validate(&self) -> IdentityResult<()> {
        if self.document_id.trim().is_empty() {
            return Err(IdentityError::schema("document_id", "must not be empty"));
        }
        for (i, g) in self.active_goals.iter().enumerate() {
            check_unit(&format!("active_goals[{}].progress", i), g.progress)?;
        }
        for (i, m) in self.working_memory.iter().enumerate() {
            if m.key.trim().is_empty() {
                return Err(IdentityError::schema(
                    format!("working_memory[{}].key", i),
                    "must not be empty",
                ));
            }
            check_unit(&format!("working_memory[{}].importance", i), m.importance)?;
        }
        if let Some(sum) = &self.checksum {
            check_digest("checksum", sum)?;
        }
        Ok(())
    }

    /// Copy with the checksum computed over the current content.
    pub fn sealed(&self) -> IdentityResult<Self> {
        let mut snap = self.clone();
        snap.checksum = Some(integrity::compute_checksum(&snap)?);
        Ok(snap)
    }

    pub fn verify_checksum(&self) -> bool {
        integrity::verify_checksum(self)
    }
}

/// Builder with defaulting: `captured_at` is "now", every list starts empty.
#[derive(Debug, Clone)]
pub struct StateSnapshotBuilder {
    snapshot: StateSnapshot,
}

impl StateSnapshotBuilder {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            snapshot: StateSnapshot {
                document_id: document_id.into(),
                captured_at: Utc::now(),
                active_goals: Vec::new(),
                recent_decisions: Vec::new(),
                working_memory: Vec::new(),
                open_questions: Vec::new(),
                summary: None,
                emotional_tone: None,
                checksum: None,
            },
        }
    }

    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.snapshot.captured_at = at;
        self
    }

    pub fn goal(
        mut self,
        id: impl Into<String>,
        description: impl Into<String>,
        priority: GoalPriority,
        progress: f64,
    ) -> Self {
        self.snapshot.active_goals.push(ActiveGoal {
            id: id.into(),
            description: description.into(),
            priority,
            progress,
        });
        self
    }

    pub fn decision(mut self, decision: impl Into<String>) -> Self {
        self.snapshot.recent_decisions.push(decision.into());
        self
    }

    pub fn memory(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
        importance: f64,
    ) -> Self {
        self.snapshot.working_memory.push(WorkingMemoryItem {
            key: key.into(),
            value,
            importance,
        });
        self
    }

    pub fn question(mut self, question: impl Into<String>) -> Self {
        self.snapshot.open_questions.push(question.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.snapshot.summary = Some(summary.into());
        self
    }

    pub fn emotional_tone(mut self, tone: impl Into<String>) -> Self {
        self.snapshot.emotional_tone = Some(tone.into());
        self
    }

    /// Validate and seal the checksum.
    pub fn build(self) -> IdentityResult<StateSnapshot> {
        self.snapshot.validate()?;
        self.snapshot.sealed()
    }
}
