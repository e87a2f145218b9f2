use phylosync_core::MutationRecord;
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::sync::Arc;

pub type ResolvedMutations = SmallVec<[Arc<MutationRecord>; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DictionaryPhase {
    #[default]
    Empty,
    Streaming,
    Complete,
    ErrorComplete,
}

impl DictionaryPhase {
    pub fn is_final(self) -> bool {
        matches!(self, Self::Complete | Self::ErrorComplete)
    }
}

/// Immutable view of the dictionary handed to everyone but the owner.
#[derive(Debug, Clone, Default)]
pub struct DictionarySnapshot {
    records: Arc<[Arc<MutationRecord>]>,
    is_final: bool,
}

impl DictionarySnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn get(&self, index: usize) -> Option<&Arc<MutationRecord>> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[Arc<MutationRecord>] {
        &self.records
    }

    /// Index list → records. Out-of-range indices are skipped and counted.
    pub fn resolve(&self, indices: &[usize]) -> (ResolvedMutations, usize) {
        let mut out = ResolvedMutations::new();
        let mut missing = 0;
        for &idx in indices {
            match self.records.get(idx) {
                Some(rec) => out.push(Arc::clone(rec)),
                None => missing += 1,
            }
        }
        (out, missing)
    }

    pub fn genes(&self) -> BTreeSet<String> {
        self.records.iter().map(|m| m.gene.clone()).collect()
    }
}

/// Append-only mutation table fed by the config stream.
///
/// Empty → Streaming → Complete | ErrorComplete, never back.
#[derive(Debug, Default)]
pub struct MutationDictionary {
    phase: DictionaryPhase,
    buffer: Vec<Arc<MutationRecord>>,
    frozen: Option<DictionarySnapshot>,
    pub chunks_accepted: usize,
    pub chunks_rejected: usize,
}

impl MutationDictionary {
    pub fn phase(&self) -> DictionaryPhase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Records shipped inline with the base config, before any chunk.
    pub fn seed(&mut self, records: Vec<MutationRecord>) {
        if self.phase != DictionaryPhase::Empty {
            tracing::warn!(phase = ?self.phase, "ignoring seed on a started dictionary");
            return;
        }
        self.buffer.extend(records.into_iter().map(Arc::new));
    }

    pub fn open(&mut self) {
        if self.phase == DictionaryPhase::Empty {
            self.phase = DictionaryPhase::Streaming;
        }
    }

    /// Returns false when the chunk arrived after the dictionary was finalized.
    pub fn append(&mut self, records: Vec<MutationRecord>) -> bool {
        self.open();
        if self.phase != DictionaryPhase::Streaming {
            tracing::warn!(
                phase = ?self.phase,
                records = records.len(),
                "dropping mutation chunk after completion"
            );
            return false;
        }
        let placeholders = records.iter().filter(|r| r.is_placeholder()).count();
        if placeholders > 0 {
            tracing::warn!(placeholders, at = self.buffer.len(), "mutation chunk held entries that are not records");
        }
        self.buffer.extend(records.into_iter().map(Arc::new));
        self.chunks_accepted += 1;
        true
    }

    pub fn reject_chunk(&mut self, reason: &str) {
        self.chunks_rejected += 1;
        tracing::error!(reason, "discarding mutation chunk");
    }

    pub fn complete(&mut self) {
        self.finish(DictionaryPhase::Complete);
    }

    pub fn fail(&mut self) {
        self.finish(DictionaryPhase::ErrorComplete);
    }

    fn finish(&mut self, phase: DictionaryPhase) {
        if self.phase.is_final() {
            return;
        }
        self.phase = phase;
        self.frozen = Some(DictionarySnapshot {
            records: self.buffer.clone().into(),
            is_final: true,
        });
    }

    /// After finalization this is the frozen table; before, a copy of the prefix so far.
    pub fn snapshot(&self) -> DictionarySnapshot {
        if let Some(frozen) = &self.frozen {
            return frozen.clone();
        }
        DictionarySnapshot {
            records: self.buffer.clone().into(),
            is_final: false,
        }
    }
}
