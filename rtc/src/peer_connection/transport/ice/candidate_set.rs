use std::collections::HashSet;

use super::candidate::RTCIceCandidate;
use crate::peer_connection::sdp::RTCMediaSection;

/// Result of offering a candidate to a [`CandidateSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateAddOutcome {
    Accepted,
    /// Same foundation, component, address and port as a known candidate; nothing changed.
    Duplicate,
    Rejected(String),
}

#[derive(Debug, Clone)]
struct CandidateEntry {
    candidate: RTCIceCandidate,
    delivered: bool,
}

/// Candidates of one side of a connection, in discovery order.
///
/// Remote candidates may arrive before the description that declares their media
/// section. They stay undelivered until [`CandidateSet::take_deliverable`] sees a
/// matching section, and are handed out in arrival order so neither the candidate
/// stream nor the description stream is reordered.
#[derive(Debug, Default)]
pub struct CandidateSet {
    entries: Vec<CandidateEntry>,
    keys: HashSet<(String, u16, String, u16)>,
    gathering_complete: bool,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, candidate: RTCIceCandidate) -> CandidateAddOutcome {
        if candidate.component == 0 {
            return CandidateAddOutcome::Rejected("component must be at least 1".to_owned());
        }
        if candidate.sdp_mid.is_none() && candidate.sdp_mline_index.is_none() {
            return CandidateAddOutcome::Rejected(
                "candidate is missing both sdpMid and sdpMLineIndex".to_owned(),
            );
        }
        if !self.keys.insert(candidate.dedup_key()) {
            return CandidateAddOutcome::Duplicate;
        }

        self.entries.push(CandidateEntry {
            candidate,
            delivered: false,
        });
        CandidateAddOutcome::Accepted
    }

    /// Marks gathering as finished. Returns `true` only for the first call of a round.
    pub fn gathering_complete(&mut self) -> bool {
        !std::mem::replace(&mut self.gathering_complete, true)
    }

    pub fn is_gathering_complete(&self) -> bool {
        self.gathering_complete
    }

    /// Candidates of the `m=` section at `media_index`, highest priority first; ties keep
    /// discovery order. A candidate that names only its mid is placed through `sections`.
    pub fn candidates_for(
        &self,
        media_index: u16,
        sections: &[RTCMediaSection],
    ) -> Vec<RTCIceCandidate> {
        let mut candidates: Vec<RTCIceCandidate> = self
            .entries
            .iter()
            .filter(|e| e.candidate.section_index(sections) == Some(media_index))
            .map(|e| e.candidate.clone())
            .collect();
        // sort_by is stable
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
        candidates
    }

    /// Hands out, in arrival order, every undelivered candidate whose media section is
    /// among `sections`, and marks it delivered.
    pub fn take_deliverable(&mut self, sections: &[RTCMediaSection]) -> Vec<RTCIceCandidate> {
        self.entries
            .iter_mut()
            .filter(|e| !e.delivered && e.candidate.matches_section(sections))
            .map(|e| {
                e.delivered = true;
                e.candidate.clone()
            })
            .collect()
    }

    /// Forgets `candidate`, so adding it again is accepted. Returns whether it was known.
    pub fn remove(&mut self, candidate: &RTCIceCandidate) -> bool {
        let key = candidate.dedup_key();
        if !self.keys.remove(&key) {
            return false;
        }
        self.entries.retain(|e| e.candidate.dedup_key() != key);
        true
    }

    pub fn buffered_len(&self) -> usize {
        self.entries.iter().filter(|e| !e.delivered).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets every candidate and starts a new gathering round (ICE restart).
    pub fn reset(&mut self) {
        self.entries.clear();
        self.keys.clear();
        self.gathering_complete = false;
    }
}
