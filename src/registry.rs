//! Candidate registry: identity, metadata and the derived vote tally.

use std::collections::HashMap;

use crate::error::RegistryError;
use crate::models::{Candidate, CandidateMetadata, GENESIS_SENTINEL};

#[derive(Debug, Clone, Default)]
pub struct CandidateRegistry {
    /// Insertion order is the tie-break for ranked results.
    candidates: Vec<Candidate>,
    index: HashMap<String, usize>,
}

impl CandidateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a registry from stored candidates, keeping their order and counts.
    pub fn from_candidates(candidates: Vec<Candidate>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for candidate in candidates {
            if candidate.name.trim().is_empty() {
                return Err(RegistryError::InvalidMetadata(format!(
                    "candidate {:?} has no name",
                    candidate.id
                )));
            }
            if candidate.id.trim() != candidate.id {
                return Err(RegistryError::InvalidMetadata(format!(
                    "unusable id {:?}",
                    candidate.id
                )));
            }
            registry.check_id(&candidate.id)?;
            registry.insert(candidate);
        }
        Ok(registry)
    }

    pub fn get(&self, candidate_id: &str) -> Result<&Candidate, RegistryError> {
        self.index
            .get(candidate_id)
            .map(|&i| &self.candidates[i])
            .ok_or_else(|| RegistryError::NotFound(candidate_id.to_string()))
    }

    pub fn contains(&self, candidate_id: &str) -> bool {
        self.index.contains_key(candidate_id)
    }

    /// Only the vote service calls this, paired with a ledger append.
    pub(crate) fn increment_vote(&mut self, candidate_id: &str) -> Result<u64, RegistryError> {
        let i = *self
            .index
            .get(candidate_id)
            .ok_or_else(|| RegistryError::NotFound(candidate_id.to_string()))?;
        let candidate = &mut self.candidates[i];
        candidate.votes += 1;
        Ok(candidate.votes)
    }

    pub fn add_candidate(&mut self, metadata: CandidateMetadata) -> Result<Candidate, RegistryError> {
        if metadata.name.trim().is_empty() {
            return Err(RegistryError::InvalidMetadata("name must not be empty".to_string()));
        }

        let id = match metadata.id {
            Some(id) => {
                let id = id.trim().to_string();
                self.check_id(&id)?;
                id
            }
            None => self.next_id(),
        };

        let candidate = Candidate {
            id,
            name: metadata.name,
            party: metadata.party,
            position: metadata.position,
            image: metadata.image,
            votes: 0,
        };
        self.insert(candidate.clone());
        Ok(candidate)
    }

    /// All candidates, most votes first; equal counts keep insertion order.
    pub fn ranked_results(&self) -> Vec<Candidate> {
        let mut ranked = self.candidates.clone();
        // sort_by is stable
        ranked.sort_by(|a, b| b.votes.cmp(&a.votes));
        ranked
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn total_votes(&self) -> u64 {
        self.candidates.iter().map(|c| c.votes).sum()
    }

    /// Ids must be non-empty, not the genesis sentinel, and not already taken.
    fn check_id(&self, id: &str) -> Result<(), RegistryError> {
        if id.is_empty() || id == GENESIS_SENTINEL {
            return Err(RegistryError::InvalidMetadata(format!("unusable id {id:?}")));
        }
        if self.index.contains_key(id) {
            return Err(RegistryError::DuplicateIdentity(id.to_string()));
        }
        Ok(())
    }

    fn insert(&mut self, candidate: Candidate) {
        self.index.insert(candidate.id.clone(), self.candidates.len());
        self.candidates.push(candidate);
    }

    /// Next free sequential id, starting from `len + 1`.
    fn next_id(&self) -> String {
        let mut n = self.candidates.len() + 1;
        while self.index.contains_key(&n.to_string()) {
            n += 1;
        }
        n.to_string()
    }
}

/// The Student Body President roster the campus front end ships with.
pub fn default_roster() -> Vec<CandidateMetadata> {
    [
        ("Alex Johnson", "Student Progress Party"),
        ("Maria Rodriguez", "Campus Forward Coalition"),
        ("David Lee", "Academic Excellence Union"),
    ]
    .into_iter()
    .map(|(name, party)| CandidateMetadata {
        id: None,
        name: name.to_string(),
        party: party.to_string(),
        position: "Student Body President".to_string(),
        image: "/placeholder.svg".to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> CandidateMetadata {
        CandidateMetadata {
            id: None,
            name: name.to_string(),
            party: "Independent".to_string(),
            position: "Treasurer".to_string(),
            image: String::new(),
        }
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let mut registry = CandidateRegistry::new();
        let a = registry.add_candidate(meta("Ann")).unwrap();
        let b = registry.add_candidate(meta("Bo")).unwrap();
        assert_eq!(a.id, "1");
        assert_eq!(b.id, "2");
        assert_eq!(a.votes, 0);
    }

    #[test]
    fn assigned_id_skips_taken_ids() {
        let mut registry = CandidateRegistry::new();
        registry
            .add_candidate(CandidateMetadata {
                id: Some("2".to_string()),
                ..meta("Explicit")
            })
            .unwrap();
        // len + 1 == 2 is taken
        let next = registry.add_candidate(meta("Next")).unwrap();
        assert_eq!(next.id, "3");
    }

    #[test]
    fn explicit_duplicate_id_is_rejected() {
        let mut registry = CandidateRegistry::new();
        registry.add_candidate(meta("Ann")).unwrap();
        let err = registry
            .add_candidate(CandidateMetadata {
                id: Some("1".to_string()),
                ..meta("Impostor")
            })
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateIdentity("1".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_name_is_not_a_duplicate() {
        let mut registry = CandidateRegistry::new();
        registry.add_candidate(meta("Ann")).unwrap();
        assert!(registry.add_candidate(meta("Ann")).is_ok());
    }

    #[test]
    fn invalid_metadata_is_rejected() {
        let mut registry = CandidateRegistry::new();
        assert!(matches!(
            registry.add_candidate(meta("  ")),
            Err(RegistryError::InvalidMetadata(_))
        ));
        assert!(matches!(
            registry.add_candidate(CandidateMetadata {
                id: Some(GENESIS_SENTINEL.to_string()),
                ..meta("Ann")
            }),
            Err(RegistryError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn get_and_increment_unknown_fail() {
        let mut registry = CandidateRegistry::new();
        assert_eq!(
            registry.get("9").unwrap_err(),
            RegistryError::NotFound("9".to_string())
        );
        assert!(registry.increment_vote("9").is_err());
    }

    #[test]
    fn increment_adds_exactly_one() {
        let mut registry = CandidateRegistry::new();
        registry.add_candidate(meta("Ann")).unwrap();
        assert_eq!(registry.increment_vote("1").unwrap(), 1);
        assert_eq!(registry.increment_vote("1").unwrap(), 2);
        assert_eq!(registry.get("1").unwrap().votes, 2);
        assert_eq!(registry.total_votes(), 2);
    }

    #[test]
    fn ranked_results_break_ties_by_insertion_order() {
        let mut registry = CandidateRegistry::new();
        for name in ["Ann", "Bo", "Cy", "Di"] {
            registry.add_candidate(meta(name)).unwrap();
        }
        registry.increment_vote("3").unwrap();
        registry.increment_vote("2").unwrap();

        let order: Vec<_> = registry.ranked_results().into_iter().map(|c| c.name).collect();
        assert_eq!(order, ["Bo", "Cy", "Ann", "Di"]);
    }

    #[test]
    fn from_candidates_rejects_duplicates() {
        let mut registry = CandidateRegistry::new();
        let ann = registry.add_candidate(meta("Ann")).unwrap();
        assert!(CandidateRegistry::from_candidates(vec![ann.clone(), ann]).is_err());
    }

    #[test]
    fn from_candidates_rejects_reserved_and_empty_ids() {
        let mut registry = CandidateRegistry::new();
        let ann = registry.add_candidate(meta("Ann")).unwrap();

        for bad_id in [GENESIS_SENTINEL, "", " 1"] {
            let stored = Candidate {
                id: bad_id.to_string(),
                ..ann.clone()
            };
            assert!(
                matches!(
                    CandidateRegistry::from_candidates(vec![stored]),
                    Err(RegistryError::InvalidMetadata(_))
                ),
                "accepted id {bad_id:?}"
            );
        }

        let nameless = Candidate {
            name: String::new(),
            ..ann.clone()
        };
        assert!(CandidateRegistry::from_candidates(vec![nameless]).is_err());
        assert!(CandidateRegistry::from_candidates(vec![ann]).is_ok());
    }

    #[test]
    fn default_roster_registers_cleanly() {
        let mut registry = CandidateRegistry::new();
        for metadata in default_roster() {
            registry.add_candidate(metadata).unwrap();
        }
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("2").unwrap().name, "Maria Rodriguez");
        assert_eq!(registry.total_votes(), 0);
    }
}
