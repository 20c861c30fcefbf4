use diaflow_types::{FactId, FactValue};
use indexmap::IndexMap;

/// Answer state of a single fact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FactState {
    Answered(FactValue),
    #[default]
    Unanswered,
    /// Explicitly answered as "unknown".
    Unknown,
}

impl FactState {
    pub fn value(&self) -> Option<&FactValue> {
        match self {
            FactState::Answered(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_unanswered(&self) -> bool {
        matches!(self, FactState::Unanswered)
    }
}

/// Session fact storage seen by conditions and node actions.
pub trait FactStore {
    fn get(&self, fact: &str) -> FactState;

    /// Stores `state` for `fact` and returns the state it replaced.
    fn put(&mut self, fact: &str, state: FactState) -> FactState;
}

/// In-memory fact store; unanswered facts are not stored.
#[derive(Debug, Clone, Default)]
pub struct MemFactStore {
    facts: IndexMap<FactId, FactState>,
}

impl MemFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&mut self, fact: &str, value: impl Into<FactValue>) -> FactState {
        self.put(fact, FactState::Answered(value.into()))
    }

    pub fn mark_unknown(&mut self, fact: &str) -> FactState {
        self.put(fact, FactState::Unknown)
    }

    pub fn retract(&mut self, fact: &str) -> FactState {
        self.put(fact, FactState::Unanswered)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FactState)> {
        self.facts.iter().map(|(fact, state)| (fact.as_str(), state))
    }
}

impl FactStore for MemFactStore {
    fn get(&self, fact: &str) -> FactState {
        self.facts.get(fact).cloned().unwrap_or_default()
    }

    fn put(&mut self, fact: &str, state: FactState) -> FactState {
        let previous = match state {
            FactState::Unanswered => self.facts.shift_remove(fact),
            state => self.facts.insert(fact.to_string(), state),
        };
        previous.unwrap_or_default()
    }
}
