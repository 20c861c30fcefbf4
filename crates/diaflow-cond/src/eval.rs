use diaflow_types::{CondExpr, FactId, FactValue};

use crate::facts::{FactState, FactStore};

/// Why a condition could not be decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Indeterminate {
    NotAnswered(FactId),
    Unknown(FactId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Satisfied,
    NotSatisfied,
    Indeterminate(Indeterminate),
}

impl Outcome {
    /// Only `Satisfied` counts; indeterminate outcomes are treated as not satisfied.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Outcome::Satisfied)
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Outcome::Indeterminate(_))
    }

    fn from_bool(value: bool) -> Self {
        if value {
            Outcome::Satisfied
        } else {
            Outcome::NotSatisfied
        }
    }

    fn negate(self) -> Self {
        match self {
            Outcome::Satisfied => Outcome::NotSatisfied,
            Outcome::NotSatisfied => Outcome::Satisfied,
            other => other,
        }
    }
}

pub trait Condition {
    fn eval(&self, facts: &dyn FactStore) -> Outcome;
}

impl Condition for CondExpr {
    fn eval(&self, facts: &dyn FactStore) -> Outcome {
        eval_condition(self, facts)
    }
}

/// A missing condition is always satisfied.
impl Condition for Option<CondExpr> {
    fn eval(&self, facts: &dyn FactStore) -> Outcome {
        match self {
            Some(cond) => eval_condition(cond, facts),
            None => Outcome::Satisfied,
        }
    }
}

pub fn eval_condition(cond: &CondExpr, facts: &dyn FactStore) -> Outcome {
    match cond {
        CondExpr::True => Outcome::Satisfied,
        CondExpr::Known { fact } => Outcome::from_bool(!facts.get(fact).is_unanswered()),
        CondExpr::IsUnknown { fact } => match facts.get(fact) {
            FactState::Unknown => Outcome::Satisfied,
            FactState::Answered(_) => Outcome::NotSatisfied,
            FactState::Unanswered => Outcome::Indeterminate(Indeterminate::NotAnswered(fact.clone())),
        },
        CondExpr::Equals { fact, value } => with_value(facts, fact, |current| current == value),
        CondExpr::OneOf { fact, values } => {
            with_value(facts, fact, |current| values.contains(current))
        }
        CondExpr::Compare { fact, cmp, value } => with_value(facts, fact, |current| {
            current
                .as_int()
                .is_some_and(|current| cmp.apply(current, *value))
        }),
        CondExpr::And { all } => {
            let mut pending = None;
            for term in all {
                match eval_condition(term, facts) {
                    Outcome::NotSatisfied => return Outcome::NotSatisfied,
                    Outcome::Indeterminate(reason) => {
                        pending.get_or_insert(reason);
                    }
                    Outcome::Satisfied => {}
                }
            }
            pending.map_or(Outcome::Satisfied, Outcome::Indeterminate)
        }
        CondExpr::Or { any } => {
            let mut pending = None;
            for term in any {
                match eval_condition(term, facts) {
                    Outcome::Satisfied => return Outcome::Satisfied,
                    Outcome::Indeterminate(reason) => {
                        pending.get_or_insert(reason);
                    }
                    Outcome::NotSatisfied => {}
                }
            }
            pending.map_or(Outcome::NotSatisfied, Outcome::Indeterminate)
        }
        CondExpr::Not { cond } => eval_condition(cond, facts).negate(),
        CondExpr::MinOf { min, max, of } => {
            let mut satisfied = 0usize;
            let mut open = 0usize;
            let mut pending = None;
            for term in of {
                match eval_condition(term, facts) {
                    Outcome::Satisfied => satisfied += 1,
                    Outcome::NotSatisfied => {}
                    Outcome::Indeterminate(reason) => {
                        open += 1;
                        pending.get_or_insert(reason);
                    }
                }
            }
            let upper = max.unwrap_or(usize::MAX);
            if satisfied > upper || satisfied + open < *min {
                Outcome::NotSatisfied
            } else if satisfied >= *min && satisfied + open <= upper {
                Outcome::Satisfied
            } else {
                // Open terms can still tip the count either way.
                pending.map_or(Outcome::NotSatisfied, Outcome::Indeterminate)
            }
        }
    }
}

fn with_value(facts: &dyn FactStore, fact: &str, test: impl FnOnce(&FactValue) -> bool) -> Outcome {
    match facts.get(fact) {
        FactState::Answered(value) => Outcome::from_bool(test(&value)),
        FactState::Unanswered => Outcome::Indeterminate(Indeterminate::NotAnswered(fact.to_string())),
        FactState::Unknown => Outcome::Indeterminate(Indeterminate::Unknown(fact.to_string())),
    }
}
