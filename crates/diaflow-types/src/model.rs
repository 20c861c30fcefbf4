use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

pub type Name = String;
pub type FactId = String;

/// Literal fact value as stored in the session and compared by conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool { bool: bool },
    Int { int: i64 },
    Text { text: String },
}

impl FactValue {
    pub fn text(text: impl Into<String>) -> Self {
        FactValue::Text { text: text.into() }
    }

    /// Human-readable kind string used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FactValue::Bool { .. } => "bool",
            FactValue::Int { .. } => "int",
            FactValue::Text { .. } => "text",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FactValue::Int { int } => Some(*int),
            _ => None,
        }
    }
}

impl From<bool> for FactValue {
    fn from(value: bool) -> Self {
        FactValue::Bool { bool: value }
    }
}

impl From<i64> for FactValue {
    fn from(value: i64) -> Self {
        FactValue::Int { int: value }
    }
}

impl From<&str> for FactValue {
    fn from(value: &str) -> Self {
        FactValue::text(value)
    }
}

impl From<String> for FactValue {
    fn from(value: String) -> Self {
        FactValue::Text { text: value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn apply(self, left: i64, right: i64) -> bool {
        match self {
            CmpOp::Lt => left < right,
            CmpOp::Le => left <= right,
            CmpOp::Gt => left > right,
            CmpOp::Ge => left >= right,
        }
    }
}

/// Guard expression over session facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CondExpr {
    True,
    Known {
        fact: FactId,
    },
    IsUnknown {
        fact: FactId,
    },
    Equals {
        fact: FactId,
        value: FactValue,
    },
    OneOf {
        fact: FactId,
        values: Vec<FactValue>,
    },
    Compare {
        fact: FactId,
        cmp: CmpOp,
        value: i64,
    },
    And {
        all: Vec<CondExpr>,
    },
    Or {
        any: Vec<CondExpr>,
    },
    Not {
        cond: Box<CondExpr>,
    },
    /// Satisfied when at least `min` (and, if given, at most `max`) terms are satisfied.
    MinOf {
        min: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
        of: Vec<CondExpr>,
    },
}

impl CondExpr {
    pub fn equals(fact: impl Into<FactId>, value: impl Into<FactValue>) -> Self {
        CondExpr::Equals {
            fact: fact.into(),
            value: value.into(),
        }
    }

    pub fn known(fact: impl Into<FactId>) -> Self {
        CondExpr::Known { fact: fact.into() }
    }

    pub fn and(all: impl IntoIterator<Item = CondExpr>) -> Self {
        CondExpr::And {
            all: all.into_iter().collect(),
        }
    }

    pub fn or(any: impl IntoIterator<Item = CondExpr>) -> Self {
        CondExpr::Or {
            any: any.into_iter().collect(),
        }
    }

    pub fn negate(cond: CondExpr) -> Self {
        CondExpr::Not {
            cond: Box::new(cond),
        }
    }

    /// Facts read by this expression, in first-reference order.
    pub fn facts(&self) -> IndexSet<FactId> {
        let mut out = IndexSet::new();
        self.collect_facts(&mut out);
        out
    }

    pub fn collect_facts(&self, out: &mut IndexSet<FactId>) {
        match self {
            CondExpr::True => {}
            CondExpr::Known { fact }
            | CondExpr::IsUnknown { fact }
            | CondExpr::Equals { fact, .. }
            | CondExpr::OneOf { fact, .. }
            | CondExpr::Compare { fact, .. } => {
                out.insert(fact.clone());
            }
            CondExpr::And { all: terms }
            | CondExpr::Or { any: terms }
            | CondExpr::MinOf { of: terms, .. } => {
                for term in terms {
                    term.collect_facts(out);
                }
            }
            CondExpr::Not { cond } => cond.collect_facts(out),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefFlowSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flows: Vec<DefFlow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<DefTrigger>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefFlow {
    pub name: Name,
    /// Start nodes of autostart flows are indicated when a session is created.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub autostart: bool,
    pub nodes: Vec<DefNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<DefEdge>,
}

impl DefFlow {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            autostart: false,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefNode {
    pub name: Name,
    #[serde(flatten)]
    pub kind: DefNodeKind,
}

impl DefNode {
    pub fn start(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            kind: DefNodeKind::Start,
        }
    }

    pub fn action(name: impl Into<Name>, action: DefAction) -> Self {
        Self {
            name: name.into(),
            kind: DefNodeKind::Action { action },
        }
    }

    pub fn composed(name: impl Into<Name>, flow: impl Into<Name>, start: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            kind: DefNodeKind::Composed {
                flow: flow.into(),
                start: start.into(),
            },
        }
    }

    pub fn snapshot(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            kind: DefNodeKind::Snapshot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefNodeKind {
    Start,
    Action { action: DefAction },
    /// Calls start node `start` of flow `flow` as a sub-flow.
    Composed { flow: Name, start: Name },
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DefAction {
    Noop,
    /// Sets `fact` to `value`; undo restores whatever the fact held before.
    Assign { fact: FactId, value: FactValue },
    /// Host action registered under `name`.
    Invoke { name: Name },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefEdge {
    pub from: Name,
    pub to: Name,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<CondExpr>,
}

impl DefEdge {
    pub fn new(from: impl Into<Name>, to: impl Into<Name>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            when: None,
        }
    }

    pub fn when(mut self, cond: CondExpr) -> Self {
        self.when = Some(cond);
        self
    }
}

/// Indication rule: indicates `start` of `flow` while `when` holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefTrigger {
    pub name: Name,
    pub flow: Name,
    pub start: Name,
    pub when: CondExpr,
}
