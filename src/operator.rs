//! Filter operator vocabulary (spec §4.1).
//!
//! Mirrors the teacher's `Operator` enum and `to_sql` rendering
//! (`src/transpiler.rs`), generalized from "render one SQL operator" to
//! "render one operand for the wire type the property actually has".

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// The six comparison operators every scalar type may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FilterOp {
    /// Server-side textual operator token.
    pub fn token(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::Lt => "lt",
            FilterOp::Le => "le",
            FilterOp::Gt => "gt",
            FilterOp::Ge => "ge",
        }
    }

    /// In-memory two-argument comparator: does `ord` satisfy this operator?
    pub fn matches(self, ord: Ordering) -> bool {
        match self {
            FilterOp::Eq => ord == Ordering::Equal,
            FilterOp::Ne => ord != Ordering::Equal,
            FilterOp::Lt => ord == Ordering::Less,
            FilterOp::Le => ord != Ordering::Greater,
            FilterOp::Gt => ord == Ordering::Greater,
            FilterOp::Ge => ord != Ordering::Less,
        }
    }
}

/// A rendered filter operand, picked by the wire type of the property being
/// filtered (spec §4.1's rendering table).
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOperand {
    Str(String),
    /// Already-formatted bare literal (number or boolean).
    Bare(String),
    Date(DateTime<Utc>),
    Guid(Uuid),
}

impl FilterOperand {
    fn render(&self) -> String {
        match self {
            FilterOperand::Str(s) => format!("'{}'", s.replace('\'', "''")),
            FilterOperand::Bare(s) => s.clone(),
            FilterOperand::Date(d) => format!("datetime'{}'", d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            FilterOperand::Guid(g) => format!("guid'{}'", g.hyphenated()),
        }
    }
}

/// Render `<property> <op-token> <rendered-operand>` (spec §4.1). Composing
/// several conditions with `and`/`or` is the caller's job, not this type's.
pub fn render_condition(property: &str, op: FilterOp, operand: &FilterOperand) -> String {
    format!("{} {} {}", property, op.token(), operand.render())
}
