//! Composable list query: predicates, projection, expansion and paging.
//! Stores evaluate it; the HTTP layer builds it from `$filter`/`$select`/... parameters (see [`odata`]).

pub mod odata;

use serde_json::Value;

/// Hard cap on rows returned by one list call.
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_lowercase().as_str() {
            "eq" => CompareOp::Eq,
            "ne" => CompareOp::Ne,
            "gt" => CompareOp::Gt,
            "ge" => CompareOp::Ge,
            "lt" => CompareOp::Lt,
            "le" => CompareOp::Le,
            _ => return None,
        })
    }

    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    /// Whether an ordering between a row value and the operand satisfies the operator.
    pub fn holds(&self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ord == Equal,
            CompareOp::Ne => ord != Equal,
            CompareOp::Gt => ord == Greater,
            CompareOp::Ge => ord != Less,
            CompareOp::Lt => ord == Less,
            CompareOp::Le => ord != Greater,
        }
    }
}

/// `column op value`. `value` is already normalized for the column type; `Null` is only valid with eq/ne.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    /// ANDed together.
    pub predicates: Vec<Predicate>,
    /// Column names to keep; `None` keeps every visible column.
    pub select: Option<Vec<String>>,
    /// Navigation names to embed.
    pub expand: Vec<String>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
    pub count: bool,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, column: &str, op: CompareOp, value: Value) -> Self {
        self.predicates.push(Predicate {
            column: column.to_string(),
            op,
            value,
        });
        self
    }

    pub fn expand(mut self, navigation: &str) -> Self {
        self.expand.push(navigation.to_string());
        self
    }

    pub fn top(mut self, n: u32) -> Self {
        self.top = Some(n);
        self
    }

    pub fn skip(mut self, n: u32) -> Self {
        self.skip = Some(n);
        self
    }

    /// Effective page size: `$top` capped at [`MAX_PAGE_SIZE`], or the cap itself.
    pub fn limit(&self) -> u32 {
        self.top.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u32 {
        self.skip.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn limit_is_capped() {
        assert_eq!(ListQuery::new().limit(), 1000);
        assert_eq!(ListQuery::new().top(5).limit(), 5);
        assert_eq!(ListQuery::new().top(5000).limit(), 1000);
    }

    #[test]
    fn operators_against_orderings() {
        assert!(CompareOp::Ge.holds(Ordering::Equal));
        assert!(CompareOp::Ge.holds(Ordering::Greater));
        assert!(!CompareOp::Lt.holds(Ordering::Equal));
        assert!(CompareOp::Ne.holds(Ordering::Less));
        assert_eq!(CompareOp::parse("LE"), Some(CompareOp::Le));
        assert_eq!(CompareOp::parse("like"), None);
    }
}
