use crate::catalog::types::Value;
use crate::error::AdaptdbError;
use crate::index::SecondaryIndex;
use crate::storage::table::DataTable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maximum nesting depth for expressions to prevent stack overflow
const MAX_EXPR_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Eq(String, Value),
    Ne(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    In(String, Vec<Value>),
    Between(String, Value, Value),
    IsNull(String),
    IsNotNull(String),
    Like(String, String),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn and(self, rhs: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(rhs))
    }

    pub fn or(self, rhs: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(rhs))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    /// Calculates the maximum nesting depth of this expression tree.
    pub fn depth(&self) -> usize {
        match self {
            Expr::Eq(_, _)
            | Expr::Ne(_, _)
            | Expr::Lt(_, _)
            | Expr::Lte(_, _)
            | Expr::Gt(_, _)
            | Expr::Gte(_, _)
            | Expr::In(_, _)
            | Expr::Between(_, _, _)
            | Expr::IsNull(_)
            | Expr::IsNotNull(_)
            | Expr::Like(_, _) => 1,
            Expr::Not(inner) => 1 + inner.depth(),
            Expr::And(left, right) | Expr::Or(left, right) => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn validate_depth(&self) -> Result<(), AdaptdbError> {
        let depth = self.depth();
        if depth > MAX_EXPR_DEPTH {
            return Err(AdaptdbError::Validation(format!(
                "expression depth {} exceeds maximum allowed depth of {}",
                depth, MAX_EXPR_DEPTH
            )));
        }
        Ok(())
    }
}

/// Comparison operators an index descriptor may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// One key-bound condition: column position, operator, bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    pub column_id: usize,
    pub op: ScanOp,
    pub value: Value,
}

/// The key-bound sub-predicate handed to an index: parallel to the original
/// (key column ids, expression types, values) triple, kept as one condition
/// list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexScanDesc {
    pub conditions: Vec<KeyCondition>,
}

impl IndexScanDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column_id: usize, op: ScanOp, value: Value) -> Self {
        self.conditions.push(KeyCondition {
            column_id,
            op,
            value,
        });
        self
    }
}

/// Inputs of one hybrid scan call: the target table, an optional index
/// descriptor, the residual predicate, and the output column list.
#[derive(Debug, Clone)]
pub struct HybridScanPlan {
    pub table: Arc<DataTable>,
    pub index: Option<Arc<SecondaryIndex>>,
    pub index_desc: Option<IndexScanDesc>,
    pub predicate: Option<Expr>,
    pub column_ids: Vec<usize>,
}

impl HybridScanPlan {
    /// Plan with no index: the whole table is scanned brute-force.
    pub fn seq(table: Arc<DataTable>, predicate: Option<Expr>, column_ids: Vec<usize>) -> Self {
        Self {
            table,
            index: None,
            index_desc: None,
            predicate,
            column_ids,
        }
    }

    /// Plan splitting work between `index` (for its covered prefix) and
    /// brute force (for the rest).
    pub fn with_index(
        table: Arc<DataTable>,
        index: Arc<SecondaryIndex>,
        index_desc: IndexScanDesc,
        predicate: Option<Expr>,
        column_ids: Vec<usize>,
    ) -> Self {
        Self {
            table,
            index: Some(index),
            index_desc: Some(index_desc),
            predicate,
            column_ids,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Fail the scan when the index cannot serve the key predicate instead
    /// of degrading to brute force.
    pub strict_index_predicates: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            strict_index_predicates: false,
        }
    }
}

pub struct ColumnRef(String);

pub fn col(name: &str) -> ColumnRef {
    ColumnRef(name.to_string())
}

pub trait IntoQueryValue {
    fn into_query_value(self) -> Value;
}

impl IntoQueryValue for Value {
    fn into_query_value(self) -> Value {
        self
    }
}

impl IntoQueryValue for bool {
    fn into_query_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl IntoQueryValue for i64 {
    fn into_query_value(self) -> Value {
        Value::Integer(self)
    }
}

impl IntoQueryValue for i32 {
    fn into_query_value(self) -> Value {
        Value::Integer(self as i64)
    }
}

impl IntoQueryValue for f64 {
    fn into_query_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoQueryValue for &str {
    fn into_query_value(self) -> Value {
        Value::Text(self.into())
    }
}

pub fn lit<T: IntoQueryValue>(value: T) -> Value {
    value.into_query_value()
}

impl ColumnRef {
    pub fn eq(self, value: Value) -> Expr {
        Expr::Eq(self.0, value)
    }

    pub fn neq(self, value: Value) -> Expr {
        Expr::Ne(self.0, value)
    }

    pub fn gt(self, value: Value) -> Expr {
        Expr::Gt(self.0, value)
    }

    pub fn gte(self, value: Value) -> Expr {
        Expr::Gte(self.0, value)
    }

    pub fn lt(self, value: Value) -> Expr {
        Expr::Lt(self.0, value)
    }

    pub fn lte(self, value: Value) -> Expr {
        Expr::Lte(self.0, value)
    }

    pub fn between(self, low: Value, high: Value) -> Expr {
        Expr::Between(self.0, low, high)
    }

    pub fn in_(self, values: Vec<Value>) -> Expr {
        Expr::In(self.0, values)
    }

    pub fn like(self, pattern: &str) -> Expr {
        Expr::Like(self.0, pattern.to_string())
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(self.0)
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(self.0)
    }
}
