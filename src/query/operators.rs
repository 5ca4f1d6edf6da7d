use crate::catalog::types::{Row, Value};
use crate::query::error::QueryError;
use crate::query::plan::Expr;
use lru::LruCache;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::num::NonZeroUsize;

const EXPR_CACHE_SHARDS: usize = 16;
const EXPR_CACHE_TOTAL_CAPACITY: usize = 256;
const EXPR_CACHE_PER_SHARD: usize = EXPR_CACHE_TOTAL_CAPACITY / EXPR_CACHE_SHARDS;

/// Global cache for compiled expressions to avoid recompiling identical
/// predicates. Key is (expr debug string, column names, table) so a cached
/// entry is only reused in the schema context it was compiled for.
type ExprCacheKey = (String, Vec<String>, String);
type ExprCompileCacheShard = parking_lot::Mutex<LruCache<ExprCacheKey, CompiledExpr>>;
type ExprCompileCache = [ExprCompileCacheShard; EXPR_CACHE_SHARDS];

static EXPR_COMPILE_CACHE: once_cell::sync::Lazy<ExprCompileCache> =
    once_cell::sync::Lazy::new(|| {
        std::array::from_fn(|_| {
            let cap = NonZeroUsize::new(EXPR_CACHE_PER_SHARD).unwrap_or(NonZeroUsize::MIN);
            parking_lot::Mutex::new(LruCache::new(cap))
        })
    });

fn expr_cache_shard_idx(cache_key: &ExprCacheKey) -> usize {
    let mut hasher = DefaultHasher::new();
    cache_key.hash(&mut hasher);
    (hasher.finish() as usize) % EXPR_CACHE_SHARDS
}

/// Pull-based row source. The hybrid scan executor and its wrappers all
/// speak this interface.
pub trait Operator {
    fn next(&mut self) -> Option<Row>;
    fn rows_examined(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompiledExpr {
    Eq(usize, Value),
    Ne(usize, Value),
    Lt(usize, Value),
    Lte(usize, Value),
    Gt(usize, Value),
    Gte(usize, Value),
    In(usize, Vec<Value>),
    Between(usize, Value, Value),
    IsNull(usize),
    IsNotNull(usize),
    Like(usize, String),
    And(Box<CompiledExpr>, Box<CompiledExpr>),
    Or(Box<CompiledExpr>, Box<CompiledExpr>),
    Not(Box<CompiledExpr>),
}

impl CompiledExpr {
    pub fn and(self, rhs: CompiledExpr) -> CompiledExpr {
        CompiledExpr::And(Box::new(self), Box::new(rhs))
    }
}

pub fn compile_expr(
    expr: &Expr,
    columns: &[String],
    table: &str,
) -> Result<CompiledExpr, QueryError> {
    let cache_key = (format!("{:?}", expr), columns.to_vec(), table.to_string());
    let shard_idx = expr_cache_shard_idx(&cache_key);
    let cache_shard = &EXPR_COMPILE_CACHE[shard_idx];

    if let Some(compiled) = cache_shard.lock().get(&cache_key) {
        return Ok(compiled.clone());
    }

    let compiled = compile_expr_uncached(expr, columns, table)?;
    cache_shard.lock().put(cache_key, compiled.clone());
    Ok(compiled)
}

fn compile_expr_uncached(
    expr: &Expr,
    columns: &[String],
    table: &str,
) -> Result<CompiledExpr, QueryError> {
    match expr {
        Expr::Eq(c, v) => Ok(CompiledExpr::Eq(
            find_col_idx(columns, c, table)?,
            v.clone(),
        )),
        Expr::Ne(c, v) => Ok(CompiledExpr::Ne(
            find_col_idx(columns, c, table)?,
            v.clone(),
        )),
        Expr::Lt(c, v) => Ok(CompiledExpr::Lt(
            find_col_idx(columns, c, table)?,
            v.clone(),
        )),
        Expr::Lte(c, v) => Ok(CompiledExpr::Lte(
            find_col_idx(columns, c, table)?,
            v.clone(),
        )),
        Expr::Gt(c, v) => Ok(CompiledExpr::Gt(
            find_col_idx(columns, c, table)?,
            v.clone(),
        )),
        Expr::Gte(c, v) => Ok(CompiledExpr::Gte(
            find_col_idx(columns, c, table)?,
            v.clone(),
        )),
        Expr::In(c, values) => Ok(CompiledExpr::In(
            find_col_idx(columns, c, table)?,
            values.clone(),
        )),
        Expr::Between(c, lo, hi) => Ok(CompiledExpr::Between(
            find_col_idx(columns, c, table)?,
            lo.clone(),
            hi.clone(),
        )),
        Expr::IsNull(c) => Ok(CompiledExpr::IsNull(find_col_idx(columns, c, table)?)),
        Expr::IsNotNull(c) => Ok(CompiledExpr::IsNotNull(find_col_idx(columns, c, table)?)),
        Expr::Like(c, pattern) => Ok(CompiledExpr::Like(
            find_col_idx(columns, c, table)?,
            pattern.clone(),
        )),
        Expr::And(a, b) => Ok(CompiledExpr::And(
            Box::new(compile_expr_uncached(a, columns, table)?),
            Box::new(compile_expr_uncached(b, columns, table)?),
        )),
        Expr::Or(a, b) => Ok(CompiledExpr::Or(
            Box::new(compile_expr_uncached(a, columns, table)?),
            Box::new(compile_expr_uncached(b, columns, table)?),
        )),
        Expr::Not(inner) => Ok(CompiledExpr::Not(Box::new(compile_expr_uncached(
            inner, columns, table,
        )?))),
    }
}

/// Narrows each emitted row to the selected column positions.
pub struct ProjectOperator<'a> {
    child: Box<dyn Operator + 'a>,
    selected: Vec<usize>,
}

impl<'a> ProjectOperator<'a> {
    pub fn new(child: Box<dyn Operator + 'a>, selected: Vec<usize>) -> Self {
        Self { child, selected }
    }
}

impl Operator for ProjectOperator<'_> {
    fn next(&mut self) -> Option<Row> {
        let row = self.child.next()?;
        let values = self
            .selected
            .iter()
            .map(|idx| row.values[*idx].clone())
            .collect();
        Some(Row { values })
    }

    fn rows_examined(&self) -> usize {
        self.child.rows_examined()
    }
}

pub fn eval_compiled_expr(expr: &CompiledExpr, row: &Row) -> bool {
    match expr {
        CompiledExpr::Eq(idx, v) => {
            get_col(row, *idx).is_some_and(|rv| compare_values(rv, v).is_some_and(|o| o.is_eq()))
        }
        CompiledExpr::Ne(idx, v) => {
            get_col(row, *idx).is_some_and(|rv| compare_values(rv, v).is_some_and(|o| !o.is_eq()))
        }
        CompiledExpr::Lt(idx, v) => {
            get_col(row, *idx).is_some_and(|rv| compare_values(rv, v).is_some_and(|o| o.is_lt()))
        }
        CompiledExpr::Lte(idx, v) => {
            get_col(row, *idx).is_some_and(|rv| compare_values(rv, v).is_some_and(|o| o.is_le()))
        }
        CompiledExpr::Gt(idx, v) => {
            get_col(row, *idx).is_some_and(|rv| compare_values(rv, v).is_some_and(|o| o.is_gt()))
        }
        CompiledExpr::Gte(idx, v) => {
            get_col(row, *idx).is_some_and(|rv| compare_values(rv, v).is_some_and(|o| o.is_ge()))
        }
        CompiledExpr::In(idx, values) => get_col(row, *idx).is_some_and(|rv| {
            values
                .iter()
                .any(|v| compare_values(rv, v).is_some_and(|o| o.is_eq()))
        }),
        CompiledExpr::Between(idx, lo, hi) => get_col(row, *idx).is_some_and(|rv| {
            compare_values(rv, lo).is_some_and(|o| o.is_ge())
                && compare_values(rv, hi).is_some_and(|o| o.is_le())
        }),
        CompiledExpr::IsNull(idx) => get_col(row, *idx).is_some_and(|rv| matches!(rv, Value::Null)),
        CompiledExpr::IsNotNull(idx) => {
            get_col(row, *idx).is_some_and(|rv| !matches!(rv, Value::Null))
        }
        CompiledExpr::Like(idx, pattern) => get_col(row, *idx).is_some_and(|rv| match rv {
            Value::Text(s) => like_match(s, pattern),
            _ => false,
        }),
        CompiledExpr::And(a, b) => eval_compiled_expr(a, row) && eval_compiled_expr(b, row),
        CompiledExpr::Or(a, b) => eval_compiled_expr(a, row) || eval_compiled_expr(b, row),
        CompiledExpr::Not(inner) => !eval_compiled_expr(inner, row),
    }
}

fn find_col_idx(columns: &[String], col: &str, table: &str) -> Result<usize, QueryError> {
    columns
        .iter()
        .position(|c| c == col)
        .ok_or_else(|| QueryError::ColumnNotFound {
            table: table.to_string(),
            column: col.to_string(),
        })
}

fn get_col(row: &Row, idx: usize) -> Option<&Value> {
    row.values.get(idx)
}

fn like_match(value: &str, pattern: &str) -> bool {
    let text = value.as_bytes();
    let pat = pattern.as_bytes();
    let mut ti = 0usize;
    let mut pi = 0usize;
    let mut star_pi: Option<usize> = None;
    let mut star_ti = 0usize;

    while ti < text.len() {
        if pi < pat.len() && (pat[pi] == b'_' || pat[pi] == text[ti]) {
            ti += 1;
            pi += 1;
            continue;
        }
        if pi < pat.len() && pat[pi] == b'%' {
            star_pi = Some(pi);
            pi += 1;
            star_ti = ti;
            continue;
        }
        if let Some(saved_pi) = star_pi {
            pi = saved_pi + 1;
            star_ti += 1;
            ti = star_ti;
            continue;
        }
        return false;
    }

    while pi < pat.len() && pat[pi] == b'%' {
        pi += 1;
    }

    pi == pat.len()
}

fn compare_values(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Timestamp(a), Value::Integer(b)) => a.partial_cmp(b),
        (Value::Integer(a), Value::Timestamp(b)) => a.partial_cmp(b),
        (Value::Timestamp(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Timestamp(b)) => a.partial_cmp(&(*b as f64)),
        _ => Some(left.cmp(right)),
    }
}
