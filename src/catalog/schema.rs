use crate::catalog::types::{ColumnType, Row, Value};
use crate::error::AdaptdbError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub col_type: ColumnType,
    pub nullable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(table_name: &str, columns: Vec<ColumnDef>) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns,
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Shape check applied on every insert path. Visibility and key
    /// constraints are someone else's problem; this only guards arity,
    /// nullability, and per-column type agreement.
    pub fn validate_row(&self, row: &Row) -> Result<(), AdaptdbError> {
        if row.values.len() != self.columns.len() {
            return Err(AdaptdbError::RowArityMismatch {
                table: self.table_name.clone(),
                expected: self.columns.len(),
                actual: row.values.len(),
            });
        }
        for (column, value) in self.columns.iter().zip(row.values.iter()) {
            match value.column_type() {
                None => {
                    if !column.nullable {
                        return Err(AdaptdbError::NotNullViolation {
                            table: self.table_name.clone(),
                            column: column.name.clone(),
                        });
                    }
                }
                Some(actual) if actual != column.col_type => {
                    return Err(AdaptdbError::TypeMismatch {
                        table: self.table_name.clone(),
                        column: column.name.clone(),
                        expected: column.col_type.to_string(),
                        actual: actual.to_string(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IndexType {
    SkipList,
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexDef {
    pub index_name: String,
    pub table_name: String,
    pub columns: Vec<String>,
    pub index_type: IndexType,
}

impl IndexDef {
    pub fn skip_list(index_name: &str, table_name: &str, columns: &[&str]) -> Self {
        Self {
            index_name: index_name.to_string(),
            table_name: table_name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            index_type: IndexType::SkipList,
        }
    }

    pub fn hash(index_name: &str, table_name: &str, columns: &[&str]) -> Self {
        Self {
            index_name: index_name.to_string(),
            table_name: table_name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            index_type: IndexType::Hash,
        }
    }
}
