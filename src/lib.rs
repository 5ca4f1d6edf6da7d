pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod query;
pub mod storage;
pub mod txn;

use crate::catalog::schema::{IndexDef, TableSchema};
use crate::catalog::types::Row;
use crate::config::AdaptdbConfig;
use crate::error::{AdaptdbError, ResourceType};
use crate::index::SecondaryIndex;
use crate::index::builder::{BackgroundBuilder, BuildMode, IndexBuilder};
use crate::logging::LogRouter;
use crate::query::error::QueryError;
use crate::query::hybrid_scan::{ScanResult, execute_scan};
use crate::query::plan::{HybridScanPlan, ScanOptions};
use crate::storage::table::DataTable;
use crate::storage::tile_group::TupleLocator;
use crate::txn::{Transaction, TransactionManager};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// An in-process storage engine instance: tables, their indexes, the
/// transaction manager, and the per-worker log buffer pools.
pub struct AdaptdbInstance {
    config: AdaptdbConfig,
    txn_manager: Arc<TransactionManager>,
    tables: RwLock<HashMap<String, Arc<DataTable>>>,
    log_router: LogRouter,
}

impl AdaptdbInstance {
    pub fn open(config: AdaptdbConfig) -> Result<Self, AdaptdbError> {
        config.validate()?;
        let log_router = LogRouter::new(
            config.log_buffer_queue_size,
            config.log_buffer_capacity_bytes,
        );
        Ok(Self {
            config,
            txn_manager: Arc::new(TransactionManager::new()),
            tables: RwLock::new(HashMap::new()),
            log_router,
        })
    }

    pub fn config(&self) -> &AdaptdbConfig {
        &self.config
    }

    pub fn txn_manager(&self) -> &Arc<TransactionManager> {
        &self.txn_manager
    }

    pub fn create_table(&self, schema: TableSchema) -> Result<Arc<DataTable>, AdaptdbError> {
        let mut tables = self.tables.write();
        if tables.contains_key(&schema.table_name) {
            return Err(AdaptdbError::AlreadyExists {
                resource_type: ResourceType::Table,
                resource_id: schema.table_name.clone(),
            });
        }
        let name = schema.table_name.clone();
        let table = Arc::new(DataTable::new(schema, self.config.tuples_per_tile_group));
        tables.insert(name.clone(), Arc::clone(&table));
        info!(table = %name, "created table");
        Ok(table)
    }

    pub fn table(&self, name: &str) -> Result<Arc<DataTable>, AdaptdbError> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| AdaptdbError::NotFound {
                resource_type: ResourceType::Table,
                resource_id: name.to_string(),
            })
    }

    /// Registers an empty index on a table. Population is the builder's job;
    /// until it advances the coverage cursor, scans treat the whole table as
    /// uncovered.
    pub fn create_index(&self, def: IndexDef) -> Result<Arc<SecondaryIndex>, AdaptdbError> {
        let table = self.table(&def.table_name)?;
        let name = def.index_name.clone();
        let index = Arc::new(SecondaryIndex::build(def, table.schema())?);
        table.add_index(Arc::clone(&index))?;
        info!(index = %name, table = table.name(), "created index");
        Ok(index)
    }

    /// Starts the single background builder for (table, index).
    pub fn spawn_index_builder(
        &self,
        table_name: &str,
        index_name: &str,
        mode: BuildMode,
    ) -> Result<BackgroundBuilder, AdaptdbError> {
        let table = self.table(table_name)?;
        let index = table.index(index_name).ok_or_else(|| AdaptdbError::NotFound {
            resource_type: ResourceType::Index,
            resource_id: index_name.to_string(),
        })?;
        let builder = IndexBuilder::new(table, index);
        Ok(BackgroundBuilder::spawn(
            builder,
            mode,
            Duration::from_millis(self.config.builder_idle_backoff_ms),
        ))
    }

    pub fn begin_transaction(&self) -> Transaction {
        self.txn_manager.begin()
    }

    pub fn commit_transaction(&self, txn: Transaction) -> u64 {
        self.txn_manager.commit(txn)
    }

    /// Appends one tuple, records it in the transaction, and fires a log
    /// record at the worker's buffer pool.
    pub fn insert(
        &self,
        txn: &mut Transaction,
        table_name: &str,
        row: &Row,
        worker_id: usize,
    ) -> Result<TupleLocator, AdaptdbError> {
        let table = self.table(table_name)?;
        let locator = table.append_tuple(row)?;
        self.txn_manager.record_insert(txn, locator);
        self.log_router
            .log_insert(worker_id, self.txn_manager.visible_seq(), locator);
        Ok(locator)
    }

    /// Runs a hybrid scan under the instance's predicate-strictness policy.
    pub fn scan(&self, plan: &HybridScanPlan, txn: &Transaction) -> Result<ScanResult, QueryError> {
        execute_scan(
            plan,
            ScanOptions {
                strict_index_predicates: self.config.strict_index_predicates,
            },
            txn,
            &self.txn_manager,
        )
    }
}

impl std::fmt::Debug for AdaptdbInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptdbInstance")
            .field("tables", &self.tables.read().len())
            .finish()
    }
}
