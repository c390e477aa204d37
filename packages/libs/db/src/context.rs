//! Context and transaction scoping
//!
//! A [`Context`] owns one table handle per configured descriptor, all bound
//! to the same connection. Entering a transaction never mutates a context:
//! [`Context::in_transaction`] binds a fresh one to the transactional
//! connection and hands it to the callback.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::error::{DbError, Result};
use crate::factory::{DefaultTableFactory, TableFactory};
use crate::table::Table;

/// One managed table: its SQL name and the name callers look it up by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    pub table_name: String,
    pub ref_name: String,
}

impl TableDescriptor {
    pub fn new(table_name: impl Into<String>, ref_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ref_name: ref_name.into(),
        }
    }
}

#[derive(Clone)]
pub struct Context {
    connection: Arc<dyn Connection>,
    descriptors: Arc<[TableDescriptor]>,
    factory: Arc<dyn TableFactory>,
    tables: HashMap<String, Table>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("descriptors", &self.descriptors)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Context with the default factory.
    pub fn new(connection: Arc<dyn Connection>, descriptors: Vec<TableDescriptor>) -> Self {
        Self::bind(connection, descriptors, Arc::new(DefaultTableFactory))
    }

    /// Build a context: one handle per descriptor, each bound to `connection`.
    pub fn bind(
        connection: Arc<dyn Connection>,
        descriptors: impl Into<Arc<[TableDescriptor]>>,
        factory: Arc<dyn TableFactory>,
    ) -> Self {
        let descriptors = descriptors.into();
        let tables = descriptors
            .iter()
            .map(|d| {
                (
                    d.ref_name.clone(),
                    factory.create(&d.table_name, connection.clone()),
                )
            })
            .collect();

        Self {
            connection,
            descriptors,
            factory,
            tables,
        }
    }

    /// Same connection and descriptors, handles rebuilt by `factory`.
    pub fn with_factory(&self, factory: Arc<dyn TableFactory>) -> Self {
        Self::bind(self.connection.clone(), self.descriptors.clone(), factory)
    }

    pub fn table(&self, ref_name: &str) -> Result<&Table> {
        self.tables.get(ref_name).ok_or_else(|| DbError::UnknownTable {
            name: ref_name.to_string(),
        })
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn descriptors(&self) -> &[TableDescriptor] {
        &self.descriptors
    }

    /// Run `f` inside a transaction.
    ///
    /// `f` receives a context bound to the transaction. The transaction
    /// commits when `f` returns `Ok` and rolls back when it returns `Err`;
    /// the callback's error is returned as-is. Called on a context that is
    /// already transactional, this opens a savepoint scope.
    ///
    /// The inner context and its tables must not outlive the callback: once
    /// the scope closes, they fail with [`DbError::TransactionClosed`].
    pub async fn in_transaction<F, Fut, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<DbError>,
    {
        let tx = self.connection.begin().await?;
        let scoped = Self::bind(
            tx.clone().into_connection(),
            self.descriptors.clone(),
            self.factory.clone(),
        );

        match f(scoped).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}
