//! Distributed transactions shared between the queue manager and a database.
//!
//! The queue manager is the transaction coordinator of record: the database
//! connection is enlisted in the queue-manager connection's unit of work, and
//! the unit of work is begun, committed and backed out through the messaging
//! session. A database connection obtained this way must never finalize the
//! transaction on its own, which [`XaDbConnection`] enforces.

use crate::error::{ConfigurationError, DbError, MessagingError};
use crate::session::QueueSession;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

#[cfg(test)]
#[path = "transaction_tests.rs"]
mod tests;

// ============================================================================
// Isolation Level
// ============================================================================

/// Database transaction isolation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ_UNCOMMITTED",
            Self::ReadCommitted => "READ_COMMITTED",
            Self::RepeatableRead => "REPEATABLE_READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IsolationLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READ_UNCOMMITTED" => Ok(Self::ReadUncommitted),
            "READ_COMMITTED" => Ok(Self::ReadCommitted),
            "REPEATABLE_READ" => Ok(Self::RepeatableRead),
            "SERIALIZABLE" => Ok(Self::Serializable),
            _ => Err(ConfigurationError::InvalidIsolationLevel {
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Database Bridge
// ============================================================================

/// Connection provided by the database access layer
pub trait DbConnection: Send {
    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), DbError>;

    fn commit(&mut self) -> Result<(), DbError>;

    fn rollback(&mut self) -> Result<(), DbError>;

    fn close(&mut self) -> Result<(), DbError>;
}

impl<T: DbConnection + ?Sized> DbConnection for &mut T {
    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), DbError> {
        (**self).set_isolation_level(level)
    }

    fn commit(&mut self) -> Result<(), DbError> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        (**self).rollback()
    }

    fn close(&mut self) -> Result<(), DbError> {
        (**self).close()
    }
}

impl<T: DbConnection + ?Sized> DbConnection for Box<T> {
    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), DbError> {
        (**self).set_isolation_level(level)
    }

    fn commit(&mut self) -> Result<(), DbError> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        (**self).rollback()
    }

    fn close(&mut self) -> Result<(), DbError> {
        (**self).close()
    }
}

/// Source of connections that can take part in a distributed transaction
pub trait XaDataSource: Send + Sync {
    fn xa_connection(&self) -> Result<Box<dyn DbConnection>, DbError>;
}

/// Database connection enlisted in a queue-manager unit of work.
///
/// Commit, rollback and close are no-ops: the queue manager finalizes the
/// transaction branch and releases the connection.
pub struct XaDbConnection {
    inner: Box<dyn DbConnection>,
}

impl XaDbConnection {
    pub fn new(inner: Box<dyn DbConnection>) -> Self {
        Self { inner }
    }

    /// The wrapped connection, for statement execution
    pub fn inner_mut(&mut self) -> &mut dyn DbConnection {
        self.inner.as_mut()
    }
}

impl DbConnection for XaDbConnection {
    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), DbError> {
        self.inner.set_isolation_level(level)
    }

    fn commit(&mut self) -> Result<(), DbError> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DbError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), DbError> {
        Ok(())
    }
}

/// Hands out database connections coordinated with a messaging session
#[derive(Clone)]
pub struct XaDbConnectionFactory {
    data_source: Arc<dyn XaDataSource>,
}

impl XaDbConnectionFactory {
    pub fn new(data_source: Arc<dyn XaDataSource>) -> Self {
        Self { data_source }
    }

    /// Obtain a connection bound to the session's transaction branch
    pub fn connection(&self, session: &mut QueueSession) -> Result<XaDbConnection, MessagingError> {
        let connection = session.database_connection(self.data_source.as_ref())?;
        Ok(XaDbConnection::new(connection))
    }
}

// ============================================================================
// Transaction Coordination
// ============================================================================

/// Begin/commit/backout of a queue-manager transaction branch
pub trait TransactionBranch {
    fn begin(&mut self) -> Result<(), MessagingError>;

    fn commit(&mut self) -> Result<(), MessagingError>;

    fn backout(&mut self) -> Result<(), MessagingError>;
}

/// Unit-of-work protocol driven by the surrounding application framework
pub trait Transaction {
    fn begin(&mut self) -> Result<(), MessagingError>;

    fn commit(&mut self) -> Result<(), MessagingError>;

    fn rollback(&mut self) -> Result<(), MessagingError>;
}

impl<T: TransactionBranch + ?Sized> TransactionBranch for &mut T {
    fn begin(&mut self) -> Result<(), MessagingError> {
        (**self).begin()
    }

    fn commit(&mut self) -> Result<(), MessagingError> {
        (**self).commit()
    }

    fn backout(&mut self) -> Result<(), MessagingError> {
        (**self).backout()
    }
}

/// Transaction that drives a queue-manager branch and aligns the enlisted
/// database connection's isolation level.
///
/// The transaction owns its branch and connection; use [`branch_mut`]
/// to do work inside the unit of work and [`into_parts`] to take them back.
///
/// [`branch_mut`]: XaTransaction::branch_mut
/// [`into_parts`]: XaTransaction::into_parts
pub struct XaTransaction<B, C> {
    branch: B,
    connection: C,
    isolation_level: IsolationLevel,
}

impl<B: TransactionBranch, C: DbConnection> XaTransaction<B, C> {
    pub fn new(branch: B, connection: C, isolation_level: IsolationLevel) -> Self {
        Self {
            branch,
            connection,
            isolation_level,
        }
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    pub fn branch_mut(&mut self) -> &mut B {
        &mut self.branch
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn into_parts(self) -> (B, C) {
        (self.branch, self.connection)
    }
}

impl<B: TransactionBranch, C: DbConnection> Transaction for XaTransaction<B, C> {
    fn begin(&mut self) -> Result<(), MessagingError> {
        // The branch has to exist before the isolation level can be applied
        self.branch.begin()?;
        debug!(target: "sql", "XaTransaction#begin()");
        self.connection
            .set_isolation_level(self.isolation_level)
            .map_err(|source| MessagingError::Database {
                message: format!("failed to set isolation level {}", self.isolation_level),
                source,
            })
    }

    fn commit(&mut self) -> Result<(), MessagingError> {
        self.branch.commit()?;
        debug!(target: "sql", "XaTransaction#commit()");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), MessagingError> {
        self.branch.backout()?;
        debug!(target: "sql", "XaTransaction#rollback()");
        Ok(())
    }
}

/// Creates [`XaTransaction`]s with a configured isolation level
#[derive(Debug, Clone, Default)]
pub struct XaTransactionFactory {
    isolation_level: IsolationLevel,
}

impl XaTransactionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_isolation_level(mut self, isolation_level: IsolationLevel) -> Self {
        self.isolation_level = isolation_level;
        self
    }

    /// Set the isolation level from its configuration name
    pub fn set_isolation_level(&mut self, name: &str) -> Result<(), ConfigurationError> {
        self.isolation_level = name.parse()?;
        Ok(())
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    pub fn transaction<B, C>(&self, branch: B, connection: C) -> XaTransaction<B, C>
    where
        B: TransactionBranch,
        C: DbConnection,
    {
        XaTransaction::new(branch, connection, self.isolation_level)
    }
}
