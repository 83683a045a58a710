use serde_json::Value;

use crate::error::Result;

pub mod http;

#[cfg(test)]
pub mod fake;

/// A live session with the database server. One connection is opened per run
/// and reused for every catalog query and freeze statement.
pub trait Connection {
    fn name(&self) -> &'static str;

    /// Fail unless the server answers.
    fn ping(&self) -> Result<()>;

    /// Run a `SELECT`-style statement and return one JSON object per row,
    /// in server order.
    fn query(&self, sql: &str) -> Result<Vec<Value>>;

    /// Run a statement that returns no rows.
    fn execute(&self, sql: &str) -> Result<()>;
}

impl<T: Connection + ?Sized> Connection for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn ping(&self) -> Result<()> {
        (**self).ping()
    }

    fn query(&self, sql: &str) -> Result<Vec<Value>> {
        (**self).query(sql)
    }

    fn execute(&self, sql: &str) -> Result<()> {
        (**self).execute(sql)
    }
}
