use std::cell::RefCell;

use serde_json::Value;

use super::Connection;
use crate::error::{Error, Result};

/// Records every call; answers queries from canned responses matched by
/// substring.
#[derive(Default)]
pub struct FakeConnection {
    responses: Vec<(String, std::result::Result<Vec<Value>, String>)>,
    fail_execute_containing: Option<String>,
    pub queries: RefCell<Vec<String>>,
    pub executed: RefCell<Vec<String>>,
    pub pings: RefCell<usize>,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, sql_fragment: &str, rows: Vec<Value>) -> Self {
        self.responses.push((sql_fragment.to_string(), Ok(rows)));
        self
    }

    pub fn fail_query(mut self, sql_fragment: &str, message: &str) -> Self {
        self.responses.push((sql_fragment.to_string(), Err(message.to_string())));
        self
    }

    pub fn fail_execute(mut self, sql_fragment: &str) -> Self {
        self.fail_execute_containing = Some(sql_fragment.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl Connection for FakeConnection {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn ping(&self) -> Result<()> {
        *self.pings.borrow_mut() += 1;
        Ok(())
    }

    fn query(&self, sql: &str) -> Result<Vec<Value>> {
        self.queries.borrow_mut().push(sql.to_string());
        let found = self.responses.iter().find(|(fragment, _)| sql.contains(fragment.as_str()));
        match found {
            Some((_, Ok(rows))) => Ok(rows.clone()),
            Some((_, Err(message))) => Err(Error::Server { code: 81, message: message.clone() }),
            None => Ok(Vec::new()),
        }
    }

    fn execute(&self, sql: &str) -> Result<()> {
        self.executed.borrow_mut().push(sql.to_string());
        match &self.fail_execute_containing {
            Some(fragment) if sql.contains(fragment.as_str()) => Err(Error::Server {
                code: 60,
                message: format!("Table doesn't exist: {sql}"),
            }),
            _ => Ok(()),
        }
    }
}
