//! Scripted [`QueryExecutor`] for unit tests.

use std::collections::VecDeque;

use crate::core::traits::{QueryExecutor, Row};
use crate::core::value::Params;
use crate::error::{DialectError, Result};

/// Canned response to one statement.
#[derive(Debug)]
pub(crate) enum Reply {
    Rows(Vec<Row>),
    Affected(u64),
    Error(DialectError),
}

/// Executor that records every statement and answers from a script.
///
/// A rule matches when the SQL text contains its needle. Each match consumes
/// one queued reply; statements with no pending reply succeed with zero
/// affected rows or an empty result set.
#[derive(Debug)]
pub(crate) struct ScriptedExecutor {
    pub log: Vec<String>,
    pub params: Vec<Params>,
    rules: Vec<(String, VecDeque<Reply>)>,
    pub open: bool,
    pub opens: usize,
    pub closes: usize,
    pub insert_id: Option<u64>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            log: Vec::new(),
            params: Vec::new(),
            rules: Vec::new(),
            open: true,
            opens: 0,
            closes: 0,
            insert_id: None,
        }
    }

    /// Queue a reply for the next statement containing `needle`.
    pub fn on(&mut self, needle: &str, reply: Reply) -> &mut Self {
        match self.rules.iter_mut().find(|(n, _)| n == needle) {
            Some((_, replies)) => replies.push_back(reply),
            None => self.rules.push((needle.to_string(), VecDeque::from([reply]))),
        }
        self
    }

    /// Queue a result set for the next statement containing `needle`.
    pub fn on_rows(&mut self, needle: &str, rows: Vec<Row>) -> &mut Self {
        self.on(needle, Reply::Rows(rows))
    }

    /// Queue an error for the next statement containing `needle`.
    pub fn on_error(&mut self, needle: &str, err: DialectError) -> &mut Self {
        self.on(needle, Reply::Error(err))
    }

    fn next_reply(&mut self, sql: &str, params: &Params) -> Result<Option<Reply>> {
        if !self.open {
            return Err(DialectError::ConnectionLost("connection is not open".to_string()));
        }
        self.log.push(sql.to_string());
        self.params.push(params.clone());
        let reply = self
            .rules
            .iter_mut()
            .find(|(needle, replies)| sql.contains(needle.as_str()) && !replies.is_empty())
            .and_then(|(_, replies)| replies.pop_front());
        match reply {
            Some(Reply::Error(err)) => Err(err),
            other => Ok(other),
        }
    }
}

impl QueryExecutor for ScriptedExecutor {
    fn execute(&mut self, sql: &str, params: &Params) -> Result<u64> {
        match self.next_reply(sql, params)? {
            Some(Reply::Affected(n)) => Ok(n),
            Some(Reply::Rows(rows)) => Ok(rows.len() as u64),
            _ => Ok(0),
        }
    }

    fn query(&mut self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        match self.next_reply(sql, params)? {
            Some(Reply::Rows(rows)) => Ok(rows),
            _ => Ok(Vec::new()),
        }
    }

    fn last_insert_id(&mut self) -> Result<Option<u64>> {
        Ok(self.insert_id)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> Result<()> {
        if !self.open {
            self.open = true;
            self.opens += 1;
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.closes += 1;
        }
    }

    fn target(&self) -> String {
        "scripted:3306/test".to_string()
    }
}
