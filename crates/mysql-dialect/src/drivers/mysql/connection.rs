//! Blocking MySQL/MariaDB executor.
//!
//! Wraps one `mysql_async` connection and a current-thread tokio runtime so
//! every call blocks for exactly one round trip. Named `:param` placeholders
//! are rewritten to positional `?` markers before the statement is sent.

use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, SslOpts, Value};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::core::traits::{QueryExecutor, Row};
use crate::core::value::{Params, SqlValue};
use crate::dialect::DialectRules;
use crate::error::{DialectError, Result};
use crate::placeholder::to_positional;

/// One blocking connection to a MySQL or MariaDB server.
pub struct MysqlConnection {
    runtime: Runtime,
    opts: Opts,
    conn: Option<Conn>,
    target: String,
    last_insert_id: Option<u64>,
}

impl MysqlConnection {
    /// Prepare a connection without opening it.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        let mut builder = OptsBuilder::default()
            .ip_or_hostname(config.host.as_str())
            .tcp_port(config.port)
            .db_name(Some(config.database.as_str()))
            .user(Some(config.user.as_str()))
            .pass(Some(config.password.as_str()))
            // Use utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"]);
        if let Some(ssl) = ssl_opts(&config.ssl_mode) {
            builder = builder.ssl_opts(ssl);
        }

        Ok(Self {
            runtime,
            opts: builder.into(),
            conn: None,
            target: config.target(),
            last_insert_id: None,
        })
    }

    /// Prepare and open a connection.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut connection = Self::new(config)?;
        connection.open()?;
        Ok(connection)
    }

    /// Server version string as reported by `SELECT VERSION()`.
    pub fn server_version(&mut self) -> Result<String> {
        self.query_scalar("SELECT VERSION()", &Params::new())?
            .and_then(|v| v.to_text())
            .ok_or_else(|| DialectError::Driver("server returned no version".to_string()))
    }

    /// Dialect rules matching the connected server.
    pub fn detect_rules(&mut self) -> Result<DialectRules> {
        let version = self.server_version()?;
        debug!("Detected server version {}", version);
        DialectRules::for_server_version(&version)
    }

    /// Remember the id reported by the latest statement. A statement that
    /// generated no id clears it.
    fn record_insert_id(&mut self, insert_id: Option<u64>) {
        self.last_insert_id = insert_id.filter(|id| *id > 0);
    }

    fn conn(&mut self) -> Result<&mut Conn> {
        self.conn
            .as_mut()
            .ok_or_else(|| DialectError::ConnectionLost(format!("connection to {} is not open", self.target)))
    }
}

impl QueryExecutor for MysqlConnection {
    fn execute(&mut self, sql: &str, params: &Params) -> Result<u64> {
        let (sql, values) = to_positional(sql, params)?;
        let runtime = &self.runtime;
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| DialectError::ConnectionLost(format!("connection to {} is not open", self.target)))?;

        let (affected, insert_id) = runtime.block_on(async {
            if values.is_empty() {
                conn.query_drop(sql.as_str()).await?;
            } else {
                conn.exec_drop(sql.as_str(), positional(values)).await?;
            }
            Ok::<_, mysql_async::Error>((conn.affected_rows(), conn.last_insert_id()))
        })?;

        self.record_insert_id(insert_id);
        Ok(affected)
    }

    fn query(&mut self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        let (sql, values) = to_positional(sql, params)?;
        let runtime = &self.runtime;
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| DialectError::ConnectionLost(format!("connection to {} is not open", self.target)))?;

        let rows = runtime.block_on(async {
            let rows: Vec<mysql_async::Row> = if values.is_empty() {
                conn.query(sql.as_str()).await?
            } else {
                conn.exec(sql.as_str(), positional(values)).await?
            };
            Ok::<_, mysql_async::Error>(rows)
        })?;

        Ok(rows.iter().map(convert_row).collect())
    }

    fn last_insert_id(&mut self) -> Result<Option<u64>> {
        self.conn()?;
        Ok(self.last_insert_id)
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = self.runtime.block_on(Conn::new(self.opts.clone()))?;
        info!("Connected to MySQL: {}", self.target);
        self.conn = Some(conn);
        self.last_insert_id = None;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = self.runtime.block_on(conn.disconnect()) {
                debug!("Error while disconnecting from {}: {}", self.target, e);
            }
            info!("Disconnected from MySQL: {}", self.target);
        }
    }

    fn target(&self) -> String {
        self.target.clone()
    }
}

impl Drop for MysqlConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// TLS options for an `ssl_mode` setting.
fn ssl_opts(mode: &str) -> Option<SslOpts> {
    match mode.to_lowercase().as_str() {
        "disable" => {
            warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
            None
        }
        "prefer" | "require" => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
        "verify-ca" | "verify_ca" => Some(SslOpts::default().with_danger_skip_domain_validation(true)),
        "verify-full" | "verify_identity" => Some(SslOpts::default()),
        _ => {
            warn!("Unknown ssl_mode '{}', defaulting to Preferred", mode);
            Some(SslOpts::default().with_danger_accept_invalid_certs(true))
        }
    }
}

fn positional(values: Vec<SqlValue>) -> mysql_async::Params {
    mysql_async::Params::Positional(values.into_iter().map(to_mysql_value).collect())
}

fn to_mysql_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Bool(v) => Value::Int(i64::from(v)),
        SqlValue::Int(v) => Value::Int(v),
        SqlValue::UInt(v) => Value::UInt(v),
        SqlValue::Double(v) => Value::Double(v),
        SqlValue::Text(s) => Value::Bytes(s.into_bytes()),
        SqlValue::Bytes(b) => Value::Bytes(b),
        SqlValue::Json(v) => Value::Bytes(v.to_string().into_bytes()),
    }
}

fn from_mysql_value(value: &Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => SqlValue::Text(text.to_string()),
            Err(_) => SqlValue::Bytes(bytes.clone()),
        },
        Value::Int(v) => SqlValue::Int(*v),
        Value::UInt(v) => SqlValue::UInt(*v),
        Value::Float(v) => SqlValue::Double(f64::from(*v)),
        Value::Double(v) => SqlValue::Double(*v),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut text = format!("{:04}-{:02}-{:02}", year, month, day);
            if *hour != 0 || *minute != 0 || *second != 0 || *micros != 0 {
                text.push_str(&format!(" {:02}:{:02}:{:02}", hour, minute, second));
                if *micros != 0 {
                    text.push_str(&format!(".{:06}", micros));
                }
            }
            SqlValue::Text(text)
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let mut text = format!(
                "{}{:02}:{:02}:{:02}",
                if *negative { "-" } else { "" },
                u64::from(*days) * 24 + u64::from(*hours),
                minutes,
                seconds
            );
            if *micros != 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            SqlValue::Text(text)
        }
    }
}

fn convert_row(row: &mysql_async::Row) -> Row {
    let columns = row
        .columns_ref()
        .iter()
        .map(|c| c.name_str().into_owned())
        .collect();
    let values = (0..row.len())
        .map(|i| row.as_ref(i).map(from_mysql_value).unwrap_or(SqlValue::Null))
        .collect();
    Row::new(columns, values)
}
