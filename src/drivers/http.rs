use reqwest::blocking::{Client, Response};
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::Connection;
use crate::config::settings::ConnectionSettings;
use crate::error::{Error, Result};

const EXCEPTION_CODE_HEADER: &str = "X-ClickHouse-Exception-Code";
/// HTTP port of a stock server, used when the native port does not name one.
const DEFAULT_HTTP_PORT: u16 = 8123;

/// ClickHouse over its HTTP interface.
pub struct HttpConnection {
    client: Client,
    base_url: String,
    user: String,
    password: Option<String>,
    /// Ask the server to record our statements in `system.query_log`.
    log_queries: bool,
}

impl HttpConnection {
    /// Connect and ping. When `settings.port` turns out to be the server's
    /// native-protocol port (9000 by default), the server names its HTTP
    /// port in the refusal and the connection moves there.
    pub fn open(settings: &ConnectionSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout).no_proxy().build()?;
        let mut conn = Self {
            client,
            base_url: settings.url(),
            user: settings.user.clone(),
            password: settings.password.clone(),
            log_queries: settings.debug,
        };

        if let Err(err) = conn.ping() {
            let Some(http_port) = http_port_hint(&err) else {
                return Err(err);
            };
            warn!(
                "port {} speaks the native protocol, using HTTP port {http_port} instead",
                settings.port
            );
            conn.base_url = ConnectionSettings { port: http_port, ..settings.clone() }.url();
            conn.ping()?;
        }
        Ok(conn)
    }

    fn post(&self, body: String) -> Result<String> {
        let mut request = self
            .client
            .post(&self.base_url)
            .header("X-ClickHouse-User", &self.user)
            .body(body);
        if self.log_queries {
            request = request.query(&[("log_queries", "1")]);
        }
        if let Some(password) = &self.password {
            request = request.header("X-ClickHouse-Key", password);
        }
        read_body(request.send()?)
    }
}

impl Connection for HttpConnection {
    fn name(&self) -> &'static str {
        "clickhouse-http"
    }

    fn ping(&self) -> Result<()> {
        debug!(url = %self.base_url, "ping");
        let body = read_body(self.client.get(format!("{}ping", self.base_url)).send()?)?;
        trace!(response = body.trim(), "pong");
        Ok(())
    }

    fn query(&self, sql: &str) -> Result<Vec<Value>> {
        debug!(sql, "query");
        let body = self.post(format!("{sql} FORMAT JSONEachRow"))?;
        let rows = parse_rows(&body)?;
        trace!(rows = rows.len(), "query finished");
        Ok(rows)
    }

    fn execute(&self, sql: &str) -> Result<()> {
        debug!(sql, "execute");
        self.post(sql.to_string())?;
        Ok(())
    }
}

fn read_body(response: Response) -> Result<String> {
    let status = response.status();
    let header_code = response
        .headers()
        .get(EXCEPTION_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i32>().ok());
    let body = response.text()?;
    if status.is_success() && header_code.is_none() {
        return Ok(body);
    }
    Err(server_error(status.as_u16(), header_code, &body))
}

/// Build the error for a failed request, preferring the server's own
/// exception code over the HTTP status.
pub(crate) fn server_error(status: u16, header_code: Option<i32>, body: &str) -> Error {
    let message = body.trim().to_string();
    let code = header_code
        .or_else(|| exception_code(&message))
        .unwrap_or(i32::from(status));
    Error::Server { code, message }
}

/// The HTTP port to retry on, if `err` is the server's answer to an HTTP
/// request sent to its native port ("Port 9000 is for clickhouse-client
/// program. You must use port 8123 for HTTP.").
fn http_port_hint(err: &Error) -> Option<u16> {
    let Error::Server { message, .. } = err else {
        return None;
    };
    if !message.contains("is for clickhouse-client program") {
        return None;
    }
    let port = message
        .split("You must use port ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|port| port.parse().ok());
    Some(port.unwrap_or(DEFAULT_HTTP_PORT))
}

fn exception_code(message: &str) -> Option<i32> {
    let rest = message.strip_prefix("Code:")?.trim_start();
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Split a `JSONEachRow` body into rows.
pub(crate) fn parse_rows(body: &str) -> Result<Vec<Value>> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(Error::from))
        .collect()
}
