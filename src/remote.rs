//! Client for the spreadsheet-backed endpoint.
//!
//! Reads are `GET <url>?action=getExpenses`; writes are `POST <url>` with an
//! action-tagged JSON body sent as `text/plain`. Every response is the same
//! envelope: `{ success, data?, message? }`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{KakeiboError, Result};
use crate::models::Expense;
use crate::settings::Settings;

/// The four operations the household shell needs from a backing store.
pub trait RemoteStore {
    fn fetch_expenses(&self) -> Result<Vec<Expense>>;
    /// Returns the stored record when the server echoes it back.
    fn add_expense(&self, expense: &Expense) -> Result<Option<Expense>>;
    fn toggle_settled(&self, id: &str, is_settled: bool) -> Result<()>;
    fn delete_expense(&self, id: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request<'a> {
    AddExpense {
        data: &'a Expense,
    },
    ToggleSettled {
        id: &'a str,
        #[serde(rename = "isSettled")]
        is_settled: bool,
    },
    DeleteExpense {
        id: &'a str,
    },
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Turn `success: false` into an error carrying the server's message, or
    /// `fallback` when it sent none.
    pub fn into_result(self, fallback: &str) -> Result<Option<T>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(KakeiboError::Remote(
                self.message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}

pub fn decode<T: DeserializeOwned>(body: &str) -> Result<ApiResponse<T>> {
    serde_json::from_str(body)
        .map_err(|e| KakeiboError::Transport(format!("unexpected response from endpoint: {e}")))
}

#[cfg(feature = "remote")]
pub use http::HttpStore;

#[cfg(feature = "remote")]
mod http {
    use std::time::Duration;

    use serde::de::DeserializeOwned;
    use tracing::debug;

    use super::{decode, ApiResponse, RemoteStore, Request};
    use crate::error::{KakeiboError, Result};
    use crate::models::Expense;

    pub struct HttpStore {
        agent: ureq::Agent,
        url: String,
    }

    impl HttpStore {
        pub fn new(url: &str, timeout: Duration) -> Self {
            let agent = ureq::AgentBuilder::new().timeout(timeout).build();
            Self {
                agent,
                url: url.to_string(),
            }
        }

        fn read_body(response: ureq::Response) -> Result<String> {
            response
                .into_string()
                .map_err(|e| KakeiboError::Transport(e.to_string()))
        }

        fn post<T: DeserializeOwned>(&self, request: &Request) -> Result<ApiResponse<T>> {
            let body = serde_json::to_string(request)?;
            debug!(url = %self.url, body = %body, "POST");
            let response = self
                .agent
                .post(&self.url)
                .set("Content-Type", "text/plain;charset=utf-8")
                .send_string(&body)
                .map_err(|e| KakeiboError::Transport(e.to_string()))?;
            decode(&Self::read_body(response)?)
        }
    }

    impl RemoteStore for HttpStore {
        fn fetch_expenses(&self) -> Result<Vec<Expense>> {
            debug!(url = %self.url, "GET getExpenses");
            let response = self
                .agent
                .get(&self.url)
                .query("action", "getExpenses")
                .call()
                .map_err(|e| KakeiboError::Transport(e.to_string()))?;
            let envelope: ApiResponse<Vec<Expense>> = decode(&Self::read_body(response)?)?;
            Ok(envelope
                .into_result("failed to fetch expenses")?
                .unwrap_or_default())
        }

        fn add_expense(&self, expense: &Expense) -> Result<Option<Expense>> {
            let echoed = self
                .post::<serde_json::Value>(&Request::AddExpense { data: expense })?
                .into_result("failed to add expense")?;
            Ok(echoed.and_then(|v| serde_json::from_value(v).ok()))
        }

        fn toggle_settled(&self, id: &str, is_settled: bool) -> Result<()> {
            self.post::<serde_json::Value>(&Request::ToggleSettled { id, is_settled })?
                .into_result("failed to update settled state")?;
            Ok(())
        }

        fn delete_expense(&self, id: &str) -> Result<()> {
            self.post::<serde_json::Value>(&Request::DeleteExpense { id })?
                .into_result("failed to delete expense")?;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use std::io::{BufRead, BufReader, Read, Write};
        use std::net::TcpListener;
        use std::sync::mpsc;

        use super::*;

        /// Answer one request per canned body on a local port and hand each
        /// raw request back over the channel.
        fn serve(bodies: Vec<&'static str>) -> (String, mpsc::Receiver<String>) {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let url = format!("http://{}/exec", listener.local_addr().unwrap());
            let (tx, rx) = mpsc::channel();
            std::thread::spawn(move || {
                for body in bodies {
                    let (mut stream, _) = listener.accept().unwrap();
                    let mut reader = BufReader::new(stream.try_clone().unwrap());
                    let mut head = String::new();
                    let mut length = 0usize;
                    loop {
                        let mut line = String::new();
                        reader.read_line(&mut line).unwrap();
                        if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                            length = value.trim().parse().unwrap();
                        }
                        head.push_str(&line);
                        if line == "\r\n" || line.is_empty() {
                            break;
                        }
                    }
                    let mut payload = vec![0u8; length];
                    reader.read_exact(&mut payload).unwrap();
                    head.push_str(&String::from_utf8(payload).unwrap());
                    tx.send(head).unwrap();

                    let reply = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    stream.write_all(reply.as_bytes()).unwrap();
                }
            });
            (url, rx)
        }

        fn store(url: &str) -> HttpStore {
            HttpStore::new(url, Duration::from_secs(5))
        }

        fn body_of(raw: &str) -> serde_json::Value {
            let (_, body) = raw.split_once("\r\n\r\n").unwrap();
            serde_json::from_str(body).unwrap()
        }

        #[test]
        fn test_fetch_uses_get_with_action_query() {
            let (url, requests) = serve(vec![
                r#"{"success":true,"data":[{"id":"1","date":"2026/01/18","itemName":"Rice","category":"food","amount":980,"payer":"A","isSettled":false}]}"#,
            ]);
            let expenses = store(&url).fetch_expenses().unwrap();
            assert_eq!(expenses.len(), 1);
            assert_eq!(expenses[0].item_name, "Rice");

            let raw = requests.recv().unwrap();
            assert!(raw.starts_with("GET /exec?action=getExpenses HTTP/1.1\r\n"), "{raw}");
        }

        #[test]
        fn test_writes_post_plain_text_json() {
            let (url, requests) = serve(vec![r#"{"success":true}"#]);
            store(&url).toggle_settled("id-1", true).unwrap();

            let raw = requests.recv().unwrap();
            assert!(raw.starts_with("POST /exec HTTP/1.1\r\n"), "{raw}");
            assert!(raw
                .to_ascii_lowercase()
                .contains("content-type: text/plain;charset=utf-8\r\n"));
            assert_eq!(
                body_of(&raw),
                serde_json::json!({"action": "toggleSettled", "id": "id-1", "isSettled": true})
            );
        }

        #[test]
        fn test_add_sends_record_and_reads_echo() {
            let (url, requests) = serve(vec![
                r#"{"success":true,"data":{"id":"x1","date":"2026/02/01","itemName":"Tea","category":"food","amount":300,"payer":"B","isSettled":false}}"#,
            ]);
            let expense = Expense {
                id: "x1".to_string(),
                date: "2026/02/01".to_string(),
                item_name: "Tea".to_string(),
                category: "food".to_string(),
                amount: 300,
                payer: "B".to_string(),
                is_settled: false,
            };
            let echoed = store(&url).add_expense(&expense).unwrap();
            assert_eq!(echoed, Some(expense));

            let body = body_of(&requests.recv().unwrap());
            assert_eq!(body["action"], "addExpense");
            assert_eq!(body["data"]["itemName"], "Tea");
        }

        #[test]
        fn test_rejected_write_is_remote_error() {
            let (url, _requests) = serve(vec![r#"{"success":false,"message":"sheet locked"}"#]);
            match store(&url).delete_expense("id-1") {
                Err(KakeiboError::Remote(msg)) => assert_eq!(msg, "sheet locked"),
                other => panic!("unexpected: {other:?}"),
            }
        }

        #[test]
        fn test_closed_port_is_transport_error() {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let url = format!("http://{}/exec", listener.local_addr().unwrap());
            drop(listener);
            assert!(matches!(store(&url).fetch_expenses(), Err(KakeiboError::Transport(_))));
        }
    }
}

/// Build the configured remote store. `None` means local-only: offline mode,
/// no endpoint configured, or the crate was built without the `remote`
/// feature.
pub fn connect(settings: &Settings, offline: bool) -> Option<Box<dyn RemoteStore>> {
    if offline {
        return None;
    }
    let url = settings.endpoint()?;
    build_store(&url, settings.timeout_secs)
}

#[cfg(feature = "remote")]
fn build_store(url: &str, timeout_secs: u64) -> Option<Box<dyn RemoteStore>> {
    let timeout = std::time::Duration::from_secs(timeout_secs.max(1));
    Some(Box::new(HttpStore::new(url, timeout)))
}

#[cfg(not(feature = "remote"))]
fn build_store(url: &str, _timeout_secs: u64) -> Option<Box<dyn RemoteStore>> {
    tracing::warn!(%url, "built without the `remote` feature; endpoint ignored");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Expense {
        Expense {
            id: "id-1".to_string(),
            date: "2026/01/18".to_string(),
            item_name: "Supermarket".to_string(),
            category: "food".to_string(),
            amount: 1691,
            payer: "A".to_string(),
            is_settled: false,
        }
    }

    #[test]
    fn test_add_request_shape() {
        let e = sample();
        let body = serde_json::to_value(Request::AddExpense { data: &e }).unwrap();
        assert_eq!(body["action"], "addExpense");
        assert_eq!(body["data"]["itemName"], "Supermarket");
        assert_eq!(body["data"]["isSettled"], false);
    }

    #[test]
    fn test_toggle_request_shape() {
        let body = serde_json::to_value(Request::ToggleSettled { id: "id-1", is_settled: true }).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"action": "toggleSettled", "id": "id-1", "isSettled": true})
        );
    }

    #[test]
    fn test_delete_request_shape() {
        let body = serde_json::to_value(Request::DeleteExpense { id: "id-1" }).unwrap();
        assert_eq!(body, serde_json::json!({"action": "deleteExpense", "id": "id-1"}));
    }

    #[test]
    fn test_decode_success_with_data() {
        let raw = r#"{"success":true,"data":[{"id":"1","date":"2026/01/18","itemName":"x","category":"food","amount":5,"payer":"A","isSettled":false}]}"#;
        let resp: ApiResponse<Vec<Expense>> = decode(raw).unwrap();
        let data = resp.into_result("failed").unwrap().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].amount, 5);
    }

    #[test]
    fn test_decode_failure_uses_server_message() {
        let resp: ApiResponse<Vec<Expense>> = decode(r#"{"success":false,"message":"sheet locked"}"#).unwrap();
        match resp.into_result("failed to fetch expenses") {
            Err(KakeiboError::Remote(msg)) => assert_eq!(msg, "sheet locked"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_failure_without_message_uses_fallback() {
        let resp: ApiResponse<serde_json::Value> = decode(r#"{"success":false}"#).unwrap();
        match resp.into_result("failed to delete expense") {
            Err(KakeiboError::Remote(msg)) => assert_eq!(msg, "failed to delete expense"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_garbage_is_transport_error() {
        let result: Result<ApiResponse<serde_json::Value>> = decode("<html>Moved</html>");
        assert!(matches!(result, Err(KakeiboError::Transport(_))));
    }

    #[test]
    fn test_connect_offline_or_unconfigured() {
        let settings = Settings::default();
        assert!(connect(&settings, true).is_none());
        let configured = Settings {
            endpoint_url: Some("https://example.invalid/exec".to_string()),
            ..Settings::default()
        };
        assert!(connect(&configured, true).is_none());
    }
}
