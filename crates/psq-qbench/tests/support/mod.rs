//! Scripted transport for exercising the client without a network.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use psq_config::QBenchConfig;
use psq_qbench::{HttpRequest, HttpResponse, Transport, TransportError};
use serde_json::{Value, json};

pub const TOKEN_PATH: &str = "qbench/oauth2/v1/token";

type Reply = Result<HttpResponse, TransportError>;

/// Replies are queued per path suffix; the last reply for a path repeats.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    delays: Mutex<HashMap<String, Duration>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that hands out one long-lived token.
    pub fn authenticated() -> Self {
        Self::new().on(TOKEN_PATH, vec![token("tok-1", 3600)])
    }

    pub fn on(self, suffix: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(suffix.to_string(), replies.into());
        self
    }

    pub fn slow(self, suffix: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(suffix.to_string(), delay);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn requests_to(&self, suffix: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| matches_suffix(&r.url, suffix))
            .collect()
    }

    pub fn calls_to(&self, suffix: &str) -> usize {
        self.requests_to(suffix).len()
    }
}

fn matches_suffix(url: &str, suffix: &str) -> bool {
    url.ends_with(&format!("/{suffix}"))
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Reply {
        self.log.lock().unwrap().push(request.clone());

        let delay = self
            .delays
            .lock()
            .unwrap()
            .iter()
            .find(|(suffix, _)| matches_suffix(&request.url, suffix))
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts
            .iter_mut()
            .find(|(suffix, _)| matches_suffix(&request.url, suffix))
            .map(|(_, queue)| queue);
        match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, ""))),
            None => Ok(HttpResponse::new(404, "no script for path")),
        }
    }
}

pub fn token(bearer: &str, expires_in: i64) -> Reply {
    ok(json!({"access_token": bearer, "expires_in": expires_in}))
}

pub fn ok(body: Value) -> Reply {
    Ok(HttpResponse::new(200, body.to_string()))
}

pub fn status(code: u16) -> Reply {
    Ok(HttpResponse::new(code, format!("{{\"error\":\"status {code}\"}}")))
}

pub fn config() -> QBenchConfig {
    QBenchConfig {
        base_url: "https://lab.qbench.net".into(),
        client_id: "client".into(),
        client_secret: "secret".into(),
        jwt_ttl_secs: Some(3580),
        jwt_leeway_secs: Some(20),
        base_delay_ms: 1,
        max_delay_ms: 5,
        ..Default::default()
    }
}

pub fn sample(id: Value, name: &str) -> Value {
    json!({"data": {"id": id, "sample_name": name, "custom_formatted_id": format!("PS-{id}")}})
}
