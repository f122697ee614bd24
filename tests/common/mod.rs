//! In-process fake Sonic engine for integration tests.
//!
//! Speaks the channel protocol over a real TCP listener and keeps an
//! in-memory index: collection -> bucket -> object -> terms. Terms are the
//! lowercased alphanumeric words of pushed text.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sonicwire::ClientConfig;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};

pub const PASSWORD: &str = "SecretPassword";

/// bucket -> object -> terms, objects kept in push order
type Bucket = Vec<(String, Vec<String>)>;
type Index = HashMap<String, HashMap<String, Bucket>>;

struct Shared {
    password: String,
    query_delay: Duration,
    index: Mutex<Index>,
    received: Mutex<Vec<String>>,
    accepted: AtomicUsize,
    open: AtomicUsize,
    peak_open: AtomicUsize,
    markers: AtomicU64,
}

/// Handle to a running fake engine.
#[derive(Clone)]
pub struct FakeSonic {
    port: u16,
    shared: Arc<Shared>,
}

impl FakeSonic {
    pub async fn start() -> Self {
        Self::start_with_delay(Duration::ZERO).await
    }

    /// Starts an engine that waits `query_delay` before each `EVENT` line.
    pub async fn start_with_delay(query_delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let shared = Arc::new(Shared {
            password: PASSWORD.to_string(),
            query_delay,
            index: Mutex::new(HashMap::new()),
            received: Mutex::new(Vec::new()),
            accepted: AtomicUsize::new(0),
            open: AtomicUsize::new(0),
            peak_open: AtomicUsize::new(0),
            markers: AtomicU64::new(0),
        });

        let accept_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let shared = Arc::clone(&accept_shared);
                shared.accepted.fetch_add(1, Ordering::SeqCst);
                let open = shared.open.fetch_add(1, Ordering::SeqCst) + 1;
                shared.peak_open.fetch_max(open, Ordering::SeqCst);
                tokio::spawn(async move {
                    serve(stream, &shared).await;
                    shared.open.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        Self { port, shared }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new("127.0.0.1", self.port).password(PASSWORD)
    }

    /// Sockets accepted so far.
    pub fn accepted(&self) -> usize {
        self.shared.accepted.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open sockets seen.
    pub fn peak_open(&self) -> usize {
        self.shared.peak_open.load(Ordering::SeqCst)
    }

    /// Every command line received after the handshake, in order.
    pub fn received(&self) -> Vec<String> {
        self.shared.received.lock().unwrap().clone()
    }

    /// Received lines starting with `verb`.
    pub fn received_verb(&self, verb: &str) -> Vec<String> {
        self.received()
            .into_iter()
            .filter(|line| line.split(' ').next() == Some(verb))
            .collect()
    }
}

/// Starts a listener that accepts sockets and never answers.
pub async fn start_silent() -> ClientConfig {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    ClientConfig::new("127.0.0.1", port).password(PASSWORD)
}

async fn send(write: &mut OwnedWriteHalf, line: &str) -> bool {
    write.write_all(format!("{}\r\n", line).as_bytes()).await.is_ok()
}

async fn serve(stream: TcpStream, shared: &Shared) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    if !send(&mut write, "CONNECTED <sonic-server v1.4.9>").await {
        return;
    }

    let channel = match lines.next_line().await {
        Ok(Some(line)) => {
            let parts: Vec<&str> = line.split(' ').collect();
            if parts.len() != 3 || parts[0] != "START" {
                send(&mut write, "ERR invalid_format(START <mode> <password>)").await;
                return;
            }
            if parts[2] != shared.password {
                send(&mut write, "ERR authentication_failed").await;
                return;
            }
            let channel = parts[1].to_string();
            send(
                &mut write,
                &format!("STARTED {} protocol(1) buffer(20000)", channel),
            )
            .await;
            channel
        }
        _ => return,
    };

    while let Ok(Some(line)) = lines.next_line().await {
        shared.received.lock().unwrap().push(line.clone());
        let args = tokenize(&line);
        let verb = args.first().map(String::as_str).unwrap_or("");

        match verb {
            "QUERY" | "SUGGEST" | "LIST" => {
                let marker = format!(
                    "m{:07}",
                    shared.markers.fetch_add(1, Ordering::SeqCst)
                );
                let items = match deferred(verb, &args, shared) {
                    Ok(items) => items,
                    Err(reason) => {
                        send(&mut write, &format!("ERR {}", reason)).await;
                        continue;
                    }
                };
                if !send(&mut write, &format!("PENDING {}", marker)).await {
                    break;
                }
                if !shared.query_delay.is_zero() {
                    tokio::time::sleep(shared.query_delay).await;
                }
                let mut event = format!("EVENT {} {}", verb, marker);
                for item in items {
                    event.push(' ');
                    event.push_str(&item);
                }
                if !send(&mut write, &event).await {
                    break;
                }
            }
            "QUIT" => {
                send(&mut write, "ENDED quit").await;
                break;
            }
            _ => {
                let reply = immediate(verb, &args, &channel, shared);
                if !send(&mut write, &reply).await {
                    break;
                }
            }
        }
    }
}

/// Splits a command line into arguments; a quoted argument keeps its
/// spaces and has `\"` and `\\` unescaped.
fn tokenize(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c == ' ' {
            chars.next();
            continue;
        }
        let mut arg = String::new();
        if c == '"' {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(next) = chars.next() {
                            arg.push(next);
                        }
                    }
                    '"' => break,
                    _ => arg.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ' ' {
                    break;
                }
                arg.push(c);
                chars.next();
            }
        }
        args.push(arg);
    }
    args
}

fn terms(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if !out.contains(&word) {
            out.push(word);
        }
    }
    out
}

/// Reads `LIMIT(n)` / `OFFSET(n)` from the trailing arguments.
fn meta(args: &[String], key: &str) -> Result<Option<usize>, String> {
    for arg in args {
        if let Some(value) = arg
            .strip_prefix(key)
            .and_then(|r| r.strip_prefix('('))
            .and_then(|r| r.strip_suffix(')'))
        {
            return match value.parse::<usize>() {
                Ok(0) | Err(_) => Err(format!("invalid_meta_value({})", arg)),
                Ok(n) => Ok(Some(n)),
            };
        }
    }
    Ok(None)
}

fn is_meta(arg: &str) -> bool {
    ["LIMIT(", "OFFSET(", "LANG("]
        .iter()
        .any(|p| arg.starts_with(p))
}

fn deferred(verb: &str, args: &[String], shared: &Shared) -> Result<Vec<String>, String> {
    let limit = meta(args, "LIMIT")?.unwrap_or(10);
    let offset = if verb == "SUGGEST" {
        0
    } else {
        meta(args, "OFFSET")?.unwrap_or(0)
    };
    let plain: Vec<&String> = args[1..].iter().filter(|a| !is_meta(a)).collect();
    if plain.is_empty() {
        return Err("invalid_format".to_string());
    }

    let index = shared.index.lock().unwrap();
    let bucket = plain
        .get(1)
        .and_then(|b| index.get(plain[0].as_str()).and_then(|c| c.get(b.as_str())));
    let bucket = match bucket {
        Some(bucket) => bucket,
        None => return Ok(Vec::new()),
    };

    let items: Vec<String> = match verb {
        "QUERY" => {
            let wanted = terms(plain.get(2).map(|s| s.as_str()).unwrap_or(""));
            bucket
                .iter()
                .rev()
                .filter(|(_, t)| wanted.iter().all(|w| t.contains(w)))
                .map(|(object, _)| object.clone())
                .collect()
        }
        "SUGGEST" => {
            let prefix = plain
                .get(2)
                .map(|s| s.to_lowercase())
                .unwrap_or_default();
            let mut words: Vec<String> = bucket
                .iter()
                .flat_map(|(_, t)| t.iter())
                .filter(|w| w.starts_with(&prefix))
                .cloned()
                .collect();
            words.sort();
            words.dedup();
            words
        }
        _ => {
            let mut words: Vec<String> = bucket
                .iter()
                .flat_map(|(_, t)| t.iter())
                .cloned()
                .collect();
            words.sort();
            words.dedup();
            words
        }
    };

    Ok(items.into_iter().skip(offset).take(limit).collect())
}

fn immediate(verb: &str, args: &[String], channel: &str, shared: &Shared) -> String {
    let arg = |n: usize| args.get(n).map(String::as_str);
    let mut index = shared.index.lock().unwrap();

    match verb {
        "PING" => "PONG".to_string(),
        "HELP" => {
            let commands = match channel {
                "search" => "QUERY, SUGGEST, LIST, PING, HELP, QUIT",
                "ingest" => "PUSH, POP, COUNT, FLUSHB, FLUSHC, FLUSHO, PING, HELP, QUIT",
                _ => "TRIGGER, INFO, PING, HELP, QUIT",
            };
            format!("RESULT commands({})", commands)
        }
        "PUSH" => match (arg(1), arg(2), arg(3), arg(4)) {
            (Some(c), Some(b), Some(o), Some(text)) => {
                let bucket = index
                    .entry(c.to_string())
                    .or_default()
                    .entry(b.to_string())
                    .or_default();
                let new_terms = terms(text);
                match bucket.iter_mut().find(|(object, _)| object == o) {
                    Some((_, existing)) => {
                        for term in new_terms {
                            if !existing.contains(&term) {
                                existing.push(term);
                            }
                        }
                    }
                    None => bucket.push((o.to_string(), new_terms)),
                }
                "OK".to_string()
            }
            _ => "ERR invalid_format(PUSH <collection> <bucket> <object> \"<text>\")".to_string(),
        },
        "POP" => match (arg(1), arg(2), arg(3), arg(4)) {
            (Some(c), Some(b), Some(o), Some(text)) => {
                let removed = index
                    .get_mut(c)
                    .and_then(|c| c.get_mut(b))
                    .and_then(|b| b.iter_mut().find(|(object, _)| object == o))
                    .map(|(_, existing)| {
                        let before = existing.len();
                        let gone = terms(text);
                        existing.retain(|t| !gone.contains(t));
                        before - existing.len()
                    })
                    .unwrap_or(0);
                format!("RESULT {}", removed)
            }
            _ => "ERR invalid_format(POP <collection> <bucket> <object> \"<text>\")".to_string(),
        },
        "COUNT" => {
            let collection = index.get(arg(1).unwrap_or(""));
            let count = match (collection, arg(2), arg(3)) {
                (None, _, _) => 0,
                (Some(c), None, _) => c.len(),
                (Some(c), Some(b), None) => c.get(b).map_or(0, |b| b.len()),
                (Some(c), Some(b), Some(o)) => c
                    .get(b)
                    .and_then(|b| b.iter().find(|(object, _)| object == o))
                    .map_or(0, |(_, t)| t.len()),
            };
            format!("RESULT {}", count)
        }
        "FLUSHC" => {
            let flushed = index
                .remove(arg(1).unwrap_or(""))
                .map_or(0, |c| c.values().map(|b| b.len()).sum::<usize>());
            format!("RESULT {}", flushed)
        }
        "FLUSHB" => {
            let flushed = match (arg(1), arg(2)) {
                (Some(c), Some(b)) => index
                    .get_mut(c)
                    .and_then(|c| c.remove(b))
                    .map_or(0, |b| b.len()),
                _ => 0,
            };
            format!("RESULT {}", flushed)
        }
        "FLUSHO" => {
            let flushed = match (arg(1), arg(2), arg(3)) {
                (Some(c), Some(b), Some(o)) => index
                    .get_mut(c)
                    .and_then(|c| c.get_mut(b))
                    .and_then(|b| {
                        let pos = b.iter().position(|(object, _)| object == o)?;
                        Some(b.remove(pos).1.len())
                    })
                    .unwrap_or(0),
                _ => 0,
            };
            format!("RESULT {}", flushed)
        }
        "TRIGGER" => match (arg(1), arg(2)) {
            (None, _) | (Some("consolidate"), None) => "OK".to_string(),
            (Some("backup"), Some(_)) | (Some("restore"), Some(_)) => "OK".to_string(),
            _ => "ERR invalid_format(TRIGGER [<action>]?)".to_string(),
        },
        "INFO" => format!(
            "RESULT uptime(42) clients_connected({}) commands_total({}) command_latency_best(1) command_latency_worst(3) kv_open_count({})",
            shared.open.load(Ordering::SeqCst),
            shared.received.lock().unwrap().len(),
            index.len(),
        ),
        _ => "ERR unknown_command".to_string(),
    }
}
