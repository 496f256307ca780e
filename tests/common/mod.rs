//! Loopback fake PLCs for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use plc_link::checksum::encode_bcc;

/// How the fake answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Serve reads and writes from memory.
    Serve,
    /// Answer with a header addressed to another PC number.
    WrongHeader,
    /// Never answer.
    Silent,
    /// Drop the first connection right after accepting it, then serve.
    DropFirst,
}

type Memory = Arc<Mutex<HashMap<u32, u16>>>;

/// A PLC on a loopback port.
pub struct FakePlc {
    pub port: u16,
    pub requests: Arc<AtomicUsize>,
    pub connections: Arc<AtomicUsize>,
    memory: Memory,
}

impl FakePlc {
    /// Mitsubishi 3E binary PLC.
    pub fn mitsubishi(behavior: Behavior) -> Self {
        Self::start(behavior, serve_mitsubishi)
    }

    /// Panasonic MEWTOCOL-COM PLC over TCP, unit 01.
    pub fn panasonic(behavior: Behavior) -> Self {
        Self::start(behavior, serve_panasonic)
    }

    fn start(behavior: Behavior, serve: fn(TcpStream, Behavior, &Memory, &AtomicUsize)) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(AtomicUsize::new(0));
        let connections = Arc::new(AtomicUsize::new(0));
        let memory: Memory = Arc::new(Mutex::new(HashMap::new()));

        let (req, conns, mem) = (requests.clone(), connections.clone(), memory.clone());
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let n = conns.fetch_add(1, Ordering::SeqCst);
                if behavior == Behavior::DropFirst && n == 0 {
                    drop(stream);
                    continue;
                }
                let (req, mem) = (req.clone(), mem.clone());
                thread::spawn(move || serve(stream, behavior, &mem, &req));
            }
        });

        Self {
            port,
            requests,
            connections,
            memory,
        }
    }

    pub fn word(&self, address: u32) -> u16 {
        self.memory.lock().unwrap().get(&address).copied().unwrap_or(0)
    }

    pub fn set_word(&self, address: u32, value: u16) {
        self.memory.lock().unwrap().insert(address, value);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Polls `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    cond()
}

fn le16(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

fn addr3(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], 0])
}

fn serve_mitsubishi(mut stream: TcpStream, behavior: Behavior, memory: &Memory, requests: &AtomicUsize) {
    loop {
        let mut head = [0u8; 9];
        if stream.read_exact(&mut head).is_err() {
            return;
        }
        let mut body = vec![0u8; usize::from(le16(&head[7..9]))];
        if stream.read_exact(&mut body).is_err() {
            return;
        }
        requests.fetch_add(1, Ordering::SeqCst);
        if behavior == Behavior::Silent {
            continue;
        }

        // body: timer(2) command(2) sub(2) ...
        let command = le16(&body[2..4]);
        let p = &body[6..];
        let mut data = Vec::new();
        {
            let mut mem = memory.lock().unwrap();
            match command {
                0x1401 => {
                    let (start, count) = (addr3(&p[0..3]), le16(&p[4..6]));
                    for i in 0..u32::from(count) {
                        let at = 6 + 2 * i as usize;
                        mem.insert(start + i, le16(&p[at..at + 2]));
                    }
                }
                0x0401 => {
                    let (start, count) = (addr3(&p[0..3]), le16(&p[4..6]));
                    for i in 0..u32::from(count) {
                        let v = mem.get(&(start + i)).copied().unwrap_or(0);
                        data.extend_from_slice(&v.to_le_bytes());
                    }
                }
                0x1402 => {
                    let (words, dwords) = (usize::from(p[0]), usize::from(p[1]));
                    let mut at = 2;
                    for _ in 0..words {
                        mem.insert(addr3(&p[at..at + 3]), le16(&p[at + 4..at + 6]));
                        at += 6;
                    }
                    for _ in 0..dwords {
                        let a = addr3(&p[at..at + 3]);
                        mem.insert(a, le16(&p[at + 4..at + 6]));
                        mem.insert(a + 1, le16(&p[at + 6..at + 8]));
                        at += 8;
                    }
                }
                0x0403 => {
                    let (words, dwords) = (usize::from(p[0]), usize::from(p[1]));
                    let mut at = 2;
                    for _ in 0..words {
                        let v = mem.get(&addr3(&p[at..at + 3])).copied().unwrap_or(0);
                        data.extend_from_slice(&v.to_le_bytes());
                        at += 4;
                    }
                    for _ in 0..dwords {
                        let a = addr3(&p[at..at + 3]);
                        for w in [a, a + 1] {
                            let v = mem.get(&w).copied().unwrap_or(0);
                            data.extend_from_slice(&v.to_le_bytes());
                        }
                        at += 4;
                    }
                }
                _ => {}
            }
        }

        let pc_no = if behavior == Behavior::WrongHeader { 0x01 } else { 0xFF };
        let mut reply = vec![0xD0, 0x00, 0x00, pc_no, 0xFF, 0x03, 0x00];
        reply.extend_from_slice(&((data.len() + 2) as u16).to_le_bytes());
        reply.extend_from_slice(&[0x00, 0x00]);
        reply.extend_from_slice(&data);
        if stream.write_all(&reply).is_err() {
            return;
        }
    }
}

fn serve_panasonic(mut stream: TcpStream, behavior: Behavior, memory: &Memory, requests: &AtomicUsize) {
    let mut pending = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        pending.extend_from_slice(&buf[..n]);
        while let Some(end) = pending.iter().position(|&b| b == b'\r') {
            let frame: Vec<u8> = pending.drain(..=end).collect();
            requests.fetch_add(1, Ordering::SeqCst);
            if behavior == Behavior::Silent {
                continue;
            }
            let text = String::from_utf8_lossy(&frame[..frame.len() - 1]).to_string();
            // "%01#" + command + BCC
            let command = &text[4..text.len() - 2];
            let unit = if behavior == Behavior::WrongHeader { "02" } else { "01" };

            let reply = {
                let mut mem = memory.lock().unwrap();
                if let Some(rest) = command.strip_prefix("WDD") {
                    let start: u32 = rest[0..5].parse().unwrap();
                    let data = hex::decode(&rest[10..]).unwrap();
                    for (i, pair) in data.chunks(2).enumerate() {
                        mem.insert(start + i as u32, le16(pair));
                    }
                    format!("%{unit}$WD")
                } else if let Some(rest) = command.strip_prefix("RDD") {
                    let start: u32 = rest[0..5].parse().unwrap();
                    let end: u32 = rest[5..10].parse().unwrap();
                    let mut data = Vec::new();
                    for a in start..=end {
                        data.extend_from_slice(&mem.get(&a).copied().unwrap_or(0).to_le_bytes());
                    }
                    format!("%{unit}$RD{}", hex::encode_upper(data))
                } else if command.starts_with("WCS") {
                    format!("%{unit}$WC")
                } else {
                    format!("%{unit}!42")
                }
            };
            let bcc = encode_bcc(&reply);
            if stream.write_all(format!("{reply}{bcc}\r").as_bytes()).is_err() {
                return;
            }
        }
    }
}
