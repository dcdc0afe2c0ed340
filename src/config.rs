//! Configuration from environment variables.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::game::session::{Rules, DEFAULT_WINNING_SCORE};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address to bind, always on 0.0.0.0.
    pub addr: SocketAddr,
    pub rules: Rules,
    /// Interval between liveness pings; a connection that misses one is dropped.
    pub heartbeat: Duration,
    /// Destroy a room once its last member leaves.
    pub reap_empty_rooms: bool,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            rules: Rules::default(),
            heartbeat: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            reap_empty_rooms: true,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Reads `PORT`, `WINNING_SCORE`, `HEARTBEAT_SECS`, `REAP_EMPTY_ROOMS`
    /// and `LOG_FORMAT`. Missing or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let port = get("PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let winning_score = get("WINNING_SCORE")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_WINNING_SCORE);
        let heartbeat = get("HEARTBEAT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_HEARTBEAT_SECS);
        let reap_empty_rooms = get("REAP_EMPTY_ROOMS")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(true);
        let log_format = match get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            rules: Rules { winning_score },
            heartbeat: Duration::from_secs(heartbeat),
            reap_empty_rooms,
            log_format,
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
