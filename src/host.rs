// Host Module - Machine address, its syntactic validation and the edit form behind it
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::{ConsoleError, Result};

static HOST_URL_REGEX: OnceLock<Regex> = OnceLock::new();

fn host_url_regex() -> &'static Regex {
    HOST_URL_REGEX.get_or_init(|| {
        Regex::new(r"^([a-zA-Z]+)://([a-zA-Z0-9.\-]+):([0-9]+)$").expect("host address pattern is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAddress {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl Default for HostAddress {
    fn default() -> Self {
        HostAddress {
            protocol: "http".to_string(),
            host: "192.168.188.103".to_string(),
            port: 80,
        }
    }
}

impl HostAddress {
    /// Accepts `scheme://host:port` only; no path, no missing parts
    pub fn parse(input: &str) -> Result<Self> {
        let caps = host_url_regex()
            .captures(input)
            .ok_or_else(|| ConsoleError::Validation(format!("'{}' is not of the form scheme://host:port", input)))?;
        let port = caps[3]
            .parse::<u16>()
            .map_err(|_| ConsoleError::Validation(format!("port '{}' is out of range", &caps[3])))?;
        Ok(HostAddress {
            protocol: caps[1].to_string(),
            host: caps[2].to_string(),
            port,
        })
    }

    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Base URL for API calls: the address followed by the API base path
    pub fn api_base(&self, base_path: &str) -> String {
        format!("{}{}", self, base_path.trim_end_matches('/'))
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Host address input with accept/cancel controls.
///
/// Both controls are enabled only while the input differs from the current
/// address and is syntactically valid.
#[derive(Debug, Clone)]
pub struct HostForm {
    current: HostAddress,
    input: String,
}

impl HostForm {
    pub fn new(current: HostAddress) -> Self {
        let input = current.to_string();
        HostForm { current, input }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn current(&self) -> &HostAddress {
        &self.current
    }

    pub fn set_input(&mut self, input: &str) {
        self.input = input.to_string();
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    pub fn is_dirty(&self) -> bool {
        self.input != self.current.to_string()
    }

    pub fn can_accept(&self) -> bool {
        self.is_dirty() && HostAddress::is_valid(&self.input)
    }

    pub fn can_cancel(&self) -> bool {
        self.can_accept()
    }

    /// Adopt the input as the new current address; `None` while the accept control is disabled
    pub fn accept(&mut self) -> Option<HostAddress> {
        if !self.can_accept() {
            return None;
        }
        let parsed = HostAddress::parse(&self.input).ok()?;
        self.current = parsed.clone();
        self.input = self.current.to_string();
        Some(parsed)
    }

    /// Restore the input to the current address
    pub fn cancel(&mut self) {
        self.input = self.current.to_string();
    }

    /// Follow an address change made elsewhere (config reload) without losing a pending edit
    pub fn sync_current(&mut self, current: HostAddress) {
        let was_dirty = self.is_dirty();
        self.current = current;
        if !was_dirty {
            self.input = self.current.to_string();
        }
    }
}
