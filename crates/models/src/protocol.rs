use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Port protocol as stored in `service_port.protocol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Http,
    Https,
    Stream,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Stream => "stream",
        }
    }

    /// HTTP ports are routed by the gateway and never get an LB mapping port.
    pub fn is_http(&self) -> bool {
        matches!(self, Protocol::Http | Protocol::Https)
    }

    /// Transport of the orchestrator port object.
    pub fn transport(&self) -> &'static str {
        match self {
            Protocol::Udp => "UDP",
            _ => "TCP",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "stream" => Ok(Protocol::Stream),
            other => Err(ModelError::Validation(format!("unsupported protocol '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("HTTP".parse::<Protocol>().unwrap(), Protocol::Http);
        assert_eq!(" stream ".parse::<Protocol>().unwrap(), Protocol::Stream);
        assert!("sctp".parse::<Protocol>().is_err());
    }

    #[test]
    fn only_udp_changes_transport() {
        assert_eq!(Protocol::Udp.transport(), "UDP");
        assert_eq!(Protocol::Stream.transport(), "TCP");
        assert_eq!(Protocol::Https.transport(), "TCP");
        assert!(Protocol::Https.is_http());
        assert!(!Protocol::Stream.is_http());
    }
}
