//! FTN node addresses, as carried in `M_ADR` frames.
//!
//! Parsing here is limited to the wire grammar `zone:net/node[.point][@domain]`
//! that every Binkp implementation must round-trip to exchange `M_ADR`.
//! Anything beyond that — validating an address against a nodelist,
//! resolving a domain alias, accepting operator-entered address strings —
//! is the embedder's problem (parsing arbitrary FTN address strings is an
//! external collaborator concern).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A fully-qualified FidoNet Technology Network address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub zone: u16,
    pub net: u16,
    pub node: u16,
    pub point: u16,
    pub domain: Option<String>,
}

impl Address {
    pub fn new(zone: u16, net: u16, node: u16) -> Self {
        Self {
            zone,
            net,
            node,
            point: 0,
            domain: None,
        }
    }

    pub fn with_point(mut self, point: u16) -> Self {
        self.point = point;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.zone, self.net, self.node)?;
        if self.point != 0 {
            write!(f, ".{}", self.point)?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "@{domain}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("missing zone separator ':' in address {0:?}")]
    MissingZone(String),
    #[error("missing net/node separator '/' in address {0:?}")]
    MissingNet(String),
    #[error("invalid numeric component in address {0:?}")]
    InvalidNumber(String),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rest, domain) = match s.split_once('@') {
            Some((rest, domain)) => (rest, Some(domain.to_string())),
            None => (s, None),
        };

        let (zone_str, rest) = rest
            .split_once(':')
            .ok_or_else(|| AddressParseError::MissingZone(s.to_string()))?;
        let (net_str, node_point) = rest
            .split_once('/')
            .ok_or_else(|| AddressParseError::MissingNet(s.to_string()))?;
        let (node_str, point_str) = match node_point.split_once('.') {
            Some((node, point)) => (node, Some(point)),
            None => (node_point, None),
        };

        let parse_u16 = |v: &str| v.parse::<u16>().map_err(|_| AddressParseError::InvalidNumber(s.to_string()));

        Ok(Address {
            zone: parse_u16(zone_str)?,
            net: parse_u16(net_str)?,
            node: parse_u16(node_str)?,
            point: point_str.map(parse_u16).transpose()?.unwrap_or(0),
            domain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plain_address() {
        let addr: Address = "2:345/6".parse().unwrap();
        assert_eq!(addr, Address::new(2, 345, 6));
        assert_eq!(addr.to_string(), "2:345/6");
    }

    #[test]
    fn round_trips_point_and_domain() {
        let addr: Address = "2:345/6.7@fidonet".parse().unwrap();
        assert_eq!(addr, Address::new(2, 345, 6).with_point(7).with_domain("fidonet"));
        assert_eq!(addr.to_string(), "2:345/6.7@fidonet");
    }

    #[test]
    fn rejects_missing_separators() {
        assert!("2345/6".parse::<Address>().is_err());
        assert!("2:3456".parse::<Address>().is_err());
    }
}
