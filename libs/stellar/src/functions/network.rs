//! Network functions: address classification, CIDR membership and URL parts.

use super::helpers::{as_text, check_arity, opt_str, type_mismatch};
use super::Builtin;
use crate::error::Result;
use crate::value::Value;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::Url;

pub(super) const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "IS_IP",
        description: "Determine if a string is an IP address",
        params: &[
            "ip - An object which we wish to test is an ip",
            "type (optional) - 'IPV4' or 'IPV6'; defaults to IPV4",
        ],
        returns: "True if the string is an IP and false otherwise",
        func: is_ip,
    },
    Builtin {
        name: "IN_SUBNET",
        description: "Returns true if an IP is within a subnet range",
        params: &[
            "ip - The IP address in string form",
            "cidr+ - One or more IP ranges specified in CIDR notation",
        ],
        returns: "True if the IP address is within at least one of the ranges",
        func: in_subnet,
    },
    Builtin {
        name: "URL_TO_HOST",
        description: "Extract the hostname from a URL",
        params: &["url - URL in string form"],
        returns: "The hostname from the URL as a string",
        func: url_to_host,
    },
    Builtin {
        name: "URL_TO_PROTOCOL",
        description: "Extract the protocol from a URL",
        params: &["url - URL in string form"],
        returns: "The protocol from the URL as a string",
        func: url_to_protocol,
    },
];

fn is_ip(args: &[Value]) -> Result<Value> {
    check_arity("IS_IP", args, 1, Some(2))?;
    let Some(text) = as_text(&args[0]) else {
        return Ok(Value::Bool(false));
    };
    let kind = opt_str("IS_IP", args, 1)?.unwrap_or("IPV4");
    let matched = match kind.to_ascii_uppercase().as_str() {
        "IPV4" => text.parse::<Ipv4Addr>().is_ok(),
        "IPV6" => text.parse::<Ipv6Addr>().is_ok(),
        "ANY" => text.parse::<IpAddr>().is_ok(),
        _ => false,
    };
    Ok(Value::Bool(matched))
}

/// A parsed `addr/prefix` block. A bare address is a host route.
struct Cidr {
    network: IpAddr,
    prefix: u32,
}

impl Cidr {
    fn parse(text: &str) -> Option<Cidr> {
        let (addr, prefix) = match text.trim().split_once('/') {
            Some((addr, prefix)) => (addr.parse::<IpAddr>().ok()?, Some(prefix.parse().ok()?)),
            None => (text.trim().parse::<IpAddr>().ok()?, None),
        };
        let width = if addr.is_ipv4() { 32 } else { 128 };
        let prefix = prefix.unwrap_or(width);
        (prefix <= width).then_some(Cidr {
            network: addr,
            prefix,
        })
    }

    fn contains(&self, ip: &IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = u32::MAX.checked_shl(32 - self.prefix).unwrap_or(0);
                u32::from(net) & mask == u32::from(*ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = u128::MAX.checked_shl(128 - self.prefix).unwrap_or(0);
                u128::from(net) & mask == u128::from(*ip) & mask
            }
            _ => false,
        }
    }
}

fn in_subnet(args: &[Value]) -> Result<Value> {
    check_arity("IN_SUBNET", args, 2, None)?;
    let Some(ip) = as_text(&args[0]).and_then(|s| s.trim().parse::<IpAddr>().ok()) else {
        return Ok(Value::Bool(false));
    };

    for (index, arg) in args.iter().enumerate().skip(1) {
        let block = match arg {
            Value::Null => continue,
            Value::String(s) => s,
            other => return Err(type_mismatch("IN_SUBNET", index, "string", other)),
        };
        if Cidr::parse(block).is_some_and(|cidr| cidr.contains(&ip)) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn parse_url(function: &str, args: &[Value]) -> Result<Option<Url>> {
    check_arity(function, args, 1, Some(1))?;
    Ok(opt_str(function, args, 0)?.and_then(|s| Url::parse(s.trim()).ok()))
}

fn url_to_host(args: &[Value]) -> Result<Value> {
    Ok(parse_url("URL_TO_HOST", args)?
        .and_then(|url| url.host_str().map(Value::string))
        .unwrap_or(Value::Null))
}

fn url_to_protocol(args: &[Value]) -> Result<Value> {
    Ok(parse_url("URL_TO_PROTOCOL", args)?
        .map(|url| Value::string(url.scheme()))
        .unwrap_or(Value::Null))
}
