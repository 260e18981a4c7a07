//! Attribute validators and configuration validation against a schema.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::{AttrType, Attribute, Block, Nesting, Schema, join_path};
use crate::diag::Diagnostics;

const INVALID: &str = "Invalid Attribute Value";

/// `Validator::Regex` patterns, compiled on first use.
static PATTERNS: Lazy<Mutex<HashMap<&'static str, Regex>>> = Lazy::new(Default::default);

fn compiled(pattern: &'static str) -> std::result::Result<Regex, regex::Error> {
    let mut cache = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(re) = cache.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)?;
    cache.insert(pattern, re.clone());
    Ok(re)
}

/// A constraint on an attribute value.
///
/// String validators apply to every element of list and set attributes.
#[derive(Debug, Clone)]
pub enum Validator {
    /// Length in characters, inclusive.
    LengthBetween(usize, usize),
    /// Must match `pattern`; `message` explains the expected format.
    Regex {
        pattern: &'static str,
        message: &'static str,
    },
    OneOf(&'static [&'static str]),
    /// Inclusive range.
    Int64Between(i64, i64),
    /// Must not be set together with any of these sibling names.
    ConflictsWith(&'static [&'static str]),
    /// Needs all of these sibling names to be set too.
    AlsoRequires(&'static [&'static str]),
    IpAddress,
    Ipv4Address,
    Ipv6Address,
    /// `<address>/<prefix length>` of either family.
    CidrNetwork,
    /// An OpenSSH public key line.
    SshPublicKey,
}

impl Validator {
    fn check_string(&self, value: &str) -> Option<String> {
        match self {
            Validator::LengthBetween(min, max) => {
                let len = value.chars().count();
                (len < *min || len > *max).then(|| {
                    format!("string length must be between {min} and {max}, got: {len}")
                })
            }
            Validator::Regex { pattern, message } => match compiled(pattern) {
                Ok(re) if re.is_match(value) => None,
                Ok(_) => Some(format!("'{value}' {message}")),
                Err(e) => Some(format!("bad pattern {pattern}: {e}")),
            },
            Validator::OneOf(allowed) => (!allowed.iter().any(|a| *a == value)).then(|| {
                format!("value must be one of: {}, got: '{value}'", allowed.join(", "))
            }),
            Validator::IpAddress => value
                .parse::<IpAddr>()
                .is_err()
                .then(|| format!("'{value}' is not a valid IP address")),
            Validator::Ipv4Address => value
                .parse::<Ipv4Addr>()
                .is_err()
                .then(|| format!("'{value}' is not a valid IPv4 address")),
            Validator::Ipv6Address => value
                .parse::<Ipv6Addr>()
                .is_err()
                .then(|| format!("'{value}' is not a valid IPv6 address")),
            Validator::CidrNetwork => check_cidr(value),
            Validator::SshPublicKey => ssh_key::PublicKey::from_openssh(value)
                .err()
                .map(|e| format!("not a valid OpenSSH public key: {e}")),
            Validator::Int64Between(..)
            | Validator::ConflictsWith(_)
            | Validator::AlsoRequires(_) => None,
        }
    }
}

fn check_cidr(value: &str) -> Option<String> {
    let bad = || Some(format!("'{value}' is not a valid network in CIDR notation"));
    let Some((addr, len)) = value.split_once('/') else {
        return bad();
    };
    let Ok(len) = len.parse::<u8>() else {
        return bad();
    };
    match addr.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) if len <= 32 => None,
        Ok(IpAddr::V6(_)) if len <= 128 => None,
        _ => bad(),
    }
}

impl Schema {
    /// Validate configuration JSON, recording one diagnostic per problem.
    pub fn validate(&self, config: &Value, diags: &mut Diagnostics) {
        match config {
            Value::Object(obj) => validate_block(&self.block, obj, "", diags),
            _ => diags.add_error(INVALID, "configuration must be an object"),
        }
    }
}

fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

fn validate_block(block: &Block, obj: &Map<String, Value>, prefix: &str, diags: &mut Diagnostics) {
    for key in obj.keys() {
        if !block.attributes.contains_key(key.as_str()) && !block.blocks.contains_key(key.as_str())
        {
            diags.add_attribute_error(
                join_path(prefix, key),
                "Unsupported argument",
                format!("an argument named '{key}' is not expected here"),
            );
        }
    }

    for (name, attr) in &block.attributes {
        let path = join_path(prefix, name);
        match obj.get(*name) {
            None | Some(Value::Null) => {
                if attr.required {
                    diags.add_attribute_error(
                        path.clone(),
                        "Missing required argument",
                        format!("the argument '{name}' is required"),
                    );
                }
            }
            Some(value) => validate_attribute(attr, value, &path, diags),
        }
        if is_set(obj.get(*name)) {
            check_siblings(&attr.validators, obj, &path, diags);
        }
    }

    for (name, nested) in &block.blocks {
        let path = join_path(prefix, name);
        match (nested.nesting, obj.get(*name)) {
            (_, None | Some(Value::Null)) => {
                if let Nesting::List { min, .. } | Nesting::Set { min, .. } = nested.nesting {
                    if min > 0 {
                        diags.add_attribute_error(
                            path,
                            "Missing required block",
                            format!("at least {min} '{name}' block(s) required"),
                        );
                    }
                }
            }
            (Nesting::Single, Some(Value::Object(inner))) => {
                validate_block(&nested.block, inner, &path, diags)
            }
            (Nesting::List { min, max } | Nesting::Set { min, max }, Some(Value::Array(items))) => {
                if items.len() < min || (max > 0 && items.len() > max) {
                    let bound = if max > 0 {
                        format!("between {min} and {max}")
                    } else {
                        format!("at least {min}")
                    };
                    diags.add_attribute_error(
                        path.clone(),
                        "Invalid block count",
                        format!("'{name}' needs {bound} block(s), got {}", items.len()),
                    );
                }
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{i}]");
                    match item {
                        Value::Object(inner) => {
                            validate_block(&nested.block, inner, &item_path, diags)
                        }
                        _ => diags.add_attribute_error(item_path, INVALID, "block must be an object"),
                    }
                }
            }
            _ => diags.add_attribute_error(path, INVALID, format!("'{name}' has the wrong shape")),
        }
    }

    if !block.at_least_one_of.is_empty()
        && !block.at_least_one_of.iter().any(|n| is_set(obj.get(*n)))
    {
        let path = if prefix.is_empty() {
            block.at_least_one_of[0].to_string()
        } else {
            prefix.to_string()
        };
        diags.add_attribute_error(
            path,
            "Missing configuration",
            format!(
                "at least one of {} must be specified",
                block.at_least_one_of.join(", ")
            ),
        );
    }
}

fn validate_attribute(attr: &Attribute, value: &Value, path: &str, diags: &mut Diagnostics) {
    let type_error = |diags: &mut Diagnostics| {
        diags.add_attribute_error(
            path,
            "Incorrect attribute value type",
            format!("expected {}", attr.ty.as_str()),
        )
    };

    match (attr.ty, value) {
        (AttrType::String, Value::String(s)) => check_str(attr, s, path, diags),
        (AttrType::Bool, Value::Bool(_)) => {}
        (AttrType::Int64, Value::Number(n)) => match n.as_i64() {
            Some(n) => check_int(attr, n, path, diags),
            None => type_error(diags),
        },
        (AttrType::ListString | AttrType::SetString, Value::Array(items)) => {
            let mut seen: Vec<&str> = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let Value::String(s) = item else {
                    type_error(diags);
                    return;
                };
                if attr.ty == AttrType::SetString && seen.contains(&s.as_str()) {
                    diags.add_attribute_error(
                        format!("{path}[{i}]"),
                        INVALID,
                        format!("duplicate set element '{s}'"),
                    );
                }
                seen.push(s);
                check_str(attr, s, &format!("{path}[{i}]"), diags);
            }
        }
        _ => type_error(diags),
    }
}

fn check_str(attr: &Attribute, value: &str, path: &str, diags: &mut Diagnostics) {
    for validator in &attr.validators {
        if let Some(message) = validator.check_string(value) {
            diags.add_attribute_error(path, INVALID, message);
        }
    }
}

fn check_int(attr: &Attribute, value: i64, path: &str, diags: &mut Diagnostics) {
    for validator in &attr.validators {
        if let Validator::Int64Between(min, max) = validator {
            if value < *min || value > *max {
                diags.add_attribute_error(
                    path,
                    INVALID,
                    format!("value must be between {min} and {max}, got: {value}"),
                );
            }
        }
    }
}

fn check_siblings(
    validators: &[Validator],
    obj: &Map<String, Value>,
    path: &str,
    diags: &mut Diagnostics,
) {
    for validator in validators {
        match validator {
            Validator::ConflictsWith(names) => {
                for other in names.iter().filter(|n| is_set(obj.get(**n))) {
                    diags.add_attribute_error(
                        path,
                        "Invalid Attribute Combination",
                        format!("cannot be configured together with '{other}'"),
                    );
                }
            }
            Validator::AlsoRequires(names) => {
                for other in names.iter().filter(|n| !is_set(obj.get(**n))) {
                    diags.add_attribute_error(
                        path,
                        "Invalid Attribute Combination",
                        format!("'{other}' must be configured too"),
                    );
                }
            }
            _ => {}
        }
    }
}
