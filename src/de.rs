//! Lenient deserializers for host-supplied JSON
//!
//! Records arrive from loosely typed page data: ids may be numbers, tags may be
//! a bare string instead of a list, flags may be `1` instead of `true`. These
//! helpers accept the shapes the pages actually produce.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Render a JSON number the way the browser would print it
pub fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => format!("{}", f),
        None => n.to_string(),
    }
}

/// Text of a scalar value; `None` for null. Compound values become JSON text.
pub fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_text(n)),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// JavaScript truthiness of a value
pub fn value_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric value of a number or numeric string; empty strings are `None`
pub fn value_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Flatten a scalar or list into a list of strings, dropping nulls
pub fn value_list(v: &Value) -> Vec<String> {
    match v {
        Value::Array(items) => items.iter().filter_map(value_text).collect(),
        other => value_text(other).into_iter().collect(),
    }
}

pub fn opt_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(value_text(&v).filter(|s| !s.is_empty()))
}

pub fn string_list<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(value_list(&v))
}

pub fn truthy<'de, D>(d: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(value_truthy(&v))
}

pub fn opt_f64<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(value_f64(&v))
}

pub fn opt_usize<'de, D>(d: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(value_f64(&v).filter(|f| *f >= 0.0).map(|f| f as usize))
}

/// Tag maps: `{ "Tag": "one" }` and `{ "Tag": ["one", "two"] }` both decode
pub fn tag_map<'de, D>(d: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    let mut out = BTreeMap::new();
    if let Value::Object(map) = v {
        for (tag, vals) in map {
            out.insert(tag, value_list(&vals));
        }
    }
    Ok(out)
}

/// Category lists: a list, a single id, or an object whose keys are ids
pub fn id_list<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Object(map) => map.keys().cloned().collect(),
        other => value_list(&other),
    })
}

/// Any JSON array; other shapes decode as empty
pub fn array<'de, D>(d: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

/// Flat `key -> scalar` maps (reverse-complement tables and the like)
pub fn string_map<'de, D>(d: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    let mut out = BTreeMap::new();
    if let Value::Object(map) = v {
        for (k, val) in map {
            if let Some(text) = value_text(&val) {
                out.insert(k, text);
            }
        }
    }
    Ok(out)
}

/// `key -> number` maps; `None` when the field is absent or not an object
pub fn opt_number_map<'de, D>(d: D) -> Result<Option<BTreeMap<String, f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Object(map) => Some(
            map.into_iter()
                .map(|(k, val)| {
                    let n = value_f64(&val).unwrap_or(if value_truthy(&val) { 1.0 } else { 0.0 });
                    (k, n)
                })
                .collect(),
        ),
        _ => None,
    })
}
