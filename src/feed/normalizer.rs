//! Pulse document normalizer
//!
//! The aggregator's `/api/query` payload has no stable schema: sections come
//! and go, get renamed, and funding fields appear under several names (as a
//! fraction or as a percent string). Everything here works on a generic
//! [`serde_json::Value`] and degrades to "absent" instead of failing.

use serde_json::{Map, Value};

use super::{NormalizedRow, Sections};

/// Key fragments that mark a derivatives section
const SECTION_TAGS: [&str; 3] = ["perp", "swap", "futures"];

/// Fragments stripped from a section key to get the exchange name
const EXCHANGE_NOISE: [&str; 4] = ["perp", "swap", "futures", "spot"];

const SEPARATORS: [char; 4] = ['_', '-', ' ', '.'];

/// List-valued fields that hold the section rows, in order of preference
const LIST_FIELDS: [&str; 3] = ["list", "items", "rows"];

const NAME_FIELDS: [&str; 2] = ["name", "symbol"];
const BID_FIELDS: [&str; 2] = ["b", "bid"];
const ASK_FIELDS: [&str; 2] = ["a", "ask"];

/// Funding field candidates, tried in order
const FUNDING_FIELDS: [&str; 5] = ["fundingRate", "funding", "fr", "funding_rate", "fundingRate8h"];

/// Split a Pulse document into per-exchange rows.
///
/// Never fails: unknown layouts yield an empty map, bad rows are dropped.
/// Sections are visited in ascending key order, so when two keys name the
/// same exchange the later key's rows are kept.
pub fn parse_sections(doc: &Value) -> Sections {
    let mut out = Sections::new();

    let Some(container) = container(doc) else {
        return out;
    };

    let mut entries: Vec<(&String, &Value)> = container.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (key, section) in entries {
        let key_lc = key.to_lowercase();
        if !SECTION_TAGS.iter().any(|tag| key_lc.contains(tag)) {
            continue;
        }
        let Some(list) = section.as_object().and_then(section_list) else {
            continue;
        };

        let rows: Vec<NormalizedRow> = list.iter().filter_map(parse_row).collect();
        tracing::trace!(section = %key, rows = rows.len(), "Parsed section");

        out.insert(exchange_from_key(key), rows);
    }

    out
}

/// Best mid from raw bid/ask values (numbers or numeric strings)
pub fn mid_from_bid_ask(bid: &Value, ask: &Value) -> Option<f64> {
    mid_price(as_number(bid)?, as_number(ask)?)
}

/// `(bid + ask) / 2` for a sane, uncrossed quote
pub fn mid_price(bid: f64, ask: f64) -> Option<f64> {
    if !bid.is_finite() || !ask.is_finite() {
        return None;
    }
    if bid > 0.0 && ask > 0.0 && ask >= bid {
        Some((ask + bid) / 2.0)
    } else {
        None
    }
}

/// Exchange identifier from a section key: "binancePerp" -> "binance"
pub fn exchange_from_key(key: &str) -> String {
    let lowered = key.to_lowercase();
    let mut name = lowered.clone();
    for noise in EXCHANGE_NOISE {
        name = name.replace(noise, "");
    }
    let name = name.trim_matches(|c: char| SEPARATORS.contains(&c));
    if name.is_empty() {
        lowered
    } else {
        name.to_string()
    }
}

/// Funding rate from the first candidate field that parses
pub fn funding_rate(row: &Map<String, Value>) -> Option<f64> {
    FUNDING_FIELDS
        .iter()
        .filter_map(|field| row.get(*field))
        .find_map(|value| as_number(value).or_else(|| as_percent(value)))
}

/// Section map: a non-blank `data` member, otherwise the document root.
///
/// A non-blank `data` that is not an object yields nothing.
fn container(doc: &Value) -> Option<&Map<String, Value>> {
    match doc.get("data") {
        Some(data) if !is_blank(data) => data.as_object(),
        _ => doc.as_object(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn section_list(section: &Map<String, Value>) -> Option<&Vec<Value>> {
    LIST_FIELDS
        .iter()
        .find_map(|field| section.get(*field).and_then(Value::as_array))
}

fn parse_row(item: &Value) -> Option<NormalizedRow> {
    let row = item.as_object()?;

    let instrument = first_field(row, &NAME_FIELDS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let bid = first_number(row, &BID_FIELDS);
    let ask = first_number(row, &ASK_FIELDS);
    let funding = funding_rate(row);

    let parsed = NormalizedRow {
        instrument,
        bid,
        ask,
        funding,
    };

    if parsed.mid().is_none() && parsed.funding.is_none() {
        return None;
    }
    Some(parsed)
}

fn first_field<'a>(row: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .find_map(|field| row.get(*field).filter(|v| !v.is_null()))
}

fn first_number(row: &Map<String, Value>, fields: &[&str]) -> Option<f64> {
    fields
        .iter()
        .filter_map(|field| row.get(*field))
        .find_map(as_number)
}

/// A finite number, or a string holding one
fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// "0.01%" -> 0.0001
fn as_percent(value: &Value) -> Option<f64> {
    let raw = value.as_str()?.trim();
    let pct = raw.strip_suffix('%')?.trim().parse::<f64>().ok()?;
    pct.is_finite().then_some(pct / 100.0)
}
