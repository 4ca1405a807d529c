//! Parser for the completion service's reply.
//!
//! The remote model is untrusted input, so the accepted shape is a small
//! grammar rather than an incidental heuristic: the reply is split into
//! segments on newlines, commas, and semicolons; each segment is read as
//! `key: value` with the key matched case-insensitively against fixed
//! label sets. The quantity is the first unsigned-integer substring of its
//! value, defaulting to 1 when absent or unparseable. A missing, empty, or
//! placeholder product value means the reply is unusable.

const PRODUCT_KEYS: &[&str] = &["product name", "product", "item"];
const QUANTITY_KEYS: &[&str] = &["quantity", "qty", "amount"];
const PLACEHOLDER_VALUES: &[&str] = &["unknown", "none", "n/a", "null", "-"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedOrder {
    pub product: String,
    pub quantity: u32,
}

pub fn parse_candidate(reply: &str) -> Option<ParsedOrder> {
    let mut product: Option<String> = None;
    let mut quantity: Option<u32> = None;

    for segment in reply.split(['\n', ',', ';']) {
        let Some((raw_key, raw_value)) = segment.split_once(':') else {
            continue;
        };
        let key = normalize_key(raw_key);
        let value = raw_value.trim();

        if product.is_none() && PRODUCT_KEYS.contains(&key.as_str()) {
            if let Some(name) = product_value(value) {
                product = Some(name);
            }
        } else if quantity.is_none() && QUANTITY_KEYS.contains(&key.as_str()) {
            quantity = first_integer(value);
        }
    }

    product.map(|product| ParsedOrder { product, quantity: quantity.unwrap_or(1).max(1) })
}

/// Keys may arrive decorated ("- Product", "**Quantity**"); strip common
/// bullet and emphasis characters before matching.
fn normalize_key(raw: &str) -> String {
    raw.trim()
        .trim_matches(|ch: char| matches!(ch, '-' | '*' | '•' | '#' | '"'))
        .trim()
        .to_ascii_lowercase()
}

fn product_value(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_matches(|ch: char| matches!(ch, '"' | '*' | '.')).trim();
    if cleaned.is_empty() {
        return None;
    }
    if PLACEHOLDER_VALUES.contains(&cleaned.to_ascii_lowercase().as_str()) {
        return None;
    }
    Some(cleaned.to_string())
}

fn first_integer(value: &str) -> Option<u32> {
    let mut digits = String::new();
    for ch in value.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if !digits.is_empty() {
            break;
        }
    }
    digits.parse::<u32>().ok()
}
