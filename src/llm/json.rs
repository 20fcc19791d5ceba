//! Recover JSON from model replies

use serde_json::Value;

/// Extract a JSON object or array from LLM response text.
///
/// Models sometimes wrap JSON in markdown code fences or add explanation
/// text. Tries, in order:
/// 1. Direct parse (response is pure JSON)
/// 2. A ```json ... ``` or ``` ... ``` fenced block
/// 3. The outermost `{...}` span, then the outermost `[...]` span
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Some(v) = parse_structured(trimmed) {
        return Some(v);
    }

    let fenced = if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        after.find("```").map(|end| &after[..end])
    } else if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        after.find("```").map(|end| &after[..end])
    } else {
        None
    };

    if let Some(block) = fenced {
        if let Some(v) = parse_structured(block.trim()) {
            return Some(v);
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Some(v) = parse_structured(&trimmed[start..=end]) {
                    return Some(v);
                }
            }
        }
    }

    None
}

fn parse_structured(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(v) if v.is_object() || v.is_array() => Some(v),
        _ => None,
    }
}
