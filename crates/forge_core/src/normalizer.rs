//! Recovery of structured data from raw model text.
//!
//! Extraction runs an ordered list of pure locators. Each locator picks a
//! candidate slice of the text, and the candidate is decoded straight into
//! the requested type. The first tier that decodes wins:
//!
//! 1. the whole text
//! 2. the interior of a ```json fenced block
//! 3. the span from the first `{`/`[` to the last `}`/`]`
//!
//! Nothing here performs I/O; callers decide whether to log the raw text
//! carried by [`ExtractionError`].

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ExtractionError, Tier, TierFailure};

/// Picks the slice of the raw text a tier tries to decode
type Locator = fn(&str) -> Option<&str>;

const TIERS: [(Tier, Locator); 3] = [
    (Tier::Direct, whole_text),
    (Tier::Fenced, fenced_block),
    (Tier::Span, delimited_span),
];

/// Extract a value of type `T` from model output.
pub fn extract<T: DeserializeOwned>(raw: &str) -> Result<T, ExtractionError> {
    let mut attempts = Vec::with_capacity(TIERS.len());

    for (tier, locate) in TIERS {
        match decode_candidate::<T>(raw, locate) {
            Ok(value) => {
                debug!("Extracted structured data via {} tier", tier);
                return Ok(value);
            }
            Err(reason) => attempts.push(TierFailure { tier, reason }),
        }
    }

    Err(ExtractionError {
        raw: raw.to_string(),
        attempts,
    })
}

/// Extract an untyped JSON value from model output.
pub fn extract_value(raw: &str) -> Result<serde_json::Value, ExtractionError> {
    extract(raw)
}

fn decode_candidate<T: DeserializeOwned>(raw: &str, locate: Locator) -> Result<T, String> {
    let candidate = locate(raw).ok_or_else(|| "no candidate found".to_string())?;
    serde_json::from_str(candidate).map_err(|e| e.to_string())
}

fn whole_text(raw: &str) -> Option<&str> {
    Some(raw)
}

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)```(?i:json)\b(.*?)```").expect("fence pattern is valid"))
}

fn fenced_block(raw: &str) -> Option<&str> {
    fence_pattern()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn delimited_span(raw: &str) -> Option<&str> {
    let start = [raw.find('{'), raw.find('[')].into_iter().flatten().min()?;
    let end = [raw.rfind('}'), raw.rfind(']')].into_iter().flatten().max()?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}
