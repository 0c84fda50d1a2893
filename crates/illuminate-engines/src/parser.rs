//! Parse LLM output into raw description candidates

use crate::engine::EngineError;
use illuminate_domain::DescriptionType;
use serde_json::Value;
use tracing::warn;

/// One parsed element of the model's JSON array, before span anchoring
#[derive(Debug, Clone)]
pub(crate) struct RawCandidate {
    pub content: String,
    pub description_type: DescriptionType,
    pub confidence: f64,
    pub entities: Vec<String>,
}

/// Parse an LLM JSON response into raw candidates
///
/// Malformed individual elements are skipped with a warning; only an
/// entirely unparseable response is an error.
pub(crate) fn parse_llm_response(response: &str) -> Result<Vec<RawCandidate>, EngineError> {
    let json_str = extract_json(response)?;

    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| EngineError::InvalidOutput(format!("JSON parse error: {e}")))?;

    let array = json
        .as_array()
        .ok_or_else(|| EngineError::InvalidOutput("Expected JSON array".to_string()))?;

    let mut candidates = Vec::new();
    for (idx, item) in array.iter().enumerate() {
        match parse_candidate_json(item) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => {
                warn!("Failed to parse candidate {idx}: {e}");
            }
        }
    }

    Ok(candidates)
}

/// Extract JSON from a response, handling markdown code fences
fn extract_json(response: &str) -> Result<String, EngineError> {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return Err(EngineError::InvalidOutput("Empty code block".to_string()));
        }
        // Skip the opening fence line and the closing fence
        let json_lines = &lines[1..lines.len().saturating_sub(1)];
        Ok(json_lines.join("\n"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Parse a single candidate element
fn parse_candidate_json(json: &Value) -> Result<RawCandidate, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| "Candidate is not a JSON object".to_string())?;

    let content = obj
        .get("content")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Missing or invalid 'content'".to_string())?
        .to_string();
    if content.trim().is_empty() {
        return Err("'content' is empty".to_string());
    }

    let type_str = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Missing or invalid 'type'".to_string())?;
    let description_type = DescriptionType::parse(type_str)
        .ok_or_else(|| format!("Unknown description type '{type_str}'"))?;

    let confidence = obj
        .get("confidence")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| "Missing or invalid 'confidence'".to_string())?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(format!("confidence {confidence} out of range [0.0, 1.0]"));
    }

    let entities = obj
        .get("entities")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(RawCandidate {
        content,
        description_type,
        confidence,
        entities,
    })
}
