//! Extraction of structured poem records from raw provider replies.
//!
//! Two tiers: decode the first balanced JSON object in the reply, and if
//! that fails, fall back to a single synthetic candidate carrying the raw
//! text verbatim. Format noise alone never fails an invocation.

use serde::Deserialize;

use crate::error::ProviderError;
use crate::types::{PoemCandidate, UNKNOWN};

#[derive(Debug, Deserialize)]
struct PoemsPayload {
    #[serde(default)]
    poems: Vec<PoemCandidate>,
}

/// Parse a raw reply into at most `requested` candidates, in provider
/// order.
///
/// Returns `EmptyResult` only when the reply decodes cleanly but its
/// `poems` list is empty; the fallback tier always yields one candidate.
pub fn parse_candidates(raw: &str, requested: usize) -> Result<Vec<PoemCandidate>, ProviderError> {
    if let Some(json) = extract_json_object(raw) {
        if let Ok(payload) = serde_json::from_str::<PoemsPayload>(json) {
            if payload.poems.is_empty() {
                return Err(ProviderError::EmptyResult);
            }
            let mut poems = payload.poems;
            poems.truncate(requested);
            return Ok(poems);
        }
    }

    tracing::warn!("structured decode failed, falling back to raw text candidate");
    Ok(vec![fallback_candidate(raw)])
}

/// The tier-2 candidate: the whole raw reply as content, everything else
/// the unknown sentinel.
pub fn fallback_candidate(raw: &str) -> PoemCandidate {
    PoemCandidate {
        title: UNKNOWN.to_string(),
        content: raw.to_string(),
        author: UNKNOWN.to_string(),
        dynasty: UNKNOWN.to_string(),
        appreciation: UNKNOWN.to_string(),
    }
}

/// Locate the first balanced `{...}` substring, tracking strings and
/// escapes so braces inside string literals do not confuse the scan.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let bytes = raw.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_FIELD_REPLY: &str =
        r#"{"poems":[{"title":"T","content":"C","author":"A","dynasty":"D","appreciation":"Ap"}]}"#;

    #[test]
    fn test_well_formed_reply_yields_verbatim_candidate() {
        let poems = parse_candidates(FIVE_FIELD_REPLY, 1).unwrap();
        assert_eq!(poems.len(), 1);
        assert_eq!(poems[0].title, "T");
        assert_eq!(poems[0].content, "C");
        assert_eq!(poems[0].author, "A");
        assert_eq!(poems[0].dynasty, "D");
        assert_eq!(poems[0].appreciation, "Ap");
    }

    #[test]
    fn test_json_embedded_in_prose_is_found() {
        let raw = format!("当然可以，推荐如下：\n{}\n希望你喜欢。", FIVE_FIELD_REPLY);
        let poems = parse_candidates(&raw, 1).unwrap();
        assert_eq!(poems[0].title, "T");
    }

    #[test]
    fn test_braces_inside_strings_do_not_break_the_scan() {
        let raw = r#"note {"poems":[{"title":"a } b","content":"c {"}]} tail"#;
        let poems = parse_candidates(raw, 5).unwrap();
        assert_eq!(poems[0].title, "a } b");
        assert_eq!(poems[0].content, "c {");
    }

    #[test]
    fn test_truncates_to_requested_count_in_order() {
        let raw = r#"{"poems":[
            {"title":"p1"},{"title":"p2"},{"title":"p3"},{"title":"p4"},{"title":"p5"}
        ]}"#;
        let poems = parse_candidates(raw, 3).unwrap();
        assert_eq!(poems.len(), 3);
        let titles: Vec<&str> = poems.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_missing_fields_default_to_unknown() {
        let raw = r#"{"poems":[{"title":"静夜思","content":"床前明月光"}]}"#;
        let poems = parse_candidates(raw, 1).unwrap();
        assert_eq!(poems[0].author, UNKNOWN);
        assert_eq!(poems[0].dynasty, UNKNOWN);
        assert_eq!(poems[0].appreciation, UNKNOWN);
    }

    #[test]
    fn test_empty_poems_list_is_an_error() {
        let err = parse_candidates(r#"{"poems": []}"#, 1).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResult));

        // An object with no poems key decodes to an empty list too.
        let err = parse_candidates(r#"{"message": "hi"}"#, 1).unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResult));
    }

    #[test]
    fn test_malformed_json_falls_back_to_raw_text() {
        let raw = r#"{"poems": [{"title": "broken"#;
        let poems = parse_candidates(raw, 1).unwrap();
        assert_eq!(poems.len(), 1);
        assert_eq!(poems[0].content, raw);
        assert_eq!(poems[0].title, UNKNOWN);
    }

    #[test]
    fn test_plain_prose_falls_back_verbatim() {
        let raw = "抱歉，我无法以JSON格式回答，但我推荐《春晓》。";
        let poems = parse_candidates(raw, 3).unwrap();
        assert_eq!(poems.len(), 1);
        assert_eq!(poems[0].content, raw);
    }

    #[test]
    fn test_extract_json_object_picks_first_balanced_object() {
        assert_eq!(extract_json_object("a {\"x\": 1} b {\"y\": 2}"), Some("{\"x\": 1}"));
        assert_eq!(extract_json_object("no object here"), None);
        assert_eq!(extract_json_object("{ unbalanced"), None);
    }
}
