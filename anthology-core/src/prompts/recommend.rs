//! Prompt construction for poem recommendations.
//!
//! `build_messages` is a pure function of the request (given a stable
//! image encoding): same inputs always produce the same message sequence.

use crate::chat::ChatMessage;
use crate::media::ImagePayload;
use crate::types::RecommendationRequest;

/// Fallback user instruction when the request carries an image but no text.
pub const DEFAULT_IMAGE_INSTRUCTION: &str = "请根据图片推荐相关的古诗词";

/// System instruction directing structured JSON output with a `poems` list.
pub fn render_system_prompt() -> String {
    r#"你是一个专业的诗词推荐助手。请根据用户的需求推荐合适的古诗词，并提供详细的赏析。

请按照以下JSON格式返回结果：
{
    "poems": [
        {
            "title": "诗词标题",
            "content": "诗词内容（完整）",
            "author": "作者",
            "dynasty": "朝代",
            "appreciation": "赏析内容"
        }
    ]
}"#
    .to_string()
}

/// Compose the user-turn text body: one line per present part, in fixed
/// order (image description, positive prompt, negative prompt, context).
/// Empty strings count as absent.
pub fn render_user_body(
    request: &RecommendationRequest,
    image_description: Option<&str>,
) -> String {
    let fields = [
        ("图片描述：", image_description),
        ("推荐要求：", request.positive_prompt.as_deref()),
        ("排除要求：", request.negative_prompt.as_deref()),
        ("上下文信息：", request.context.as_deref()),
    ];

    let parts: Vec<String> = fields
        .into_iter()
        .filter_map(|(label, value)| match value {
            Some(v) if !v.is_empty() => Some(format!("{}{}", label, v)),
            _ => None,
        })
        .collect();

    parts.join("\n")
}

/// Build the full provider message sequence for one request.
///
/// With an image the user turn becomes multi-part: the composed body (or
/// the default instruction if the body would be empty) followed by the
/// inline image payload. The caller guarantees at least one of prompt or
/// image is present.
pub fn build_messages(
    request: &RecommendationRequest,
    image_description: Option<&str>,
    image: Option<&ImagePayload>,
) -> Vec<ChatMessage> {
    let body = render_user_body(request, image_description);

    let user = match image {
        Some(payload) => {
            let text = if body.is_empty() {
                DEFAULT_IMAGE_INSTRUCTION.to_string()
            } else {
                body
            };
            ChatMessage::user_with_image(text, payload.data_url.clone())
        }
        None => ChatMessage::user(body),
    };

    vec![ChatMessage::system(render_system_prompt()), user]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ContentPart, MessageContent};

    fn full_request() -> RecommendationRequest {
        RecommendationRequest {
            positive_prompt: Some("关于春天".to_string()),
            negative_prompt: Some("不要悲伤".to_string()),
            context: Some("用户喜欢唐诗".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_user_body_fixed_order_and_labels() {
        let body = render_user_body(&full_request(), Some("一片桃花林"));
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(
            lines,
            vec![
                "图片描述：一片桃花林",
                "推荐要求：关于春天",
                "排除要求：不要悲伤",
                "上下文信息：用户喜欢唐诗",
            ]
        );
    }

    #[test]
    fn test_user_body_skips_absent_parts() {
        let request = RecommendationRequest {
            positive_prompt: Some("关于秋天".to_string()),
            ..Default::default()
        };
        let body = render_user_body(&request, None);
        assert_eq!(body, "推荐要求：关于秋天");
    }

    #[test]
    fn test_system_prompt_demands_poems_schema() {
        let prompt = render_system_prompt();
        assert!(prompt.contains("\"poems\""));
        for field in ["title", "content", "author", "dynasty", "appreciation"] {
            assert!(prompt.contains(field), "missing field {field}");
        }
    }

    #[test]
    fn test_build_messages_text_only() {
        let messages = build_messages(&full_request(), None, None);
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0].content, MessageContent::Text(_)));
        assert!(!messages[1].has_image());
        assert!(messages[1].text().contains("推荐要求：关于春天"));
    }

    #[test]
    fn test_build_messages_with_image_uses_parts() {
        let payload = ImagePayload {
            data_url: "data:image/png;base64,AAAA".to_string(),
        };
        let messages = build_messages(&full_request(), Some("桃花"), Some(&payload));
        assert!(messages[1].has_image());

        let MessageContent::Parts(parts) = &messages[1].content else {
            panic!("expected multi-part user turn");
        };
        assert!(matches!(parts[0], ContentPart::Text { .. }));
        assert!(matches!(parts[1], ContentPart::ImageUrl { .. }));
    }

    #[test]
    fn test_empty_body_with_image_falls_back_to_default_instruction() {
        let request = RecommendationRequest {
            image_path: Some("x.png".into()),
            ..Default::default()
        };
        let payload = ImagePayload {
            data_url: "data:image/png;base64,AAAA".to_string(),
        };
        let messages = build_messages(&request, None, Some(&payload));
        assert_eq!(messages[1].text(), DEFAULT_IMAGE_INSTRUCTION);
    }
}
