//! Prompt for the describe-image sub-call.

/// Asks the vision model for the content, mood, and feeling of the image
/// so the description can seed the recommendation prompt.
pub const DESCRIBE_IMAGE_PROMPT: &str = "请详细描述这张图片的内容、意境和情感，用于推荐相关的古诗词。";
