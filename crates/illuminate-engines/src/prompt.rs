//! LLM prompt engineering for description extraction

/// Instructions prepended to every extraction prompt
const EXTRACTION_INSTRUCTIONS: &str = r#"You are an assistant that finds visually descriptive passages in book chapters for an illustrator.

Extract every passage that describes something an artist could draw. Classify each as one of:
- "location": a scene or setting (a castle, a forest clearing, a drawing room)
- "character": a character's appearance or visual presence
- "atmosphere": mood, light, weather - the feel of a scene
- "object": a significant physical object
- "action": a visually distinctive action or movement

Respond with ONLY a JSON array. Each element must have:
- "content": the passage, copied VERBATIM from the text (do not paraphrase)
- "type": one of location / character / atmosphere / object / action
- "confidence": your confidence from 0.0 to 1.0 that this passage is worth illustrating
- "entities": names mentioned in the passage, in order of appearance

Return [] if the text contains nothing visual. Do not invent passages."#;

/// Builds prompts for the chunked LLM engine
pub struct PromptBuilder {
    text: String,
    language_hint: Option<String>,
}

impl PromptBuilder {
    /// Create a new prompt builder for one chunk of chapter text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language_hint: None,
        }
    }

    /// Add a language hint (prose language detection is caller-owned)
    pub fn with_language_hint(mut self, language: impl Into<String>) -> Self {
        self.language_hint = Some(language.into());
        self
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        if let Some(language) = &self.language_hint {
            prompt.push_str(&format!("The text is written in {language}.\n\n"));
        }

        prompt.push_str("Text to analyze:\n");
        prompt.push_str("---\n");
        prompt.push_str(&self.text);
        prompt.push_str("\n---\n");

        prompt
    }
}
