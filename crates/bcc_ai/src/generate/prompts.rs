//! Prompt templates for the instruction-following generative model.

pub const RESPONSE_MARKER: &str = "### Response:";

/// Clause appended to the query when the grounded path found no qualifying
/// context.
pub const CAUTION_NOTE: &str =
    "[Note: No policy document match. Respond cautiously; do not invent numbers.]";

/// Base instruction-following template: BFSI-assistant persona plus the
/// compliance directive never to invent financial figures.
pub fn base_prompt(input: &str) -> String {
    format!(
        r#"Below is an instruction that describes a task. Write a response that appropriately completes the request.

### Instruction:
You are a professional BFSI call center assistant. Respond helpfully, accurately, and in a compliant manner. Do NOT guess financial numbers, interest rates, or policy details. If unsure, direct the customer to official channels.

### Input:
{input}

### Response:
"#
    )
}

/// Wrap retrieved context and the query into the grounded input block,
/// repeating the no-invention directive and instructing the model to say
/// so when the context does not answer the query.
pub fn grounded_input(query: &str, context: &str) -> String {
    format!(
        r#"The following is verified policy/knowledge. Use it to answer. Do NOT invent numbers.

{context}

---

User query: {query}

Provide a factual, policy-aligned response based on the above. If the answer is not in the context, say so and direct to official channels."#
    )
}

pub fn cautious_input(query: &str) -> String {
    format!("{query}\n{CAUTION_NOTE}")
}

/// Extract the completion: the text after the response marker, or the raw
/// continuation past the prompt when the marker is absent.
pub fn extract_response(full_text: &str, prompt: &str) -> String {
    if let Some(pos) = full_text.rfind(RESPONSE_MARKER) {
        return full_text[pos + RESPONSE_MARKER.len()..].trim().to_string();
    }
    if let Some(rest) = full_text.strip_prefix(prompt) {
        return rest.trim().to_string();
    }
    full_text.trim().to_string()
}
