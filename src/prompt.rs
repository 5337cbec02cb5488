//! Prompt construction for field completion

const COMPLETE_INSTRUCTIONS: &str = r#"Complete the following content data. Fill in any missing fields and return ONLY a valid JSON object like this:

{
    "Title": "string",
    "Description": "string",
    "Category": "string"
}

Requirements:
- If a field already exists, keep it unchanged.
- Fill in the missing fields based on the available ones.
- Do NOT include any explanation, markdown, or formatting.
- Return ONLY the JSON object.
"#;

/// Build the completion prompt for a record, embedding whichever fields are known
pub fn completion_prompt(title: Option<&str>, description: Option<&str>) -> String {
    let mut prompt = String::from(COMPLETE_INSTRUCTIONS);
    prompt.push('\n');

    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        prompt.push_str(&format!("Title: {}\n", title));
    }
    if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
        prompt.push_str(&format!("Description: {}\n", description));
    }

    prompt.trim().to_string()
}
