use serde::de::DeserializeOwned;

/// Decodes raw model output into a typed response. Models sometimes wrap the object in a
/// Markdown fence or a sentence of prose, so the outermost `{...}` span is used when the
/// text as a whole is not JSON.
pub fn decode_response<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err("empty model output".to_string());
    }

    match serde_json::from_str::<T>(text) {
        Ok(value) => Ok(value),
        Err(direct_err) => {
            let candidate = extract_json_object(text).ok_or_else(|| {
                format!("no JSON object in model output ({})", direct_err)
            })?;
            serde_json::from_str::<T>(candidate).map_err(|e| e.to_string())
        }
    }
}

fn extract_json_object(text: &str) -> Option<&str> {
    let unfenced = strip_fence(text).unwrap_or(text);
    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&unfenced[start..=end])
}

/// Body between the first fence line and the last fence; string values may carry
/// fences of their own.
fn strip_fence(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let close = body.rfind("```")?;
    Some(&body[..close])
}
