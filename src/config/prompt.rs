use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use log::info;

use crate::schema::Contract;

const BUILTIN_PROMPTS: &str = include_str!("../../json/prompts.json");

#[derive(Debug)]
pub enum PromptError {
    TemplateNotFound(String),
    UnboundRequest(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::TemplateNotFound(key) => write!(f, "Prompt template '{}' not found", key),
            PromptError::UnboundRequest(msg) => write!(f, "Request cannot be bound to a template: {}", msg),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct PromptConfig {
    /// Appended to every task prompt; `{output_shape}` receives the task's JSON skeleton.
    pub response_format: String,
    pub templates: HashMap<String, String>,
    #[serde(skip)]
    pub last_loaded: Option<SystemTime>,
}

impl PromptConfig {
    pub fn builtin() -> Result<Self, PromptError> {
        let config: PromptConfig = serde_json::from_str(BUILTIN_PROMPTS)?;
        Ok(config)
    }

    fn template(&self, key: &str) -> Result<&str, PromptError> {
        self.templates
            .get(key)
            .map(|s| s.as_str())
            .ok_or_else(|| PromptError::TemplateNotFound(format!("templates:{}", key)))
    }
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let file_content = fs::read_to_string(path.as_ref())?;
    let mut config: PromptConfig = serde_json::from_str(&file_content)?;
    config.last_loaded = Some(SystemTime::now());
    info!("Loaded {} prompt templates from {}", config.templates.len(), path.as_ref().display());
    Ok(Arc::new(config))
}

pub fn reload_prompts_if_changed<P: AsRef<Path>>(
    path: P,
    current_config: &Arc<PromptConfig>
) -> Result<Option<Arc<PromptConfig>>, PromptError> {
    let metadata = fs::metadata(&path)?;

    if let Ok(modified) = metadata.modified() {
        if let Some(last_loaded) = current_config.last_loaded {
            if modified > last_loaded {
                info!("Prompts file changed, reloading...");
                return load_prompts(path).map(Some);
            }
        } else {
            info!("No last_loaded timestamp, reloading prompts...");
            return load_prompts(path).map(Some);
        }
    }
    Ok(None)
}

/// Binds the request's serialized fields into the task template and appends the
/// output-shape instruction. Pure: the same request always yields the same prompt.
pub fn render_prompt<C: Contract>(
    config: &PromptConfig,
    request: &C::Request
) -> Result<String, PromptError> {
    let template = config.template(C::TEMPLATE)?;
    let vars = match serde_json::to_value(request)? {
        JsonValue::Object(map) => map
            .into_iter()
            .map(|(k, v)| {
                let text = match v {
                    JsonValue::String(s) => s,
                    JsonValue::Null => String::new(),
                    other => other.to_string(),
                };
                (k, text)
            })
            .collect::<HashMap<_, _>>(),
        other => {
            return Err(PromptError::UnboundRequest(format!("{} is not an object", other)));
        }
    };

    let body = render_template(template, &vars);
    let mut shape = HashMap::new();
    shape.insert("output_shape".to_string(), C::OUTPUT_SHAPE.to_string());
    let instruction = render_template(&config.response_format, &shape);

    Ok(format!("{}\n\n{}", body.trim_end(), instruction))
}

/// `{name}` is replaced by the variable (empty when absent); `{?name}...{/name}` is kept
/// only when the variable is present and non-blank. Any other brace is literal.
pub fn render_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = match after.find('}') {
            Some(close) => close,
            None => {
                out.push_str(&rest[open..]);
                return out;
            }
        };
        let token = &after[..close];

        if let Some(name) = token.strip_prefix('?').filter(|n| is_identifier(n)) {
            let end_tag = format!("{{/{}}}", name);
            let body_start = &after[close + 1..];
            if let Some(end) = body_start.find(&end_tag) {
                let present = vars.get(name).map(|v| !v.trim().is_empty()).unwrap_or(false);
                if present {
                    out.push_str(&render_template(&body_start[..end], vars));
                }
                rest = &body_start[end + end_tag.len()..];
                continue;
            }
        } else if is_identifier(token) {
            if let Some(value) = vars.get(token) {
                out.push_str(value);
            }
            rest = &after[close + 1..];
            continue;
        }

        out.push('{');
        rest = after;
    }

    out.push_str(rest);
    out
}

fn is_identifier(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
