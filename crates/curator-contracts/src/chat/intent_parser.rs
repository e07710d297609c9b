use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, ADD_COMMAND, CRITIQUE_COMMAND, DEFAULT_ADD_COUNT, IMAGE_ID_COMMANDS,
    NO_ARG_COMMANDS, RAW_ARG_COMMANDS, SINGLE_PATH_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub text: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            text: None,
            command_args: BTreeMap::new(),
        }
    }

    fn with_arg(mut self, key: &str, value: Value) -> Self {
        self.command_args.insert(key.to_string(), value);
        self
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.command_args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn split_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg.split_whitespace().map(str::to_string).collect(),
    }
}

fn parse_single_arg(arg: &str) -> String {
    let parts = split_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

/// Splits `<image-id> <intention...>`; the id may be quoted.
fn parse_critique_args(arg: &str) -> (String, String) {
    let trimmed = arg.trim();
    if let Some(rest) = trimmed.strip_prefix('"') {
        if let Some(end) = rest.find('"') {
            return (rest[..end].to_string(), rest[end + 1..].trim().to_string());
        }
    }
    match trimmed.split_once(char::is_whitespace) {
        Some((id, intention)) => (id.to_string(), intention.trim().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    let Some(slash_tail) = raw_trimmed.strip_prefix('/') else {
        let mut intent = Intent::new("critique_selected", text);
        intent.text = Some(raw_trimmed.to_string());
        return intent;
    };

    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    if command_len == 0 {
        return Intent::new("unknown", text).with_arg("command", Value::String(String::new()));
    }
    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
        return Intent::new(action, text).with_arg("value", Value::String(arg.to_string()));
    }

    if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
        return Intent::new(action, text)
            .with_arg("path", Value::String(parse_single_arg(arg)));
    }

    if let Some(action) = find_action(&command, IMAGE_ID_COMMANDS) {
        return Intent::new(action, text)
            .with_arg("image_id", Value::String(parse_single_arg(arg)));
    }

    if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
        return Intent::new(action, text);
    }

    if command == ADD_COMMAND.command {
        let count = arg
            .parse::<u64>()
            .ok()
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_ADD_COUNT);
        return Intent::new(ADD_COMMAND.action, text).with_arg("count", Value::from(count));
    }

    if command == CRITIQUE_COMMAND.command {
        let (image_id, intention) = parse_critique_args(arg);
        let mut intent = Intent::new(CRITIQUE_COMMAND.action, text)
            .with_arg("image_id", Value::String(image_id));
        intent.text = Some(intention);
        return intent;
    }

    Intent::new("unknown", text)
        .with_arg("command", Value::String(command))
        .with_arg("arg", Value::String(arg.to_string()))
}
