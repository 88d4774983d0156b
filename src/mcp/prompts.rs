//! Fixed prompt catalog served by `prompts/get`.
//!
//! The catalog is supplied by the embedding application when the router is
//! built and never changes afterwards. Templates may reference arguments as
//! `{name}` placeholders, filled from the `arguments` object of the request.

use serde::Serialize;
use serde_json::{Map, Value};

/// A single prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Prompt name clients ask for.
    pub name: String,
    /// Argument names substituted into the template.
    pub arguments: Vec<String>,
    /// Template text with `{argument}` placeholders.
    pub template: String,
}

impl PromptTemplate {
    /// Creates a template without arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            template: template.into(),
        }
    }

    /// Declares an argument substituted into the template.
    #[must_use]
    pub fn with_argument(mut self, name: impl Into<String>) -> Self {
        self.arguments.push(name.into());
        self
    }

    /// Renders the template, substituting missing arguments with "".
    #[must_use]
    pub fn render(&self, arguments: &Map<String, Value>) -> String {
        self.arguments.iter().fold(self.template.clone(), |text, arg| {
            let value = arguments.get(arg).map_or_else(String::new, |v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            text.replace(&format!("{{{arg}}}"), &value)
        })
    }
}

/// One message of a rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    /// Always "user".
    pub role: &'static str,
    /// Rendered prompt text.
    pub content: String,
}

/// The `prompts/get` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptResult {
    /// `"Prompt: <name>"`.
    pub description: String,
    /// Rendered messages.
    pub messages: Vec<PromptMessage>,
}

/// Enumerated set of prompts, possibly empty.
#[derive(Debug, Clone, Default)]
pub struct PromptCatalog {
    prompts: Vec<PromptTemplate>,
}

impl PromptCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template to the catalog.
    #[must_use]
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompts.push(prompt);
        self
    }

    /// Looks up a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.prompts.iter().find(|p| p.name == name)
    }

    /// Renders the named prompt, or `None` if it is not in the catalog.
    #[must_use]
    pub fn render(&self, name: &str, arguments: &Map<String, Value>) -> Option<PromptResult> {
        let prompt = self.get(name)?;
        Some(PromptResult {
            description: format!("Prompt: {name}"),
            messages: vec![PromptMessage {
                role: "user",
                content: prompt.render(arguments),
            }],
        })
    }

    /// Number of prompts in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    /// Returns `true` if the catalog holds no prompts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
