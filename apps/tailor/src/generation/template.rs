//! Prompt template rendering. `{name}` slots are filled from a context mapping;
//! `{{` and `}}` produce literal braces.

use std::collections::HashMap;

use thiserror::Error;

/// Named values available to a prompt template.
pub type PromptContext = HashMap<String, String>;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("slot '{{{0}}}' has no value in the prompt context")]
    MissingSlot(String),

    #[error("malformed template at byte {position}: {reason}")]
    Malformed {
        position: usize,
        reason: &'static str,
    },
}

/// Renders `template` against `context`. Every referenced slot must be present.
pub fn render(template: &str, context: &PromptContext) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                out.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    if c == '{' {
                        return Err(TemplateError::Malformed {
                            position,
                            reason: "nested '{' inside a slot",
                        });
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(TemplateError::Malformed {
                        position,
                        reason: "unterminated '{'",
                    });
                }
                let name = name.trim();
                if name.is_empty() {
                    return Err(TemplateError::Malformed {
                        position,
                        reason: "empty slot name",
                    });
                }
                let value = context
                    .get(name)
                    .ok_or_else(|| TemplateError::MissingSlot(name.to_string()))?;
                out.push_str(value);
            }
            '}' => {
                return Err(TemplateError::Malformed {
                    position,
                    reason: "single '}' outside a slot",
                })
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
