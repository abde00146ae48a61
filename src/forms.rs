//! Declarative descriptions of the back-office forms.
//!
//! The admin UI renders its inputs from a [`FormSchema`], and the server
//! checks submitted bodies against the same schema before deserialising
//! them into typed inputs, so both sides agree on what a field accepts.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::db::models::{StoryKind, StoryStatus};
use crate::error::FieldError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text {
        multiline: bool,
        max_length: Option<usize>,
    },
    Number {
        min: Option<i64>,
        max: Option<i64>,
    },
    Select {
        options: Vec<String>,
    },
    MultiSelect {
        options: Vec<String>,
    },
    TextList {
        max_items: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FormField {
    fn text(name: &'static str, label: &'static str, max_length: usize) -> Self {
        Self {
            name,
            label,
            required: true,
            kind: FieldKind::Text {
                multiline: false,
                max_length: Some(max_length),
            },
        }
    }

    fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    fn multiline(mut self) -> Self {
        if let FieldKind::Text { ref mut multiline, .. } = self.kind {
            *multiline = true;
        }
        self
    }

    fn check(&self, value: &Value, errors: &mut Vec<FieldError>) {
        let name = self.name;
        match &self.kind {
            FieldKind::Text { max_length, .. } => {
                let Some(s) = value.as_str() else {
                    errors.push(FieldError::new(name, "must be a string"));
                    return;
                };
                if self.required && s.trim().is_empty() {
                    errors.push(FieldError::new(name, "is required"));
                } else if let Some(max) = max_length {
                    if s.chars().count() > *max {
                        errors.push(FieldError::new(
                            name,
                            format!("must be at most {} characters", max),
                        ));
                    }
                }
            }
            FieldKind::Number { min, max } => {
                let Some(n) = value.as_i64() else {
                    errors.push(FieldError::new(name, "must be an integer"));
                    return;
                };
                if let Some(min) = min {
                    if n < *min {
                        errors.push(FieldError::new(name, format!("must be at least {}", min)));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        errors.push(FieldError::new(name, format!("must be at most {}", max)));
                    }
                }
            }
            FieldKind::Select { options } => match value.as_str() {
                Some(s) if options.iter().any(|o| o == s) => {}
                Some(s) => errors.push(FieldError::new(name, format!("'{}' is not an option", s))),
                None => errors.push(FieldError::new(name, "must be a string")),
            },
            FieldKind::MultiSelect { options } => {
                let Some(items) = value.as_array() else {
                    errors.push(FieldError::new(name, "must be a list"));
                    return;
                };
                for item in items {
                    match item.as_str() {
                        Some(s) if options.iter().any(|o| o == s) => {}
                        Some(s) => {
                            errors.push(FieldError::new(name, format!("'{}' is not an option", s)))
                        }
                        None => errors.push(FieldError::new(name, "must contain only strings")),
                    }
                }
            }
            FieldKind::TextList { max_items } => {
                let Some(items) = value.as_array() else {
                    errors.push(FieldError::new(name, "must be a list"));
                    return;
                };
                if items.iter().any(|i| !i.is_string()) {
                    errors.push(FieldError::new(name, "must contain only strings"));
                }
                if let Some(max) = max_items {
                    if items.len() > *max {
                        errors.push(FieldError::new(name, format!("must have at most {} items", max)));
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSchema {
    pub entity: &'static str,
    pub fields: Vec<FormField>,
}

impl FormSchema {
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check a submitted body, collecting every problem rather than stopping
    /// at the first. `null` counts as absent.
    pub fn validate(&self, body: &Value) -> Result<(), Vec<FieldError>> {
        let Some(object) = body.as_object() else {
            return Err(vec![FieldError::new("body", "must be a JSON object")]);
        };

        let mut errors = Vec::new();
        for field in &self.fields {
            match present(object, field.name) {
                Some(value) => field.check(value, &mut errors),
                None if field.required => errors.push(FieldError::new(field.name, "is required")),
                None => {}
            }
        }

        for key in object.keys() {
            if self.field(key).is_none() {
                errors.push(FieldError::new(key.as_str(), "is not a known field"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn present<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    object.get(name).filter(|v| !v.is_null())
}

fn names<I, T>(items: I, f: fn(&T) -> &'static str) -> Vec<String>
where
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| f(&item).to_string()).collect()
}

pub fn story_form(genres: &[String]) -> FormSchema {
    FormSchema {
        entity: "story",
        fields: vec![
            FormField::text("title", "Title", 200),
            FormField::text("author", "Author", 100),
            FormField::text("description", "Description", 5000)
                .multiline()
                .optional(),
            FormField::text("cover_url", "Cover image URL", 500).optional(),
            FormField {
                name: "kind",
                label: "Type",
                required: true,
                kind: FieldKind::Select {
                    options: names(StoryKind::ALL, StoryKind::as_str),
                },
            },
            FormField {
                name: "status",
                label: "Status",
                required: false,
                kind: FieldKind::Select {
                    options: names(StoryStatus::ALL, StoryStatus::as_str),
                },
            },
            FormField {
                name: "genres",
                label: "Genres",
                required: false,
                kind: FieldKind::MultiSelect {
                    options: genres.to_vec(),
                },
            },
        ],
    }
}

pub fn chapter_form() -> FormSchema {
    FormSchema {
        entity: "chapter",
        fields: vec![
            FormField {
                name: "number",
                label: "Chapter number",
                required: true,
                kind: FieldKind::Number {
                    min: Some(1),
                    max: None,
                },
            },
            FormField::text("title", "Title", 200),
            FormField {
                name: "content_type",
                label: "Content type",
                required: true,
                kind: FieldKind::Select {
                    options: vec!["novel".into(), "oneshot".into(), "comic".into()],
                },
            },
            FormField::text("body", "Text", 200_000).multiline().optional(),
            FormField {
                name: "pages",
                label: "Page image URLs",
                required: false,
                kind: FieldKind::TextList {
                    max_items: Some(500),
                },
            },
        ],
    }
}
