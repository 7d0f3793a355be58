//! `{placeholder}` substitution for bundle sources
//!
//! Placeholders are filled from a bundle's `data` mapping. Data values may
//! themselves contain placeholders referring to other keys; those are
//! resolved first, depth-first, with explicit cycle detection. A dotted key
//! (`{urls.base}`) reaches into nested mappings when no top-level key matches
//! it literally. `{{` and `}}` produce literal braces.

use indexmap::IndexMap;
use serde_yaml::Value;
use std::collections::HashMap;

use crate::error::TemplateError;

const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Substitute every placeholder in `template` using `data`
pub fn substitute(template: &str, data: &IndexMap<String, Value>) -> Result<String, TemplateError> {
    Resolver::new(data).expand(template)
}

/// Resolves data values on demand and memoizes them
struct Resolver<'a> {
    data: &'a IndexMap<String, Value>,
    resolved: HashMap<String, String>,
    visiting: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn new(data: &'a IndexMap<String, Value>) -> Self {
        Self {
            data,
            resolved: HashMap::new(),
            visiting: Vec::new(),
        }
    }

    fn expand(&mut self, template: &str) -> Result<String, TemplateError> {
        let bytes = template.as_bytes();
        let mut out = String::with_capacity(template.len());
        let mut literal_start = 0;
        let mut pos = 0;

        while pos < bytes.len() {
            match bytes[pos] {
                b'{' if bytes.get(pos + 1) == Some(&b'{') => {
                    out.push_str(&template[literal_start..pos]);
                    out.push('{');
                    pos += 2;
                    literal_start = pos;
                }
                b'{' => {
                    out.push_str(&template[literal_start..pos]);
                    let close = template[pos + 1..]
                        .find('}')
                        .map(|offset| pos + 1 + offset)
                        .ok_or_else(|| malformed(template, "unclosed '{'"))?;
                    let key = template[pos + 1..close].trim();
                    if key.is_empty() {
                        return Err(malformed(template, "empty placeholder"));
                    }
                    if key.contains('{') {
                        return Err(malformed(template, "nested '{' in placeholder"));
                    }
                    let value = self.lookup(key, template)?;
                    out.push_str(&value);
                    pos = close + 1;
                    literal_start = pos;
                }
                b'}' if bytes.get(pos + 1) == Some(&b'}') => {
                    out.push_str(&template[literal_start..pos]);
                    out.push('}');
                    pos += 2;
                    literal_start = pos;
                }
                b'}' => return Err(malformed(template, "single '}' encountered")),
                _ => pos += 1,
            }
        }

        out.push_str(&template[literal_start..]);
        Ok(out)
    }

    fn lookup(&mut self, key: &str, template: &str) -> Result<String, TemplateError> {
        if let Some(value) = self.resolved.get(key) {
            return Ok(value.clone());
        }

        if let Some(start) = self.visiting.iter().position(|k| k == key) {
            let mut chain = self.visiting[start..].to_vec();
            chain.push(key.to_string());
            return Err(TemplateError::Cycle { chain });
        }

        let raw = self.find(key).ok_or_else(|| TemplateError::MissingKey {
            key: key.to_string(),
            template: template.to_string(),
            help: self.suggest(key),
        })?;

        let value = match raw {
            Value::String(s) => {
                self.visiting.push(key.to_string());
                let expanded = self.expand(s);
                self.visiting.pop();
                expanded?
            }
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            _ => {
                return Err(TemplateError::NotScalar {
                    key: key.to_string(),
                });
            }
        };

        self.resolved.insert(key.to_string(), value.clone());
        Ok(value)
    }

    fn find(&self, key: &str) -> Option<&'a Value> {
        if let Some(value) = self.data.get(key) {
            return Some(value);
        }

        let mut segments = key.split('.');
        let mut current = self.data.get(segments.next()?)?;
        for segment in segments {
            current = current.as_mapping()?.get(segment)?;
        }
        Some(current)
    }

    fn suggest(&self, key: &str) -> Option<String> {
        if let Some((_, candidate)) = self
            .data
            .keys()
            .map(|k| (strsim::levenshtein(key, k), k))
            .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
        {
            return Some(format!("did you mean `{}`?", candidate));
        }

        if self.data.is_empty() {
            Some("the bundle has no `data` entries".to_string())
        } else {
            let keys: Vec<&str> = self.data.keys().map(String::as_str).collect();
            Some(format!("available keys: {}", keys.join(", ")))
        }
    }
}

fn malformed(template: &str, message: &str) -> TemplateError {
    TemplateError::Malformed {
        template: template.to_string(),
        message: message.to_string(),
    }
}
