use std::io::Read;

use serde_json::{Map, Value};

use crate::error::Error;

/// Fields that may identify the client site, in lookup order.
const SLUG_FIELDS: [&str; 4] = ["sito_web", "sito", "nome_cliente", "cliente"];

/// Read-only view over the `data` object of an analysis request.
///
/// No schema is enforced: every lookup tolerates absent fields and yields an
/// empty string for them.
#[derive(Clone, Debug)]
pub struct ReportRecord {
    data: Map<String, Value>,
}

impl ReportRecord {
    /// Accepts either `{ "data": { ... } }` or the bare field object.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let Value::Object(mut root) = value else {
            return Err(Error::InvalidRecord("expected a JSON object".into()));
        };
        // only an object-valued `data` is a wrapper; anything else is a field
        let data = match root.remove("data") {
            Some(Value::Object(data)) => data,
            Some(other) => {
                root.insert("data".into(), other);
                root
            }
            None => root,
        };
        Ok(Self { data })
    }

    pub fn from_json_str(s: &str) -> Result<Self, Error> {
        Self::from_value(serde_json::from_str(s)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, Error> {
        Self::from_value(serde_json::from_reader(reader)?)
    }

    /// Look up a dotted path such as `target_demografico.eta`.
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.data.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    pub fn text(&self, path: &str) -> String {
        self.field(path).map(value_text).unwrap_or_default()
    }

    /// Pair a pipe-delimited item list with its explanation list by position.
    ///
    /// Items without a matching explanation get an empty one. Pairs whose item
    /// is blank are dropped after pairing, so stray pipes never shift the
    /// explanations of later items.
    pub fn paired_list(&self, items_path: &str, explanations_path: &str) -> Vec<(String, String)> {
        let items = split_pipes(&self.text(items_path));
        let explanations = split_pipes(&self.text(explanations_path));
        if !explanations.is_empty() && items.len() != explanations.len() {
            log::warn!(
                "{items_path}: {} items but {explanations_path} has {} explanations",
                items.len(),
                explanations.len(),
            );
        }
        items
            .into_iter()
            .enumerate()
            .filter(|(_, item)| !item.is_empty())
            .map(|(i, item)| {
                let explanation = explanations.get(i).cloned().unwrap_or_default();
                (item, explanation)
            })
            .collect()
    }

    /// Site/client identifier, sanitised for use in a file name.
    pub fn slug(&self) -> String {
        SLUG_FIELDS
            .iter()
            .map(|f| self.text(f))
            .find(|v| !v.trim().is_empty())
            .map(|v| slugify(v.trim()))
            .unwrap_or_else(|| "report".to_string())
    }

    pub fn output_filename(&self) -> String {
        output_filename(&self.slug())
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join("|"),
        Value::Object(_) => String::new(),
        other => other.to_string(),
    }
}

/// Split a repeated-value string on `|`, trimming each element.
/// An empty or blank input yields no elements.
pub fn split_pipes(s: &str) -> Vec<String> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    s.split('|').map(|part| part.trim().to_string()).collect()
}

/// Replace every non-alphanumeric character with `_`.
pub fn slugify(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn output_filename(slug: &str) -> String {
    format!("analisi_{slug}.pdf")
}

pub fn content_disposition(slug: &str) -> String {
    format!("inline; filename={}", output_filename(slug))
}
