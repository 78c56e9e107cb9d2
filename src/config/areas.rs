use serde::Deserialize;

const DELIMITERS: [char; 5] = ['/', ',', ';', '|', '\n'];

/// Area input as written by a user: one delimited string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AreaInput {
    One(String),
    Many(Vec<String>),
}

impl Default for AreaInput {
    fn default() -> Self {
        AreaInput::One(String::new())
    }
}

impl AreaInput {
    pub fn to_areas(&self) -> Vec<String> {
        match self {
            AreaInput::One(raw) => split_areas(raw),
            AreaInput::Many(values) => values
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Splits `"Malmö / Eslöv, Skåne län"` into trimmed, non-empty areas.
/// Order and duplicates are preserved.
pub fn split_areas(raw: &str) -> Vec<String> {
    raw.split(|c: char| DELIMITERS.contains(&c))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_areas(areas: &[String]) -> String {
    areas.join(" / ")
}
