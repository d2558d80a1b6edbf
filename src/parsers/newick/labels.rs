/// Checks if a character can appear in an unquoted name as written.
/// Spaces are allowed because they are written as underscores.
fn is_unquoted_safe(c: char) -> bool {
    !matches!(c, '(' | ')' | '[' | ']' | ',' | ';' | ':' | '\'' | '"' | '_')
        && (c == ' ' || !c.is_whitespace())
        && !c.is_control()
}

/// Formats a node name for output.
///
/// A name made only of safe characters is written bare, spaces becoming
/// underscores. Anything else is single quoted with embedded `'` doubled.
/// Reading the result back yields the original name.
pub(crate) fn format_name(name: &str) -> String {
    if name.chars().all(is_unquoted_safe) {
        name.replace(' ', "_")
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// eNewick label `base#TypeIndex`, e.g. `A#H1` or `#LGT21`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkLabel {
    pub base_label: String,
    pub network_index: u64,
    pub edge_type: Option<String>,
}

impl NetworkLabel {
    /// Splits a label at its last `#`. Returns `None` if the part after it
    /// is not letters followed by at least one digit.
    pub fn parse(label: &str) -> Option<Self> {
        let (base_label, suffix) = label.rsplit_once('#')?;
        let digits_start = suffix
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphabetic())
            .map(|(i, _)| i)?;
        let (edge_type, digits) = suffix.split_at(digits_start);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            base_label: base_label.to_string(),
            network_index: digits.parse().ok()?,
            edge_type: if edge_type.is_empty() {
                None
            } else {
                Some(edge_type.to_string())
            },
        })
    }
}
