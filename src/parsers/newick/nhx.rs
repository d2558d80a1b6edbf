use crate::events::Predicate;
use crate::phylo::annotation::AnnotationEntry;
use crate::phylo::literal::{LiteralTranslator, LiteralValue};

use super::attributes::HotCommentError;

/// Reserved NHX keys and the predicates they stand for. Both lookup
/// directions go through this one table.
static NHX_KEYS: [(&str, Predicate); 6] = [
    ("GN", Predicate::GeneName),
    ("AC", Predicate::SequenceAccession),
    ("B", Predicate::Confidence),
    ("S", Predicate::ScientificName),
    ("T", Predicate::TaxonomyId),
    ("D", Predicate::Event),
];

/// Predicate for a hot-comment key. Keys outside the NHX vocabulary map to
/// [Predicate::HasLiteralMeta].
pub(crate) fn predicate_for_nhx_key(key: &str) -> Predicate {
    NHX_KEYS
        .iter()
        .find(|(nhx_key, _)| *nhx_key == key)
        .map(|(_, predicate)| *predicate)
        .unwrap_or(Predicate::HasLiteralMeta)
}

pub(crate) fn nhx_key_for_predicate(predicate: Predicate) -> Option<&'static str> {
    NHX_KEYS
        .iter()
        .find(|(_, p)| *p == predicate)
        .map(|(nhx_key, _)| *nhx_key)
}

/// Checks if a string is in NHX format and extracts the content.
///
/// A bare `&NHX` must be the whole comment; `&NHXrate=1` is generic.
pub(crate) fn extract_nhx_content(s: &str) -> Option<&str> {
    s.strip_prefix("&&NHX:")
        .or_else(|| s.strip_prefix("&NHX:"))
        .or_else(|| s.strip_prefix("&NHX").filter(|rest| rest.is_empty()))
}

/// Parses NHX (New Hampshire X) format attributes.
///
/// Format: `S=Human:D=Y:B=100` (colon-separated key=value pairs).
pub(crate) fn parse_nhx_attributes(
    s: &str,
    translator: &dyn LiteralTranslator,
) -> Result<Vec<AnnotationEntry>, HotCommentError> {
    let mut result = Vec::new();

    for part in s.split(':') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (key, value) = match part.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (part, None),
        };
        if key.is_empty() {
            return Err(HotCommentError::EmptyKey(part.to_string()));
        }

        let value = value.map(|v| {
            let unquoted = v.trim_matches('"');
            translator.parse(unquoted)
        });
        result.push(AnnotationEntry::new(key, value));
    }

    Ok(result)
}

/// Checks if every entry can be written as `[&&NHX:...]` and read back
/// unchanged.
pub(crate) fn is_nhx_writable(
    entries: &[AnnotationEntry],
    translator: &dyn LiteralTranslator,
) -> bool {
    !entries.is_empty()
        && entries.iter().all(|entry| {
            nhx_key_for_predicate(entry.predicate) == Some(entry.key.as_str())
                && match &entry.value {
                    None => true,
                    Some(LiteralValue::List(_)) => false,
                    Some(value) => {
                        let text = translator.format(value);
                        !text.is_empty()
                            && !text.chars().any(|c| {
                                c.is_whitespace()
                                    || matches!(
                                        c,
                                        ':' | '=' | '[' | ']' | ',' | '\''
                                            | '"' | '{' | '}'
                                    )
                            })
                            && translator.parse(&text) == *value
                    }
                }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phylo::literal::DefaultLiteralTranslator;

    #[test]
    fn test_extract_nhx_content() {
        assert_eq!(extract_nhx_content(""), None);
        assert_eq!(extract_nhx_content("&"), None);
        assert_eq!(extract_nhx_content("NHX"), None);
        assert_eq!(extract_nhx_content("&&NHX:"), Some(""));
        assert_eq!(extract_nhx_content("&NHX:"), Some(""));
        assert_eq!(extract_nhx_content("&NHX"), Some(""));
        assert_eq!(extract_nhx_content("&NHXrate=1"), None);
        assert_eq!(extract_nhx_content("&&NHXS=Human"), None);
        assert_eq!(
            extract_nhx_content("&&NHX:S=Human:B=1.123:T=9606"),
            Some("S=Human:B=1.123:T=9606")
        );
    }

    #[test]
    fn test_parse_nhx_attributes() {
        let entries =
            parse_nhx_attributes("S=Human:D=Y:B=100:XX=7", &DefaultLiteralTranslator)
                .unwrap();
        let summary: Vec<(&str, Predicate, Option<LiteralValue>)> = entries
            .iter()
            .map(|e| (e.key.as_str(), e.predicate, e.value.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("S", Predicate::ScientificName, Some("Human".into())),
                ("D", Predicate::Event, Some("Y".into())),
                ("B", Predicate::Confidence, Some(LiteralValue::Integer(100))),
                ("XX", Predicate::HasLiteralMeta, Some(LiteralValue::Integer(7))),
            ]
        );
    }

    #[test]
    fn test_nhx_empty_key_is_rejected() {
        assert!(parse_nhx_attributes("S=Human:=3", &DefaultLiteralTranslator).is_err());
    }

    #[test]
    fn test_table_is_bidirectional() {
        for (key, predicate) in NHX_KEYS {
            assert_eq!(predicate_for_nhx_key(key), predicate);
            assert_eq!(nhx_key_for_predicate(predicate), Some(key));
        }
        assert_eq!(predicate_for_nhx_key("colour"), Predicate::HasLiteralMeta);
        assert_eq!(nhx_key_for_predicate(Predicate::HasLiteralMeta), None);
    }

    #[test]
    fn test_is_nhx_writable() {
        let translator = DefaultLiteralTranslator;
        let nhx = vec![
            AnnotationEntry::new("S", Some("Human".into())),
            AnnotationEntry::new("B", Some(LiteralValue::Integer(95))),
        ];
        assert!(is_nhx_writable(&nhx, &translator));

        let spaced = vec![AnnotationEntry::new(
            "S",
            Some(LiteralValue::Text("Homo sapiens".into())),
        )];
        assert!(!is_nhx_writable(&spaced, &translator));

        // Would come back as a number.
        let numeric_text =
            vec![AnnotationEntry::new("GN", Some(LiteralValue::Text("42".into())))];
        assert!(!is_nhx_writable(&numeric_text, &translator));

        let generic = vec![AnnotationEntry::new("colour", Some("red".into()))];
        assert!(!is_nhx_writable(&generic, &translator));
    }
}
