use super::nhx::{extract_nhx_content, parse_nhx_attributes};
use crate::phylo::annotation::AnnotationEntry;
use crate::phylo::literal::{LiteralTranslator, LiteralValue};

use thiserror::Error;

/// Why a hot comment could not be read as annotations.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum HotCommentError {
    #[error("Unbalanced quote in \"{0}\".")]
    UnbalancedQuote(String),
    #[error("Unbalanced brace in \"{0}\".")]
    UnbalancedBrace(String),
    #[error("Missing key in \"{0}\".")]
    EmptyKey(String),
    #[error("Missing value for key \"{0}\".")]
    EmptyValue(String),
}

/// Parses the content of a hot comment (everything between `[` and `]`,
/// starting with `&`) into annotation entries.
///
/// `[&&NHX:...]` content is read with the NHX dialect; everything else with
/// the generic `&key=value,key2={a,b}` dialect. `[&]` yields no entries.
pub(crate) fn parse_hot_comment(
    content: &str,
    translator: &dyn LiteralTranslator,
) -> Result<Vec<AnnotationEntry>, HotCommentError> {
    if let Some(nhx_content) = extract_nhx_content(content) {
        return parse_nhx_attributes(nhx_content, translator);
    }

    let body = content.strip_prefix('&').unwrap_or(content);
    let mut result = Vec::new();
    for part in split_respecting_brackets(body, ',')? {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        result.push(parse_entry(part, translator)?);
    }
    Ok(result)
}

/// Parses one `key=value` or key-only part. Keys may carry their own
/// leading `&`, as in `[&a=1,&b=2]`.
fn parse_entry(
    part: &str,
    translator: &dyn LiteralTranslator,
) -> Result<AnnotationEntry, HotCommentError> {
    let (key, value) = match split_respecting_brackets(part, '=')?.as_slice() {
        [key] => (*key, None),
        [key, ..] => (*key, Some(&part[key.len() + 1..])),
        [] => (part, None),
    };

    let key = key.trim().trim_start_matches('&').trim();
    if key.is_empty() || key.contains(['"', '\'', '{', '}']) {
        return Err(HotCommentError::EmptyKey(part.to_string()));
    }

    let value = match value {
        None => None,
        Some(value) => {
            let value = value.trim();
            if value.is_empty() {
                return Err(HotCommentError::EmptyValue(key.to_string()));
            }
            Some(parse_value(value, translator)?)
        }
    };

    Ok(AnnotationEntry::new(key, value))
}

/// Parses a scalar, a quoted string or a brace-delimited list of either.
fn parse_value(
    value: &str,
    translator: &dyn LiteralTranslator,
) -> Result<LiteralValue, HotCommentError> {
    if let Some(inner) = value.strip_prefix('{') {
        let Some(inner) = inner.strip_suffix('}') else {
            return Err(HotCommentError::UnbalancedBrace(value.to_string()));
        };
        if inner.trim().is_empty() {
            return Ok(LiteralValue::List(Vec::new()));
        }
        let items = split_respecting_brackets(inner, ',')?
            .into_iter()
            .map(|item| {
                let item = item.trim();
                if item.is_empty() {
                    Err(HotCommentError::EmptyValue(value.to_string()))
                } else {
                    parse_value(item, translator)
                }
            })
            .collect::<Result<Vec<LiteralValue>, HotCommentError>>()?;
        return Ok(LiteralValue::List(items));
    }

    if let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'')
    {
        let inner = &value[1..];
        let Some(inner) = inner.strip_suffix(quote) else {
            return Err(HotCommentError::UnbalancedQuote(value.to_string()));
        };
        let doubled = format!("{quote}{quote}");
        let unescaped = inner.replace(&doubled, &quote.to_string());
        if unescaped.contains(quote) && unescaped.matches(quote).count() * 2
            != inner.matches(quote).count()
        {
            return Err(HotCommentError::UnbalancedQuote(value.to_string()));
        }
        return Ok(LiteralValue::Text(unescaped));
    }

    if value.contains(['}', '"', '\'']) {
        return Err(HotCommentError::UnbalancedBrace(value.to_string()));
    }
    Ok(translator.parse(value))
}

/// Splits string at delimiter while respecting nested structures.
///
/// Delimiters inside braces `{}`, brackets `[]` or quotes are ignored. A
/// doubled quote inside a quoted run is an escaped quote.
pub(crate) fn split_respecting_brackets(
    s: &str,
    delimiter: char,
) -> Result<Vec<&str>, HotCommentError> {
    let mut result = Vec::new();
    let mut bracket_depth: usize = 0;
    let mut brace_depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (char_index, character) in s.char_indices() {
        if let Some(q) = quote {
            if character == q {
                quote = None;
            }
            continue;
        }
        match character {
            '"' | '\'' => quote = Some(character),
            '[' => bracket_depth += 1,
            '{' => brace_depth += 1,
            ']' => {
                bracket_depth = bracket_depth
                    .checked_sub(1)
                    .ok_or_else(|| HotCommentError::UnbalancedBrace(s.to_string()))?;
            }
            '}' => {
                brace_depth = brace_depth
                    .checked_sub(1)
                    .ok_or_else(|| HotCommentError::UnbalancedBrace(s.to_string()))?;
            }
            current_char
                if current_char == delimiter
                    && bracket_depth == 0
                    && brace_depth == 0 =>
            {
                result.push(&s[start..char_index]);
                start = char_index + current_char.len_utf8();
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(HotCommentError::UnbalancedQuote(s.to_string()));
    }
    if bracket_depth != 0 || brace_depth != 0 {
        return Err(HotCommentError::UnbalancedBrace(s.to_string()));
    }

    result.push(&s[start..]);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Predicate;
    use crate::phylo::literal::DefaultLiteralTranslator;

    fn parse(s: &str) -> Result<Vec<(String, Option<LiteralValue>)>, HotCommentError> {
        Ok(parse_hot_comment(s, &DefaultLiteralTranslator)?
            .into_iter()
            .map(|e| (e.key, e.value))
            .collect())
    }

    #[test]
    fn test_generic_dialect() {
        let test_cases: Vec<(&str, Vec<(String, Option<LiteralValue>)>)> = vec![
            ("&", vec![]),
            ("& ", vec![]),
            ("&a=1", vec![("a".into(), Some(LiteralValue::Integer(1)))]),
            (
                "&support=0.95,name=\"Homo sapiens\"",
                vec![
                    ("support".into(), Some(LiteralValue::Decimal(0.95))),
                    ("name".into(), Some(LiteralValue::Text("Homo sapiens".into()))),
                ],
            ),
            (
                "&&a=1,&b=x",
                vec![
                    ("a".into(), Some(LiteralValue::Integer(1))),
                    ("b".into(), Some(LiteralValue::Text("x".into()))),
                ],
            ),
            (
                "&rates={1,2.5,'a,b'}",
                vec![(
                    "rates".into(),
                    Some(LiteralValue::List(vec![
                        LiteralValue::Integer(1),
                        LiteralValue::Decimal(2.5),
                        LiteralValue::Text("a,b".into()),
                    ])),
                )],
            ),
            ("&flag", vec![("flag".into(), None)]),
            (
                "&q=\"say \"\"hi\"\"\"",
                vec![("q".into(), Some(LiteralValue::Text("say \"hi\"".into())))],
            ),
            ("&n=\"5\"", vec![("n".into(), Some(LiteralValue::Text("5".into())))]),
        ];

        for (input, expected) in test_cases {
            println!("{input}");
            assert_eq!(parse(input).unwrap(), expected);
        }
    }

    #[test]
    fn test_nhx_dialect_dispatch() {
        let entries =
            parse_hot_comment("&&NHX:S=Human:B=100", &DefaultLiteralTranslator).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].predicate, Predicate::ScientificName);
        assert_eq!(entries[1].value, Some(LiteralValue::Integer(100)));

        // Generic content that merely starts with the letters NHX.
        let entries =
            parse_hot_comment("&NHXrate=1", &DefaultLiteralTranslator).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "NHXrate");
        assert_eq!(entries[0].value, Some(LiteralValue::Integer(1)));
    }

    #[test]
    fn test_generic_keys_use_nhx_table() {
        let entries =
            parse_hot_comment("&S=\"Homo sapiens\",colour=red", &DefaultLiteralTranslator)
                .unwrap();
        assert_eq!(entries[0].predicate, Predicate::ScientificName);
        assert_eq!(entries[1].predicate, Predicate::HasLiteralMeta);
    }

    #[test]
    fn test_malformed_hot_comments() {
        let test_cases = vec![
            "&a=\"open",
            "&a={1,2",
            "&a=1}",
            "&=5",
            "&a=",
            "&a={1,,2}",
        ];
        for input in test_cases {
            println!("{input}");
            assert!(parse(input).is_err());
        }
    }
}
