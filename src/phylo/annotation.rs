use crate::events::{
    ContentEvent, Event, EventContentType, LiteralContentEvent,
    LiteralMetaEvent, Predicate,
};
use crate::parsers::newick::nhx::predicate_for_nhx_key;
use crate::phylo::literal::{LiteralType, LiteralValue};

/// One `key=value` metadata entry of a node or edge. Entry order is
/// insertion order and is kept on output.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationEntry {
    pub key: String,
    pub predicate: Predicate,
    pub value: Option<LiteralValue>,
    /// Type the value had in the source, if known.
    pub value_type: Option<LiteralType>,
}

impl AnnotationEntry {
    /// Creates an entry whose predicate is looked up from `key`.
    pub fn new(key: impl Into<String>, value: Option<LiteralValue>) -> Self {
        let key = key.into();
        let predicate = predicate_for_nhx_key(&key);
        Self::with_predicate(predicate, key, value)
    }

    pub fn with_predicate(
        predicate: Predicate,
        key: impl Into<String>,
        value: Option<LiteralValue>,
    ) -> Self {
        let value_type = value.as_ref().map(LiteralValue::get_type);
        Self { key: key.into(), predicate, value, value_type }
    }

    /// Event group describing this entry. List values are split into one
    /// content event per element, all but the last marked `continued`.
    pub(crate) fn to_events(&self, meta_id: String) -> Vec<Event> {
        let mut events = vec![Event::Start(ContentEvent::LiteralMeta(
            LiteralMetaEvent {
                id: meta_id,
                predicate: self.predicate,
                key: Some(self.key.clone()),
                value_type: self.value_type,
            },
        ))];

        match &self.value {
            None => {}
            Some(LiteralValue::List(items)) => {
                let last = items.len().saturating_sub(1);
                for (i, item) in items.iter().enumerate() {
                    events.push(Event::Sole(ContentEvent::LiteralMetaContent(
                        LiteralContentEvent {
                            value: Some(item.clone()),
                            string_value: Some(item.to_string()),
                            continued: i < last,
                        },
                    )));
                }
            }
            Some(value) => {
                events.push(Event::literal_content(
                    Some(value.clone()),
                    Some(value.to_string()),
                ));
            }
        }

        events.push(Event::End(EventContentType::LiteralMeta));
        events
    }
}

// =============================================================================
// AnnotationCollector
// =============================================================================

/// Reassembles [AnnotationEntry] values from `LITERAL_META` event groups.
///
/// Errors are returned as messages; callers wrap them in their own
/// inconsistency error.
#[derive(Debug, Default)]
pub(crate) struct AnnotationCollector {
    open: Option<OpenEntry>,
}

#[derive(Debug)]
struct OpenEntry {
    meta: LiteralMetaEvent,
    values: Vec<LiteralValue>,
    last_continued: Option<bool>,
}

impl AnnotationCollector {
    pub(crate) fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub(crate) fn start(&mut self, meta: LiteralMetaEvent) -> Result<(), String> {
        if self.open.is_some() {
            return Err(format!(
                "metadata entry {} starts inside another entry",
                meta.id
            ));
        }
        self.open = Some(OpenEntry { meta, values: Vec::new(), last_continued: None });
        Ok(())
    }

    pub(crate) fn content(
        &mut self,
        content: LiteralContentEvent,
    ) -> Result<(), String> {
        let Some(open) = self.open.as_mut() else {
            return Err("literal content outside a metadata entry".to_string());
        };
        if open.last_continued == Some(false) {
            return Err(format!(
                "metadata entry {} has a second content event after a final one",
                open.meta.id
            ));
        }
        open.last_continued = Some(content.continued);
        if let Some(value) =
            content.value.or(content.string_value.map(LiteralValue::Text))
        {
            open.values.push(value);
        }
        Ok(())
    }

    pub(crate) fn end(&mut self) -> Result<AnnotationEntry, String> {
        let Some(open) = self.open.take() else {
            return Err("metadata entry ends without a start".to_string());
        };
        if open.last_continued == Some(true) {
            return Err(format!(
                "continued literal content of metadata entry {} was never terminated",
                open.meta.id
            ));
        }

        let OpenEntry { meta, mut values, .. } = open;
        let value = if meta.value_type == Some(LiteralType::List) {
            Some(LiteralValue::List(values))
        } else if values.len() <= 1 {
            values.pop()
        } else if values.iter().all(|v| matches!(v, LiteralValue::Text(_))) {
            Some(LiteralValue::Text(values.iter().map(|v| v.to_string()).collect()))
        } else {
            Some(LiteralValue::List(values))
        };

        let key = match meta.key {
            Some(key) => key,
            None => meta.predicate.as_str().to_string(),
        };
        Ok(AnnotationEntry {
            key,
            predicate: meta.predicate,
            value_type: meta.value_type.or(value.as_ref().map(LiteralValue::get_type)),
            value,
        })
    }
}
