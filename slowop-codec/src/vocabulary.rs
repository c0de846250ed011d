//! Operation name vocabulary used to infer kinds from command documents

use slowop_format::constants::GENERIC_TYPE_HINTS;
use slowop_format::{Document, OperationKind};

/// Ordered command keys probed when inferring an operation kind.
///
/// Order matters: a command may carry more than one recognized key (an
/// aggregate stage holding an update-shaped sub-document, for example) and
/// the first match wins.
#[derive(Debug, Clone)]
pub struct OperationVocabulary {
    entries: Vec<(&'static str, OperationKind)>,
}

impl Default for OperationVocabulary {
    fn default() -> Self {
        Self {
            entries: vec![
                ("aggregate", OperationKind::Aggregate),
                ("count", OperationKind::Count),
                ("delete", OperationKind::Delete),
                ("distinct", OperationKind::Distinct),
                ("find", OperationKind::Find),
                ("findandmodify", OperationKind::FindAndModify),
                ("findAndModify", OperationKind::FindAndModify),
                ("getMore", OperationKind::GetMore),
                ("insert", OperationKind::Insert),
                ("update", OperationKind::Update),
                ("createIndexes", OperationKind::CreateIndexes),
            ],
        }
    }
}

impl OperationVocabulary {
    /// Build a vocabulary from an explicit, ordered key list.
    pub fn from_entries(entries: Vec<(&'static str, OperationKind)>) -> Self {
        Self { entries }
    }

    /// Keys in probe order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    /// First kind whose key is present with a non-null value.
    pub fn infer(&self, command: &Document) -> Option<OperationKind> {
        self.entries
            .iter()
            .find(|(key, _)| command.get(*key).is_some_and(|value| !value.is_null()))
            .map(|(_, kind)| *kind)
    }

    /// Kind named by an explicit type hint, if the hint is meaningful.
    pub fn resolve_hint(&self, hint: &str) -> Option<OperationKind> {
        if hint.is_empty() || GENERIC_TYPE_HINTS.contains(&hint) {
            return None;
        }
        OperationKind::from_name(hint)
    }
}
