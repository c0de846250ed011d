//! Namespace filter

use crate::constants::{SYSTEM_COMMAND_SUFFIX, SYSTEM_DATABASE_PREFIXES};
use crate::error::ClassifyError;

/// Reject namespaces that do not belong to user collections.
pub fn check_namespace(namespace: &str) -> Result<(), ClassifyError> {
    if namespace.is_empty() {
        return Err(ClassifyError::MissingNamespace);
    }
    if SYSTEM_DATABASE_PREFIXES
        .iter()
        .any(|prefix| namespace.starts_with(prefix))
    {
        return Err(ClassifyError::SystemDatabase);
    }
    if namespace.ends_with(SYSTEM_COMMAND_SUFFIX) {
        return Err(ClassifyError::SystemCommand);
    }
    Ok(())
}
