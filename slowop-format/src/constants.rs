//! Constants shared by the classifier, extractor and pattern passes

/// Component tag for command execution log lines.
pub const COMPONENT_COMMAND: &str = "COMMAND";
/// Component tag for legacy query log lines.
pub const COMPONENT_QUERY: &str = "QUERY";
/// Component tag for write operation log lines.
pub const COMPONENT_WRITE: &str = "WRITE";
/// Components whose slow operations are analyzed.
pub const SUPPORTED_COMPONENTS: [&str; 3] = [COMPONENT_COMMAND, COMPONENT_QUERY, COMPONENT_WRITE];

/// Log message carried by slow operation lines.
pub const SLOW_QUERY_MESSAGE: &str = "Slow query";

/// Namespace prefixes of internal databases.
pub const SYSTEM_DATABASE_PREFIXES: [&str; 3] = ["admin.", "config.", "local."];
/// Namespace suffix of database command pseudo-collections.
pub const SYSTEM_COMMAND_SUFFIX: &str = ".$cmd";

/// Type hints that carry no operation information.
pub const GENERIC_TYPE_HINTS: [&str; 2] = ["command", "none"];

/// Pattern reported for operations without a filterable shape.
pub const PATTERN_NOT_APPLICABLE: &str = "N/A";
/// Pattern reported when no shape can be serialized.
pub const PATTERN_EMPTY: &str = "{}";
/// Sentinel substituted for every scalar leaf.
pub const SENTINEL: i64 = 1;

/// Filter keys probed for update/delete commands, in order.
pub const WRITE_FILTER_KEYS: [&str; 2] = ["q", "query"];
/// Filter keys probed for every other command, in order.
pub const READ_FILTER_KEYS: [&str; 3] = ["filter", "query", "q"];
/// Key holding the aggregation pipeline.
pub const PIPELINE_KEY: &str = "pipeline";

/// Extended JSON wrapper for regular expressions.
pub const REGEX_WRAPPER_KEY: &str = "$regularExpression";
/// Extended JSON wrapper for object identifiers.
pub const OBJECT_ID_WRAPPER_KEY: &str = "$oid";

/// Stage operators that give an aggregate a filterable shape.
///
/// Matched as key prefixes, so `$sortByCount` counts as `$sort`.
pub const SHAPED_STAGE_OPERATORS: [&str; 4] = ["$match", "$sort", "$facet", "$indexStats"];
/// Stage operators replaced by their value when they wrap the whole pattern.
pub const UNWRAPPED_STAGE_OPERATORS: [&str; 2] = ["$match", "$sort"];
/// Stage operator whose value is elided when it wraps the whole pattern.
pub const FACET_STAGE_OPERATOR: &str = "$facet";

/// Plan summary prefix for index scans.
pub const PLAN_IXSCAN: &str = "IXSCAN";
/// Plan summary for full collection scans.
pub const PLAN_COLLSCAN: &str = "COLLSCAN";
