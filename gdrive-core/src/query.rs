use std::fmt;

use crate::client::FOLDER_MIME_TYPE;

/// Escapes a value for use inside a single-quoted Drive query literal.
pub fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Builder for the `q` parameter of `files.list`; clauses are joined with `and`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQuery {
    clauses: Vec<String>,
}

impl FileQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_parents(self, parent_id: &str) -> Self {
        self.clause(format!("'{}' in parents", escape_query_literal(parent_id)))
    }

    pub fn name_equals(self, name: &str) -> Self {
        self.clause(format!("name = '{}'", escape_query_literal(name)))
    }

    pub fn name_contains(self, fragment: &str) -> Self {
        self.clause(format!("name contains '{}'", escape_query_literal(fragment)))
    }

    pub fn mime_type(self, mime_type: &str) -> Self {
        self.clause(format!("mimeType = '{}'", escape_query_literal(mime_type)))
    }

    pub fn folders_only(self) -> Self {
        self.mime_type(FOLDER_MIME_TYPE)
    }

    pub fn trashed(self, trashed: bool) -> Self {
        self.clause(format!("trashed = {trashed}"))
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn build(&self) -> String {
        self.clauses.join(" and ")
    }

    fn clause(mut self, clause: String) -> Self {
        self.clauses.push(clause);
        self
    }
}

impl fmt::Display for FileQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape_query_literal("Bob's"), "Bob\\'s");
        assert_eq!(escape_query_literal("a\\b"), "a\\\\b");
        assert_eq!(escape_query_literal("plain"), "plain");
    }

    #[test]
    fn builds_folder_lookup_query() {
        let query = FileQuery::new()
            .folders_only()
            .in_parents("root")
            .name_equals("Bob's Files")
            .trashed(false);
        assert_eq!(
            query.build(),
            "mimeType = 'application/vnd.google-apps.folder' and 'root' in parents \
             and name = 'Bob\\'s Files' and trashed = false"
        );
    }

    #[test]
    fn empty_query_builds_empty_string() {
        let query = FileQuery::new();
        assert!(query.is_empty());
        assert_eq!(query.to_string(), "");
    }
}
