use std::collections::BTreeSet;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::domain::SMALL_COLUMN_LIMIT;
use crate::table::{CellValue, Column, Table};

/// Lower case search terms matched against column names.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SearchQuery {
    terms: BTreeSet<String>,
}

impl SearchQuery {
    /// Splits `raw` on commas and new lines. Terms are trimmed and lower cased, empty
    /// terms are dropped.
    pub fn parse(raw: &str) -> Self {
        let terms = raw
            .split([',', '\n'])
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }

    /// True if any term is a substring of the trimmed, lower cased `name`.
    pub fn matches(&self, name: &str) -> bool {
        let key = name.trim().to_lowercase();
        self.terms.iter().any(|term| key.contains(term.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl ColumnSummary {
    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn is_small(&self) -> bool {
        self.count() < SMALL_COLUMN_LIMIT
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Partition {
    pub small: Vec<ColumnSummary>,
    pub large: Vec<ColumnSummary>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.small.len() + self.large.len()
    }
}

/// Column names sorted case-insensitively, ignoring surrounding whitespace, and
/// filtered by `query`. Names with equal sort keys keep the table order.
pub fn select_columns<'a>(table: &'a Table, query: &SearchQuery) -> Vec<&'a str> {
    let mut names: Vec<&str> = table.column_names().collect();
    names.sort_by_cached_key(|name| name.trim().to_lowercase());
    if !query.is_empty() {
        names.retain(|name| query.matches(name));
    }
    names
}

/// Sorted unique non missing values of `column`.
pub fn summarize(column: &Column) -> ColumnSummary {
    let mut values: Vec<CellValue> = column
        .values
        .iter()
        .filter(|v| !v.is_missing())
        .cloned()
        .collect();
    values.sort_unstable();
    values.dedup();
    ColumnSummary {
        name: column.name.clone(),
        values,
    }
}

/// Splits summaries at [`SMALL_COLUMN_LIMIT`] unique values, keeping their order.
pub fn partition(summaries: Vec<ColumnSummary>) -> Partition {
    let (small, large) = summaries.into_iter().partition(ColumnSummary::is_small);
    Partition { small, large }
}

/// Selects, summarizes and partitions the columns of `table` for one interaction.
pub fn explore(table: &Table, query: &SearchQuery) -> Partition {
    let start_time = Instant::now();
    let names = select_columns(table, query);
    trace!("Selected columns {:?}", names);

    // Summaries are computed in parallel, collect keeps the selection order.
    let summaries: Vec<ColumnSummary> = names
        .par_iter()
        .filter_map(|name| table.column(name))
        .map(summarize)
        .collect();

    let result = partition(summaries);
    debug!(
        "Explored {} columns ({} small, {} large) in {}ms",
        result.len(),
        result.small.len(),
        result.large.len(),
        start_time.elapsed().as_millis()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_with_uniques(name: &str, n: usize) -> Column {
        let values = (0..n).map(|i| CellValue::from(i as i64)).collect();
        Column::new(name, values)
    }

    fn table(names: &[&str]) -> Table {
        let columns = names
            .iter()
            .map(|name| Column::new(*name, vec![CellValue::Missing]))
            .collect();
        Table::new("t", columns).unwrap()
    }

    #[test]
    fn parse_splits_on_commas_and_newlines() {
        let query = SearchQuery::parse("Foo, bar\nBAZ");
        assert_eq!(query.len(), 3);
        assert!(query.contains("foo"));
        assert!(query.contains("bar"));
        assert!(query.contains("baz"));
    }

    #[test]
    fn parse_drops_empty_terms() {
        assert!(SearchQuery::parse("   ").is_empty());
        assert!(SearchQuery::parse("").is_empty());
        assert_eq!(SearchQuery::parse(",, \n age ,\n\n").len(), 1);
        assert_eq!(SearchQuery::parse("a,A, a "), SearchQuery::parse("a"));
    }

    #[test]
    fn select_filters_by_substring() {
        let table = table(&["Age", "Name", "AgeGroup"]);
        let query = SearchQuery::parse("age");
        assert_eq!(select_columns(&table, &query), vec!["Age", "AgeGroup"]);
    }

    #[test]
    fn select_without_query_sorts_all_columns() {
        let table = table(&["b", " A", "c ", "a"]);
        let names = select_columns(&table, &SearchQuery::default());
        // " A" and "a" share a sort key and keep the table order.
        assert_eq!(names, vec![" A", "a", "b", "c "]);
    }

    #[test]
    fn select_matches_any_term_and_trims_names() {
        let table = table(&[" City ", "Name", "AgeGroup", "zip"]);
        let query = SearchQuery::parse("city\nZIP");
        assert_eq!(select_columns(&table, &query), vec![" City ", "zip"]);

        let nothing = SearchQuery::parse("weight");
        assert!(select_columns(&table, &nothing).is_empty());
    }

    #[test]
    fn summarize_drops_missing_and_duplicates() {
        let column = Column::new(
            "n",
            vec![
                1_i64.into(),
                2_i64.into(),
                2_i64.into(),
                CellValue::Missing,
                1_i64.into(),
                3_i64.into(),
            ],
        );
        let summary = summarize(&column);
        assert_eq!(
            summary.values,
            vec![CellValue::from(1_i64), 2_i64.into(), 3_i64.into()]
        );
        assert_eq!(summary.count(), 3);
    }

    #[test]
    fn summarize_ignores_row_order() {
        let values: Vec<CellValue> = vec!["b".into(), "a".into(), CellValue::Missing, "b".into()];
        let mut reversed = values.clone();
        reversed.reverse();

        let first = summarize(&Column::new("c", values));
        let second = summarize(&Column::new("c", reversed));
        assert_eq!(first, second);
        assert_eq!(summarize(&Column::new("c", first.values.clone())), first);
    }

    #[test]
    fn summarize_orders_mixed_values() {
        let column = Column::new(
            "mixed",
            vec!["x".into(), 10_i64.into(), 2.5_f64.into(), "a".into(), 10_i64.into()],
        );
        let shown: Vec<String> = summarize(&column).values.iter().map(|v| v.to_string()).collect();
        assert_eq!(shown, vec!["2.5", "10", "a", "x"]);
    }

    #[test]
    fn partition_boundary_is_300() {
        let summaries = vec![
            summarize(&column_with_uniques("299", 299)),
            summarize(&column_with_uniques("300", 300)),
            summarize(&column_with_uniques("0", 0)),
            summarize(&column_with_uniques("301", 301)),
        ];
        let result = partition(summaries);
        let small: Vec<&str> = result.small.iter().map(|s| s.name.as_str()).collect();
        let large: Vec<&str> = result.large.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(small, vec!["299", "0"]);
        assert_eq!(large, vec!["300", "301"]);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn explore_keeps_selection_order() {
        let pad = |mut c: Column| {
            c.values.resize(350, CellValue::Missing);
            c
        };
        let columns = vec![
            pad(column_with_uniques("wide", 350)),
            pad(column_with_uniques("Beta", 350)),
            pad(column_with_uniques("alpha", 5)),
            pad(column_with_uniques("Gamma", 7)),
        ];
        let table = Table::new("t", columns).unwrap();

        let result = explore(&table, &SearchQuery::default());
        let small: Vec<&str> = result.small.iter().map(|s| s.name.as_str()).collect();
        let large: Vec<&str> = result.large.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(small, vec!["alpha", "Gamma"]);
        assert_eq!(large, vec!["Beta", "wide"]);

        let filtered = explore(&table, &SearchQuery::parse("a"));
        assert_eq!(filtered.len(), 3);
        assert!(filtered.large.iter().all(|s| s.name == "Beta"));
    }
}
