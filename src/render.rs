use crate::domain::SMALL_COLUMN_LIMIT;
use crate::explorer::{ColumnSummary, Partition};

pub const PAGE_TITLE: &str = "Data Analysis Dashboard";

/// Value boxes are never shorter than this many lines.
pub const MIN_VALUE_BOX_LINES: usize = 3;

pub const VALUES_CAPTION: &str = "Copy all values below:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Small,
    Large,
}

impl SectionKind {
    pub fn index(self) -> usize {
        match self {
            SectionKind::Small => 0,
            SectionKind::Large => 1,
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            SectionKind::Small => SectionKind::Large,
            SectionKind::Large => SectionKind::Small,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelBody {
    Values {
        caption: String,
        values: Vec<String>,
        height: usize,
    },
    Count {
        count: usize,
        note: String,
    },
}

/// One collapsible column block. `key` is the column name and identifies the panel
/// across renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub key: String,
    pub label: String,
    pub body: PanelBody,
}

impl Panel {
    /// Newline joined values, if the panel lists them.
    pub fn copy_text(&self) -> Option<String> {
        match &self.body {
            PanelBody::Values { values, .. } => Some(values.join("\n")),
            PanelBody::Count { .. } => None,
        }
    }

    pub fn count(&self) -> usize {
        match &self.body {
            PanelBody::Values { values, .. } => values.len(),
            PanelBody::Count { count, .. } => *count,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub panels: Vec<Panel>,
    pub placeholder: Option<String>,
}

impl Section {
    pub fn panel(&self, key: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.key == key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.panels.iter().position(|p| p.key == key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub title: String,
    pub sections: [Section; 2],
}

impl Page {
    pub fn section(&self, kind: SectionKind) -> &Section {
        &self.sections[kind.index()]
    }
}

fn small_panel(summary: &ColumnSummary) -> Panel {
    let values: Vec<String> = summary.values.iter().map(|v| v.to_string()).collect();
    Panel {
        key: summary.name.clone(),
        label: format!("📊 {}", summary.name),
        body: PanelBody::Values {
            caption: VALUES_CAPTION.to_string(),
            height: std::cmp::max(MIN_VALUE_BOX_LINES, values.len()),
            values,
        },
    }
}

fn large_panel(summary: &ColumnSummary) -> Panel {
    let count = summary.count();
    Panel {
        key: summary.name.clone(),
        label: format!("📊 {} ({count} unique values)", summary.name),
        body: PanelBody::Count {
            count,
            note: format!(
                "Too many unique values to display for easy copy-paste. Total: {count}."
            ),
        },
    }
}

fn section(
    kind: SectionKind,
    title: String,
    panels: Vec<Panel>,
    placeholder: String,
) -> Section {
    let placeholder = panels.is_empty().then_some(placeholder);
    Section {
        kind,
        title,
        panels,
        placeholder,
    }
}

/// Builds the page for one partition. The result depends on nothing else.
pub fn build_page(partition: &Partition) -> Page {
    let small = section(
        SectionKind::Small,
        format!("Copy-Paste Friendly (<{SMALL_COLUMN_LIMIT} unique values)"),
        partition.small.iter().map(small_panel).collect(),
        format!("No columns with less than {SMALL_COLUMN_LIMIT} unique values."),
    );
    let large = section(
        SectionKind::Large,
        format!("Large Columns ({SMALL_COLUMN_LIMIT}+ unique values)"),
        partition.large.iter().map(large_panel).collect(),
        format!("No columns with {SMALL_COLUMN_LIMIT} or more unique values."),
    );
    Page {
        title: PAGE_TITLE.to_string(),
        sections: [small, large],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::{partition, summarize};
    use crate::table::{CellValue, Column};

    fn summary(name: &str, values: Vec<CellValue>) -> ColumnSummary {
        summarize(&Column::new(name, values))
    }

    fn wide(name: &str, n: usize) -> ColumnSummary {
        summary(name, (0..n).map(|i| CellValue::from(i as i64)).collect())
    }

    #[test]
    fn small_panel_lists_values_one_per_line() {
        let page = build_page(&partition(vec![summary(
            "City",
            vec!["Vienna".into(), "Graz".into(), CellValue::Missing, "Linz".into()],
        )]));
        let panel = &page.section(SectionKind::Small).panels[0];
        assert_eq!(panel.key, "City");
        assert_eq!(panel.label, "📊 City");
        assert_eq!(panel.copy_text().as_deref(), Some("Graz\nLinz\nVienna"));
        assert_eq!(panel.count(), 3);
        match &panel.body {
            PanelBody::Values { caption, height, .. } => {
                assert_eq!(caption, VALUES_CAPTION);
                assert_eq!(*height, 3);
            }
            body => panic!("unexpected body {body:?}"),
        }
    }

    #[test]
    fn value_box_height_has_a_floor() {
        let page = build_page(&partition(vec![
            summary("one", vec![1_i64.into()]),
            wide("many", 40),
        ]));
        let heights: Vec<usize> = page
            .section(SectionKind::Small)
            .panels
            .iter()
            .map(|p| match p.body {
                PanelBody::Values { height, .. } => height,
                PanelBody::Count { .. } => 0,
            })
            .collect();
        assert_eq!(heights, vec![MIN_VALUE_BOX_LINES, 40]);
    }

    #[test]
    fn large_panel_only_shows_count() {
        let page = build_page(&partition(vec![wide("id", 300)]));
        let large = page.section(SectionKind::Large);
        let panel = &large.panels[0];
        assert_eq!(panel.label, "📊 id (300 unique values)");
        assert_eq!(panel.copy_text(), None);
        assert_eq!(
            panel.body,
            PanelBody::Count {
                count: 300,
                note: "Too many unique values to display for easy copy-paste. Total: 300."
                    .to_string(),
            }
        );
        assert_eq!(
            page.section(SectionKind::Small).placeholder.as_deref(),
            Some("No columns with less than 300 unique values.")
        );
        assert_eq!(large.placeholder, None);
    }

    #[test]
    fn empty_partition_renders_placeholders() {
        let page = build_page(&Partition::default());
        assert_eq!(page.title, PAGE_TITLE);
        assert_eq!(
            page.section(SectionKind::Large).placeholder.as_deref(),
            Some("No columns with 300 or more unique values.")
        );
        assert!(page.sections.iter().all(|s| s.panels.is_empty()));
    }

    #[test]
    fn panels_are_keyed_by_column_name() {
        let page = build_page(&partition(vec![
            wide("b", 2),
            wide("big", 310),
            wide("a", 2),
        ]));
        let small = page.section(SectionKind::Small);
        assert_eq!(small.position("a"), Some(1));
        assert_eq!(small.panel("b").map(|p| p.label.as_str()), Some("📊 b"));
        assert!(small.panel("big").is_none());
        assert_eq!(page.section(SectionKind::Large).position("big"), Some(0));
    }

    #[test]
    fn page_is_a_function_of_its_input() {
        let input = partition(vec![wide("x", 5), wide("y", 305)]);
        assert_eq!(build_page(&input), build_page(&input.clone()));
    }
}
