use std::cmp::Ordering;
use std::fmt;

use crate::domain::CVError;

/// A single cell of a loaded table.
///
/// Columns coming from polars are integers, floats or cast to their string
/// form, so a column normally holds only one kind of value. Mixed columns are
/// still ordered: `Integer` and `Number` compare by numeric value and come
/// before `Text`.
#[derive(Debug, Clone)]
pub enum CellValue {
    Missing,
    Integer(i128),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Builds a numeric cell. `NaN` is a missing value and `-0.0` is folded into `0.0`.
    pub fn number(value: f64) -> Self {
        if value.is_nan() {
            CellValue::Missing
        } else if value == 0.0 {
            CellValue::Number(0.0)
        } else {
            CellValue::Number(value)
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Missing => 0,
            CellValue::Integer(_) | CellValue::Number(_) => 1,
            CellValue::Text(_) => 2,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Missing => write!(f, "∅"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Number(v) => write!(f, "{}", float_text(*v)),
            CellValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b))
            }
            (CellValue::Integer(a), CellValue::Integer(b)) => a.cmp(b),
            (CellValue::Integer(a), CellValue::Number(b)) => cmp_integer_float(*a, *b),
            (CellValue::Number(a), CellValue::Integer(b)) => cmp_integer_float(*b, *a).reverse(),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value.into())
    }
}

impl From<u64> for CellValue {
    fn from(value: u64) -> Self {
        CellValue::Integer(value.into())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Missing, Into::into)
    }
}

/// Exact comparison of an integer with a float. Every `i128` lies in `[-2^127, 2^127)`.
fn cmp_integer_float(i: i128, f: f64) -> Ordering {
    let bound = 2f64.powi(127);
    if f >= bound {
        return Ordering::Less;
    }
    if f < -bound {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i128)) {
        Ordering::Equal => whole.partial_cmp(&f).unwrap_or(Ordering::Equal),
        ordering => ordering,
    }
}

/// Shortest round trip text of a float. Integral values keep a `.0`, and values below `1e-4`
/// or from `1e16` on use exponent form, e.g. `1e+16` and `1.5e-05`.
fn float_text(v: f64) -> String {
    if v.is_infinite() {
        return if v > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let scientific = format!("{v:e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if v != 0.0 && !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exponent.abs());
    }
    let plain = v.to_string();
    if plain.contains('.') { plain } else { format!("{plain}.0") }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// An immutable, column oriented table. All columns have the same number of rows.
#[derive(Debug, Default)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    nrows: usize,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self, CVError> {
        let nrows = columns.first().map(Column::len).unwrap_or(0);
        if let Some(column) = columns.iter().find(|c| c.len() != nrows) {
            return Err(CVError::LoadingFailed(format!(
                "Column \"{}\" has {} rows, expected {}!",
                column.name,
                column.len(),
                nrows
            )));
        }
        Ok(Self {
            name: name.into(),
            columns,
            nrows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncolumns(&self) -> usize {
        self.columns.len()
    }
}
