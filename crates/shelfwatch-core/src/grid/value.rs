use serde::{Serialize, Serializer};

/// One cell as submitted with `USER_ENTERED` semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum GridValue {
    /// Renders blank so numeric columns stay aggregable.
    Empty,
    Number(f64),
    Integer(u64),
    Text(String),
    /// A string starting with `=`.
    Formula(String),
}

impl GridValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Cell text as the spreadsheet would receive it.
    pub fn render(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Number(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Text(value) | Self::Formula(value) => value.clone(),
        }
    }

    pub const fn is_formula(&self) -> bool {
        matches!(self, Self::Formula(_))
    }
}

impl Serialize for GridValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_str(""),
            Self::Number(value) => serializer.serialize_f64(*value),
            Self::Integer(value) => serializer.serialize_u64(*value),
            Self::Text(value) | Self::Formula(value) => serializer.serialize_str(value),
        }
    }
}

/// Values for one A1 range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueRange {
    pub range: String,
    pub values: Vec<Vec<GridValue>>,
}

impl ValueRange {
    pub fn single(range: String, value: GridValue) -> Self {
        Self {
            range,
            values: vec![vec![value]],
        }
    }
}

/// Ordered range writes submitted as one request.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatchUpdate {
    pub data: Vec<ValueRange>,
}

impl BatchUpdate {
    pub fn push(&mut self, range: ValueRange) {
        self.data.push(range);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, range: &str) -> Option<&ValueRange> {
        self.data.iter().find(|entry| entry.range == range)
    }
}

/// Highlight applied by the formatting pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    /// Bold on light green (#d9ead3).
    Header,
    /// Bold on yellow, for block markers.
    Marker,
    /// Bold on light green, for metric and price-type names.
    Label,
}

impl CellStyle {
    /// Background as RGB fractions.
    pub const fn background(self) -> (f64, f64, f64) {
        match self {
            Self::Header | Self::Label => (0.85, 0.93, 0.83),
            Self::Marker => (1.0, 1.0, 0.0),
        }
    }
}

/// Formatting for a rectangle of cells. Rows and columns are 1-based and
/// inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellFormat {
    pub first_row: u32,
    pub last_row: u32,
    pub first_column: usize,
    pub last_column: usize,
    pub style: CellStyle,
}

impl CellFormat {
    pub const fn cell(row: u32, column: usize, style: CellStyle) -> Self {
        Self {
            first_row: row,
            last_row: row,
            first_column: column,
            last_column: column,
            style,
        }
    }
}
