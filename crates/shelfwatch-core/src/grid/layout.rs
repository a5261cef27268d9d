//! Row and column layout of the monitoring grid.
//!
//! The layout is rebuilt from configuration on every cycle. Iteration order
//! is fixed (metric, then company, then URL), so an unchanged configuration
//! always yields the same row numbers and slot-column history lines up
//! across cycles.

use serde::Serialize;

use super::a1;
use super::value::GridValue;
use crate::domain::{CompanyGroup, Field, ListingCode, Money, ProductRecord, TimeSlot};

pub const FIXED_COLUMNS: [&str; 3] = ["Name", "Parameter", "CurrentData"];
pub const CURRENT_DATA_COLUMN: usize = 3;
pub const ANALYSIS_MARKER: &str = "Analysis zone";
pub const PARENT_MARKER: &str = "Parent ASIN";
pub const VARIATION_MARKER: &str = "Variations ASIN";
pub const AVERAGE_LABEL: &str = "Average price";
pub const NOT_FOUND_LABEL: &str = "Not Found";
/// Row of the cycle timestamp in the `CurrentData` column.
pub const TIMESTAMP_ROW: u32 = 2;
/// First row of the data block.
pub const START_ROW: u32 = 3;

/// Metrics of the parent block, in row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Metric {
    BestSellerRank,
    ReviewCount,
    Rating,
    Price,
}

impl Metric {
    pub const ALL: [Self; 4] = [Self::BestSellerRank, Self::ReviewCount, Self::Rating, Self::Price];

    pub const fn label(self) -> &'static str {
        match self {
            Self::BestSellerRank => "BSR",
            Self::ReviewCount => "Number of Reviews",
            Self::Rating => "Rating",
            Self::Price => "Price",
        }
    }

    pub fn value(self, record: &ProductRecord) -> GridValue {
        match self {
            Self::BestSellerRank => integer(record.headline_rank()),
            Self::ReviewCount => integer(record.review_count.clone()),
            Self::Rating => match record.rating {
                Field::Found(rating) => GridValue::Number(rating),
                Field::NotFound => GridValue::Empty,
            },
            Self::Price => money(&record.full_price),
        }
    }
}

/// Price types of the variation block, in row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PriceType {
    Price,
    ListPrice,
    PrimePrice,
}

impl PriceType {
    pub const ALL: [Self; 3] = [Self::Price, Self::ListPrice, Self::PrimePrice];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Price => "Price",
            Self::ListPrice => "List Price",
            Self::PrimePrice => "Prime Price",
        }
    }

    pub fn value(self, record: &ProductRecord) -> GridValue {
        match self {
            Self::Price => money(&record.full_price),
            Self::ListPrice => money(&record.list_price),
            Self::PrimePrice => money(&record.prime_price),
        }
    }
}

fn integer(field: Field<u64>) -> GridValue {
    match field {
        Field::Found(value) => GridValue::Integer(value),
        Field::NotFound => GridValue::Empty,
    }
}

fn money(field: &Field<Money>) -> GridValue {
    match field {
        Field::Found(money) => GridValue::Number(money.cents_rounded()),
        Field::NotFound => GridValue::Empty,
    }
}

/// What a data row reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "block", content = "kind", rename_all = "snake_case")]
pub enum RowKind {
    Parent(Metric),
    Variation(PriceType),
}

impl RowKind {
    pub fn value(self, record: &ProductRecord) -> GridValue {
        match self {
            Self::Parent(metric) => metric.value(record),
            Self::Variation(price_type) => price_type.value(record),
        }
    }
}

/// One company's listing URLs for a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanySection {
    pub company: String,
    pub urls: Vec<String>,
}

impl CompanySection {
    pub fn new(company: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            company: company.into(),
            urls,
        }
    }
}

/// Everything the layout depends on for one report tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridConfig {
    pub sheet_name: String,
    pub active_slots: Vec<TimeSlot>,
    pub analysis_slots: Vec<TimeSlot>,
    /// Tracked company first, then competitors by index.
    pub parent_sections: Vec<CompanySection>,
    pub variation_sections: Vec<CompanySection>,
}

impl GridConfig {
    /// Active then analysis slots; the candidates for the nearest slot.
    pub fn all_slots(&self) -> Vec<TimeSlot> {
        self.active_slots
            .iter()
            .chain(&self.analysis_slots)
            .copied()
            .collect()
    }
}

/// Row number assigned to `(company, listing, kind)` this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowAssignment {
    pub company: String,
    pub listing: Option<ListingCode>,
    pub kind: RowKind,
    pub row: u32,
}

/// Synthetic average row heading a contiguous run of variation rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AverageRow {
    pub company: String,
    pub price_type: PriceType,
    pub row: u32,
    pub first_row: u32,
    pub last_row: u32,
}

impl AverageRow {
    /// `=AVERAGE(FILTER(C5:C7, C5:C7<>""))` over `column`.
    pub fn formula(&self, column: usize) -> String {
        let span = a1::local_range((column, self.first_row), (column, self.last_row));
        format!("=AVERAGE(FILTER({span}, {span}<>\"\"))")
    }
}

/// Computed grid for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub header: Vec<String>,
    /// Data block rows starting at [`START_ROW`].
    pub rows: Vec<Vec<GridValue>>,
    pub assignments: Vec<RowAssignment>,
    pub averages: Vec<AverageRow>,
    /// Rows holding the parent/variation markers.
    pub marker_rows: Vec<u32>,
    /// Rows holding metric or price-type names.
    pub label_rows: Vec<u32>,
}

impl GridLayout {
    pub fn build(config: &GridConfig, group: &CompanyGroup) -> Self {
        let mut builder = LayoutBuilder {
            group,
            layout: Self {
                header: header(config),
                rows: Vec::new(),
                assignments: Vec::new(),
                averages: Vec::new(),
                marker_rows: Vec::new(),
                label_rows: Vec::new(),
            },
        };

        builder.marker(PARENT_MARKER);
        for metric in Metric::ALL {
            builder.label(metric.label());
            for section in &config.parent_sections {
                for url in &section.urls {
                    builder.listing(&section.company, url, RowKind::Parent(metric));
                }
            }
        }

        builder.marker(VARIATION_MARKER);
        for price_type in PriceType::ALL {
            builder.label(price_type.label());
            for section in config.variation_sections.iter().filter(|s| !s.urls.is_empty()) {
                builder.variation_group(section, price_type);
            }
        }

        let layout = builder.layout;
        tracing::debug!(
            rows = layout.rows.len(),
            assignments = layout.assignments.len(),
            averages = layout.averages.len(),
            "grid layout built"
        );
        layout
    }

    /// Last row of the data block.
    pub fn end_row(&self) -> u32 {
        START_ROW + self.rows.len().saturating_sub(1) as u32
    }

    /// 1-based column of a header label.
    pub fn column_of(&self, label: &str) -> Option<usize> {
        self.header
            .iter()
            .position(|entry| entry == label)
            .map(|index| index + 1)
    }

    pub fn row_of(&self, company: &str, listing: &ListingCode, kind: RowKind) -> Option<u32> {
        self.assignments
            .iter()
            .find(|entry| {
                entry.company == company && entry.listing.as_ref() == Some(listing) && entry.kind == kind
            })
            .map(|entry| entry.row)
    }
}

fn header(config: &GridConfig) -> Vec<String> {
    let mut active = config.active_slots.clone();
    active.sort();
    let mut analysis = config.analysis_slots.clone();
    analysis.sort();

    FIXED_COLUMNS
        .iter()
        .map(|label| (*label).to_owned())
        .chain(active.iter().map(|slot| slot.label()))
        .chain(std::iter::once(ANALYSIS_MARKER.to_owned()))
        .chain(analysis.iter().map(|slot| slot.label()))
        .collect()
}

/// `=HYPERLINK("url", "CODE")`, or the not-found label without a code.
fn listing_reference(url: &str, listing: Option<&ListingCode>) -> GridValue {
    match listing {
        Some(code) => GridValue::Formula(format!(
            "=HYPERLINK(\"{}\", \"{code}\")",
            url.replace('"', "\"\"")
        )),
        None => GridValue::text(NOT_FOUND_LABEL),
    }
}

struct LayoutBuilder<'a> {
    group: &'a CompanyGroup,
    layout: GridLayout,
}

impl LayoutBuilder<'_> {
    fn next_row(&self) -> u32 {
        START_ROW + self.layout.rows.len() as u32
    }

    fn marker(&mut self, label: &str) {
        let row = self.next_row();
        self.layout.marker_rows.push(row);
        self.layout.rows.push(vec![GridValue::text(label)]);
    }

    fn label(&mut self, label: &str) {
        let row = self.next_row();
        self.layout.label_rows.push(row);
        self.layout.rows.push(vec![GridValue::text(label)]);
    }

    fn listing(&mut self, company: &str, url: &str, kind: RowKind) {
        let row = self.next_row();
        let listing = ListingCode::from_url(url);
        let value = listing
            .as_ref()
            .and_then(|code| self.group.find(company, code))
            .map_or(GridValue::Empty, |record| kind.value(record));

        self.layout.rows.push(vec![
            GridValue::text(company),
            listing_reference(url, listing.as_ref()),
            value,
        ]);
        self.layout.assignments.push(RowAssignment {
            company: company.to_owned(),
            listing,
            kind,
            row,
        });
    }

    fn variation_group(&mut self, section: &CompanySection, price_type: PriceType) {
        let row = self.next_row();
        let first_row = row + 1;
        let last_row = row + section.urls.len() as u32;
        let average = AverageRow {
            company: section.company.clone(),
            price_type,
            row,
            first_row,
            last_row,
        };

        self.layout.rows.push(vec![
            GridValue::text(&section.company),
            GridValue::text(AVERAGE_LABEL),
            GridValue::Formula(average.formula(CURRENT_DATA_COLUMN)),
        ]);
        self.layout.averages.push(average);

        for url in &section.urls {
            self.listing(&section.company, url, RowKind::Variation(price_type));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_slots;

    fn config() -> GridConfig {
        GridConfig {
            sheet_name: String::from("Monitor"),
            active_slots: parse_slots(["14:00", "08:00"]).expect("slots"),
            analysis_slots: parse_slots(["22:00"]).expect("slots"),
            parent_sections: vec![
                CompanySection::new("Acme", vec![String::from("https://www.amazon.de/dp/B000000001")]),
                CompanySection::new("Rival", vec![String::from("https://www.amazon.de/dp/B000000002")]),
            ],
            variation_sections: vec![CompanySection::new(
                "Acme",
                vec![
                    String::from("https://www.amazon.de/dp/B000000003"),
                    String::from("https://www.amazon.de/gp/help"),
                ],
            )],
        }
    }

    #[test]
    fn header_orders_slots_around_analysis_marker() {
        let layout = GridLayout::build(&config(), &CompanyGroup::new());
        assert_eq!(
            layout.header,
            vec!["Name", "Parameter", "CurrentData", "08:00", "14:00", "Analysis zone", "22:00"]
        );
        assert_eq!(layout.column_of("14:00"), Some(5));
    }

    #[test]
    fn parent_rows_follow_metric_then_company_order() {
        let layout = GridLayout::build(&config(), &CompanyGroup::new());
        let code = |raw| ListingCode::parse(raw).expect("code");

        // 3: Parent marker, 4: BSR label, 5-6: rows, 7: reviews label ...
        assert_eq!(layout.marker_rows[0], 3);
        assert_eq!(layout.row_of("Acme", &code("B000000001"), RowKind::Parent(Metric::BestSellerRank)), Some(5));
        assert_eq!(layout.row_of("Rival", &code("B000000002"), RowKind::Parent(Metric::BestSellerRank)), Some(6));
        assert_eq!(layout.row_of("Acme", &code("B000000001"), RowKind::Parent(Metric::ReviewCount)), Some(8));
        assert_eq!(layout.row_of("Rival", &code("B000000002"), RowKind::Parent(Metric::Price)), Some(15));
    }

    #[test]
    fn variation_group_has_average_row_over_contiguous_rows() {
        let layout = GridLayout::build(&config(), &CompanyGroup::new());

        // 16: Variations marker, 17: Price label, 18: average, 19-20: variations.
        assert_eq!(layout.marker_rows, vec![3, 16]);
        let average = &layout.averages[0];
        assert_eq!((average.row, average.first_row, average.last_row), (18, 19, 20));
        assert_eq!(average.formula(3), "=AVERAGE(FILTER(C19:C20, C19:C20<>\"\"))");

        let average_row = &layout.rows[(average.row - START_ROW) as usize];
        assert_eq!(average_row[1], GridValue::text(AVERAGE_LABEL));
        assert!(average_row[2].is_formula());
    }

    #[test]
    fn unparsable_listing_renders_not_found_label() {
        let layout = GridLayout::build(&config(), &CompanyGroup::new());
        let row = &layout.rows[(20 - START_ROW) as usize];
        assert_eq!(row[1], GridValue::text(NOT_FOUND_LABEL));
        assert_eq!(row[2], GridValue::Empty);
        assert_eq!(layout.end_row(), 28);
    }
}
