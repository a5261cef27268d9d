//! Monitoring grid: layout, A1 addressing and batched synchronization.

pub mod a1;
pub mod layout;
pub mod sync;
pub mod value;

pub use layout::{
    AverageRow, CompanySection, GridConfig, GridLayout, Metric, PriceType, RowAssignment, RowKind,
};
pub use sync::{GridPlan, GridSynchronizer, SyncReport};
pub use value::{BatchUpdate, CellFormat, CellStyle, GridValue, ValueRange};
