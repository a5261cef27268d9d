use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;

use super::a1;
use super::layout::{GridConfig, GridLayout, CURRENT_DATA_COLUMN, START_ROW, TIMESTAMP_ROW};
use super::value::{BatchUpdate, CellFormat, CellStyle, GridValue, ValueRange};
use crate::domain::{CompanyGroup, TimeSlot};
use crate::scheduler::nearest_slot;
use crate::sheets::{SheetsBackend, SheetsError};

/// Delay before the single retry of a failed batch.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Everything one cycle writes, before submission.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPlan {
    pub layout: GridLayout,
    pub batch: BatchUpdate,
    /// Nearest slot and its 1-based column, when the slot is in the header.
    pub slot_column: Option<(TimeSlot, usize)>,
}

/// Outcome of a successful synchronization.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub plan: GridPlan,
    /// 1 when the first submission succeeded, 2 after the retry.
    pub attempts: u32,
    pub formatted: bool,
}

/// Builds the grid for one cycle and submits it as one batch.
pub struct GridSynchronizer {
    backend: Arc<dyn SheetsBackend>,
    spreadsheet_id: String,
    retry_delay: Duration,
}

impl GridSynchronizer {
    pub fn new(backend: Arc<dyn SheetsBackend>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            backend,
            spreadsheet_id: spreadsheet_id.into(),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Lays out the grid and assembles the ordered writes: header, cycle
    /// timestamp, data block, per-row current/slot values, average formulas.
    pub fn plan(config: &GridConfig, group: &CompanyGroup, now: DateTime<Tz>) -> GridPlan {
        let layout = GridLayout::build(config, group);
        let sheet = config.sheet_name.as_str();
        let mut batch = BatchUpdate::default();

        batch.push(ValueRange {
            range: a1::cell(sheet, 1, 1),
            values: vec![layout.header.iter().map(GridValue::text).collect()],
        });
        batch.push(ValueRange::single(
            a1::cell(sheet, CURRENT_DATA_COLUMN, TIMESTAMP_ROW),
            GridValue::text(now.format("%Y-%m-%d %H:%M:%S").to_string()),
        ));
        if !layout.rows.is_empty() {
            batch.push(ValueRange {
                range: a1::range(
                    sheet,
                    (1, START_ROW),
                    (CURRENT_DATA_COLUMN, layout.end_row()),
                ),
                values: layout.rows.clone(),
            });
        }

        let slot_column = nearest_slot(now.time(), &config.all_slots()).and_then(|slot| {
            let column = layout.column_of(&slot.label());
            if column.is_none() {
                tracing::warn!(slot = %slot, "nearest slot missing from header");
            }
            column.map(|column| (slot, column))
        });
        let mut columns = vec![CURRENT_DATA_COLUMN];
        if let Some((slot, column)) = slot_column {
            tracing::info!(slot = %slot, column, "values also recorded in slot column");
            columns.push(column);
        }

        for assignment in &layout.assignments {
            let Some(record) = assignment
                .listing
                .as_ref()
                .and_then(|code| group.find(&assignment.company, code))
            else {
                continue;
            };
            let value = assignment.kind.value(record);
            for &column in &columns {
                batch.push(ValueRange::single(
                    a1::cell(sheet, column, assignment.row),
                    value.clone(),
                ));
            }
        }

        for average in &layout.averages {
            for &column in &columns {
                batch.push(ValueRange::single(
                    a1::cell(sheet, column, average.row),
                    GridValue::Formula(average.formula(column)),
                ));
            }
        }

        GridPlan {
            layout,
            batch,
            slot_column,
        }
    }

    /// Writes the grid. A failed batch is retried once after the retry
    /// delay; a second failure abandons this cycle's update. Formatting runs
    /// only after a successful write and never fails the call.
    #[tracing::instrument(level = "info", skip_all, fields(sheet = %config.sheet_name))]
    pub async fn synchronize(
        &self,
        config: &GridConfig,
        group: &CompanyGroup,
        now: DateTime<Tz>,
    ) -> Result<SyncReport, SheetsError> {
        let plan = Self::plan(config, group, now);
        let attempts = self.submit(&plan.batch).await?;
        tracing::info!(ranges = plan.batch.len(), attempts, "grid values written");

        let formats = formatting(&plan.layout);
        let formatted = match self
            .backend
            .format_cells(&self.spreadsheet_id, &config.sheet_name, &formats)
            .await
        {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "grid formatting skipped");
                false
            }
        };

        Ok(SyncReport {
            plan,
            attempts,
            formatted,
        })
    }

    async fn submit(&self, batch: &BatchUpdate) -> Result<u32, SheetsError> {
        let first = match self.backend.batch_update(&self.spreadsheet_id, batch).await {
            Ok(()) => return Ok(1),
            Err(error) => error,
        };
        tracing::warn!(
            error = %first,
            retry_in_secs = self.retry_delay.as_secs(),
            "batch update failed, retrying once"
        );
        tokio::time::sleep(self.retry_delay).await;

        match self.backend.batch_update(&self.spreadsheet_id, batch).await {
            Ok(()) => Ok(2),
            Err(error) => {
                tracing::error!(%error, "batch update failed again, abandoning this cycle's grid update");
                Err(error)
            }
        }
    }
}

/// Header row, block markers and metric/price-type labels.
pub fn formatting(layout: &GridLayout) -> Vec<CellFormat> {
    let header = CellFormat {
        first_row: 1,
        last_row: 1,
        first_column: 1,
        last_column: layout.header.len().max(1),
        style: CellStyle::Header,
    };
    std::iter::once(header)
        .chain(
            layout
                .marker_rows
                .iter()
                .map(|&row| CellFormat::cell(row, 1, CellStyle::Marker)),
        )
        .chain(
            layout
                .label_rows
                .iter()
                .map(|&row| CellFormat::cell(row, 1, CellStyle::Label)),
        )
        .collect()
}
