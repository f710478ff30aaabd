//! Preview lifecycle: fetch annotated records, patch the grid, revert on demand

use crate::cancel::CancellationToken;
use crate::error::{PrepdiffError, Result};
use crate::grid::GridService;
use crate::model::{DatasetSnapshot, InstructionSet};
use crate::store::RowStore;
use log::debug;
use serde::Serialize;

/// Preparation action payload attached to update/add preview requests
#[derive(Debug, Clone, Serialize)]
pub struct PreviewAction {
    pub action: String,
    pub parameters: serde_json::Value,
}

/// Request payload for a diff preview between two recipe steps
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffPreviewParams {
    pub preparation_id: String,
    pub current_step_id: String,
    pub preview_step_id: String,
    pub tdp_ids: Vec<i64>,
}

/// Request payload for previewing a step parameter change
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreviewParams {
    pub preparation_id: String,
    pub current_step_id: String,
    pub update_step_id: String,
    pub tdp_ids: Vec<i64>,
    pub action: PreviewAction,
}

/// Request payload for previewing a prospective new step
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPreviewParams {
    pub preparation_id: String,
    pub dataset_id: String,
    pub tdp_ids: Vec<i64>,
    pub action: PreviewAction,
}

/// The backend preview endpoints, abstracted. Implementations should check
/// the token while waiting and return [`PrepdiffError::Cancelled`] when it
/// fires; the service also discards any response arriving after cancellation,
/// so a stale resolution can never mutate the grid.
pub trait PreviewProvider {
    fn preview_diff(
        &self,
        params: &DiffPreviewParams,
        cancel: &CancellationToken,
    ) -> Result<DatasetSnapshot>;

    fn preview_update(
        &self,
        params: &UpdatePreviewParams,
        cancel: &CancellationToken,
    ) -> Result<DatasetSnapshot>;

    fn preview_add(
        &self,
        params: &AddPreviewParams,
        cancel: &CancellationToken,
    ) -> Result<DatasetSnapshot>;
}

/// Drives transient, revertible previews over a grid service.
///
/// The first preview of a sequence captures the grid content and the
/// viewport's displayed row ids; subsequent previews revert the previous one
/// before applying theirs, and `reset(true)`/`cancel_preview` restore the
/// captured state. Issuing a request cancels the pending one first, so at
/// most one preview mutation is ever in flight.
pub struct PreviewService<S: RowStore, P: PreviewProvider> {
    grid: GridService<S>,
    provider: P,
    /// Inclusive (top, bottom) positions of the rendered viewport within the
    /// visible rows; `None` means everything is displayed
    viewport: Option<(usize, usize)>,
    original_data: Option<DatasetSnapshot>,
    displayed_ids: Option<Vec<i64>>,
    reverter: Option<InstructionSet>,
    canceler: Option<CancellationToken>,
}

impl<S: RowStore, P: PreviewProvider> PreviewService<S, P> {
    pub fn new(grid: GridService<S>, provider: P) -> Self {
        Self {
            grid,
            provider,
            viewport: None,
            original_data: None,
            displayed_ids: None,
            reverter: None,
            canceler: None,
        }
    }

    pub fn grid(&self) -> &GridService<S> {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut GridService<S> {
        &mut self.grid
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Update the rendered row range, as reported by the grid on scroll
    pub fn set_viewport(&mut self, top: usize, bottom: usize) {
        self.viewport = Some((top, bottom));
    }

    pub fn preview_in_progress(&self) -> bool {
        self.original_data.is_some()
    }

    /// Diff preview between the current and another recipe step
    pub fn preview_diff_records(
        &mut self,
        preparation_id: &str,
        current_step_id: &str,
        preview_step_id: &str,
        focused_column: Option<String>,
    ) -> Result<()> {
        self.stop_pending_preview();
        let token = self.init_preview_if_needed();

        let params = DiffPreviewParams {
            preparation_id: preparation_id.to_string(),
            current_step_id: current_step_id.to_string(),
            preview_step_id: preview_step_id.to_string(),
            tdp_ids: self.displayed_ids.clone().unwrap_or_default(),
        };
        let response = self.provider.preview_diff(&params, &token);
        self.finish_preview(response, &token, focused_column)
    }

    /// Preview of a step with changed parameters
    pub fn preview_update_records(
        &mut self,
        preparation_id: &str,
        current_step_id: &str,
        update_step_id: &str,
        action: PreviewAction,
        focused_column: Option<String>,
    ) -> Result<()> {
        self.stop_pending_preview();
        let token = self.init_preview_if_needed();

        let params = UpdatePreviewParams {
            preparation_id: preparation_id.to_string(),
            current_step_id: current_step_id.to_string(),
            update_step_id: update_step_id.to_string(),
            tdp_ids: self.displayed_ids.clone().unwrap_or_default(),
            action,
        };
        let response = self.provider.preview_update(&params, &token);
        self.finish_preview(response, &token, focused_column)
    }

    /// Preview of a prospective step appended to the preparation
    pub fn preview_add_records(
        &mut self,
        preparation_id: &str,
        dataset_id: &str,
        action: PreviewAction,
        focused_column: Option<String>,
    ) -> Result<()> {
        self.stop_pending_preview();
        let token = self.init_preview_if_needed();

        let params = AddPreviewParams {
            preparation_id: preparation_id.to_string(),
            dataset_id: dataset_id.to_string(),
            tdp_ids: self.displayed_ids.clone().unwrap_or_default(),
            action,
        };
        let response = self.provider.preview_add(&params, &token);
        self.finish_preview(response, &token, focused_column)
    }

    /// Cancel the pending request, if any. Its eventual resolution is
    /// discarded without touching the grid.
    pub fn stop_pending_preview(&mut self) {
        if let Some(canceler) = self.canceler.take() {
            debug!("cancelling pending preview request");
            canceler.cancel();
        }
    }

    /// Cancel the current or pending preview and restore the original data
    pub fn cancel_preview(&mut self, focused_column: Option<String>) -> Result<()> {
        self.stop_pending_preview();
        self.grid.set_focused_column(focused_column);
        self.reset(true)
    }

    /// Clear the preview state; when `restore_original_data` is set and a
    /// preview is displayed, revert the grid first
    pub fn reset(&mut self, restore_original_data: bool) -> Result<()> {
        if restore_original_data && self.preview_in_progress() {
            let reverter = self.reverter.take();
            self.grid.execute(reverter)?;
        }
        self.original_data = None;
        self.displayed_ids = None;
        self.reverter = None;
        Ok(())
    }

    fn init_preview_if_needed(&mut self) -> CancellationToken {
        if self.original_data.is_none() {
            self.original_data = Some(self.grid.snapshot());
            self.displayed_ids = Some(self.displayed_tdp_ids());
        }
        let token = CancellationToken::new();
        self.canceler = Some(token.clone());
        token
    }

    /// Ids of the rows currently rendered in the viewport, sorted
    fn displayed_tdp_ids(&self) -> Vec<i64> {
        let visible = self.grid.store().visible_rows();
        let (top, take) = match self.viewport {
            Some((top, bottom)) if bottom >= top => (top, bottom - top + 1),
            Some(_) => (0, 0),
            None => (0, visible.len()),
        };

        let mut ids: Vec<i64> = visible
            .iter()
            .skip(top)
            .take(take)
            .map(|row| row.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn finish_preview(
        &mut self,
        response: Result<DatasetSnapshot>,
        token: &CancellationToken,
        focused_column: Option<String>,
    ) -> Result<()> {
        self.canceler = None;
        match response {
            Ok(data) => {
                if token.is_cancelled() {
                    // superseded while in flight: the response is stale
                    debug!("discarding superseded preview response");
                    return Err(PrepdiffError::Cancelled);
                }
                self.grid.set_focused_column(focused_column);
                self.replace_records(&data)
            }
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                // genuine upstream failure: drop the preview entirely
                self.cancel_preview(None)?;
                Err(err)
            }
        }
    }

    /// Revert the previous preview, then patch the grid with the new one and
    /// keep its reverter
    fn replace_records(&mut self, data: &DatasetSnapshot) -> Result<()> {
        let previous = self.reverter.take();
        self.grid.execute(previous)?;

        let executor = self.grid.preview_executor(data);
        self.reverter = self.grid.execute(Some(executor))?;
        Ok(())
    }
}
