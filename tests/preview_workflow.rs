//! End-to-end preview workflow over the public API: filter the grid, run a
//! diff preview against a scripted backend, supersede it, and revert.

use prepdiff::cancel::CancellationToken;
use prepdiff::error::Result;
use prepdiff::filter::{Filter, FilterKind, FilterList};
use prepdiff::model::{CellDiff, ColumnMetadata, DatasetSnapshot, Row, RowDiff};
use prepdiff::preview::{
    AddPreviewParams, DiffPreviewParams, PreviewProvider, PreviewService, UpdatePreviewParams,
};
use prepdiff::store::{InMemoryRowStore, RowStore};
use prepdiff::GridService;
use std::cell::RefCell;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn columns() -> Vec<ColumnMetadata> {
    vec![
        ColumnMetadata::new("0000", "firstname"),
        ColumnMetadata::new("0001", "amount"),
    ]
}

fn row(id: i64, name: &str, amount: &str) -> Row {
    Row::new(id)
        .with_value("0000", name)
        .with_value("0001", amount)
}

fn base_grid() -> GridService<InMemoryRowStore> {
    let rows = vec![
        row(0, "Tata", "10"),
        row(1, "Tete", "20"),
        row(2, "Titi", "30"),
        row(3, "Toto", "40"),
        row(4, "Tutu", "50"),
    ];
    GridService::new(InMemoryRowStore::with_rows(rows).unwrap(), columns())
}

/// Replays queued snapshots in order, recording the ids each request carried
struct ScriptedBackend {
    responses: RefCell<Vec<Result<DatasetSnapshot>>>,
    requested_ids: RefCell<Vec<Vec<i64>>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<Result<DatasetSnapshot>>) -> Self {
        Self {
            responses: RefCell::new(responses),
            requested_ids: RefCell::new(Vec::new()),
        }
    }

    fn next(&self, tdp_ids: &[i64]) -> Result<DatasetSnapshot> {
        self.requested_ids.borrow_mut().push(tdp_ids.to_vec());
        self.responses.borrow_mut().remove(0)
    }
}

impl PreviewProvider for ScriptedBackend {
    fn preview_diff(
        &self,
        params: &DiffPreviewParams,
        _cancel: &CancellationToken,
    ) -> Result<DatasetSnapshot> {
        self.next(&params.tdp_ids)
    }

    fn preview_update(
        &self,
        params: &UpdatePreviewParams,
        _cancel: &CancellationToken,
    ) -> Result<DatasetSnapshot> {
        self.next(&params.tdp_ids)
    }

    fn preview_add(
        &self,
        params: &AddPreviewParams,
        _cancel: &CancellationToken,
    ) -> Result<DatasetSnapshot> {
        self.next(&params.tdp_ids)
    }
}

/// Step preview: Tete uppercased, Toto deleted, a new row spliced in
fn step_preview() -> DatasetSnapshot {
    vec_preview(vec![
        row(0, "Tata", "10"),
        row(1, "TETE", "20").with_cell_diff("0000", CellDiff::Update),
        row(2, "Titi", "30"),
        row(10, "Titi Bis", "35").with_row_diff(RowDiff::New),
        row(3, "Toto", "40").with_row_diff(RowDiff::Delete),
        row(4, "Tutu", "50"),
    ])
}

fn vec_preview(rows: Vec<Row>) -> DatasetSnapshot {
    DatasetSnapshot::new(columns(), rows)
}

#[test]
fn test_preview_apply_and_revert_round_trip() {
    init_logging();

    let backend = ScriptedBackend::new(vec![Ok(step_preview())]);
    let mut service = PreviewService::new(base_grid(), backend);
    let before = service.grid().snapshot();

    service
        .preview_diff_records("prep-1", "step-1", "step-2", None)
        .unwrap();

    let ids: Vec<i64> = service.grid().store().rows().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 10, 3, 4]);
    assert!(service.grid().preview());
    assert_eq!(
        service.grid().store().get_by_id(1).unwrap().value("0000"),
        Some("TETE")
    );

    service.reset(true).unwrap();
    assert_eq!(service.grid().snapshot(), before);
    assert!(!service.grid().preview());
    assert!(!service.preview_in_progress());
}

#[test]
fn test_successive_previews_compare_against_the_original() {
    init_logging();

    // second preview only deletes Toto; the uppercased Tete from the first
    // preview must not survive it
    let second = vec_preview(vec![
        row(0, "Tata", "10"),
        row(1, "Tete", "20"),
        row(2, "Titi", "30"),
        row(3, "Toto", "40").with_row_diff(RowDiff::Delete),
        row(4, "Tutu", "50"),
    ]);
    let backend = ScriptedBackend::new(vec![Ok(step_preview()), Ok(second)]);
    let mut service = PreviewService::new(base_grid(), backend);
    let before = service.grid().snapshot();

    service
        .preview_diff_records("prep-1", "step-1", "step-2", None)
        .unwrap();
    service
        .preview_diff_records("prep-1", "step-1", "step-3", None)
        .unwrap();

    assert_eq!(
        service.grid().store().get_by_id(1).unwrap().value("0000"),
        Some("Tete")
    );
    assert_eq!(
        service.grid().store().get_by_id(3).unwrap().row_diff,
        Some(RowDiff::Delete)
    );
    assert_eq!(service.grid().store().index_by_id(10), None);

    service.cancel_preview(None).unwrap();
    assert_eq!(service.grid().snapshot(), before);
}

#[test]
fn test_filtered_viewport_drives_requested_ids() {
    init_logging();

    let backend = ScriptedBackend::new(vec![Ok(step_preview())]);
    let mut service = PreviewService::new(base_grid(), backend);

    // only rows with amount >= 30 are visible, viewport shows the first two
    let mut filters = FilterList::default();
    filters.add(Filter::new(
        FilterKind::InsideRange {
            interval: [30.0, 100.0],
        },
        "0001",
    ));
    let predicates = filters.compile(service.grid().columns()).unwrap();
    service.grid_mut().store_mut().set_filters(predicates);
    service.set_viewport(0, 1);

    service
        .preview_diff_records("prep-1", "step-1", "step-2", None)
        .unwrap();

    let requested = service_requested_ids(&service);
    assert_eq!(requested, vec![vec![2, 3]]);
}

fn service_requested_ids(
    service: &PreviewService<InMemoryRowStore, ScriptedBackend>,
) -> Vec<Vec<i64>> {
    service.provider().requested_ids.borrow().clone()
}

#[test]
fn test_failed_preview_leaves_the_grid_untouched() {
    init_logging();

    let backend = ScriptedBackend::new(vec![
        Ok(step_preview()),
        Err(prepdiff::PrepdiffError::upstream("HTTP 502")),
    ]);
    let mut service = PreviewService::new(base_grid(), backend);
    let before = service.grid().snapshot();

    service
        .preview_diff_records("prep-1", "step-1", "step-2", None)
        .unwrap();
    let err = service
        .preview_diff_records("prep-1", "step-1", "step-3", None)
        .unwrap_err();

    assert!(!err.is_cancelled());
    assert_eq!(service.grid().snapshot(), before);
    assert!(!service.preview_in_progress());
}
