//! End-to-end tests: assemble a forecast ensemble, then extract station series.

use aa_common::ReportingPoint;
use chrono::NaiveDate;
use grid_processor::{
    assemble_ensemble, extract_points, validate_points, Coord, Dim, GridError, RawGrid,
};
use ndarray::{ArrayD, IxDyn};

const LATS: [f64; 3] = [1.05, 0.95, 0.85];
const LONS: [f64; 4] = [10.05, 10.15, 10.25, 10.35];

fn times() -> Coord {
    let t = |d| NaiveDate::from_ymd_opt(2022, 3, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
    Coord::Times(vec![t(1), t(2)])
}

fn spatial_axes() -> Vec<(Dim, Coord)> {
    vec![
        (Dim::Time, times()),
        (Dim::Step, Coord::Steps(vec![24, 48, 72, 96, 120])),
        (Dim::Latitude, Coord::Degrees(LATS.to_vec())),
        (Dim::Longitude, Coord::Degrees(LONS.to_vec())),
    ]
}

/// Control values encode (time, step, lat, lon) so cells are distinguishable.
fn control() -> RawGrid {
    let data = ArrayD::from_shape_fn(IxDyn(&[2, 5, 3, 4]), |i| {
        (i[0] * 1000 + i[1] * 100 + i[2] * 10 + i[3]) as f32
    });
    RawGrid::new("dis24", spatial_axes(), data)
        .unwrap()
        .with_attr("history", "control download")
}

/// Perturbed member `m` is offset by `m * 10_000`.
fn perturbed(members: u32) -> RawGrid {
    let data = ArrayD::from_shape_fn(IxDyn(&[members as usize, 2, 5, 3, 4]), |i| {
        ((i[0] + 1) * 10_000 + i[1] * 1000 + i[2] * 100 + i[3] * 10 + i[4]) as f32
    });
    let mut axes = vec![(Dim::Member, Coord::Members((1..=members).collect()))];
    axes.extend(spatial_axes());
    RawGrid::new("dis24", axes, data)
        .unwrap()
        .with_attr("history", "perturbed download")
}

#[test]
fn test_assembled_shape_and_control_member() {
    let ensemble = assemble_ensemble(control(), perturbed(6)).unwrap();
    let grid = ensemble.grid();

    assert_eq!(grid.shape(), &[7, 2, 5, 3, 4]);
    assert_eq!(
        grid.dims(),
        &[Dim::Member, Dim::Time, Dim::Step, Dim::Latitude, Dim::Longitude]
    );
    assert_eq!(grid.coord(Dim::Member).unwrap(), &Coord::Members((0..7).collect()));
    assert!(!grid.attrs.contains_key("history"));

    let original = control();
    for t in 0..2 {
        for s in 0..5 {
            assert_eq!(
                grid.data()[IxDyn(&[0, t, s, 2, 3])],
                original.data()[IxDyn(&[t, s, 2, 3])]
            );
        }
    }
    assert_eq!(grid.data()[IxDyn(&[6, 1, 4, 2, 3])], 61423.0);
}

#[test]
fn test_mismatched_steps_fail_alignment() {
    let mut axes = vec![(Dim::Member, Coord::Members(vec![1]))];
    axes.extend(spatial_axes());
    axes[2] = (Dim::Step, Coord::Steps(vec![24, 48, 72, 96, 144]));
    let shifted = RawGrid::new("dis24", axes, ArrayD::zeros(IxDyn(&[1, 2, 5, 3, 4]))).unwrap();

    match assemble_ensemble(control(), shifted) {
        Err(GridError::GridAlignment { dim, .. }) => assert_eq!(dim, "step"),
        other => panic!("expected alignment error, got {other:?}"),
    }
}

#[test]
fn test_extract_from_ensemble() {
    let ensemble = assemble_ensemble(control(), perturbed(6)).unwrap();
    let points = vec![
        ReportingPoint::new("upstream", 0.96, 10.33),
        ReportingPoint::new("downstream", 1.0, 10.1),
    ];
    let table = extract_points(ensemble.grid(), &points).unwrap();

    assert_eq!(table.dims, vec![Dim::Member, Dim::Time, Dim::Step]);
    let upstream = table.get("upstream").unwrap();
    assert_eq!(upstream.shape, vec![7, 2, 5]);
    assert_eq!((upstream.cell_lat, upstream.cell_lon), (0.95, 10.35));
    // member 0, time 1, step 2 at lat index 1, lon index 3
    assert_eq!(upstream.values[7], Some(1213.0));
}

#[test]
fn test_points_on_grid_boundary_are_rejected() {
    let grid = control();
    for point in [
        ReportingPoint::new("north_edge", 1.05, 10.2),
        ReportingPoint::new("south_edge", 0.85, 10.2),
        ReportingPoint::new("west_edge", 1.0, 10.05),
        ReportingPoint::new("east_edge", 1.0, 10.35),
    ] {
        let err = validate_points(&grid, std::slice::from_ref(&point)).unwrap_err();
        assert!(
            matches!(err, GridError::OutOfBounds { point: ref p, .. } if *p == point.name),
            "{} should be rejected, got {err}",
            point.name
        );
    }
}
