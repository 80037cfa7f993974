//! Merging control and perturbed forecast parts into one ensemble grid.

use std::collections::BTreeMap;

use ndarray::{concatenate, Axis};
use tracing::debug;

use crate::error::{GridError, Result};
use crate::types::{AssembledGrid, Coord, Dim, RawGrid};

/// Attributes that differ between every download and never merge cleanly.
pub const NON_MERGEABLE_ATTRS: &[&str] = &["history"];

/// Combine a control grid and a perturbed grid along a new member axis.
///
/// The control grid must not carry a member dimension; the perturbed grid
/// must carry it at axis 0 followed by the control grid's dimensions in the
/// same order. All shared coordinates have to match exactly. The control
/// realization becomes member 0.
pub fn assemble_ensemble(mut control: RawGrid, mut perturbed: RawGrid) -> Result<AssembledGrid> {
    if control.variable() != perturbed.variable() {
        return Err(GridError::alignment(
            "variable",
            format!("control is '{}', perturbed is '{}'", control.variable(), perturbed.variable()),
        ));
    }
    if control.has_dim(Dim::Member) {
        return Err(GridError::alignment(Dim::Member, "control grid already has a member dimension"));
    }
    if perturbed.dims().first() != Some(&Dim::Member) || perturbed.dims()[1..] != *control.dims() {
        return Err(GridError::alignment(
            Dim::Member,
            format!(
                "perturbed dimensions {:?} do not extend control dimensions {:?}",
                perturbed.dims(),
                control.dims()
            ),
        ));
    }

    for dim in control.dims() {
        if control.coord(*dim)? != perturbed.coord(*dim)? {
            return Err(GridError::alignment(dim, "coordinates differ between control and perturbed"));
        }
    }

    let mut members = vec![0u32];
    match perturbed.coord(Dim::Member)? {
        Coord::Members(numbers) if !numbers.contains(&0) => members.extend_from_slice(numbers),
        Coord::Members(_) => {
            return Err(GridError::alignment(Dim::Member, "member 0 is reserved for the control run"))
        }
        _ => return Err(GridError::alignment(Dim::Member, "member coordinate is not numeric")),
    }

    control.strip_attrs(NON_MERGEABLE_ATTRS);
    perturbed.strip_attrs(NON_MERGEABLE_ATTRS);
    let control = control.expand_dims(Dim::Member, Coord::Members(vec![0]), 0)?;

    let (variable, mut dims, coords, control_data, control_attrs) = control.into_parts();
    let (_, _, _, perturbed_data, perturbed_attrs) = perturbed.into_parts();

    let data = concatenate(Axis(0), &[control_data.view(), perturbed_data.view()])?;
    debug!(
        variable = %variable,
        members = members.len(),
        shape = ?data.shape(),
        "Assembled ensemble grid"
    );

    let mut axes: Vec<(Dim, Coord)> = Vec::with_capacity(dims.len());
    axes.push((dims.remove(0), Coord::Members(members)));
    axes.extend(dims.into_iter().zip(coords.into_iter().skip(1)));

    let mut grid = RawGrid::new(variable, axes, data)?;
    grid.attrs = merge_attrs(control_attrs, perturbed_attrs);
    Ok(AssembledGrid(grid))
}

/// Union of both attribute maps, dropping keys whose values disagree.
fn merge_attrs(
    mut left: BTreeMap<String, String>,
    right: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    for (key, value) in right {
        match left.get(&key) {
            Some(existing) if *existing != value => {
                left.remove(&key);
            }
            Some(_) => {}
            None => {
                left.insert(key, value);
            }
        }
    }
    left
}
