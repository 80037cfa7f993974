//! Inclusive dekad ranges.

use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::dekad::Dekad;

/// Inclusive range of dekads. A range whose start is after its end is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DekadRange {
    pub start: Dekad,
    pub end: Dekad,
}

/// Where a dekad falls relative to a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePosition {
    Before,
    Inside,
    After,
}

impl DekadRange {
    pub fn new(start: Dekad, end: Dekad) -> Self {
        Self { start, end }
    }

    /// A fresh iterator over the range; every call starts over.
    pub fn iter(&self) -> DekadIter {
        expand(self.start, self.end)
    }

    pub fn len(&self) -> usize {
        self.iter().len()
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, dekad: &Dekad) -> bool {
        self.position_of(dekad) == RangePosition::Inside
    }

    pub fn position_of(&self, dekad: &Dekad) -> RangePosition {
        if *dekad < self.start {
            RangePosition::Before
        } else if *dekad > self.end {
            RangePosition::After
        } else {
            RangePosition::Inside
        }
    }
}

impl IntoIterator for DekadRange {
    type Item = Dekad;
    type IntoIter = DekadIter;

    fn into_iter(self) -> DekadIter {
        self.iter()
    }
}

impl IntoIterator for &DekadRange {
    type Item = Dekad;
    type IntoIter = DekadIter;

    fn into_iter(self) -> DekadIter {
        self.iter()
    }
}

/// Lazily expand `start..=end` into consecutive dekads.
pub fn expand(start: Dekad, end: Dekad) -> DekadIter {
    DekadIter {
        next: start.ordinal(),
        last: end.ordinal(),
    }
}

/// Iterator produced by [`expand`].
#[derive(Debug, Clone)]
pub struct DekadIter {
    next: i64,
    last: i64,
}

impl Iterator for DekadIter {
    type Item = Dekad;

    fn next(&mut self) -> Option<Dekad> {
        if self.next > self.last {
            return None;
        }
        let dekad = Dekad::from_ordinal(self.next).ok()?;
        self.next += 1;
        Some(dekad)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.last - self.next + 1).max(0) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DekadIter {}

impl FusedIterator for DekadIter {}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, dekad: u8) -> Dekad {
        Dekad::new(year, dekad).unwrap()
    }

    #[test]
    fn test_expand_across_year() {
        let got: Vec<_> = expand(d(2019, 35), d(2020, 2)).collect();
        assert_eq!(got, vec![d(2019, 35), d(2019, 36), d(2020, 1), d(2020, 2)]);
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(expand(d(2020, 5), d(2020, 5)).collect::<Vec<_>>(), vec![d(2020, 5)]);
        assert_eq!(expand(d(2020, 6), d(2020, 5)).count(), 0);
        assert!(DekadRange::new(d(2020, 6), d(2020, 5)).is_empty());
    }

    #[test]
    fn test_range_is_restartable() {
        let range = DekadRange::new(d(2020, 1), d(2020, 10));
        assert_eq!(range.iter().count(), 10);
        assert_eq!(range.iter().count(), 10);
        assert_eq!(range.len(), 10);
    }

    #[test]
    fn test_position_of() {
        let range = DekadRange::new(d(2020, 3), d(2020, 6));
        assert_eq!(range.position_of(&d(2020, 2)), RangePosition::Before);
        assert_eq!(range.position_of(&d(2020, 6)), RangePosition::Inside);
        assert_eq!(range.position_of(&d(2021, 1)), RangePosition::After);
    }
}
