//! Common test fixtures.
//!
//! The fake country `abc` mirrors the configuration used across the
//! datasource tests: two GloFAS stations inside [`bbox::TEST_AREA`] and a
//! West Africa NDVI area.

use aa_common::ReportingPoint;

/// ISO3 code of the fake country.
pub const ISO3: &str = "abc";

/// Country configuration for `abc`.
pub const COUNTRY_CONFIG_YAML: &str = r#"
iso3: abc
glofas:
  reporting_points:
    - name: station_north
      lat: 0.52
      lon: -1.07
    - name: station_south
      lat: -1.38
      lon: 2.11
usgs_ndvi:
  area_url: africa/west
  area_prefix: wa
"#;

/// Country configuration without any dataset sections.
pub const BARE_COUNTRY_CONFIG_YAML: &str = "iso3: abc\n";

/// Reporting points matching [`COUNTRY_CONFIG_YAML`].
pub fn reporting_points() -> Vec<ReportingPoint> {
    vec![
        ReportingPoint::new("station_north", 0.52, -1.07),
        ReportingPoint::new("station_south", -1.38, 2.11),
    ]
}

/// Bounding boxes as (north, south, east, west).
pub mod bbox {
    /// Area requested in the download tests; normalizes to 1.05/-2.25/3.35/-4.45.
    pub const DOWNLOAD_AREA: (f64, f64, f64, f64) = (1.0, -2.2, 3.3, -4.4);

    /// Compact encoding of the normalized [`DOWNLOAD_AREA`].
    pub const DOWNLOAD_AREA_ENCODING: &str = "Np1d05Sm2d25Ep3d35Wm4d45";

    /// Area covered by the synthetic grids.
    pub const TEST_AREA: (f64, f64, f64, f64) = (1.0, -2.0, 3.0, -4.0);
}
