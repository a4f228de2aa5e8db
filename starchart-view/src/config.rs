//! Static chart configuration, read once at startup.
//!
//! A JSON document; every field has a default, so `{}` is a usable config
//! that expects the tier files in the working directory and draws no
//! planets or lines. Relative paths are resolved against the directory of
//! the config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ChartError, ChartResult};

/// Geodetic location of the observatory.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Observatory {
    /// Degrees east.
    pub longitude: f64,
    /// Degrees north.
    pub latitude: f64,
    /// Meters.
    pub elevation: f64,
}

/// Nominal magnitude used to size a body on the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMagnitude {
    pub name: String,
    pub magnitude: f64,
}

impl BodyMagnitude {
    pub fn new(name: impl Into<String>, magnitude: f64) -> Self {
        Self {
            name: name.into(),
            magnitude,
        }
    }
}

pub fn default_bodies() -> Vec<BodyMagnitude> {
    [
        ("mercury", 0.23),
        ("venus", -4.14),
        ("mars", 0.71),
        ("jupiter", -2.20),
        ("saturn", 0.46),
        ("uranus", 5.68),
        ("neptune", 7.78),
        ("pluto", 14.00),
    ]
    .into_iter()
    .map(|(name, magnitude)| BodyMagnitude::new(name, magnitude))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Directory holding `hp48.cat`, `hp192.cat` and `hp768.cat`.
    pub catalog_dir: PathBuf,
    /// Hourly body-position CSV; no planets are drawn without it.
    pub transient_table: Option<PathBuf>,
    /// Headerless `ra1,dec1,ra2,dec2` CSV; no lines are drawn without it.
    pub constellation_lines: Option<PathBuf>,
    /// Validated and kept for callers such as the job that fills the body
    /// table. Rendering does not read it.
    pub observatory: Observatory,
    pub bodies: Vec<BodyMagnitude>,
    /// Lines are drawn only for views strictly wider than this.
    pub min_line_view_deg: f64,
    pub max_body_diameter: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            catalog_dir: PathBuf::from("."),
            transient_table: None,
            constellation_lines: None,
            observatory: Observatory::default(),
            bodies: default_bodies(),
            min_line_view_deg: 10.0,
            max_body_diameter: 9.0,
        }
    }
}

impl ChartConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> ChartResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ChartError::config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config = Self::from_json(&text)
            .map_err(|e| ChartError::config(format!("{}: {}", path.display(), e)))?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse and validate JSON text. Paths are left as written.
    pub fn from_json(text: &str) -> ChartResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ChartError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ChartResult<()> {
        let obs = &self.observatory;
        if !(obs.latitude.abs() <= 90.0) {
            return Err(ChartError::config(format!(
                "observatory latitude {} outside [-90, 90]",
                obs.latitude
            )));
        }
        if !(obs.longitude.abs() <= 180.0) {
            return Err(ChartError::config(format!(
                "observatory longitude {} outside [-180, 180]",
                obs.longitude
            )));
        }
        if !obs.elevation.is_finite() {
            return Err(ChartError::config("observatory elevation must be finite"));
        }
        if !self.min_line_view_deg.is_finite() {
            return Err(ChartError::config("min_line_view_deg must be finite"));
        }
        if !(self.max_body_diameter > 0.0 && self.max_body_diameter.is_finite()) {
            return Err(ChartError::config(format!(
                "max_body_diameter must be positive, got {}",
                self.max_body_diameter
            )));
        }
        for body in &self.bodies {
            if body.name.trim().is_empty() {
                return Err(ChartError::config("body with an empty name"));
            }
            if !body.magnitude.is_finite() {
                return Err(ChartError::config(format!(
                    "body {} has a non-finite magnitude",
                    body.name
                )));
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.catalog_dir);
        if let Some(p) = self.transient_table.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.constellation_lines.as_mut() {
            resolve(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = ChartConfig::from_json("{}").unwrap();
        assert_eq!(config, ChartConfig::default());
        assert_eq!(config.bodies.len(), 8);
        assert_eq!(config.min_line_view_deg, 10.0);
        assert_eq!(config.max_body_diameter, 9.0);
        let venus = config.bodies.iter().find(|b| b.name == "venus").unwrap();
        assert_eq!(venus.magnitude, -4.14);
    }

    #[test]
    fn test_partial_json() {
        let config = ChartConfig::from_json(
            r#"{
                "catalog_dir": "/srv/catalogs",
                "observatory": { "longitude": -1.5, "latitude": 53.2 },
                "bodies": [{ "name": "moon", "magnitude": -12.7 }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.catalog_dir, PathBuf::from("/srv/catalogs"));
        assert_eq!(config.observatory.latitude, 53.2);
        assert_eq!(config.observatory.elevation, 0.0);
        assert_eq!(config.bodies, vec![BodyMagnitude::new("moon", -12.7)]);
        assert!(config.transient_table.is_none());
    }

    #[test]
    fn test_validation_failures() {
        for json in [
            r#"{"observatory": {"latitude": 91.0}}"#,
            r#"{"observatory": {"longitude": -180.5}}"#,
            r#"{"max_body_diameter": 0.0}"#,
            r#"{"bodies": [{"name": " ", "magnitude": 1.0}]}"#,
            r#"{"catalog_dir": 5}"#,
            "not json",
        ] {
            let err = ChartConfig::from_json(json).unwrap_err();
            assert!(matches!(err, ChartError::Config(_)), "{json}");
        }
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.json");
        std::fs::write(
            &path,
            r#"{"catalog_dir": "tiers", "constellation_lines": "/abs/lines.csv",
                "transient_table": "planets.csv"}"#,
        )
        .unwrap();

        let config = ChartConfig::load(&path).unwrap();
        assert_eq!(config.catalog_dir, dir.path().join("tiers"));
        assert_eq!(config.transient_table, Some(dir.path().join("planets.csv")));
        assert_eq!(config.constellation_lines, Some(PathBuf::from("/abs/lines.csv")));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ChartConfig::load("/nonexistent/chart.json").unwrap_err();
        assert!(matches!(err, ChartError::Config(_)));
    }
}
