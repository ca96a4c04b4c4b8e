//! Sweep parameters.
//!
//! The tree nests center generators, level counts, area ratios and
//! aggregations. It is usually assembled from flat rows of the form
//! `id;volume%;center count;level count;area%;aggregation`.

use crate::aggregate::Aggregation;
use crate::error::{ShapeError, ShapeResult};
use anyhow::{bail, Context, Result};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Centers spread over a small sphere around `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterSphereGenerator {
    /// Relative to the mesh centroid.
    pub offset: [f64; 3],
    /// Volume of the center sphere as a fraction of the mesh volume.
    pub ratio: f64,
    pub count: usize,
}

impl Default for CenterSphereGenerator {
    fn default() -> Self {
        Self {
            offset: [0.0; 3],
            ratio: 0.0,
            count: 1,
        }
    }
}

impl CenterSphereGenerator {
    pub fn radius(&self, mesh_volume: f64) -> f64 {
        (self.ratio * mesh_volume * 3.0 / (4.0 * PI)).cbrt()
    }

    /// `count` points drawn uniformly on the center sphere. The generator is
    /// seeded, so the same parameters always give the same centers.
    pub fn centers(&self, mesh_volume: f64) -> Vec<Point3<f64>> {
        let radius = self.radius(mesh_volume);
        let offset = Point3::from(self.offset);
        let mut rng = StdRng::seed_from_u64(0);
        (0..self.count)
            .map(|_| {
                let z: f64 = rng.gen_range(-1.0..=1.0);
                let phi: f64 = rng.gen_range(0.0..2.0 * PI);
                let r = (1.0 - z * z).max(0.0).sqrt();
                offset + Vector3::new(r * phi.cos(), r * phi.sin(), z) * radius
            })
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.count == 0 {
            bail!("Center count must be at least 1.");
        }
        if !(self.ratio >= 0.0 && self.ratio.is_finite()) {
            bail!("Center sphere volume ratio must be a finite non-negative number, got {}.", self.ratio);
        }
        if !self.offset.iter().all(|c| c.is_finite()) {
            bail!("Center offset must be finite.");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRatioParams {
    pub area_ratio: f64,
    pub aggregations: Vec<Aggregation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCountParams {
    pub level_count: usize,
    pub area_ratios: Vec<AreaRatioParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenterSphereParams {
    pub generator: CenterSphereGenerator,
    pub level_counts: Vec<LevelCountParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub centers: Vec<CenterSphereParams>,
}

impl Default for Parameters {
    fn default() -> Self {
        let mut parameters = Self { centers: Vec::new() };
        parameters.insert(&ParameterRow::default());
        parameters
    }
}

/// One flat line of the parameter table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRow {
    pub generator: CenterSphereGenerator,
    pub level_count: usize,
    pub area_ratio: f64,
    pub aggregation: Aggregation,
}

impl Default for ParameterRow {
    fn default() -> Self {
        Self {
            generator: CenterSphereGenerator::default(),
            level_count: 100,
            area_ratio: 0.01,
            aggregation: Aggregation::First,
        }
    }
}

impl Parameters {
    pub fn empty() -> Self {
        Self { centers: Vec::new() }
    }

    /// Adds a row, reusing every node of the tree that already matches it.
    pub fn insert(&mut self, row: &ParameterRow) {
        let c = match self.centers.iter().position(|c| c.generator == row.generator) {
            Some(index) => index,
            None => {
                self.centers.push(CenterSphereParams {
                    generator: row.generator,
                    level_counts: Vec::new(),
                });
                self.centers.len() - 1
            }
        };
        let center = &mut self.centers[c];
        let l = match center.level_counts.iter().position(|l| l.level_count == row.level_count) {
            Some(index) => index,
            None => {
                center.level_counts.push(LevelCountParams {
                    level_count: row.level_count,
                    area_ratios: Vec::new(),
                });
                center.level_counts.len() - 1
            }
        };
        let levels = &mut center.level_counts[l];
        let a = match levels.area_ratios.iter().position(|a| a.area_ratio == row.area_ratio) {
            Some(index) => index,
            None => {
                levels.area_ratios.push(AreaRatioParams {
                    area_ratio: row.area_ratio,
                    aggregations: Vec::new(),
                });
                levels.area_ratios.len() - 1
            }
        };
        let ratio = &mut levels.area_ratios[a];
        if !ratio.aggregations.contains(&row.aggregation) {
            ratio.aggregations.push(row.aggregation);
        }
    }

    /// Flattens the tree back into rows, in tree order.
    pub fn rows(&self) -> Vec<ParameterRow> {
        let mut rows = Vec::new();
        for center in &self.centers {
            for levels in &center.level_counts {
                for ratio in &levels.area_ratios {
                    for &aggregation in &ratio.aggregations {
                        rows.push(ParameterRow {
                            generator: center.generator,
                            level_count: levels.level_count,
                            area_ratio: ratio.area_ratio,
                            aggregation,
                        });
                    }
                }
            }
        }
        rows
    }

    /// Number of aggregated results a sweep reports.
    pub fn total_count(&self) -> usize {
        self.centers
            .iter()
            .flat_map(|c| &c.level_counts)
            .flat_map(|l| &l.area_ratios)
            .map(|a| a.aggregations.len())
            .sum()
    }

    /// Reads rows until a line that starts with `;` or the end of the text.
    /// Blank lines are skipped.
    pub fn parse_rows(text: &str) -> ShapeResult<Self> {
        let mut parameters = Self::empty();
        for (number, line) in text.lines().enumerate() {
            if line.starts_with(';') {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            let row: ParameterRow = line
                .parse()
                .map_err(|err: ShapeError| ShapeError::InvalidParameters(format!("line {}: {err}", number + 1)))?;
            parameters.insert(&row);
        }
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn validate(&self) -> ShapeResult<()> {
        self.check().map_err(ShapeError::invalid_parameters)
    }

    fn check(&self) -> Result<()> {
        if self.total_count() == 0 {
            bail!("No parameter rows were given.");
        }
        for center in &self.centers {
            center.generator.validate()?;
            for levels in &center.level_counts {
                if levels.level_count == 0 {
                    bail!("Level count must be at least 1.");
                }
                for ratio in &levels.area_ratios {
                    if !(0.0..=1.0).contains(&ratio.area_ratio) {
                        bail!("Area ratio must be between 0 and 1, got {}.", ratio.area_ratio);
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, row) in self.rows().iter().enumerate() {
            writeln!(
                f,
                "{};{};{};{};{};{}",
                index + 1,
                row.generator.ratio * 100.0,
                row.generator.count,
                row.level_count,
                row.area_ratio * 100.0,
                row.aggregation
            )?;
        }
        Ok(())
    }
}

/// Substring match, as in hand-edited tables; anything unknown means `First`.
fn parse_aggregation(text: &str) -> Aggregation {
    let text = text.to_lowercase();
    if text.contains("atlag") || text.contains("átlag") || text.contains("average") {
        Aggregation::Average
    } else if text.contains("smin") {
        Aggregation::SMin
    } else if text.contains("smax") {
        Aggregation::SMax
    } else if text.contains("umin") {
        Aggregation::UMin
    } else if text.contains("umax") {
        Aggregation::UMax
    } else {
        Aggregation::First
    }
}

/// Accepts a decimal comma as well as a point.
fn parse_number<T: FromStr>(field: &str, name: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    field
        .trim()
        .replace(',', ".")
        .parse()
        .with_context(|| format!("Invalid {name} '{}'", field.trim()))
}

impl FromStr for ParameterRow {
    type Err = ShapeError;

    fn from_str(line: &str) -> ShapeResult<Self> {
        let parse = || -> Result<Self> {
            let fields: Vec<&str> = line.split(';').collect();
            if fields.len() < 6 {
                bail!("Expected 6 ';'-separated fields, found {}.", fields.len());
            }
            let volume_percent: f64 = parse_number(fields[1], "volume percentage")?;
            let count: usize = parse_number(fields[2], "center count")?;
            let level_count: usize = parse_number(fields[3], "level count")?;
            let area_percent: f64 = parse_number(fields[4], "area percentage")?;
            Ok(Self {
                generator: CenterSphereGenerator {
                    offset: [0.0; 3],
                    ratio: volume_percent / 100.0,
                    count,
                },
                level_count,
                area_ratio: area_percent / 100.0,
                aggregation: parse_aggregation(fields[5]),
            })
        };
        parse().map_err(ShapeError::invalid_parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::{CenterSphereGenerator, ParameterRow, Parameters};
    use crate::aggregate::Aggregation;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    const TABLE: &str = "\
1;0;1;100;1;elso
2;0;1;100;1;atlag
3;0;1;50;1;smin
4;0,5;5;100;2,5;umax
5;0;1;100;1;atlag
;end of parameters
6;0;1;10;1;smax
";

    #[test]
    fn rows_merge_into_a_tree() {
        let parameters = Parameters::parse_rows(TABLE).expect("valid table");
        assert_eq!(parameters.centers.len(), 2);
        let first = &parameters.centers[0];
        assert_eq!(first.level_counts.len(), 2);
        assert_eq!(
            first.level_counts[0].area_ratios[0].aggregations,
            vec![Aggregation::First, Aggregation::Average]
        );
        let second = &parameters.centers[1];
        assert_relative_eq!(second.generator.ratio, 0.005);
        assert_eq!(second.generator.count, 5);
        assert_relative_eq!(second.level_counts[0].area_ratios[0].area_ratio, 0.025);
        assert_eq!(parameters.total_count(), 4);
    }

    #[test]
    fn display_round_trips_through_parse() {
        let parameters = Parameters::parse_rows(TABLE).expect("valid table");
        let text = parameters.to_string();
        assert!(text.starts_with("1;0;1;100;1;first\n"), "unexpected text:\n{text}");
        assert_eq!(Parameters::parse_rows(&text).expect("own output parses"), parameters);
    }

    #[test]
    fn bad_rows_are_rejected() {
        let err = "1;x;1;100;1;first".parse::<ParameterRow>().expect_err("must fail");
        assert!(err.to_string().contains("volume percentage"), "unexpected error: {err}");
        let err = Parameters::parse_rows("1;0;1;0;1;first").expect_err("zero levels");
        assert!(err.to_string().contains("at least 1"), "unexpected error: {err}");
        let err = Parameters::parse_rows("1;0;1;10;150;first").expect_err("ratio above one");
        assert!(err.to_string().contains("between 0 and 1"), "unexpected error: {err}");
        let err = Parameters::parse_rows("1;0;1").expect_err("short row");
        assert!(err.to_string().contains("line 1"), "unexpected error: {err}");
    }

    #[test]
    fn unknown_keyword_means_first() {
        let row: ParameterRow = "9;0;1;10;1;whatever".parse().expect("valid row");
        assert_eq!(row.aggregation, Aggregation::First);
        let row: ParameterRow = "9;0;1;10;1;Average".parse().expect("valid row");
        assert_eq!(row.aggregation, Aggregation::Average);
    }

    #[test]
    fn default_tree_is_one_configuration() {
        let parameters = Parameters::default();
        assert_eq!(parameters.total_count(), 1);
        let levels = &parameters.centers[0].level_counts[0];
        assert_eq!(levels.level_count, 100);
        assert_relative_eq!(levels.area_ratios[0].area_ratio, 0.01);
        parameters.validate().expect("default is valid");
    }

    #[test]
    fn single_center_without_volume_is_the_offset() {
        let generator = CenterSphereGenerator {
            offset: [0.5, -1.0, 2.0],
            ratio: 0.0,
            count: 1,
        };
        assert_eq!(generator.centers(10.0), vec![Point3::new(0.5, -1.0, 2.0)]);
    }

    #[test]
    fn generated_centers_are_seeded_and_on_the_sphere() {
        let generator = CenterSphereGenerator {
            offset: [1.0, 0.0, 0.0],
            ratio: 0.01,
            count: 8,
        };
        let volume = 4.0 / 3.0 * std::f64::consts::PI * 1000.0;
        let radius = generator.radius(volume);
        assert_relative_eq!(radius, 10.0 * 0.01f64.cbrt(), epsilon = 1e-12);
        let centers = generator.centers(volume);
        assert_eq!(centers, generator.centers(volume));
        for c in &centers {
            assert_relative_eq!((c - Point3::new(1.0, 0.0, 0.0)).norm(), radius, epsilon = 1e-12);
        }
    }

    #[test]
    fn serde_defaults_fill_missing_fields() {
        let generator: CenterSphereGenerator = serde_json::from_str(r#"{"ratio": 0.1}"#).expect("parse");
        assert_eq!(generator.count, 1);
        assert_eq!(generator.offset, [0.0; 3]);
    }
}
