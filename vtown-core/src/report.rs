//! Plain-text summary of a batch: final-step outcomes across runs and the
//! change between the first and last recorded step.

use std::fmt::Write;

use crate::batch::RunOutcome;
use crate::metrics::ModelMetrics;
use crate::types::{InfrastructureType, Sector};

/// Mean and sample standard deviation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spread {
    pub mean: f64,
    pub std: f64,
}

impl Spread {
    /// Standard deviation is zero with fewer than two samples.
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() < 2 {
            0.0
        } else {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        };
        Self { mean, std }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryReport {
    pub runs: usize,
    pub steps: u64,
    pub total_rows: usize,

    pub population: Spread,
    pub gdp_per_capita: Spread,
    pub gini_coefficient: Spread,
    pub average_education: Spread,
    pub average_health: Spread,
    pub urbanization_rate: Spread,
    pub service_access_rate: Spread,

    pub employment: Vec<(Sector, f64)>,
    pub coverage: Vec<(InfrastructureType, f64)>,

    /// Percent change of mean GDP per capita; zero when it started at zero.
    pub gdp_growth_pct: f64,
    pub education_change: f64,
    pub health_change: f64,
    pub urbanization_change: f64,
}

impl SummaryReport {
    pub fn from_runs(runs: &[RunOutcome]) -> Self {
        let last: Vec<&ModelMetrics> = runs.iter().map(|r| &r.final_metrics).collect();
        let first: Vec<&ModelMetrics> = runs.iter().map(|r| &r.initial).collect();
        let gdp_start = mean(&first, |m| m.gdp_per_capita);
        let gdp_end = mean(&last, |m| m.gdp_per_capita);
        let gdp_growth_pct = if gdp_start == 0.0 {
            0.0
        } else {
            (gdp_end - gdp_start) / gdp_start * 100.0
        };

        Self {
            runs: runs.len(),
            steps: last.iter().map(|m| m.step).max().unwrap_or(0),
            total_rows: runs.iter().map(|r| r.steps_recorded).sum(),
            population: spread(&last, |m| m.population as f64),
            gdp_per_capita: spread(&last, |m| m.gdp_per_capita),
            gini_coefficient: spread(&last, |m| m.gini_coefficient),
            average_education: spread(&last, |m| m.average_education),
            average_health: spread(&last, |m| m.average_health),
            urbanization_rate: spread(&last, |m| m.urbanization_rate),
            service_access_rate: spread(&last, |m| m.service_access_rate),
            employment: Sector::ALL
                .iter()
                .map(|s| {
                    let values: Vec<f64> = last.iter().map(|m| m.employment_in(*s) as f64).collect();
                    (*s, Spread::of(&values).mean)
                })
                .collect(),
            coverage: InfrastructureType::ALL
                .iter()
                .map(|t| {
                    let values: Vec<f64> = last.iter().map(|m| m.coverage_of(*t) as f64).collect();
                    (*t, Spread::of(&values).mean)
                })
                .collect(),
            gdp_growth_pct,
            education_change: mean(&last, |m| m.average_education) - mean(&first, |m| m.average_education),
            health_change: mean(&last, |m| m.average_health) - mean(&first, |m| m.average_health),
            urbanization_change: mean(&last, |m| m.urbanization_rate)
                - mean(&first, |m| m.urbanization_rate),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "=== Village to Town Simulation Summary Report ===")?;
        writeln!(out)?;

        writeln!(out, "SIMULATION OVERVIEW")?;
        writeln!(out, "Number of runs: {}", self.runs)?;
        writeln!(out, "Steps per run: {}", self.steps)?;
        writeln!(out, "Total simulation steps: {}", self.total_rows)?;
        writeln!(out)?;

        writeln!(out, "FINAL OUTCOMES (Average across runs)")?;
        writeln!(out, "Population: {:.1} ± {:.1}", self.population.mean, self.population.std)?;
        writeln!(
            out,
            "GDP per capita: {:.0} ± {:.0} Taka",
            self.gdp_per_capita.mean, self.gdp_per_capita.std
        )?;
        writeln!(
            out,
            "Gini coefficient: {:.3} ± {:.3}",
            self.gini_coefficient.mean, self.gini_coefficient.std
        )?;
        writeln!(
            out,
            "Average education: {:.1} ± {:.1} years",
            self.average_education.mean, self.average_education.std
        )?;
        writeln!(
            out,
            "Average health: {:.3} ± {:.3}",
            self.average_health.mean, self.average_health.std
        )?;
        writeln!(
            out,
            "Urbanization rate: {:.1}% ± {:.1}%",
            self.urbanization_rate.mean * 100.0,
            self.urbanization_rate.std * 100.0
        )?;
        writeln!(
            out,
            "Service access: {:.1}% ± {:.1}%",
            self.service_access_rate.mean * 100.0,
            self.service_access_rate.std * 100.0
        )?;
        writeln!(out)?;

        writeln!(out, "EMPLOYMENT DISTRIBUTION (Final)")?;
        for (sector, count) in &self.employment {
            writeln!(out, "{}: {:.1} people", title(sector.as_str()), count)?;
        }
        writeln!(out)?;

        writeln!(out, "INFRASTRUCTURE COVERAGE (Final, households served)")?;
        for (kind, served) in &self.coverage {
            writeln!(out, "{}: {:.1}", title(kind.as_str()), served)?;
        }
        writeln!(out)?;

        writeln!(out, "DEVELOPMENT PROGRESS")?;
        writeln!(out, "GDP per capita growth: {:.1}%", self.gdp_growth_pct)?;
        writeln!(out, "Education improvement: {:+.1} years", self.education_change)?;
        writeln!(out, "Health improvement: {:+.3}", self.health_change)?;
        writeln!(out, "Urbanization increase: {:+.1}%", self.urbanization_change * 100.0)?;
        Ok(())
    }
}

fn spread(metrics: &[&ModelMetrics], f: fn(&ModelMetrics) -> f64) -> Spread {
    let values: Vec<f64> = metrics.iter().map(|m| f(m)).collect();
    Spread::of(&values)
}

fn mean(metrics: &[&ModelMetrics], f: fn(&ModelMetrics) -> f64) -> f64 {
    spread(metrics, f).mean
}

fn title(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn metrics(step: u64, gdp: f64, education: f64) -> ModelMetrics {
        ModelMetrics {
            step,
            population: 100,
            total_businesses: 10,
            gdp_per_capita: gdp,
            gini_coefficient: 0.3,
            average_education: education,
            average_health: 0.6,
            urbanization_rate: 0.25,
            infrastructure_coverage: 0.1,
            service_access_rate: 0.5,
            employment: BTreeMap::from([(Sector::Agriculture, 60), (Sector::Services, 40)]),
            coverage_by_type: BTreeMap::new(),
            units_by_type: BTreeMap::new(),
        }
    }

    fn outcome(run_id: u64, start: f64, end: f64) -> RunOutcome {
        RunOutcome {
            run_id,
            seed: Some(run_id),
            initial: metrics(0, start, 4.0),
            final_metrics: metrics(20, end, 5.0),
            steps_recorded: 21,
            history: Vec::new(),
        }
    }

    #[test]
    fn test_spread_uses_sample_deviation() {
        let spread = Spread::of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((spread.mean - 5.0).abs() < 1e-12);
        assert!((spread.std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(Spread::of(&[3.0]).std, 0.0);
        assert_eq!(Spread::of(&[]), Spread::default());
    }

    #[test]
    fn test_report_progress_and_text() {
        let report = SummaryReport::from_runs(&[outcome(0, 1000.0, 1500.0), outcome(1, 1000.0, 2500.0)]);
        assert_eq!(report.runs, 2);
        assert_eq!(report.steps, 20);
        assert_eq!(report.total_rows, 42);
        assert!((report.gdp_growth_pct - 100.0).abs() < 1e-9);
        assert!((report.education_change - 1.0).abs() < 1e-12);

        let text = report.render();
        assert!(text.contains("Number of runs: 2"));
        assert!(text.contains("GDP per capita: 2000 ± 707 Taka"));
        assert!(text.contains("Agriculture: 60.0 people"));
        assert!(text.contains("Manufacturing: 0.0 people"));
        assert!(text.contains("Education improvement: +1.0 years"));
    }

    #[test]
    fn test_zero_starting_gdp_has_no_growth() {
        let report = SummaryReport::from_runs(&[outcome(0, 0.0, 500.0)]);
        assert_eq!(report.gdp_growth_pct, 0.0);
    }
}
