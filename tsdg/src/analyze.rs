//! Inspection of an existing Prometheus exposition.
//!
//! Reads the text exposition of a running exporter, or a file holding one,
//! and reports every metric name together with its label keys and the unique
//! values seen for each key. The observed series can be written out as a base
//! metrics file, ready to be referenced from a generator configuration.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt, io,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

pub mod parser;

#[derive(thiserror::Error, Debug)]
/// Errors produced while analyzing an exposition.
pub enum Error {
    /// The exposition could not be fetched.
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        /// The requested URL
        url: String,
        /// Underlying HTTP error
        #[source]
        source: reqwest::Error,
    },
    /// The exposition file could not be read.
    #[error("Failed to read {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },
    /// The base metrics file could not be written.
    #[error("Failed to write {path:?}: {source}")]
    WriteFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to serialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
}

/// Read an exposition from an `http://` or `https://` URL, or from a file.
///
/// # Errors
///
/// Fails if the request fails, the server answers with an error status or the
/// file cannot be read.
pub async fn fetch(source: &str) -> Result<String, Error> {
    if source.starts_with("http://") || source.starts_with("https://") {
        debug!("fetching exposition from {source}");
        let fetch_err = |err| Error::Fetch {
            url: source.to_string(),
            source: err,
        };
        let response = reqwest::get(source)
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(fetch_err)?;
        response.text().await.map_err(fetch_err)
    } else {
        debug!("reading exposition from {source}");
        tokio::fs::read_to_string(source)
            .await
            .map_err(|err| Error::ReadFile {
                path: PathBuf::from(source),
                source: err,
            })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct MetricLabels {
    values: BTreeMap<String, BTreeSet<String>>,
    series: BTreeSet<Vec<(String, String)>>,
}

/// Metric names, label keys and label values found in an exposition.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Analysis {
    metrics: BTreeMap<String, MetricLabels>,
    skipped: usize,
}

impl Analysis {
    /// Analyze exposition `text`. Lines that do not parse are skipped.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut analysis = Self::default();
        for line in parser::parse_text(text) {
            match line {
                Ok(line) => {
                    let entry = analysis.metrics.entry(line.name).or_default();
                    for (key, value) in &line.labels {
                        entry
                            .values
                            .entry(key.clone())
                            .or_default()
                            .insert(value.clone());
                    }
                    entry.series.insert(line.labels);
                }
                Err(err) => {
                    debug!("skipping line: {err}");
                    analysis.skipped += 1;
                }
            }
        }
        if analysis.skipped > 0 {
            warn!("skipped {} unparseable lines", analysis.skipped);
        }
        info!("found {} metrics", analysis.metrics.len());
        analysis
    }

    /// Metric names, sorted.
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    /// Label keys of `metric` with their unique values, sorted.
    #[must_use]
    pub fn labels(&self, metric: &str) -> Option<&BTreeMap<String, BTreeSet<String>>> {
        self.metrics.get(metric).map(|m| &m.values)
    }

    /// Lines that could not be parsed.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Every observed series, grouped by metric, in the shape of a base
    /// metrics file.
    #[must_use]
    pub fn base_metrics(&self) -> BTreeMap<String, Vec<BTreeMap<String, String>>> {
        self.metrics
            .iter()
            .map(|(name, labels)| {
                let series = labels
                    .series
                    .iter()
                    .map(|pairs| {
                        pairs
                            .iter()
                            .filter(|(key, _)| key != tsdg_payload::labels::METRIC_NAME_LABEL)
                            .cloned()
                            .collect()
                    })
                    .collect();
                (name.clone(), series)
            })
            .collect()
    }

    /// Write [`Analysis::base_metrics`] as YAML to `path`.
    ///
    /// # Errors
    ///
    /// Fails if serialization or the write fails.
    pub async fn write_base(&self, path: &Path) -> Result<(), Error> {
        let yaml = serde_yaml::to_string(&self.base_metrics())?;
        tokio::fs::write(path, yaml)
            .await
            .map_err(|err| Error::WriteFile {
                path: path.to_path_buf(),
                source: err,
            })?;
        info!("wrote base metrics to {}", path.display());
        Ok(())
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, labels) in &self.metrics {
            writeln!(f, "Metric: {name}")?;
            if labels.values.is_empty() {
                writeln!(f, "  No labels")?;
            }
            for (key, values) in &labels.values {
                writeln!(f, "  Label Key: {key}")?;
                let values: Vec<&str> = values.iter().map(String::as_str).collect();
                writeln!(f, "    Unique Values: {}", values.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPOSITION: &str = r#"
# HELP node_cpu_seconds_total Seconds the CPUs spent in each mode.
# TYPE node_cpu_seconds_total counter
node_cpu_seconds_total{cpu="0",mode="idle"} 100.5
node_cpu_seconds_total{cpu="0",mode="user"} 10
node_cpu_seconds_total{cpu="1",mode="idle"} 99
node_load1 0.42
this line is broken
"#;

    #[test]
    fn collects_unique_label_values() {
        let analysis = Analysis::new(EXPOSITION);
        assert_eq!(
            analysis.metric_names().collect::<Vec<_>>(),
            vec!["node_cpu_seconds_total", "node_load1"]
        );
        assert_eq!(analysis.skipped(), 1);

        let labels = analysis.labels("node_cpu_seconds_total").expect("known metric");
        let cpus: Vec<&str> = labels["cpu"].iter().map(String::as_str).collect();
        let modes: Vec<&str> = labels["mode"].iter().map(String::as_str).collect();
        assert_eq!(cpus, vec!["0", "1"]);
        assert_eq!(modes, vec!["idle", "user"]);
        assert!(analysis.labels("node_load1").expect("known metric").is_empty());
    }

    #[test]
    fn report_lists_metrics_and_labels() {
        let report = Analysis::new(EXPOSITION).to_string();
        assert!(report.contains("Metric: node_cpu_seconds_total\n  Label Key: cpu\n    Unique Values: 0, 1\n"));
        assert!(report.contains("Metric: node_load1\n  No labels\n"));
    }

    #[test]
    fn base_metrics_hold_observed_series() {
        let base = Analysis::new(EXPOSITION).base_metrics();
        assert_eq!(base["node_cpu_seconds_total"].len(), 3);
        assert_eq!(base["node_load1"], vec![BTreeMap::new()]);
    }

    #[tokio::test]
    async fn base_file_round_trips_through_config() {
        let dir = tempfile::tempdir().expect("directory could not be created");
        let exposition = dir.path().join("metrics.txt");
        tokio::fs::write(&exposition, EXPOSITION)
            .await
            .expect("write exposition");

        let text = fetch(exposition.to_str().expect("utf-8 path"))
            .await
            .expect("readable");
        let analysis = Analysis::new(&text);
        let base = dir.path().join("base.yaml");
        analysis.write_base(&base).await.expect("writes");

        let config = crate::config::Config::parse(&format!(
            "start: 2024-01-01T00:00:00Z\nend: 2024-01-01T00:01:00Z\ninterval: 10\nbase: {}\n",
            base.display()
        ))
        .expect("valid config");
        let metrics = config.metrics().expect("valid base");
        assert_eq!(metrics.len(), 2);
        assert_eq!(config.assembly().expect("valid assembly").len(), 4);
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = fetch("/definitely/not/here.prom").await.expect_err("missing");
        assert!(matches!(err, Error::ReadFile { .. }));
    }
}
