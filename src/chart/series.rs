//! Series discovery: turns the open-ended key set of the first sample into a
//! closed, index-ordered descriptor table.

use crate::error::Error;
use crate::feed::{App, Sample};
use crate::format::FormatterKind;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    Left,
    Right,
}

/// Unit, axis and label policy for one metric name
#[derive(Clone, Debug, PartialEq)]
pub struct MetricKind {
    pub metric: String,
    pub label: String,
    pub axis: Axis,
    pub formatter: FormatterKind,
}

impl MetricKind {
    pub fn new(metric: &str, label: &str, axis: Axis, formatter: FormatterKind) -> Self {
        MetricKind {
            metric: metric.to_string(),
            label: label.to_string(),
            axis,
            formatter,
        }
    }
}

/// Classification table. Metric names not listed here are not charted.
#[derive(Clone, Debug)]
pub struct MetricTable {
    kinds: Vec<MetricKind>,
}

impl Default for MetricTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MetricTable {
    pub fn builtin() -> Self {
        MetricTable {
            kinds: vec![
                MetricKind::new("cpu_usage", "CPU", Axis::Left, FormatterKind::Percent),
                MetricKind::new("mem_used_percent", "MEM", Axis::Left, FormatterKind::Percent),
                MetricKind::new("mem_used_bytes", "MEM", Axis::Right, FormatterKind::Bytes),
            ],
        }
    }

    pub fn empty() -> Self {
        MetricTable { kinds: Vec::new() }
    }

    /// Add or replace the policy for `kind.metric`.
    pub fn with_kind(mut self, kind: MetricKind) -> Self {
        self.kinds.retain(|k| k.metric != kind.metric);
        self.kinds.push(kind);
        self
    }

    pub fn classify(&self, metric: &str) -> Option<&MetricKind> {
        self.kinds.iter().find(|k| k.metric == metric)
    }
}

/// Split `"<addr>,<metric>"`.
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(',')
}

/// `"<app>-<port> <metric label>"`, or `"<app> <metric label>"` when the
/// address carries no port. `None` when no app owns the address.
pub fn derive_label(addr: &str, metric_label: &str, apps: &[App]) -> Option<String> {
    let app = apps
        .iter()
        .find(|app| app.instances.iter().any(|i| i.addr == addr))?;

    let parts: Vec<&str> = addr.split(':').collect();
    Some(match parts.as_slice() {
        [_, port] => format!("{}-{} {}", app.name, port, metric_label),
        _ => format!("{} {}", app.name, metric_label),
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct SeriesDescriptor {
    pub key: String,
    /// Column index, 0-based, fixed for the registry's lifetime
    pub index: usize,
    pub axis: Axis,
    pub label: String,
    pub formatter: FormatterKind,
}

impl SeriesDescriptor {
    pub fn format_value(&self, value: Option<f64>) -> String {
        self.formatter.format_value(value)
    }

    pub fn format_ticks(&self, ticks: &[f64]) -> Vec<String> {
        self.formatter.format_ticks(ticks)
    }
}

/// Why a key of the first sample has no series
#[derive(Debug)]
pub enum Skipped {
    /// Metric name not in the table, or key not of the composite form
    Unclassified(String),
    Unlabeled(Error),
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skipped::Unclassified(key) => write!(f, "{} (unknown metric)", key),
            Skipped::Unlabeled(err) => write!(f, "{}", err),
        }
    }
}

#[derive(Debug)]
pub struct SeriesRegistry {
    descriptors: Vec<SeriesDescriptor>,
    index_by_key: HashMap<String, usize>,
    skipped: Vec<Skipped>,
}

impl SeriesRegistry {
    /// Build the registry from the first sample. Index order is the order the
    /// classified, labelled keys appear in `sample`.
    pub fn discover(sample: &Sample, apps: &[App], table: &MetricTable) -> Self {
        let mut descriptors = Vec::new();
        let mut index_by_key = HashMap::new();
        let mut skipped = Vec::new();

        for key in sample.value.keys() {
            let Some((addr, kind)) =
                split_key(key).and_then(|(addr, metric)| Some((addr, table.classify(metric)?)))
            else {
                tracing::debug!(key, "metric not charted");
                skipped.push(Skipped::Unclassified(key.to_string()));
                continue;
            };

            let Some(label) = derive_label(addr, &kind.label, apps) else {
                tracing::warn!(key, addr, "no application owns instance, dropping series");
                skipped.push(Skipped::Unlabeled(Error::UnresolvedLabel {
                    key: key.to_string(),
                    addr: addr.to_string(),
                }));
                continue;
            };

            let index = descriptors.len();
            index_by_key.insert(key.to_string(), index);
            descriptors.push(SeriesDescriptor {
                key: key.to_string(),
                index,
                axis: kind.axis,
                label,
                formatter: kind.formatter,
            });
        }

        SeriesRegistry {
            descriptors,
            index_by_key,
            skipped,
        }
    }

    pub fn descriptors(&self) -> &[SeriesDescriptor] {
        &self.descriptors
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index_by_key.get(key).copied()
    }

    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Index-ordered values for one tick. Series absent from `sample` get
    /// `None`; keys unknown to the registry are ignored.
    pub fn row(&self, sample: &Sample) -> Vec<Option<f64>> {
        let mut row = vec![None; self.descriptors.len()];
        for (key, value) in sample.value.iter() {
            if let Some(index) = self.index_of(key) {
                row[index] = value;
            }
        }
        row
    }
}
