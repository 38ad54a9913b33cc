use crate::chart::series::Axis;
use crate::chart::view::{Scale, SeriesStyle, TIME_LABEL, Y_AXIS_SPACE};
use crate::chart::{ChartConfig, ChartData, ChartRenderer};
use crate::error::{Error, Result};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis as ChartAxis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
};

/// Rows below the plot taken by the x-axis line and its labels
const X_AXIS_ROWS: u16 = 2;

/// Smallest inner area worth plotting into
const MIN_PLOT_WIDTH: u16 = 24;
const MIN_PLOT_HEIGHT: u16 = 5;

/// ratatui-backed chart surface. Holds the last configuration and column set
/// and draws them on demand.
#[derive(Default)]
pub struct TerminalChart {
    config: Option<ChartConfig>,
    data: ChartData,
    redraws: u64,
}

impl ChartRenderer for TerminalChart {
    fn configure(&mut self, config: &ChartConfig) -> Result<()> {
        self.config = Some(config.clone());
        Ok(())
    }

    fn set_data(&mut self, data: ChartData) -> Result<()> {
        if !data.is_aligned() {
            return Err(Error::Render(format!(
                "columns misaligned: time has {} points",
                data.len()
            )));
        }
        if let Some(config) = &self.config
            && config.series.len() != data.series.len()
        {
            return Err(Error::Render(format!(
                "chart has {} series, data has {}",
                config.series.len(),
                data.series.len()
            )));
        }
        self.data = data;
        self.redraws += 1;
        Ok(())
    }

    fn data(&self) -> &ChartData {
        &self.data
    }
}

/// Value range of one axis
#[derive(Clone, Copy, Debug, PartialEq)]
struct Bounds {
    min: f64,
    max: f64,
}

impl Bounds {
    fn span(&self) -> f64 {
        self.max - self.min
    }

    fn ticks(&self) -> [f64; 3] {
        [self.min, (self.min + self.max) / 2.0, self.max]
    }

    /// Map `v` from `self` into `target`
    fn project(&self, v: f64, target: Bounds) -> f64 {
        target.min + (v - self.min) / self.span() * target.span()
    }
}

impl TerminalChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    pub fn config(&self) -> Option<&ChartConfig> {
        self.config.as_ref()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let Some(config) = &self.config else {
            let msg = Paragraph::new(" Waiting for first sample...")
                .block(Block::default().title(" Chart ").borders(Borders::ALL))
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(msg, area);
            return;
        };

        let title = format!(
            " {} │ {} ",
            config.title,
            config.format_time_point(self.data.latest_time())
        );
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));

        if self.data.is_empty() {
            let msg = Paragraph::new(" Collecting data...")
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(msg, area);
            return;
        }

        let inner = block.inner(area);
        if inner.width < MIN_PLOT_WIDTH || inner.height < MIN_PLOT_HEIGHT {
            let msg = Paragraph::new(" Too small")
                .block(block)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(msg, area);
            return;
        }
        frame.render_widget(block, area);

        let primary = if config.has_axis(Axis::Left) {
            Axis::Left
        } else {
            Axis::Right
        };
        let secondary = (primary == Axis::Left && config.has_axis(Axis::Right)).then_some(Axis::Right);

        let (plot_area, gutter) = match secondary {
            Some(_) => {
                let space = config
                    .axes
                    .iter()
                    .find(|a| a.scale == Scale::Value(Axis::Right))
                    .map(|a| a.space)
                    .unwrap_or(Y_AXIS_SPACE);
                let chunks =
                    Layout::horizontal([Constraint::Fill(1), Constraint::Length(space)]).split(inner);
                (chunks[0], Some(chunks[1]))
            }
            None => (inner, None),
        };

        let primary_bounds = self.bounds(config, primary);
        let secondary_bounds = secondary.map(|axis| self.bounds(config, axis));

        let segments: Vec<(&SeriesStyle, Vec<Vec<(f64, f64)>>)> = config
            .series
            .iter()
            .map(|style| {
                let projection = if Some(style.axis) == secondary {
                    secondary_bounds.map(|from| (from, primary_bounds))
                } else {
                    None
                };
                (style, self.segments(style.index, projection))
            })
            .collect();

        let mut datasets = Vec::new();
        for (style, runs) in &segments {
            let legend = format!(
                "{} {}",
                style.label,
                style.format_value(self.data.latest(style.index))
            );
            let line_style = Style::default().fg(style.color);
            if runs.is_empty() {
                datasets.push(Dataset::default().name(legend).style(line_style).data(&[]));
                continue;
            }
            for (i, run) in runs.iter().enumerate() {
                let mut dataset = Dataset::default()
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(line_style)
                    .data(run);
                if i == 0 {
                    dataset = dataset.name(legend.clone());
                }
                datasets.push(dataset);
            }
        }

        let (x_min, x_max) = self.time_bounds();
        let x_labels: Vec<Span> = [x_min, (x_min + x_max) / 2.0, x_max]
            .iter()
            .map(|&t| Span::raw(config.format_time_tick(t as i64)))
            .collect();
        let y_labels: Vec<Span> = config
            .format_ticks(primary, &primary_bounds.ticks())
            .into_iter()
            .map(Span::raw)
            .collect();

        let chart = Chart::new(datasets)
            .x_axis(
                ChartAxis::default()
                    .title(TIME_LABEL)
                    .style(Style::default().fg(Color::DarkGray))
                    .bounds([x_min, x_max])
                    .labels(x_labels),
            )
            .y_axis(
                ChartAxis::default()
                    .style(Style::default().fg(Color::DarkGray))
                    .bounds([primary_bounds.min, primary_bounds.max])
                    .labels(y_labels),
            )
            .hidden_legend_constraints((Constraint::Ratio(1, 1), Constraint::Ratio(1, 2)));
        frame.render_widget(chart, plot_area);

        if let (Some(gutter), Some(axis), Some(bounds)) = (gutter, secondary, secondary_bounds) {
            let labels = config.format_ticks(axis, &bounds.ticks());
            frame.render_widget(gutter_labels(&labels, gutter.height), gutter);
        }
    }

    /// Padded value range of every series on `axis` across the window.
    fn bounds(&self, config: &ChartConfig, axis: Axis) -> Bounds {
        let (min, max) = config
            .series
            .iter()
            .filter(|s| s.axis == axis)
            .filter_map(|s| self.data.series.get(s.index))
            .flatten()
            .flatten()
            .fold((f64::MAX, f64::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        if min > max {
            return Bounds { min: 0.0, max: 100.0 };
        }

        let padding = (max - min).max(1.0) * 0.1;
        Bounds {
            min: if min >= 0.0 { (min - padding).max(0.0) } else { min - padding },
            max: max + padding,
        }
    }

    fn time_bounds(&self) -> (f64, f64) {
        let first = self.data.time.first().copied().unwrap_or(0) as f64;
        let last = self.data.time.last().copied().unwrap_or(0) as f64;
        if last > first {
            (first, last)
        } else {
            // Single point: one second either side
            (first - 1000.0, first + 1000.0)
        }
    }

    /// Contiguous non-missing runs of series `index`, optionally rescaled
    /// from one axis range into another.
    fn segments(&self, index: usize, projection: Option<(Bounds, Bounds)>) -> Vec<Vec<(f64, f64)>> {
        let Some(column) = self.data.series.get(index) else {
            return Vec::new();
        };

        let mut runs = Vec::new();
        let mut current: Vec<(f64, f64)> = Vec::new();
        for (&t, value) in self.data.time.iter().zip(column) {
            match value {
                Some(v) => {
                    let y = match projection {
                        Some((from, to)) => from.project(*v, to),
                        None => *v,
                    };
                    current.push((t as f64, y));
                }
                None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }
}

/// Right-axis labels laid out top, middle and bottom of the plot rows.
fn gutter_labels(labels: &[String], height: u16) -> Paragraph<'static> {
    let plot_rows = height.saturating_sub(X_AXIS_ROWS).max(1) as usize;
    let mut lines = vec![Line::from(""); plot_rows];
    let positions = [plot_rows - 1, (plot_rows - 1) / 2, 0];
    for (label, &row) in labels.iter().zip(positions.iter()) {
        lines[row] = Line::from(Span::styled(
            format!(" {}", label),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Paragraph::new(lines)
}
