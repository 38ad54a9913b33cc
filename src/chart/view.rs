use super::series::{Axis, SeriesDescriptor};
use super::window::ChartData;
use crate::error::{Error, Result};
use crate::format::{self, FormatterKind};
use ratatui::style::Color;

/// Line colors, picked by series index and reused past the end
pub const PALETTE: [Color; 10] = [
    Color::Rgb(0xFF, 0x00, 0x00), // red
    Color::Rgb(0x00, 0x00, 0xFF), // blue
    Color::Rgb(0x00, 0xFF, 0x00), // green
    Color::Rgb(0xFF, 0xA5, 0x00), // orange
    Color::Rgb(0x80, 0x00, 0x80), // purple
    Color::Rgb(0xFF, 0x00, 0xFF), // magenta
    Color::Rgb(0x00, 0xFF, 0xFF), // cyan
    Color::Rgb(0xB1, 0x9C, 0xD9), // lavender
    Color::Rgb(0xFF, 0xB3, 0x47), // pastel orange
    Color::Rgb(0x6A, 0x5A, 0xCD), // slate blue
];

/// Columns reserved beside the plot for a value axis
pub const Y_AXIS_SPACE: u16 = 10;

pub const TIME_LABEL: &str = "Time";

pub fn color_for(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}

/// Construction options of the rendering surface
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub title: String,
    /// Pixels; also sizes the visible window
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        ChartOptions {
            title: "CPU/MEM".to_string(),
            width: 800,
            height: 400,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scale {
    Time,
    Value(Axis),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Bottom,
    Left,
    Right,
}

/// Value scale; ticks use the formatter of the first series on the axis
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleConfig {
    pub axis: Axis,
    pub formatter: FormatterKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AxisStyle {
    pub scale: Scale,
    pub side: Side,
    pub space: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SeriesStyle {
    pub index: usize,
    pub label: String,
    pub color: Color,
    pub axis: Axis,
    pub formatter: FormatterKind,
}

impl SeriesStyle {
    pub fn format_value(&self, value: Option<f64>) -> String {
        self.formatter.format_value(value)
    }
}

/// Everything a renderer needs before the first redraw
#[derive(Clone, Debug, PartialEq)]
pub struct ChartConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub scales: Vec<ScaleConfig>,
    /// Time axis first, then one entry per value axis in first-use order
    pub axes: Vec<AxisStyle>,
    pub series: Vec<SeriesStyle>,
}

impl ChartConfig {
    pub fn build(options: &ChartOptions, descriptors: &[SeriesDescriptor]) -> Self {
        let mut scales: Vec<ScaleConfig> = Vec::new();
        let mut axes = vec![AxisStyle {
            scale: Scale::Time,
            side: Side::Bottom,
            space: 0,
        }];
        let mut series = Vec::with_capacity(descriptors.len());

        for d in descriptors {
            if !scales.iter().any(|s| s.axis == d.axis) {
                scales.push(ScaleConfig {
                    axis: d.axis,
                    formatter: d.formatter,
                });
                axes.push(AxisStyle {
                    scale: Scale::Value(d.axis),
                    side: match d.axis {
                        Axis::Left => Side::Left,
                        Axis::Right => Side::Right,
                    },
                    space: Y_AXIS_SPACE,
                });
            }

            series.push(SeriesStyle {
                index: d.index,
                label: d.label.clone(),
                color: color_for(d.index),
                axis: d.axis,
                formatter: d.formatter,
            });
        }

        ChartConfig {
            title: options.title.clone(),
            width: options.width,
            height: options.height,
            scales,
            axes,
            series,
        }
    }

    pub fn scale(&self, axis: Axis) -> Option<&ScaleConfig> {
        self.scales.iter().find(|s| s.axis == axis)
    }

    pub fn has_axis(&self, axis: Axis) -> bool {
        self.scale(axis).is_some()
    }

    pub fn format_ticks(&self, axis: Axis, ticks: &[f64]) -> Vec<String> {
        match self.scale(axis) {
            Some(scale) => scale.formatter.format_ticks(ticks),
            None => ticks.iter().map(|t| format!("{:.0}", t)).collect(),
        }
    }

    pub fn format_time_tick(&self, timestamp_ms: i64) -> String {
        format::format_clock(timestamp_ms)
    }

    pub fn format_time_point(&self, timestamp_ms: Option<i64>) -> String {
        match timestamp_ms {
            Some(t) => format::format_datetime(t),
            None => format::NO_DATA.to_string(),
        }
    }
}

/// Drawing primitive behind a [`ChartView`].
///
/// `set_data` always receives every column; a renderer must not assume it
/// gets deltas.
pub trait ChartRenderer {
    fn configure(&mut self, config: &ChartConfig) -> Result<()>;

    fn set_data(&mut self, data: ChartData) -> Result<()>;

    fn data(&self) -> &ChartData;
}

pub struct ChartView<R> {
    config: ChartConfig,
    renderer: R,
}

impl<R: ChartRenderer> ChartView<R> {
    /// Configure `renderer` and clear it to empty columns.
    ///
    /// On failure the renderer is handed back with the error so the caller
    /// can retry construction on a later tick.
    pub fn construct(
        options: &ChartOptions,
        descriptors: &[SeriesDescriptor],
        mut renderer: R,
    ) -> std::result::Result<Self, (Error, R)> {
        let config = ChartConfig::build(options, descriptors);
        let prepared = renderer
            .configure(&config)
            .and_then(|()| renderer.set_data(ChartData::empty(descriptors.len())));
        match prepared {
            Ok(()) => Ok(ChartView { config, renderer }),
            Err(e) => Err((e, renderer)),
        }
    }

    /// Push the full column set and redraw.
    pub fn update(&mut self, data: ChartData) -> Result<()> {
        self.renderer.set_data(data)
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}
