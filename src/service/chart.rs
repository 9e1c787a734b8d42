use std::error::Error;
use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{PriceSeries, YearMonth},
};

pub const CHART_WIDTH: u32 = 1000;
pub const CHART_HEIGHT: u32 = 1200;
pub const HISTOGRAM_BUCKETS: usize = 20;

const HISTOGRAM_COLOR: RGBColor = RGBColor(0x3C, 0xB0, 0x43);

/**
 * Draws the results chart for a set of price series.
 */
pub trait ChartRenderer: Send + Sync {
    /**
     * Renders the series into an image.
     *
     * # Arguments
     * `series`: One series per postal code, in request order. Empty series are skipped.
     * `unit_label`: Display name of the unit type, used in the title.
     *
     * # Returns
     * The base64 encoded PNG or an `ApplicationError`.
     */
    fn render(&self, series: &[PriceSeries], unit_label: &str) -> Result<String, ApplicationError>;
}

/**
 * Two panel PNG chart: price lines per postal code above a histogram of all prices.
 */
pub struct PlottersChartRenderer {
    width: u32,
    height: u32,
}

impl PlottersChartRenderer {
    pub fn new() -> Self {
        PlottersChartRenderer { width: CHART_WIDTH, height: CHART_HEIGHT }
    }

    fn draw(&self, buffer: &mut [u8], series: &[PriceSeries], unit_label: &str, bounds: (YearMonth, YearMonth), histogram: &Histogram) -> Result<(), Box<dyn Error>> {
        let root = BitMapBackend::with_buffer(buffer, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;
        let (upper, lower) = root.split_vertically(i32::try_from(self.height / 2)?);
        draw_price_lines(&upper, series, unit_label, bounds)?;
        draw_histogram(&lower, histogram)?;
        root.present()?;
        Ok(())
    }
}

impl ChartRenderer for PlottersChartRenderer {
    fn render(&self, series: &[PriceSeries], unit_label: &str) -> Result<String, ApplicationError> {
        let bounds = time_bounds(series).ok_or_else(|| ApplicationError::new(ErrorType::Rendering, "Cannot render a chart without prices".to_string()))?;
        let histogram = Histogram::from_series(series, HISTOGRAM_BUCKETS).ok_or_else(|| ApplicationError::new(ErrorType::Rendering, "Cannot render a histogram without prices".to_string()))?;
        let mut buffer = vec![0_u8; self.width as usize * self.height as usize * 3];
        self.draw(&mut buffer, series, unit_label, bounds, &histogram).map_err(|err| ApplicationError::new(ErrorType::Rendering, format!("Failed to draw chart: {err}")))?;
        let png = encode_png(self.width, self.height, buffer)?;
        tracing::debug!("Rendered {} series into {} byte PNG", series.iter().filter(|price_series| !price_series.is_empty()).count(), png.len());
        Ok(STANDARD.encode(png))
    }
}

fn draw_price_lines(area: &DrawingArea<BitMapBackend<'_>, Shift>, series: &[PriceSeries], unit_label: &str, bounds: (YearMonth, YearMonth)) -> Result<(), Box<dyn Error>> {
    let (x_start, x_end) = axis_range(bounds);
    let (y_min, y_max) = padded_price_range(series);
    let mut chart = ChartBuilder::on(area)
        .caption(format!("House Prices for {unit_label}"), ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(x_start..x_end, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Price")
        .x_labels(12)
        .x_label_formatter(&|ordinal| YearMonth::from_ordinal(*ordinal).to_string())
        .y_label_formatter(&|price| format!("{price:.0}"))
        .draw()?;

    for (index, price_series) in series.iter().enumerate() {
        if price_series.is_empty() {
            continue;
        }
        let color = series_color(index, series.len());
        let points: Vec<(i64, f64)> = price_series.points.iter().map(|point| (point.period.ordinal(), point.price)).collect();
        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
            .label(format!("Zip Code {}", price_series.postal_code))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(points.into_iter().map(|point| Circle::new(point, 4, color.filled())))?;
    }

    chart.configure_series_labels().background_style(WHITE.mix(0.8)).border_style(BLACK).draw()?;
    Ok(())
}

fn draw_histogram(area: &DrawingArea<BitMapBackend<'_>, Shift>, histogram: &Histogram) -> Result<(), Box<dyn Error>> {
    #[allow(clippy::cast_precision_loss)]
    let y_max = histogram.counts.iter().copied().max().unwrap_or(0) as f64 + 1.0;
    let mut chart = ChartBuilder::on(area)
        .caption("Price Distribution", ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(histogram.min..histogram.max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Price")
        .y_desc("Frequency")
        .x_label_formatter(&|price| format!("{price:.0}"))
        .y_label_formatter(&|count| format!("{count:.0}"))
        .draw()?;

    chart.draw_series(histogram.counts.iter().enumerate().filter(|(_, count)| **count > 0).map(|(index, count)| {
        let (low, high) = histogram.bucket_range(index);
        #[allow(clippy::cast_precision_loss)]
        let height = *count as f64;
        Rectangle::new([(low, 0.0), (high, height)], HISTOGRAM_COLOR.filled())
    }))?;
    Ok(())
}

/**
 * Earliest and latest month across all non-empty series.
 */
pub fn time_bounds(series: &[PriceSeries]) -> Option<(YearMonth, YearMonth)> {
    let mut periods = series.iter().flat_map(|price_series| price_series.points.iter().map(|point| point.period));
    let first = periods.next()?;
    Some(periods.fold((first, first), |(min, max), period| (min.min(period), max.max(period))))
}

/**
 * x axis as month ordinals. A single month is widened so the axis is not empty.
 */
fn axis_range(bounds: (YearMonth, YearMonth)) -> (i64, i64) {
    let (start, end) = bounds;
    if end > start { (start.ordinal(), end.ordinal()) } else { (start.ordinal(), start.ordinal() + 1) }
}

fn padded_price_range(series: &[PriceSeries]) -> (f64, f64) {
    let (min, max) = series
        .iter()
        .flat_map(|price_series| price_series.points.iter().map(|point| point.price))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), price| (min.min(price), max.max(price)));
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let padding = ((max - min) * 0.05).max(1.0);
    (min - padding, max + padding)
}

/**
 * Evenly spaced hues, one per requested postal code.
 */
pub fn series_color(index: usize, count: usize) -> RGBColor {
    #[allow(clippy::cast_precision_loss)]
    let hue = index as f64 / count.max(1) as f64;
    let (red, green, blue) = HSLColor(hue, 0.65, 0.45).rgb();
    RGBColor(red, green, blue)
}

/**
 * Equal width buckets over the pooled prices of all series.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /**
     * Buckets every price of every series.
     *
     * # Arguments
     * `series`: Series to pool.
     * `buckets`: Number of buckets.
     *
     * # Returns
     * `None` when there are no prices or no buckets. When all prices are equal the range is one unit wide around that price.
     */
    pub fn from_series(series: &[PriceSeries], buckets: usize) -> Option<Self> {
        let prices: Vec<f64> = series.iter().flat_map(|price_series| price_series.points.iter().map(|point| point.price)).filter(|price| price.is_finite()).collect();
        if prices.is_empty() || buckets == 0 {
            return None;
        }
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (min, max) = if max > min { (min, max) } else { (min - 0.5, min + 0.5) };
        let mut histogram = Histogram { min, max, counts: vec![0; buckets] };
        let width = histogram.bucket_width();
        for price in prices {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = (((price - min) / width) as usize).min(buckets - 1);
            histogram.counts[index] += 1;
        }
        Some(histogram)
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn bucket_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn bucket_range(&self, index: usize) -> (f64, f64) {
        let width = self.bucket_width();
        (self.min + width * index as f64, self.min + width * (index + 1) as f64)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/**
 * Encodes a packed RGB buffer as PNG.
 *
 * # Arguments
 * `width`: Image width in pixels.
 * `height`: Image height in pixels.
 * `buffer`: `width * height * 3` bytes.
 *
 * # Returns
 * The PNG bytes or a rendering error if the buffer does not match the dimensions.
 */
pub fn encode_png(width: u32, height: u32, buffer: Vec<u8>) -> Result<Vec<u8>, ApplicationError> {
    let image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| ApplicationError::new(ErrorType::Rendering, format!("Bitmap buffer does not match {width}x{height}")))?;
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png).map_err(|err| ApplicationError::new(ErrorType::Rendering, format!("Failed to encode PNG: {err}")))?;
    Ok(png.into_inner())
}
