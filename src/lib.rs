use csv::ReaderBuilder;
use plotters::prelude::*;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
pub mod error;
pub mod plot;

pub use error::{PlotError, Result};

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// VM count added by each data row, the first row is 4 VMs, then 8, 12, ...
pub const VM_STEP: f64 = 4.;
pub const X_DESC: &str = "VM number";
pub const CHART_EXTENSION: &str = "png";
pub const CHART_INCHES: u32 = 4;
pub const CHART_DPI: u32 = 96;

/// Settings for the metric plotter
#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    /// x increment per data row, expected positive
    pub vm_step: f64,
    /// render the columns on the rayon pool
    pub parallel: bool,
}

impl Default for PlotOptions {
    fn default() -> Self {
        PlotOptions {
            vm_step: VM_STEP,
            parallel: false,
        }
    }
}

/// The benchmark results as read from csv,
/// row 0 holds the metric names and the following rows the measurements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub records: Vec<Vec<String>>,
}

impl Table {
    pub fn new(records: Vec<Vec<String>>) -> Table {
        Table { records }
    }

    /// Init a Table from csv, keeping every field as text.
    /// Quoting is strict: a bare quote inside an unquoted field, text after a
    /// closing quote, or a quote left open at the end of the file is an error.
    /// The file is not checked for equal field counts or for data rows,
    /// these are checked when the series are extracted.
    pub fn from_csv<P: AsRef<Path>>(fin: P) -> Result<Table> {
        let fin = fin.as_ref();
        let mut data = Vec::new();
        File::open(fin)
            .and_then(|mut file| file.read_to_end(&mut data))
            .map_err(|source| PlotError::Io {
                path: fin.to_path_buf(),
                source,
            })?;
        check_quoting(&data).map_err(|(line, reason)| PlotError::Parse {
            path: fin.to_path_buf(),
            line,
            reason: reason.to_string(),
        })?;
        let records =
            read_records(&data[..]).map_err(|e| PlotError::from_csv(fin.to_path_buf(), e))?;
        debug!("read {} rows from {}", records.len(), fin.display());
        Ok(Table { records })
    }

    /// metric names, empty if the table has no rows at all
    pub fn headers(&self) -> &[String] {
        match self.records.first() {
            Some(h) => &h[..],
            None => &[],
        }
    }

    pub fn n_data_rows(&self) -> usize {
        self.records.len().saturating_sub(1)
    }

    /// Builds the series of one column,
    /// x is the synthetic VM number `vm_step * row` and y the parsed cell.
    /// A `column` past the header fails with `ColumnOutOfRange`.
    pub fn metric_series(&self, column: usize, vm_step: f64) -> Result<MetricSeries> {
        let headers = self.headers();
        let metric = match headers.get(column) {
            Some(m) => m.clone(),
            None => {
                return Err(PlotError::ColumnOutOfRange {
                    column,
                    columns: headers.len(),
                })
            }
        };
        let mut points: Vec<(f64, f64)> = Vec::with_capacity(self.n_data_rows());
        for (row, fields) in self.records.iter().enumerate().skip(1) {
            if fields.len() != headers.len() {
                return Err(PlotError::RaggedRow {
                    row,
                    expected: headers.len(),
                    found: fields.len(),
                });
            }
            let raw = &fields[column];
            let y: f64 = raw.parse().map_err(|_| PlotError::ValueParse {
                row,
                column,
                metric: metric.clone(),
                raw: raw.clone(),
            })?;
            points.push((vm_step * row as f64, y));
        }
        debug!("built series {} with {} points", metric, points.len());
        Ok(MetricSeries { metric, points })
    }
}

fn read_records<R: Read>(rdr: R) -> csv::Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(rdr);
    reader
        .records()
        .map(|r| r.map(|record| record.iter().map(String::from).collect()))
        .collect()
}

/// The csv reader glues text after a closing quote onto the field and lets
/// an open quote swallow the rest of the file, reject both up front.
/// Returns the 1-based line and the reason of the first quoting error.
fn check_quoting(data: &[u8]) -> std::result::Result<(), (u64, &'static str)> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        FieldStart,
        Unquoted,
        Quoted,
        QuoteInQuoted,
    }
    let mut state = State::FieldStart;
    let mut line: u64 = 1;
    let mut quote_line: u64 = 1;
    for (i, &b) in data.iter().enumerate() {
        state = match (state, b) {
            (State::FieldStart, b'"') => {
                quote_line = line;
                State::Quoted
            }
            (State::FieldStart, b',') | (State::Unquoted, b',') => State::FieldStart,
            (State::FieldStart, b'\n') | (State::Unquoted, b'\n') => State::FieldStart,
            (State::Unquoted, b'"') => return Err((line, "bare \" in non-quoted field")),
            (State::FieldStart, _) | (State::Unquoted, _) => State::Unquoted,
            (State::Quoted, b'"') => State::QuoteInQuoted,
            (State::Quoted, _) => State::Quoted,
            (State::QuoteInQuoted, b'"') => State::Quoted,
            (State::QuoteInQuoted, b',') | (State::QuoteInQuoted, b'\n') => State::FieldStart,
            (State::QuoteInQuoted, b'\r') if data.get(i + 1) == Some(&b'\n') => State::FieldStart,
            (State::QuoteInQuoted, _) => {
                return Err((line, "extraneous or missing \" in quoted field"))
            }
        };
        if b == b'\n' {
            line += 1;
        }
    }
    if state == State::Quoted {
        return Err((quote_line, "quoted field is never closed"));
    }
    Ok(())
}

/// One metric against the VM number, ordered by ascending x
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub metric: String,
    pub points: Vec<(f64, f64)>,
}

impl MetricSeries {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.metric, CHART_EXTENSION)
    }

    /// Renders the series as a line with point markers to a square png,
    /// an existing file is overwritten.
    pub fn plot_png<P: AsRef<Path>>(&self, fout: P) -> Result<()> {
        if let Some(&(x, y)) = self.points.iter().find(|(_, y)| !y.is_finite()) {
            return Err(PlotError::Render {
                metric: self.metric.clone(),
                reason: format!("non-finite value {} at {} {}", y, X_DESC, x),
            });
        }
        self.draw_png(fout.as_ref())
            .map_err(|e| PlotError::Render {
                metric: self.metric.clone(),
                reason: e.to_string(),
            })
    }

    fn draw_png(&self, fout: &Path) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let (xmin, xmax) = min_and_max(self.points.iter().map(|p| p.0)).ok_or("no points to plot")?;
        let (ymin, ymax) = min_and_max(self.points.iter().map(|p| p.1)).ok_or("no points to plot")?;
        let (xmin, xmax) = padded(xmin, xmax, 20.)
            .ok_or_else(|| format!("x axis range {}..{} is too wide to plot", xmin, xmax))?;
        let (ymin, ymax) = padded(ymin, ymax, 10.)
            .ok_or_else(|| format!("y axis range {}..{} is too wide to plot", ymin, ymax))?;
        let side = CHART_INCHES * CHART_DPI;
        let root = BitMapBackend::new(fout, (side, side)).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(xmin..xmax, ymin..ymax)?;
        chart
            .configure_mesh()
            .light_line_style(&TRANSPARENT)
            .bold_line_style(RGBColor(200, 200, 200).stroke_width(1))
            .label_style(("sans-serif", 12))
            .x_desc(X_DESC)
            .y_desc(self.metric.as_str())
            .draw()?;
        chart.draw_series(
            LineSeries::new(self.points.iter().copied(), BLUE.stroke_width(2)).point_size(3),
        )?;
        root.present()?;
        Ok(())
    }
}

/// Plots every column of the table against the VM number,
/// one `<metric>.png` per column in `outdir`.
/// Returns the written paths in column order; the first failure aborts the run.
pub fn plot_metrics<P: AsRef<Path>>(
    table: &Table,
    outdir: P,
    opts: &PlotOptions,
) -> Result<Vec<PathBuf>> {
    let outdir = outdir.as_ref();
    if table.n_data_rows() == 0 {
        return Err(PlotError::EmptyTable {
            rows: table.records.len(),
        });
    }
    if !outdir.is_dir() {
        return Err(PlotError::Io {
            path: outdir.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "output directory does not exist",
            ),
        });
    }
    let duplicates = duplicate_metrics(table.headers());
    for metric in duplicates.iter() {
        warn!("duplicate metric {}, the last column wins", metric);
    }
    let plot_column = |column: usize| -> Result<PathBuf> {
        let series = table.metric_series(column, opts.vm_step)?;
        let fout = outdir.join(series.file_name());
        series.plot_png(&fout)?;
        info!("plotted {} to {}", series.metric, fout.display());
        Ok(fout)
    };
    let columns = 0..table.headers().len();
    if opts.parallel && duplicates.is_empty() {
        columns.into_par_iter().map(plot_column).collect()
    } else {
        columns.map(plot_column).collect()
    }
}

/// metric names appearing more than once, in order of their second occurrence
pub fn duplicate_metrics(headers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for h in headers {
        if !seen.insert(h.as_str()) && !duplicates.contains(h) {
            duplicates.push(h.clone());
        }
    }
    duplicates
}

pub fn min_and_max<T, I>(values: I) -> Option<(T, T)>
where
    T: PartialOrd + Copy,
    I: IntoIterator<Item = T>,
{
    let mut iter = values.into_iter();
    let first = iter.next()?;
    let (mut min, mut max) = (first, first);
    for v in iter {
        if v > max {
            max = v
        }
        if v < min {
            min = v
        }
    }
    Some((min, max))
}

/// Widens [min, max] by span / divisor on each side, a flat range by
/// |value| / divisor but at least 1.
/// None when the padded range or its span does not fit in an f64.
fn padded(min: f64, max: f64, divisor: f64) -> Option<(f64, f64)> {
    let margin = if max > min {
        max / divisor - min / divisor
    } else {
        (max.abs() / divisor).max(1.)
    };
    let (lo, hi) = (min - margin, max + margin);
    if lo.is_finite() && hi.is_finite() && (hi - lo).is_finite() && hi > lo {
        Some((lo, hi))
    } else {
        None
    }
}
