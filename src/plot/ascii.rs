//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid on log–log axes, deterministic so the output can
//! be pinned by golden tests.
//!
//! Plot elements, lowest priority first:
//! - power-law tail fit: `-` line
//! - Gaussian overlay (scaled to the spectrum integral): `~` line
//! - mean pT: `|` column, drawn only into empty cells
//! - spectrum bins: one marker per class (`o`, `x`, `+`, ...)
//!
//! When any tail fit is drawn, the legend closes with the fit window.

use crate::domain::{ClassAnalysis, PtRange, ResultFile};
use crate::histogram::HistogramView;
use crate::models::sample_power_law;
use crate::report::{fit_legend, fit_range_line, gaussian_legend, mean_legend};

const MARKERS: [char; 6] = ['o', 'x', '+', '*', '#', '@'];

struct Layer {
    marker: char,
    points: Vec<(f64, f64)>,
    fit_curve: Vec<(f64, f64)>,
    gauss_curve: Vec<(f64, f64)>,
    mean: Option<f64>,
}

/// Log-space plot frame.
struct Frame {
    lx_min: f64,
    lx_max: f64,
    ly_min: f64,
    ly_max: f64,
    width: usize,
    height: usize,
}

impl Frame {
    fn col(&self, x: f64) -> usize {
        map_x(x.ln(), self.lx_min, self.lx_max, self.width)
    }

    fn row(&self, y: f64) -> usize {
        map_y(y.ln(), self.ly_min, self.ly_max, self.height)
    }
}

/// Render all classes of a run on one canvas.
pub fn render_spectrum_plot(classes: &[ClassAnalysis], fit_range: PtRange, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let layers: Vec<Layer> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| build_layer(c, fit_range, MARKERS[i % MARKERS.len()], width))
        .collect();

    let Some(((lx_min, lx_max), (ly_min, ly_max))) = log_bounds(&layers) else {
        return "Plot: nothing positive to show on log axes\n".to_string();
    };
    let (lx_min, lx_max) = pad_range(lx_min, lx_max, 0.05);
    let (ly_min, ly_max) = pad_range(ly_min, ly_max, 0.05);
    let frame = Frame {
        lx_min,
        lx_max,
        ly_min,
        ly_max,
        width,
        height,
    };

    let mut grid = vec![vec![' '; width]; height];

    for layer in &layers {
        draw_curve(&mut grid, &layer.fit_curve, &frame, '-');
        draw_curve(&mut grid, &layer.gauss_curve, &frame, '~');
    }
    for layer in &layers {
        if let Some(m) = layer.mean {
            let x = frame.col(m);
            for row in grid.iter_mut() {
                if row[x] == ' ' {
                    row[x] = '|';
                }
            }
        }
    }
    for layer in &layers {
        for &(x, y) in &layer.points {
            grid[frame.row(y)][frame.col(x)] = layer.marker;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: pT=[{:.3}, {:.3}] GeV/c | y=[{:.3e}, {:.3e}] (log-log)\n",
        lx_min.exp(),
        lx_max.exp(),
        ly_min.exp(),
        ly_max.exp()
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    for (layer, c) in layers.iter().zip(classes) {
        out.push_str(&legend_lines(layer.marker, c));
    }
    if layers.iter().any(|l| !l.fit_curve.is_empty()) {
        out.push_str(&format!("- {}\n", fit_range_line(fit_range)));
    }

    out
}

/// Render a previously exported result file.
pub fn render_result_file(file: &ResultFile, width: usize, height: usize) -> String {
    render_spectrum_plot(&file.classes, file.fit_range, width, height)
}

fn build_layer(c: &ClassAnalysis, fit_range: PtRange, marker: char, n: usize) -> Layer {
    let points = c
        .spectrum
        .bins()
        .map(|b| (b.center, b.content))
        .filter(|&(x, y)| is_plottable(x, y))
        .collect();

    let fit_curve = c
        .tail_fit
        .as_ref()
        .map(|fit| sample_power_law(&fit.params(), fit_range.low, fit_range.high, n))
        .unwrap_or_default()
        .into_iter()
        .filter(|&(x, y)| is_plottable(x, y))
        .collect();

    // Scale the unit-area density to the spectrum's integral so it overlays.
    let gauss_curve = match (&c.gaussian, c.spectrum.center_range()) {
        (Some(g), Some((lo, hi))) if hi > lo => {
            let area: f64 = c.spectrum.bins().map(|b| b.content * b.width).sum();
            g.sample(lo, hi, n)
                .into_iter()
                .map(|(x, y)| (x, area * y))
                .filter(|&(x, y)| is_plottable(x, y))
                .collect()
        }
        _ => Vec::new(),
    };

    Layer {
        marker,
        points,
        fit_curve,
        gauss_curve,
        mean: c.mean.map(|m| m.value).filter(|v| v.is_finite() && *v > 0.0),
    }
}

fn legend_lines(marker: char, c: &ClassAnalysis) -> String {
    let mut out = String::new();
    match &c.mean {
        Some(m) => out.push_str(&format!("{marker} {}\n", mean_legend(c.multiplicity, m))),
        None => out.push_str(&format!("{marker} N_ch = {}\n", c.multiplicity)),
    }
    if let Some(fit) = &c.tail_fit {
        out.push_str(&format!("  - {}\n", fit_legend(c.multiplicity, fit)));
    }
    if let Some(g) = &c.gaussian {
        out.push_str(&format!("  ~ {}\n", gaussian_legend(c.multiplicity, g)));
    }
    out
}

fn is_plottable(x: f64, y: f64) -> bool {
    x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0
}

fn log_bounds(layers: &[Layer]) -> Option<((f64, f64), (f64, f64))> {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for layer in layers {
        let all = layer
            .points
            .iter()
            .chain(&layer.fit_curve)
            .chain(&layer.gauss_curve);
        for &(x, y) in all {
            let (lx, ly) = (x.ln(), y.ln());
            x_min = x_min.min(lx);
            x_max = x_max.max(lx);
            y_min = y_min.min(ly);
            y_max = y_max.max(ly);
        }
    }

    if !(x_min.is_finite() && x_max.is_finite() && y_min.is_finite() && y_max.is_finite()) {
        return None;
    }
    // A single point still gets a frame.
    if x_max <= x_min {
        x_min -= 0.5;
        x_max += 0.5;
    }
    if y_max <= y_min {
        y_min -= 0.5;
        y_max += 0.5;
    }
    Some(((x_min, x_max), (y_min, y_max)))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], frame: &Frame, ch: char) {
    if curve.len() < 2 {
        return;
    }

    let mut prev = None;
    for &(x, y) in curve {
        let col = frame.col(x);
        let row = frame.row(y);
        match prev {
            Some((c0, r0)) => draw_line(grid, c0, r0, col, row, ch),
            None => {
                if grid[row][col] == ' ' {
                    grid[row][col] = ch;
                }
            }
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham). Only fills empty cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
