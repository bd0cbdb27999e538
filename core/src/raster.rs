//! Raster bridge: off-screen plot canvases and their pixel buffers.
//!
//! A `PlotCanvas` keeps plot state (axes limits, line and scatter series)
//! independent of any window. `RasterBridge` owns one canvas plus a pixel
//! buffer of exactly `width * height * 4` bytes, allocated once. Each call
//! to `update_image()` re-rasterizes the canvas into that same buffer.
//!
//! The buffer is written top-down, so the compositor blits it with the
//! negative row stride returned by `stride()`.

use crate::{
    error::{SimError, SimResult},
    frame::BYTES_PER_PIXEL,
    types::{Rgba, BLACK, WHITE},
};
use image::{ImageBuffer, Rgba as Px};

/// Reference resolution at which margins and marker sizes are specified.
pub const BASE_DPI: u32 = 80;

/// Colour cycle for series that do not pick their own colour.
pub const PALETTE: [Rgba; 6] = [
    [31, 119, 180, 255],
    [255, 127, 14, 255],
    [44, 160, 44, 255],
    [214, 39, 40, 255],
    [148, 103, 189, 255],
    [140, 86, 75, 255],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesId(usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesStyle {
    Line,
    /// Line drawn with every other segment left out.
    Dotted,
    Scatter { radius: u32 },
}

#[derive(Debug, Clone)]
pub struct Series {
    pub style: SeriesStyle,
    pub color: Rgba,
    pub xs:    Vec<f64>,
    pub ys:    Vec<f64>,
}

impl Series {
    fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self
            .xs
            .iter()
            .zip(&self.ys)
            .filter(|(x, y)| x.is_finite() && y.is_finite());
        let (&x, &y) = points.next()?;
        let init = (x, x, y, y);
        Some(points.fold(init, |(x0, x1, y0, y1), (&x, &y)| {
            (x0.min(x), x1.max(x), y0.min(y), y1.max(y))
        }))
    }
}

/// One set of axes filling the canvas minus its margins.
#[derive(Debug, Clone)]
pub struct Axes {
    xlim:   (f64, f64),
    ylim:   (f64, f64),
    series: Vec<Series>,
    ticks:  u32,
}

impl Default for Axes {
    fn default() -> Self {
        Self { xlim: (0.0, 1.0), ylim: (0.0, 1.0), series: Vec::new(), ticks: 5 }
    }
}

impl Axes {
    pub fn xlim(&self) -> (f64, f64) { self.xlim }
    pub fn ylim(&self) -> (f64, f64) { self.ylim }

    pub fn set_xlim(&mut self, min: f64, max: f64) {
        self.xlim = (min, max);
    }

    pub fn set_ylim(&mut self, min: f64, max: f64) {
        self.ylim = (min, max);
    }

    fn next_color(&self) -> Rgba {
        PALETTE[self.series.len() % PALETTE.len()]
    }

    fn add(&mut self, style: SeriesStyle, color: Option<Rgba>, xs: Vec<f64>, ys: Vec<f64>) -> SeriesId {
        let color = color.unwrap_or_else(|| self.next_color());
        self.series.push(Series { style, color, xs, ys });
        SeriesId(self.series.len() - 1)
    }

    pub fn plot(&mut self, xs: Vec<f64>, ys: Vec<f64>, color: Option<Rgba>) -> SeriesId {
        self.add(SeriesStyle::Line, color, xs, ys)
    }

    pub fn plot_dotted(&mut self, xs: Vec<f64>, ys: Vec<f64>, color: Option<Rgba>) -> SeriesId {
        self.add(SeriesStyle::Dotted, color, xs, ys)
    }

    pub fn scatter(&mut self, xs: Vec<f64>, ys: Vec<f64>, color: Option<Rgba>, radius: u32) -> SeriesId {
        self.add(SeriesStyle::Scatter { radius }, color, xs, ys)
    }

    pub fn series(&self, id: SeriesId) -> Option<&Series> {
        self.series.get(id.0)
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Replace the data of an existing series.
    pub fn set_data(&mut self, id: SeriesId, xs: &[f64], ys: &[f64]) {
        if let Some(series) = self.series.get_mut(id.0) {
            series.xs.clear();
            series.xs.extend_from_slice(xs);
            series.ys.clear();
            series.ys.extend_from_slice(ys);
        }
    }

    /// Append points to an existing series.
    pub fn extend_data(&mut self, id: SeriesId, xs: &[f64], ys: &[f64]) {
        if let Some(series) = self.series.get_mut(id.0) {
            series.xs.extend_from_slice(xs);
            series.ys.extend_from_slice(ys);
        }
    }

    /// Fit both limits to the data, with a 5% pad on each side.
    /// Leaves the limits alone when there is no finite data.
    pub fn autoscale(&mut self) {
        let Some((x0, x1, y0, y1)) = self
            .series
            .iter()
            .filter_map(Series::bounds)
            .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1), a.2.min(b.2), a.3.max(b.3)))
        else {
            return;
        };
        self.xlim = padded(x0, x1);
        self.ylim = padded(y0, y1);
    }
}

fn padded(min: f64, max: f64) -> (f64, f64) {
    let span = max - min;
    if span <= f64::EPSILON {
        return (min - 0.5, max + 0.5);
    }
    (min - span * 0.05, max + span * 0.05)
}

/// An off-screen plotting surface with a single set of axes.
#[derive(Debug, Clone)]
pub struct PlotCanvas {
    width:      u32,
    height:     u32,
    dpi:        u32,
    background: Rgba,
    frame:      Rgba,
    axes:       Axes,
}

impl PlotCanvas {
    pub fn new(width: u32, height: u32, dpi: u32) -> SimResult<Self> {
        if width == 0 || height == 0 || dpi == 0 {
            return Err(SimError::InvalidCanvas { width, height });
        }
        Ok(Self {
            width,
            height,
            dpi,
            background: WHITE,
            frame: BLACK,
            axes: Axes::default(),
        })
    }

    pub fn width(&self) -> u32  { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn dpi(&self) -> u32    { self.dpi }

    pub fn axes(&self) -> &Axes { &self.axes }
    pub fn axes_mut(&mut self) -> &mut Axes { &mut self.axes }

    fn scaled(&self, base: u32) -> i64 {
        ((base * self.dpi) as f64 / BASE_DPI as f64).round().max(1.0) as i64
    }

    /// Plot area in canvas pixels: (left, top, right, bottom), top-down rows.
    fn plot_area(&self) -> (i64, i64, i64, i64) {
        let margin_x = self.scaled(40).min(self.width as i64 / 4);
        let margin_y = self.scaled(30).min(self.height as i64 / 4);
        (
            margin_x,
            margin_y,
            self.width as i64 - 1 - margin_x / 2,
            self.height as i64 - 1 - margin_y,
        )
    }

    /// Rasterize the current plot state into `buf` (top-down RGBA rows).
    /// `buf` must hold exactly `width * height * 4` bytes.
    pub fn rasterize(&self, buf: &mut [u8]) -> SimResult<()> {
        let mut img: ImageBuffer<Px<u8>, &mut [u8]> =
            ImageBuffer::from_raw(self.width, self.height, buf).ok_or(SimError::InvalidCanvas {
                width:  self.width,
                height: self.height,
            })?;

        for px in img.pixels_mut() {
            *px = Px(self.background);
        }

        let (left, top, right, bottom) = self.plot_area();
        let (x0, x1) = self.axes.xlim;
        let (y0, y1) = self.axes.ylim;
        let sx = if x1 != x0 { (right - left) as f64 / (x1 - x0) } else { 0.0 };
        let sy = if y1 != y0 { (bottom - top) as f64 / (y1 - y0) } else { 0.0 };
        let to_px = |x: f64, y: f64| -> (f64, f64) {
            (left as f64 + (x - x0) * sx, bottom as f64 - (y - y0) * sy)
        };
        let clip = (left, top, right, bottom);

        for series in &self.axes.series {
            let points = series
                .xs
                .iter()
                .zip(&series.ys)
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|(&x, &y)| to_px(x, y));
            match series.style {
                SeriesStyle::Line | SeriesStyle::Dotted => {
                    let dotted = series.style == SeriesStyle::Dotted;
                    let mut previous: Option<(f64, f64)> = None;
                    for p in points {
                        if let Some(q) = previous {
                            draw_line(&mut img, q, p, series.color, clip, dotted);
                        }
                        previous = Some(p);
                    }
                    if let Some((x, y)) = previous {
                        if inside((x, y), clip) {
                            put(&mut img, x.round() as i64, y.round() as i64, series.color, clip);
                        }
                    }
                }
                SeriesStyle::Scatter { radius } => {
                    let r = self.scaled(radius.max(1)) - 1;
                    for (x, y) in points.filter(|&p| inside(p, clip)) {
                        let (cx, cy) = (x.round() as i64, y.round() as i64);
                        for dy in -r..=r {
                            for dx in -r..=r {
                                if dx * dx + dy * dy <= r * r {
                                    put(&mut img, cx + dx, cy + dy, series.color, clip);
                                }
                            }
                        }
                    }
                }
            }
        }

        // Axes frame and ticks go last so data never hides them.
        let whole = (0, 0, self.width as i64 - 1, self.height as i64 - 1);
        let (l, t, r, b) = (left as f64, top as f64, right as f64, bottom as f64);
        draw_line(&mut img, (l, t), (r, t), self.frame, whole, false);
        draw_line(&mut img, (l, b), (r, b), self.frame, whole, false);
        draw_line(&mut img, (l, t), (l, b), self.frame, whole, false);
        draw_line(&mut img, (r, t), (r, b), self.frame, whole, false);
        let tick_len = self.scaled(4) as f64;
        let ticks = self.axes.ticks.max(1) as i64;
        for i in 0..=ticks {
            let tx = (left + (right - left) * i / ticks) as f64;
            let ty = (top + (bottom - top) * i / ticks) as f64;
            draw_line(&mut img, (tx, b), (tx, b + tick_len), self.frame, whole, false);
            draw_line(&mut img, (l - tick_len, ty), (l, ty), self.frame, whole, false);
        }
        Ok(())
    }
}

fn put(
    img: &mut ImageBuffer<Px<u8>, &mut [u8]>,
    x: i64,
    y: i64,
    color: Rgba,
    (left, top, right, bottom): (i64, i64, i64, i64),
) {
    if x < left || x > right || y < top || y > bottom {
        return;
    }
    img.put_pixel(x as u32, y as u32, Px(color));
}

fn inside((x, y): (f64, f64), (left, top, right, bottom): (i64, i64, i64, i64)) -> bool {
    x >= left as f64 - 0.5 && x <= right as f64 + 0.5 && y >= top as f64 - 0.5 && y <= bottom as f64 + 0.5
}

/// Liang-Barsky: the part of segment p-q inside `clip`, if any.
fn clip_segment(
    (x0, y0): (f64, f64),
    (x1, y1): (f64, f64),
    (left, top, right, bottom): (i64, i64, i64, i64),
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (x1 - x0, y1 - y0);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    let edges = [
        (-dx, x0 - left as f64),
        (dx, right as f64 - x0),
        (-dy, y0 - top as f64),
        (dy, bottom as f64 - y0),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some(((x0 + t0 * dx, y0 + t0 * dy), (x0 + t1 * dx, y0 + t1 * dy)))
}

fn draw_line(
    img: &mut ImageBuffer<Px<u8>, &mut [u8]>,
    from: (f64, f64),
    to: (f64, f64),
    color: Rgba,
    clip: (i64, i64, i64, i64),
    dotted: bool,
) {
    let Some((a, b)) = clip_segment(from, to, clip) else { return };
    let (x0, y0) = (a.0.round() as i64, a.1.round() as i64);
    let (x1, y1) = (b.0.round() as i64, b.1.round() as i64);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let (mut x, mut y, mut err) = (x0, y0, dx + dy);
    let mut n = 0u32;
    loop {
        if !dotted || (n / 2) % 2 == 0 {
            put(img, x, y, color, clip);
        }
        n += 1;
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// A plot canvas bound to its own fixed-size pixel buffer.
#[derive(Debug, Clone)]
pub struct RasterBridge {
    canvas: PlotCanvas,
    pixels: Vec<u8>,
    updates: u64,
}

impl RasterBridge {
    /// Allocate the canvas and a pixel buffer of `width * height * 4` bytes.
    pub fn create_canvas(width: u32, height: u32, dpi: u32) -> SimResult<Self> {
        let canvas = PlotCanvas::new(width, height, dpi)?;
        let mut bridge = Self {
            canvas,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
            updates: 0,
        };
        bridge.update_image()?;
        bridge.updates = 0;
        Ok(bridge)
    }

    pub fn canvas(&self) -> &PlotCanvas { &self.canvas }
    pub fn axes_mut(&mut self) -> &mut Axes { self.canvas.axes_mut() }

    pub fn width(&self) -> u32  { self.canvas.width }
    pub fn height(&self) -> u32 { self.canvas.height }

    /// Byte distance between rows as presented bottom-up.
    pub fn stride(&self) -> isize {
        -(self.canvas.width as isize * BYTES_PER_PIXEL as isize)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of re-rasterizations since creation.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Re-rasterize the canvas into the existing buffer.
    pub fn update_image(&mut self) -> SimResult<()> {
        self.canvas.rasterize(&mut self.pixels)?;
        self.updates += 1;
        Ok(())
    }
}
