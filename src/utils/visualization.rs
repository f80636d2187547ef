//! Visualization utilities for kinodynamic_rrt
//!
//! Provides a unified interface for plotting planner output using gnuplot.
//! Only the spatial components `(x, y)` of a state are drawn.

use std::f64::consts::PI;

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{Path, State, X, Y};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";

    // Semantic colors
    pub const OBSTACLE: &str = BLACK;
    pub const START: &str = GREEN;
    pub const GOAL: &str = BLUE;
    pub const PATH: &str = RED;
    pub const TREE_A: &str = "#35C788";
    pub const TREE_B: &str = "#DD3355";
}

/// Vertices used to outline a circle
const CIRCLE_VERTICES: usize = 36;

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: colors::PATH.to_string(),
            line_width: 2.0,
            caption: "Path".to_string(),
        }
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }
}

/// Points on the outline of a circle, closed
pub fn circle_outline(cx: f64, cy: f64, radius: f64) -> (Vec<f64>, Vec<f64>) {
    (0..=CIRCLE_VERTICES)
        .map(|k| {
            let theta = 2.0 * PI * k as f64 / CIRCLE_VERTICES as f64;
            (cx + radius * theta.cos(), cy + radius * theta.sin())
        })
        .unzip()
}

/// Main visualizer struct
pub struct Visualizer {
    figure: Figure,
    title: String,
    x_label: String,
    y_label: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            figure: Figure::new(),
            title: String::new(),
            x_label: "x".to_string(),
            y_label: "y".to_string(),
            x_range: None,
            y_range: None,
            aspect_ratio: Some(1.0),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.x_range = Some((min, max));
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    /// Fit both axes to the spatial part of state-space bounds.
    pub fn set_bounds(&mut self, min: &State, max: &State) -> &mut Self {
        self.set_x_range(min[X], max[X]).set_y_range(min[Y], max[Y])
    }

    /// Plot the spatial trace of a path
    pub fn plot_path(&mut self, path: &Path, style: &PathStyle) -> &mut Self {
        self.plot_path_xy(&path.x_coords(), &path.y_coords(), style)
    }

    pub fn plot_path_xy(&mut self, x: &[f64], y: &[f64], style: &PathStyle) -> &mut Self {
        self.figure.axes2d().lines(
            x,
            y,
            &[
                Caption(&style.caption),
                Color(&style.color),
                LineWidth(style.line_width),
            ],
        );
        self
    }

    /// Plot each `(from, to)` pair as a separate straight segment.
    ///
    /// Only the first segment carries the caption so the legend has one entry.
    pub fn plot_segments(&mut self, segments: &[(State, State)], style: &PathStyle) -> &mut Self {
        let axes = self.figure.axes2d();
        for (k, (from, to)) in segments.iter().enumerate() {
            let caption = if k == 0 { style.caption.as_str() } else { "" };
            axes.lines(
                &[from[X], to[X]],
                &[from[Y], to[Y]],
                &[Caption(caption), Color(&style.color), LineWidth(style.line_width)],
            );
        }
        self
    }

    /// Plot round obstacles given as `(x, y, radius)`
    pub fn plot_circles(&mut self, obstacle_list: &[(f64, f64, f64)]) -> &mut Self {
        let axes = self.figure.axes2d();
        for (k, &(ox, oy, size)) in obstacle_list.iter().enumerate() {
            let (x, y) = circle_outline(ox, oy, size);
            let caption = if k == 0 { "Obstacles" } else { "" };
            axes.lines(&x, &y, &[Caption(caption), Color(colors::OBSTACLE), LineWidth(1.5)]);
        }
        self
    }

    /// Plot the spatial position of a single state
    pub fn plot_state(&mut self, state: &State, style: &PointStyle) -> &mut Self {
        self.figure.axes2d().points(
            &[state[X]],
            &[state[Y]],
            &[
                Caption(&style.caption),
                Color(&style.color),
                PointSymbol(style.symbol),
                PointSize(style.size),
            ],
        );
        self
    }

    pub fn save_svg(&mut self, path: &str) -> Result<(), String> {
        self.apply_settings();
        self.figure.save_to_svg(path, 800, 600).map_err(|e| e.to_string())
    }

    fn apply_settings(&mut self) {
        let axes = self.figure.axes2d();

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);

        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visualizer_bounds() {
        let mut vis = Visualizer::new();
        vis.set_bounds(&State::new(0.0, -2.0, 1.0, -2.0), &State::new(10.0, 2.0, 8.0, 2.0));
        assert_eq!(vis.x_range, Some((0.0, 10.0)));
        assert_eq!(vis.y_range, Some((1.0, 8.0)));
        assert!(vis.aspect_ratio.is_some());
    }

    #[test]
    fn test_path_style() {
        let style = PathStyle::new(colors::TREE_A, "Tree").with_line_width(0.5);
        assert_eq!(style.line_width, 0.5);
        assert_eq!(style.color, colors::TREE_A);
        assert_eq!(PathStyle::default().color, colors::PATH);
    }

    #[test]
    fn test_circle_outline_is_closed() {
        let (x, y) = circle_outline(1.0, 2.0, 0.5);
        assert_eq!(x.len(), CIRCLE_VERTICES + 1);
        assert!((x[0] - x[CIRCLE_VERTICES]).abs() < 1e-12);
        assert!((y[0] - y[CIRCLE_VERTICES]).abs() < 1e-12);
        for (px, py) in x.iter().zip(y.iter()) {
            assert!((((px - 1.0).powi(2) + (py - 2.0).powi(2)).sqrt() - 0.5).abs() < 1e-12);
        }
    }
}
