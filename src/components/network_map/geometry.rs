//! Vector math and edge outlines.
//!
//! Every edge is drawn as a filled band rather than a stroked line, so a
//! directed edge, its arrowhead and an optional midpoint gizmo share one
//! closed outline. Outlines are plain point lists; [`EdgePath::to_svg`]
//! turns them into SVG path data that a canvas `Path2d` can fill.

use std::f64::consts::PI;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Lengths below this are treated as zero.
pub const EPSILON: f64 = 1e-6;

/// Arrowhead length as a multiple of the band half-width.
const HEAD_LENGTH_RATIO: f64 = 6.0;
/// Arrowhead half-width as a multiple of the band half-width.
const HEAD_WIDTH_RATIO: f64 = 3.0;
/// Segments used to approximate the circular gizmo arc on each side.
const ARC_SEGMENTS: usize = 8;

/// A point or offset in screen or world space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
	/// Grows to the right.
	pub x: f64,
	/// Grows downward on the canvas.
	pub y: f64,
}

impl Vec2 {
	/// The origin.
	pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

	/// Point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Squared length, cheaper than [`Vec2::length`].
	pub fn length_sq(self) -> f64 {
		self.x * self.x + self.y * self.y
	}

	/// Euclidean length.
	pub fn length(self) -> f64 {
		self.length_sq().sqrt()
	}

	/// Euclidean distance to `other`.
	pub fn distance(self, other: Self) -> f64 {
		(self - other).length()
	}

	/// Scalar product.
	pub fn dot(self, other: Self) -> f64 {
		self.x * other.x + self.y * other.y
	}

	/// Unit vector in the same direction, or `None` for a zero vector.
	pub fn normalized(self) -> Option<Self> {
		let length = self.length();
		if length <= EPSILON || !length.is_finite() {
			return None;
		}
		Some(self * (1.0 / length))
	}

	/// Counter-clockwise perpendicular (in a y-up frame).
	pub fn perp(self) -> Self {
		Self::new(-self.y, self.x)
	}

	/// Linear interpolation, `t = 0` gives `self`.
	pub fn lerp(self, other: Self, t: f64) -> Self {
		self + (other - self) * t
	}

	/// Neither coordinate is NaN or infinite.
	pub fn is_finite(self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}
}

impl Add for Vec2 {
	type Output = Self;
	fn add(self, rhs: Self) -> Self {
		Self::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl AddAssign for Vec2 {
	fn add_assign(&mut self, rhs: Self) {
		self.x += rhs.x;
		self.y += rhs.y;
	}
}

impl Sub for Vec2 {
	type Output = Self;
	fn sub(self, rhs: Self) -> Self {
		Self::new(self.x - rhs.x, self.y - rhs.y)
	}
}

impl SubAssign for Vec2 {
	fn sub_assign(&mut self, rhs: Self) {
		self.x -= rhs.x;
		self.y -= rhs.y;
	}
}

impl Mul<f64> for Vec2 {
	type Output = Self;
	fn mul(self, rhs: f64) -> Self {
		Self::new(self.x * rhs, self.y * rhs)
	}
}

impl Neg for Vec2 {
	type Output = Self;
	fn neg(self) -> Self {
		Self::new(-self.x, -self.y)
	}
}

/// Shape drawn around the midpoint of a bundled edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Gizmo {
	/// Plain band.
	#[default]
	None,
	/// Round bulge following a circle around the midpoint.
	Circle,
	/// Pointed bulge with its vertices on that circle.
	Diamond,
}

impl Gizmo {
	/// Gizmo for the `slot`-th edge of a bundle.
	pub fn for_slot(slot: usize) -> Self {
		match slot % 3 {
			0 => Self::None,
			1 => Self::Circle,
			_ => Self::Diamond,
		}
	}
}

impl FromStr for Gizmo {
	type Err = GeometryError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"" | "none" => Ok(Self::None),
			"circle" => Ok(Self::Circle),
			"diamond" => Ok(Self::Diamond),
			other => Err(GeometryError::UnknownGizmo(other.to_owned())),
		}
	}
}

/// Geometry precondition violations.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryError {
	/// A gizmo name outside `none | circle | diamond`.
	UnknownGizmo(String),
	/// Both endpoints coincide, so the edge has no direction.
	DegenerateEdge,
	/// A directed edge too short to fit its arrowhead outside the node glyph.
	EdgeTooShort {
		/// Distance between the endpoints.
		length: f64,
		/// Node radius plus arrowhead length.
		required: f64,
	},
}

impl fmt::Display for GeometryError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::UnknownGizmo(name) => write!(f, "unknown gizmo shape: {name:?}"),
			Self::DegenerateEdge => write!(f, "edge endpoints coincide"),
			Self::EdgeTooShort { length, required } => {
				write!(f, "edge of length {length:.2} is shorter than {required:.2}")
			}
		}
	}
}

impl std::error::Error for GeometryError {}

/// Parameters of one edge outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeShape {
	/// Half of the band thickness.
	pub half_width: f64,
	/// Radius of the target node glyph; the arrow tip stops this far short.
	pub node_radius: f64,
	/// Ends in an arrowhead.
	pub directed: bool,
	/// Bulge drawn around the midpoint.
	pub gizmo: Gizmo,
	/// Radius of the circle the gizmo bulge passes through.
	pub gizmo_radius: f64,
	/// Sideways shift of the whole edge, used to separate bundled edges.
	pub lane_offset: f64,
}

impl Default for EdgeShape {
	fn default() -> Self {
		Self {
			half_width: 1.5,
			node_radius: 0.0,
			directed: false,
			gizmo: Gizmo::None,
			gizmo_radius: 6.0,
			lane_offset: 0.0,
		}
	}
}

impl EdgeShape {
	/// Arrowhead length along the edge.
	pub fn head_length(&self) -> f64 {
		self.half_width * HEAD_LENGTH_RATIO
	}

	/// Arrowhead half-width across the edge.
	pub fn head_half_width(&self) -> f64 {
		self.half_width * HEAD_WIDTH_RATIO
	}
}

/// Closed outline of an edge band.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgePath {
	/// Polygon vertices; the outline closes back to the first one.
	pub points: Vec<Vec2>,
	/// Arrow tip, present for directed edges.
	pub tip: Option<Vec2>,
}

impl EdgePath {
	/// SVG path data: `M x y L x y ... Z`.
	pub fn to_svg(&self) -> String {
		let mut out = String::with_capacity(self.points.len() * 16);
		for (i, point) in self.points.iter().enumerate() {
			if i > 0 {
				out.push(' ');
			}
			out.push(if i == 0 { 'M' } else { 'L' });
			out.push_str(&format!("{:.2} {:.2}", point.x, point.y));
		}
		if !out.is_empty() {
			out.push_str(" Z");
		}
		out
	}

	/// Even-odd point-in-polygon test.
	pub fn contains(&self, point: Vec2) -> bool {
		let mut inside = false;
		let count = self.points.len();
		for i in 0..count {
			let a = self.points[i];
			let b = self.points[(i + count - 1) % count];
			if (a.y > point.y) != (b.y > point.y) {
				let cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
				if point.x < cross {
					inside = !inside;
				}
			}
		}
		inside
	}
}

/// Builds the outline of the edge `from -> to`.
pub fn arrow_path(from: Vec2, to: Vec2, shape: &EdgeShape) -> Result<EdgePath, GeometryError> {
	let forward = (to - from).normalized().ok_or(GeometryError::DegenerateEdge)?;
	let side = forward.perp();
	let length = from.distance(to);

	let shift = side * shape.lane_offset;
	let (start, end) = (from + shift, to + shift);
	let w = shape.half_width.max(0.0);

	let (band_end, tip) = if shape.directed {
		let required = shape.node_radius + shape.head_length();
		if length <= required + EPSILON {
			return Err(GeometryError::EdgeTooShort { length, required });
		}
		let tip = end - forward * shape.node_radius;
		(tip - forward * shape.head_length(), Some(tip))
	} else {
		(end, None)
	};

	// Along-axis positions of the gizmo boundary, measured from `start`.
	let midpoint = length / 2.0;
	let gizmo = match shape.gizmo {
		Gizmo::None => None,
		_ if shape.gizmo_radius <= w => None,
		gizmo => {
			let reach = (shape.gizmo_radius * shape.gizmo_radius - w * w).sqrt();
			let band_len = (band_end - start).dot(forward);
			(midpoint + reach < band_len).then_some((gizmo, reach))
		}
	};

	let at = |along: f64, across: f64| start + forward * along + side * across;
	let band_len = (band_end - start).dot(forward);

	let mut points = Vec::with_capacity(16 + ARC_SEGMENTS * 2);
	// Left side, start to end.
	points.push(at(0.0, w));
	if let Some((gizmo, reach)) = gizmo {
		push_bulge(&mut points, &at, gizmo, midpoint, reach, w, shape.gizmo_radius, 1.0);
	}
	points.push(at(band_len, w));
	if let Some(tip) = tip {
		let head = shape.head_half_width();
		points.push(at(band_len, head));
		points.push(tip);
		points.push(at(band_len, -head));
	}
	// Right side, end back to start.
	points.push(at(band_len, -w));
	if let Some((gizmo, reach)) = gizmo {
		push_bulge(&mut points, &at, gizmo, midpoint, reach, w, shape.gizmo_radius, -1.0);
	}
	points.push(at(0.0, -w));

	Ok(EdgePath { points, tip })
}

/// Appends the bulge on one side (`sign` 1 = left, -1 = right). The left
/// side runs with the edge direction, the right side against it.
#[allow(clippy::too_many_arguments)]
fn push_bulge(
	points: &mut Vec<Vec2>,
	at: &impl Fn(f64, f64) -> Vec2,
	gizmo: Gizmo,
	midpoint: f64,
	reach: f64,
	half_width: f64,
	radius: f64,
	sign: f64,
) {
	let (enter, leave) = if sign > 0.0 {
		(midpoint - reach, midpoint + reach)
	} else {
		(midpoint + reach, midpoint - reach)
	};
	points.push(at(enter, sign * half_width));
	match gizmo {
		Gizmo::Circle => {
			// Angles measured from the forward axis toward this side.
			let start_angle = (half_width / radius).asin();
			let (from, to) = if sign > 0.0 {
				(PI - start_angle, start_angle)
			} else {
				(start_angle, PI - start_angle)
			};
			for step in 1..ARC_SEGMENTS {
				let t = step as f64 / ARC_SEGMENTS as f64;
				let angle = from + (to - from) * t;
				points.push(at(midpoint + radius * angle.cos(), sign * radius * angle.sin()));
			}
		}
		Gizmo::Diamond => points.push(at(midpoint, sign * radius)),
		Gizmo::None => {}
	}
	points.push(at(leave, sign * half_width));
}

#[cfg(test)]
mod tests {
	use super::*;

	fn shape() -> EdgeShape {
		EdgeShape {
			half_width: 1.5,
			node_radius: 21.0,
			directed: false,
			gizmo: Gizmo::None,
			gizmo_radius: 6.0,
			lane_offset: 0.0,
		}
	}

	#[test]
	fn coincident_endpoints_are_degenerate() {
		let p = Vec2::new(3.0, 4.0);
		assert_eq!(arrow_path(p, p, &shape()), Err(GeometryError::DegenerateEdge));
	}

	#[test]
	fn undirected_band_is_a_rectangle() {
		let path = arrow_path(Vec2::ZERO, Vec2::new(100.0, 0.0), &shape()).unwrap();
		assert_eq!(path.points.len(), 4);
		assert!(path.tip.is_none());
		assert!(path.contains(Vec2::new(50.0, 0.0)));
		assert!(!path.contains(Vec2::new(50.0, 2.0)));
	}

	#[test]
	fn directed_tip_stops_at_node_radius() {
		let shape = EdgeShape {
			directed: true,
			..shape()
		};
		let to = Vec2::new(0.0, 200.0);
		let path = arrow_path(Vec2::ZERO, to, &shape).unwrap();
		let tip = path.tip.unwrap();
		assert!((tip.distance(to) - 21.0).abs() < 1e-9);
		assert!(tip.y < to.y);
	}

	#[test]
	fn short_directed_edge_is_rejected() {
		let shape = EdgeShape {
			directed: true,
			..shape()
		};
		let result = arrow_path(Vec2::ZERO, Vec2::new(25.0, 0.0), &shape);
		assert!(matches!(result, Err(GeometryError::EdgeTooShort { .. })));
	}

	#[test]
	fn circle_gizmo_passes_through_its_radius() {
		let shape = EdgeShape {
			gizmo: Gizmo::Circle,
			..shape()
		};
		let path = arrow_path(Vec2::ZERO, Vec2::new(100.0, 0.0), &shape).unwrap();
		let mid = Vec2::new(50.0, 0.0);
		let bulge: Vec<_> = path
			.points
			.iter()
			.filter(|p| p.y.abs() > 1.5 + EPSILON)
			.collect();
		assert!(!bulge.is_empty());
		for point in bulge {
			assert!((point.distance(mid) - 6.0).abs() < 1e-9);
		}
		// The band joins the circle exactly on it.
		let reach = (36.0_f64 - 1.5 * 1.5).sqrt();
		assert!(path.points.contains(&Vec2::new(50.0 - reach, 1.5)));
	}

	#[test]
	fn diamond_gizmo_has_vertices_on_both_sides() {
		let shape = EdgeShape {
			gizmo: Gizmo::Diamond,
			..shape()
		};
		let path = arrow_path(Vec2::ZERO, Vec2::new(100.0, 0.0), &shape).unwrap();
		assert!(path.points.contains(&Vec2::new(50.0, 6.0)));
		assert!(path.points.contains(&Vec2::new(50.0, -6.0)));
	}

	#[test]
	fn gizmo_not_larger_than_band_is_skipped() {
		let shape = EdgeShape {
			gizmo: Gizmo::Circle,
			gizmo_radius: 1.0,
			..shape()
		};
		let path = arrow_path(Vec2::ZERO, Vec2::new(100.0, 0.0), &shape).unwrap();
		assert_eq!(path.points.len(), 4);
	}

	#[test]
	fn lane_offset_separates_parallel_edges() {
		let a = arrow_path(Vec2::ZERO, Vec2::new(100.0, 0.0), &shape()).unwrap();
		let b = arrow_path(
			Vec2::ZERO,
			Vec2::new(100.0, 0.0),
			&EdgeShape {
				lane_offset: 5.0,
				..shape()
			},
		)
		.unwrap();
		assert!(!b.contains(Vec2::new(50.0, 0.0)));
		assert!(a.points.iter().all(|p| !b.contains(*p)));
	}

	#[test]
	fn unknown_gizmo_name_is_an_error() {
		assert_eq!("circle".parse::<Gizmo>(), Ok(Gizmo::Circle));
		assert_eq!(
			"hexagon".parse::<Gizmo>(),
			Err(GeometryError::UnknownGizmo("hexagon".into()))
		);
	}

	#[test]
	fn svg_output_is_closed() {
		let path = arrow_path(Vec2::ZERO, Vec2::new(10.0, 0.0), &shape()).unwrap();
		let svg = path.to_svg();
		assert!(svg.starts_with("M0.00 1.50"));
		assert!(svg.ends_with(" Z"));
	}
}
