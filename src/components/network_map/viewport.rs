//! Pan/zoom transform of the map and its animated reset.

use super::geometry::Vec2;

/// Smallest zoom level.
pub const MIN_SCALE: f64 = 0.2;
/// Largest zoom level.
pub const MAX_SCALE: f64 = 2.0;
/// Duration of the animated return to identity.
pub const CENTER_DURATION_MS: f64 = 500.0;

/// World -> screen mapping: `screen = world * scale + translate`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
	/// Screen offset of the world origin.
	pub translate: Vec2,
	/// Always inside the viewport's scale extent.
	pub scale: f64,
}

impl Transform {
	/// No pan, no zoom.
	pub const IDENTITY: Self = Self {
		translate: Vec2::ZERO,
		scale: 1.0,
	};

	fn lerp(self, other: Self, t: f64) -> Self {
		Self {
			translate: self.translate.lerp(other.translate, t),
			scale: self.scale + (other.scale - self.scale) * t,
		}
	}
}

impl Default for Transform {
	fn default() -> Self {
		Self::IDENTITY
	}
}

/// A user pan or zoom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
	/// Move by a screen-space offset.
	Pan(Vec2),
	/// Zoom by `factor` keeping the screen point `anchor` fixed.
	Zoom {
		/// Screen point that stays put.
		anchor: Vec2,
		/// Multiplies the current scale.
		factor: f64,
	},
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Transition {
	from: Transform,
	started_ms: f64,
	duration_ms: f64,
}

fn cubic_in_out(t: f64) -> f64 {
	if t < 0.5 {
		4.0 * t * t * t
	} else {
		1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
	}
}

fn scale_readout(scale: f64) -> String {
	format!("Scale: {}%", (scale * 100.0).round())
}

/// Transform, zoom readout and center animation of one map.
#[derive(Clone, Debug)]
pub struct Viewport {
	transform: Transform,
	readout: String,
	extent: (f64, f64),
	center_duration_ms: f64,
	suspended: bool,
	transition: Option<Transition>,
}

impl Default for Viewport {
	fn default() -> Self {
		Self::new((MIN_SCALE, MAX_SCALE), CENTER_DURATION_MS)
	}
}

impl Viewport {
	/// Identity transform with zoom clamped to `extent`.
	pub fn new(extent: (f64, f64), center_duration_ms: f64) -> Self {
		let (low, high) = if extent.0 <= extent.1 {
			extent
		} else {
			(extent.1, extent.0)
		};
		Self {
			transform: Transform::IDENTITY,
			readout: scale_readout(1.0),
			extent: (low, high),
			center_duration_ms: center_duration_ms.max(0.0),
			suspended: false,
			transition: None,
		}
	}

	/// Current world -> screen mapping.
	pub fn transform(&self) -> Transform {
		self.transform
	}

	/// Human readable zoom level, e.g. `Scale: 100%`.
	pub fn readout(&self) -> &str {
		&self.readout
	}

	/// The only writer of `transform`; keeps the readout in step.
	fn set_transform(&mut self, transform: Transform) {
		let scale = transform.scale.clamp(self.extent.0, self.extent.1);
		self.transform = Transform {
			translate: transform.translate,
			scale,
		};
		self.readout = scale_readout(scale);
	}

	/// Whether gestures are being ignored.
	pub fn is_suspended(&self) -> bool {
		self.suspended
	}

	/// Stops reacting to gestures, e.g. while a node is dragged.
	pub fn suspend(&mut self) {
		self.suspended = true;
	}

	/// Reacts to gestures again.
	pub fn resume(&mut self) {
		self.suspended = false;
	}

	/// Applies a user gesture. Returns `false` when it was ignored.
	pub fn on_gesture(&mut self, gesture: Gesture) -> bool {
		if self.suspended {
			return false;
		}
		self.transition = None;
		let current = self.transform;
		match gesture {
			Gesture::Pan(delta) => self.set_transform(Transform {
				translate: current.translate + delta,
				scale: current.scale,
			}),
			Gesture::Zoom { anchor, factor } => {
				if !factor.is_finite() || factor <= 0.0 {
					return false;
				}
				let scale = (current.scale * factor).clamp(self.extent.0, self.extent.1);
				let ratio = scale / current.scale;
				self.set_transform(Transform {
					translate: anchor - (anchor - current.translate) * ratio,
					scale,
				});
			}
		}
		true
	}

	/// Starts the animated return to identity.
	pub fn center(&mut self, now_ms: f64) {
		if self.center_duration_ms <= 0.0 {
			self.transition = None;
			self.set_transform(Transform::IDENTITY);
			return;
		}
		self.transition = Some(Transition {
			from: self.transform,
			started_ms: now_ms,
			duration_ms: self.center_duration_ms,
		});
	}

	/// Whether a center transition is running.
	pub fn is_animating(&self) -> bool {
		self.transition.is_some()
	}

	/// Steps a running transition. Returns whether the transform changed.
	pub fn advance(&mut self, now_ms: f64) -> bool {
		let Some(transition) = self.transition else {
			return false;
		};
		let t = ((now_ms - transition.started_ms) / transition.duration_ms).clamp(0.0, 1.0);
		if t >= 1.0 {
			self.transition = None;
			self.set_transform(Transform::IDENTITY);
		} else {
			self.set_transform(transition.from.lerp(Transform::IDENTITY, cubic_in_out(t)));
		}
		true
	}

	/// Inverse of [`Viewport::world_to_screen`].
	pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
		(screen - self.transform.translate) * (1.0 / self.transform.scale)
	}

	/// Canvas pixel position of a world point.
	pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
		world * self.transform.scale + self.transform.translate
	}
}
