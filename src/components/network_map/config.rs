//! Panel configuration, optionally supplied by the host page as JSON.

use log::{debug, warn};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::HtmlScriptElement;

use super::scene::{LABEL_BUDGET, SceneStyle};
use super::viewport::{CENTER_DURATION_MS, MAX_SCALE, MIN_SCALE, Viewport};

/// Id of the `<script type="application/json">` element read by [`load_config`].
pub const CONFIG_ELEMENT_ID: &str = "network-map-config";

/// How a node locator turns into a page the host can open.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocatorRule {
	/// Locators under `prefix` are pages themselves.
	Direct {
		/// Locator prefix the rule covers.
		prefix: String,
	},
	/// Locators under `prefix` are opened as `target` followed by the
	/// locator with every `/` replaced by `.`.
	Dotted {
		/// Locator prefix the rule covers.
		prefix: String,
		/// Page the dotted locator is appended to.
		target: String,
	},
}

impl LocatorRule {
	fn resolve(&self, locator: &str) -> Option<String> {
		match self {
			Self::Direct { prefix } => locator.starts_with(prefix.as_str()).then(|| locator.to_owned()),
			Self::Dotted { prefix, target } => locator
				.starts_with(prefix.as_str())
				.then(|| format!("{target}{}", locator.replace('/', "."))),
		}
	}
}

/// Settings of one map panel.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
	/// Answers graph queries.
	pub graph_endpoint: String,
	/// Lists the selectable layers.
	pub layers_endpoint: String,
	/// First token of fragments owned by this panel.
	pub panel_token: String,
	/// Quiet time after the last change before a fetch starts.
	pub debounce_ms: f64,
	/// Initial repulsion slider value.
	pub repulsion: f64,
	/// Slider bounds for the repulsion control.
	pub repulsion_range: (f64, f64),
	/// Smallest zoom level.
	pub min_scale: f64,
	/// Largest zoom level.
	pub max_scale: f64,
	/// Length of the animated center.
	pub center_duration_ms: f64,
	/// Characters kept by short node labels.
	pub label_budget: usize,
	/// Glyph radius of ordinary nodes.
	pub node_radius: f64,
	/// Glyph radius of the map root.
	pub root_radius: f64,
	/// Locators under this prefix can be shown in the detail view.
	pub device_prefix: String,
	/// Tried in order when a node is opened.
	pub locator_rules: Vec<LocatorRule>,
}

impl Default for MapConfig {
	fn default() -> Self {
		let style = SceneStyle::default();
		Self {
			graph_endpoint: "/zport/dmd/getJSONEdges".to_owned(),
			layers_endpoint: "/zport/dmd/getNetworkLayersList".to_owned(),
			panel_token: "deviceDetailNav:network_map".to_owned(),
			debounce_ms: 250.0,
			repulsion: 100.0,
			repulsion_range: (10.0, 500.0),
			min_scale: MIN_SCALE,
			max_scale: MAX_SCALE,
			center_duration_ms: CENTER_DURATION_MS,
			label_budget: LABEL_BUDGET,
			node_radius: style.node_radius,
			root_radius: style.root_radius,
			device_prefix: "/zport/dmd/Devices/".to_owned(),
			locator_rules: vec![
				LocatorRule::Direct {
					prefix: "/zport/dmd/Devices/".to_owned(),
				},
				LocatorRule::Direct {
					prefix: "/zport/dmd/Networks/".to_owned(),
				},
				LocatorRule::Dotted {
					prefix: "/zport/dmd/IPv6Networks/".to_owned(),
					target: "/zport/dmd/networks#ipv6networks:".to_owned(),
				},
			],
		}
	}
}

impl MapConfig {
	/// Page to open for `locator`, `None` when no rule covers it.
	pub fn resolve_locator(&self, locator: &str) -> Option<String> {
		self.locator_rules.iter().find_map(|rule| rule.resolve(locator))
	}

	/// Element sizes for the scene.
	pub fn scene_style(&self) -> SceneStyle {
		SceneStyle {
			node_radius: self.node_radius,
			root_radius: self.root_radius,
			label_budget: self.label_budget,
			..SceneStyle::default()
		}
	}

	/// A viewport with the configured zoom range and center duration.
	pub fn viewport(&self) -> Viewport {
		Viewport::new((self.min_scale, self.max_scale), self.center_duration_ms)
	}

	/// Initial repulsion, kept inside the slider range.
	pub fn initial_repulsion(&self) -> f64 {
		let (low, high) = self.repulsion_range;
		if low <= high {
			self.repulsion.clamp(low, high)
		} else {
			self.repulsion
		}
	}
}

/// Reads the configuration from the host page, falling back to defaults.
pub fn load_config() -> MapConfig {
	let Some(text) = config_text() else {
		debug!("no #{CONFIG_ELEMENT_ID} element, using default map config");
		return MapConfig::default();
	};
	match serde_json::from_str::<MapConfig>(&text) {
		Ok(config) => config,
		Err(err) => {
			warn!("invalid #{CONFIG_ELEMENT_ID}: {err}; using defaults");
			MapConfig::default()
		}
	}
}

fn config_text() -> Option<String> {
	let document = web_sys::window()?.document()?;
	let element = document.get_element_by_id(CONFIG_ELEMENT_ID)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}
