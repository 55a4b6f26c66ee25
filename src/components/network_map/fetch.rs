//! Browser requests for the graph payload and the layer list.

use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use super::error::LoadError;
use super::types::{GraphPayload, LayerOption};
use super::view_state::{ViewState, percent_encode};

/// Parameters sent to the graph endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphQuery {
	/// Locator of the map root.
	pub root_id: String,
	/// Hops walked from the root.
	pub depth: u8,
	/// Comma-joined; `None` lets the backend use every layer.
	pub layers: Option<String>,
	/// Include MAC address nodes.
	pub macs: bool,
	/// Include links that end outside the walked set.
	pub dangling: bool,
}

impl GraphQuery {
	/// Query for the given view state.
	pub fn from_state(state: &ViewState) -> Self {
		Self {
			root_id: state.root_id.clone(),
			depth: state.depth,
			layers: state.layers.joined(),
			macs: state.show_macs,
			dangling: state.show_dangling,
		}
	}

	/// Percent-encoded `key=value` pairs joined by `&`.
	pub fn to_query_string(&self) -> String {
		let mut pairs = vec![
			("root_id", self.root_id.clone()),
			("depth", self.depth.to_string()),
		];
		if let Some(layers) = &self.layers {
			pairs.push(("layers", layers.clone()));
		}
		if self.macs {
			pairs.push(("macs", "true".to_owned()));
		}
		if self.dangling {
			pairs.push(("dangling", "true".to_owned()));
		}
		pairs
			.into_iter()
			.map(|(key, value)| format!("{key}={}", percent_encode(&value)))
			.collect::<Vec<_>>()
			.join("&")
	}

	/// `endpoint` with the query appended.
	pub fn url(&self, endpoint: &str) -> String {
		let separator = if endpoint.contains('?') { '&' } else { '?' };
		format!("{endpoint}{separator}{}", self.to_query_string())
	}
}

/// Decodes a graph response body. Some backends answer a failed query with
/// a bare JSON string instead of an `error` field.
pub fn decode_graph_body(body: &str) -> Result<GraphPayload, LoadError> {
	match serde_json::from_str::<serde_json::Value>(body)? {
		serde_json::Value::String(message) => Err(LoadError::Query(message)),
		value => Ok(serde_json::from_value(value)?),
	}
}

/// Requests the graph for `query` from `endpoint`.
pub async fn fetch_graph(endpoint: &str, query: &GraphQuery) -> Result<GraphPayload, LoadError> {
	let body = fetch_text(&query.url(endpoint)).await?;
	decode_graph_body(&body)
}

/// Requests the selectable layers.
pub async fn fetch_layer_options(endpoint: &str) -> Result<Vec<LayerOption>, LoadError> {
	fetch_json(endpoint).await
}

async fn fetch_json<T: DeserializeOwned>(url: &str) -> Result<T, LoadError> {
	let body = fetch_text(url).await?;
	Ok(serde_json::from_str(&body)?)
}

async fn fetch_text(url: &str) -> Result<String, LoadError> {
	let window = web_sys::window().ok_or_else(|| LoadError::Transport("no window".to_owned()))?;
	let response = JsFuture::from(window.fetch_with_str(url))
		.await
		.map_err(|err| LoadError::from_js(&err))?;
	let response: Response = response
		.dyn_into()
		.map_err(|_| LoadError::Transport("fetch did not return a Response".to_owned()))?;
	if !response.ok() {
		return Err(LoadError::Transport(format!(
			"HTTP {} {}",
			response.status(),
			response.status_text()
		)));
	}
	let text = response.text().map_err(|err| LoadError::from_js(&err))?;
	JsFuture::from(text)
		.await
		.map_err(|err| LoadError::from_js(&err))?
		.as_string()
		.ok_or_else(|| LoadError::Decode("response body is not text".to_owned()))
}

/// Layer options split the way the layer picker shows them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerGroups {
	/// Neither VLAN nor VXLAN.
	pub plain: Vec<LayerOption>,
	/// Labels have the `vlan` prefix removed.
	pub vlans: Vec<LayerOption>,
	/// Labels have the `vxlan` prefix removed.
	pub vxlans: Vec<LayerOption>,
}

impl LayerGroups {
	/// Every option value, plain ones first.
	pub fn values(&self) -> impl Iterator<Item = &str> {
		self.plain
			.iter()
			.chain(&self.vlans)
			.chain(&self.vxlans)
			.map(|option| option.value.as_str())
	}
}

fn strip_prefix_ignore_case<'a>(label: &'a str, prefix: &str) -> Option<&'a str> {
	label
		.get(..prefix.len())
		.filter(|head| head.eq_ignore_ascii_case(prefix))
		.map(|_| &label[prefix.len()..])
}

/// Splits options into plain, VLAN and VXLAN groups, keeping their order.
pub fn group_layer_options(options: Vec<LayerOption>) -> LayerGroups {
	let mut groups = LayerGroups::default();
	for mut option in options {
		if let Some(rest) = strip_prefix_ignore_case(&option.label, "vlan") {
			option.label = rest.to_owned();
			groups.vlans.push(option);
		} else if let Some(rest) = strip_prefix_ignore_case(&option.label, "vxlan") {
			option.label = rest.to_owned();
			groups.vxlans.push(option);
		} else {
			groups.plain.push(option);
		}
	}
	groups
}
