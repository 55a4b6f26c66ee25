//! Compact `key=value&...` serialization of the map query.
//!
//! The fragment is the canonical copy of the view state: every control of
//! the panel can be rebuilt from it. Decoding is total (bad input falls back
//! to defaults) and `encode` is a left inverse of `decode`.

use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Depth used when none is given.
pub const DEFAULT_DEPTH: u8 = 3;
/// Shallowest accepted depth.
pub const MIN_DEPTH: u8 = 1;
/// Deepest accepted depth.
pub const MAX_DEPTH: u8 = 15;

const KEY_ROOT: &str = "root_id";
const KEY_DEPTH: &str = "depth";
const KEY_LAYERS: &str = "layers";
const KEY_MACS: &str = "macs";
const KEY_DANGLING: &str = "dangling";

/// Which protocol layers the query asks for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LayerFilter {
	/// No `layers` key: the backend decides, i.e. everything.
	#[default]
	All,
	/// An explicit set; empty means no layers at all.
	Only(BTreeSet<String>),
}

impl LayerFilter {
	/// Splits a comma-joined list, dropping blank entries.
	pub fn parse(list: &str) -> Self {
		Self::Only(
			list.split(',')
				.map(str::trim)
				.filter(|layer| !layer.is_empty())
				.map(str::to_owned)
				.collect(),
		)
	}

	/// Whether no explicit set was chosen.
	pub fn is_all(&self) -> bool {
		matches!(self, Self::All)
	}

	/// Whether `layer` is requested.
	pub fn contains(&self, layer: &str) -> bool {
		match self {
			Self::All => true,
			Self::Only(layers) => layers.contains(layer),
		}
	}

	/// Comma-joined list, `None` for [`LayerFilter::All`].
	pub fn joined(&self) -> Option<String> {
		match self {
			Self::All => None,
			Self::Only(layers) => Some(layers.iter().cloned().collect::<Vec<_>>().join(",")),
		}
	}

	/// Toggles one layer; `All` first turns into the explicit `known` set.
	pub fn toggle<'a>(&mut self, layer: &str, known: impl IntoIterator<Item = &'a str>) {
		if self.is_all() {
			*self = Self::Only(known.into_iter().map(str::to_owned).collect());
		}
		if let Self::Only(layers) = self
			&& !layers.remove(layer)
		{
			layers.insert(layer.to_owned());
		}
	}
}

/// Everything a map query is built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewState {
	/// Locator of the map root; empty when unset.
	pub root_id: String,
	/// Hops walked from the root.
	pub depth: u8,
	/// Requested layers.
	pub layers: LayerFilter,
	/// Include MAC address nodes.
	pub show_macs: bool,
	/// Include links that leave the walked set.
	pub show_dangling: bool,
	/// Keys this version does not know, kept in order for re-encoding.
	pub extras: Vec<(String, String)>,
}

impl Default for ViewState {
	fn default() -> Self {
		Self {
			root_id: String::new(),
			depth: DEFAULT_DEPTH,
			layers: LayerFilter::All,
			show_macs: false,
			show_dangling: false,
			extras: Vec::new(),
		}
	}
}

impl ViewState {
	/// Reads a fragment without the panel token. Never fails.
	pub fn decode(fragment: &str) -> Self {
		let mut state = Self::default();
		for token in fragment.split('&') {
			let Some((key, value)) = token.split_once('=') else {
				continue;
			};
			let (key, value) = (percent_decode(key), percent_decode(value));
			match key.as_str() {
				KEY_ROOT => state.root_id = value,
				KEY_DEPTH => state.depth = parse_depth(Some(&value)),
				KEY_LAYERS => state.layers = LayerFilter::parse(&value),
				KEY_MACS => state.show_macs = parse_flag(&value),
				KEY_DANGLING => state.show_dangling = parse_flag(&value),
				_ => state.extras.push((key, value)),
			}
		}
		state
	}

	/// Canonical fragment: known keys in fixed order, then the extras.
	pub fn encode(&self) -> String {
		let mut out = String::new();
		let mut push = |key: &str, value: &str| {
			if !out.is_empty() {
				out.push('&');
			}
			let _ = write!(out, "{}={}", percent_encode(key), percent_encode(value));
		};
		push(KEY_ROOT, &self.root_id);
		push(KEY_DEPTH, &self.depth.to_string());
		if let Some(layers) = self.layers.joined() {
			push(KEY_LAYERS, &layers);
		}
		if self.show_macs {
			push(KEY_MACS, "1");
		}
		if self.show_dangling {
			push(KEY_DANGLING, "1");
		}
		for (key, value) in &self.extras {
			push(key, value);
		}
		out
	}

	/// Same state rooted elsewhere.
	pub fn with_root(&self, root_id: impl Into<String>) -> Self {
		Self {
			root_id: root_id.into(),
			..self.clone()
		}
	}
}

/// Depth from user input: missing or blank gives the default, anything
/// non-numeric the minimum, numbers are clamped.
pub fn parse_depth(raw: Option<&str>) -> u8 {
	let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
		return DEFAULT_DEPTH;
	};
	let digits = raw.strip_prefix('+').unwrap_or(raw);
	match raw.parse::<i64>() {
		Ok(depth) => depth.clamp(MIN_DEPTH.into(), MAX_DEPTH.into()) as u8,
		// Too large for i64.
		Err(_) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => MAX_DEPTH,
		Err(_) => MIN_DEPTH,
	}
}

fn parse_flag(raw: &str) -> bool {
	["1", "true", "on", "yes"]
		.iter()
		.any(|truthy| raw.trim().eq_ignore_ascii_case(truthy))
}

/// Splits off the host panel token. Returns `None` when the fragment
/// belongs to another panel of the same host.
pub fn decode_fragment(fragment: &str, panel: &str) -> Option<ViewState> {
	let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
	let (head, rest) = fragment.split_once('&').unwrap_or((fragment, ""));
	let family = panel.split_once(':').map_or(panel, |(family, _)| family);
	if head == panel {
		return Some(ViewState::decode(rest));
	}
	if !family.is_empty() && head.starts_with(family) {
		return None;
	}
	Some(ViewState::decode(fragment))
}

/// Inverse of [`decode_fragment`].
pub fn encode_fragment(state: &ViewState, panel: &str) -> String {
	if panel.is_empty() {
		state.encode()
	} else {
		format!("{panel}&{}", state.encode())
	}
}

fn is_unreserved(byte: u8) -> bool {
	byte.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&byte)
}

/// `encodeURIComponent` compatible escaping.
pub fn percent_encode(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	for byte in raw.bytes() {
		if is_unreserved(byte) {
			out.push(byte as char);
		} else {
			let _ = write!(out, "%{byte:02X}");
		}
	}
	out
}

/// Undoes [`percent_encode`]. Malformed escapes are kept literally, and so
/// is the whole input if the escapes do not form valid UTF-8.
pub fn percent_decode(raw: &str) -> String {
	let bytes = raw.as_bytes();
	let mut out = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'%'
			&& let Some(byte) = bytes
				.get(i + 1..i + 3)
				.filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
				.and_then(|hex| std::str::from_utf8(hex).ok())
				.and_then(|hex| u8::from_str_radix(hex, 16).ok())
		{
			out.push(byte);
			i += 3;
			continue;
		}
		out.push(bytes[i]);
		i += 1;
	}
	String::from_utf8(out).unwrap_or_else(|_| raw.to_owned())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn defaults_for_empty_fragment() {
		assert_eq!(ViewState::decode(""), ViewState::default());
		assert_eq!(ViewState::default().encode(), "root_id=&depth=3");
	}

	#[test]
	fn depth_is_clamped_or_defaulted() {
		assert_eq!(parse_depth(None), 3);
		assert_eq!(parse_depth(Some("  ")), 3);
		assert_eq!(parse_depth(Some("0")), 1);
		assert_eq!(parse_depth(Some("-4")), 1);
		assert_eq!(parse_depth(Some("abc")), 1);
		assert_eq!(parse_depth(Some("2.5")), 1);
		assert_eq!(parse_depth(Some("7")), 7);
		assert_eq!(parse_depth(Some("99")), 15);
		assert_eq!(parse_depth(Some("99999999999999999999999")), 15);
		assert_eq!(ViewState::decode("depth=").depth, 3);
		assert_eq!(ViewState::decode("depth=zero").depth, 1);
	}

	#[test]
	fn layers_absent_means_all_present_means_exact() {
		assert_eq!(ViewState::decode("root_id=x").layers, LayerFilter::All);
		assert_eq!(
			ViewState::decode("layers=").layers,
			LayerFilter::Only(BTreeSet::new())
		);
		let state = ViewState::decode("layers=vlan10,%20layer2,,layer2");
		assert_eq!(
			state.layers,
			LayerFilter::Only(["layer2", "vlan10"].map(String::from).into())
		);
		assert_eq!(state.encode(), "root_id=&depth=3&layers=layer2%2Cvlan10");
	}

	#[test]
	fn unknown_keys_survive_reencode() {
		let state = ViewState::decode("zoom=2&root_id=%2Fzport%2Fdmd%2FDevices%2Fsw1&theme=dark&bare&macs=yes");
		assert_eq!(
			state.extras,
			vec![("zoom".to_owned(), "2".to_owned()), ("theme".to_owned(), "dark".to_owned())]
		);
		assert!(state.show_macs);
		assert_eq!(
			state.encode(),
			"root_id=%2Fzport%2Fdmd%2FDevices%2Fsw1&depth=3&macs=1&zoom=2&theme=dark"
		);
	}

	#[test]
	fn percent_codec_matches_uri_component_rules() {
		assert_eq!(percent_encode("a b/c~d(e)"), "a%20b%2Fc~d(e)");
		assert_eq!(percent_encode("ü"), "%C3%BC");
		assert_eq!(percent_decode("%C3%BC"), "ü");
		assert_eq!(percent_decode("100%"), "100%");
		assert_eq!(percent_decode("%zz%4"), "%zz%4");
		assert_eq!(percent_decode("%FF"), "%FF");
	}

	#[test]
	fn fragments_of_other_panels_are_ignored() {
		let panel = "deviceDetailNav:network_map";
		let ours = decode_fragment("#deviceDetailNav:network_map&root_id=sw1&depth=2", panel);
		assert_eq!(ours.map(|s| (s.root_id, s.depth)), Some(("sw1".to_owned(), 2)));
		assert_eq!(decode_fragment("deviceDetailNav:events&x=1", panel), None);
		assert_eq!(decode_fragment("root_id=sw2", panel).map(|s| s.root_id), Some("sw2".to_owned()));

		let state = ViewState::decode("root_id=sw1");
		assert_eq!(
			encode_fragment(&state, panel),
			"deviceDetailNav:network_map&root_id=sw1&depth=3"
		);
		assert_eq!(decode_fragment(&encode_fragment(&state, panel), panel), Some(state));
	}

	#[test]
	fn toggling_from_all_materializes_known_layers() {
		let mut filter = LayerFilter::All;
		filter.toggle("vlan10", ["layer2", "vlan10"]);
		assert_eq!(filter, LayerFilter::Only(["layer2".to_owned()].into()));
		filter.toggle("layer3", Vec::<&str>::new());
		assert!(filter.contains("layer3"));
	}
}
