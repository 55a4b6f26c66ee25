//! Colors for links, node severities and the legend.

/// Color used when no tag in [`LINK_COLOR_PRECEDENCE`] matches.
pub const DEFAULT_LINK_COLOR: &str = "#cccccc";

/// How a layer tag is matched by a precedence rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagMatch {
	/// The whole tag, ignoring ASCII case.
	Exact(&'static str),
	/// A tag prefix, ignoring ASCII case.
	Prefix(&'static str),
}

impl TagMatch {
	/// Whether `tag` satisfies the rule.
	pub fn matches(self, tag: &str) -> bool {
		match self {
			Self::Exact(name) => tag.eq_ignore_ascii_case(name),
			Self::Prefix(prefix) => tag
				.get(..prefix.len())
				.is_some_and(|head| head.eq_ignore_ascii_case(prefix)),
		}
	}
}

/// Ordered layer tag -> link color table; the first rule matching any tag
/// of a link wins.
pub const LINK_COLOR_PRECEDENCE: &[(TagMatch, &str)] = &[
	(TagMatch::Exact("layer2"), "#4682b4"),
	(TagMatch::Prefix("vxlan"), "#9467bd"),
	(TagMatch::Prefix("vlan"), "#2ca02c"),
	(TagMatch::Exact("layer3"), "#ff7f0e"),
];

/// Display color for a link carrying `tags`.
pub fn link_color<'a, I>(tags: I) -> &'static str
where
	I: IntoIterator<Item = &'a str> + Clone,
{
	LINK_COLOR_PRECEDENCE
		.iter()
		.find(|(rule, _)| tags.clone().into_iter().any(|tag| rule.matches(tag)))
		.map(|(_, color)| *color)
		.unwrap_or(DEFAULT_LINK_COLOR)
}

/// Event severity tier of a node, most severe first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Severity {
	/// `severity_critical`
	Critical,
	/// `severity_error`
	Error,
	/// `severity_warning`
	Warning,
	/// `severity_info`
	Info,
	/// `severity_debug`, also used for cleared events.
	Debug,
	/// No open events.
	#[default]
	None,
}

impl Severity {
	/// Every tier, most severe first.
	pub const ALL: [Severity; 6] = [
		Self::Critical,
		Self::Error,
		Self::Warning,
		Self::Info,
		Self::Debug,
		Self::None,
	];

	/// Parses a color class such as `severity_warning` or a bare tier name.
	pub fn from_class(class: &str) -> Option<Self> {
		let name = class.strip_prefix("severity_").unwrap_or(class);
		Self::ALL
			.into_iter()
			.find(|severity| severity.name().eq_ignore_ascii_case(name))
	}

	/// Lower-case tier name.
	pub fn name(self) -> &'static str {
		match self {
			Self::Critical => "critical",
			Self::Error => "error",
			Self::Warning => "warning",
			Self::Info => "info",
			Self::Debug => "debug",
			Self::None => "none",
		}
	}

	/// Fill color of nodes in this tier.
	pub fn fill(self) -> &'static str {
		match self {
			Self::Critical => "#ff0000",
			Self::Error => "#ff8c00",
			Self::Warning => "#ffd700",
			Self::Info => "#1e90ff",
			Self::Debug => "#00c000",
			Self::None => "#a0a0a0",
		}
	}
}

/// Node fill color: a severity class, a literal CSS color, or nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeColor {
	/// A severity tier's fill.
	Severity(Severity),
	/// Passed to the canvas as is.
	Css(String),
}

impl NodeColor {
	/// Reads a payload color; missing or blank means [`Severity::None`].
	pub fn parse(raw: Option<&str>) -> Self {
		match raw.map(str::trim) {
			None | Some("") => Self::Severity(Severity::None),
			Some(value) => Severity::from_class(value)
				.map(Self::Severity)
				.unwrap_or_else(|| Self::Css(value.to_owned())),
		}
	}

	/// Canvas fill style.
	pub fn fill(&self) -> &str {
		match self {
			Self::Severity(severity) => severity.fill(),
			Self::Css(color) => color,
		}
	}
}

/// Ring color of the traversal root.
pub const ROOT_RING: &str = "slateblue";
/// Ring color of every other node.
pub const NODE_RING: &str = "gray";

/// Static legend rows: severity tiers followed by the map root.
pub const LEGEND: &[(&str, &str)] = &[
	("#ff0000", "Critical"),
	("#ff8c00", "Error"),
	("#ffd700", "Warning"),
	("#1e90ff", "Info"),
	("#00c000", "Debug / clear"),
	("#a0a0a0", "No events"),
	(ROOT_RING, "Map root"),
];
