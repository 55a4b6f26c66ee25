use std::fmt;

/// Why a graph or layer list could not be shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadError {
	/// The backend answered but reported a failure of the query itself.
	Query(String),
	/// The request did not complete or returned a non-success status.
	Transport(String),
	/// The response body was not the expected JSON.
	Decode(String),
}

impl LoadError {
	/// Turns a JS exception or rejected promise into a transport error.
	pub fn from_js(value: &wasm_bindgen::JsValue) -> Self {
		Self::Transport(
			value
				.as_string()
				.or_else(|| {
					js_sys::JSON::stringify(value)
						.ok()
						.and_then(|text| text.as_string())
				})
				.unwrap_or_else(|| "request failed".to_owned()),
		)
	}
}

impl fmt::Display for LoadError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Query(msg) => write!(f, "{msg}"),
			Self::Transport(msg) => write!(f, "Failed to load the network map: {msg}"),
			Self::Decode(msg) => write!(f, "Unexpected network map response: {msg}"),
		}
	}
}

impl std::error::Error for LoadError {}

impl From<serde_json::Error> for LoadError {
	fn from(err: serde_json::Error) -> Self {
		Self::Decode(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn messages_carry_the_detail() {
		assert_eq!(LoadError::Query("Device not found".into()).to_string(), "Device not found");
		assert_eq!(
			LoadError::Transport("HTTP 502".into()).to_string(),
			"Failed to load the network map: HTTP 502"
		);
		let decode: LoadError = serde_json::from_str::<Vec<u8>>("{").unwrap_err().into();
		assert!(matches!(decode, LoadError::Decode(_)));
	}
}
