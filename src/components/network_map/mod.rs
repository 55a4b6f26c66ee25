//! Force-directed network map: layout, scene, view-state sync and the
//! Leptos component that draws it.

/// Panel settings and locator rules.
pub mod config;
/// Load failures.
pub mod error;
/// Graph and layer requests.
pub mod fetch;
/// Vectors and edge paths.
pub mod geometry;
/// Pointer gestures over nodes and the canvas.
pub mod interaction;
/// Node colors and severities.
pub mod palette;
/// The engine behind one map panel.
pub mod panel;
/// Keyed elements reconciled against each dataset.
pub mod scene;
/// Force layout.
pub mod simulation;
/// Fragment and fetch coordination.
pub mod sync;
/// Payload and graph model.
pub mod types;
/// Map selection and its URL fragment form.
pub mod view_state;
/// Pan, zoom and the animated center.
pub mod viewport;

mod component;
mod legend;
mod render;

pub use component::NetworkMap;
pub use legend::Legend;
pub use panel::{MapEvent, MapPanel, MapStatus};
