/// Force-directed network map.
pub mod network_map;
