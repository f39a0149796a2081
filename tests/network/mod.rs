mod capabilities;
mod geojson;

pub use capabilities::{ScriptedMatcher, ScriptedRouter};
pub use geojson::GEOJSON_NETWORK;
