//! Request extractors that reject with the API error body.

mod attributes_body;
mod entity_path;

pub use attributes_body::AttributesBody;
pub use entity_path::EntityPath;
