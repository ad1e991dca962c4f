//! HTTP handlers, grouped by surface.

pub mod admission;
pub mod authz;
pub mod resources;
pub mod scheduling;

pub use admission::validate;
pub use authz::authorize;
pub use resources::handle_resource;
pub use scheduling::{bind_intake, filter_intake, score_intake};
