//! # kubedeploy-renderer
//!
//! Turns manifest templates into resource objects:
//! environment overlay → Tera render → YAML/JSON document stream.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kubedeploy_renderer::{load_resource_set, EnvOverlay};
//!
//! let overlay = EnvOverlay::from_env();
//! if let Ok(set) = load_resource_set(&["deploy/app.yaml"], &overlay) {
//!     for group in &set.groups {
//!         println!("{}: {} objects", group.source.display(), group.objects.len());
//!     }
//! }
//! ```

pub mod engine;
pub mod error;
pub mod loader;
pub mod overlay;
pub mod parser;

pub use engine::render;
pub use error::{DocumentError, RenderError};
pub use loader::{is_manifest, load_resource_set};
pub use overlay::EnvOverlay;
pub use parser::{parse_all, parse_objects, ObjectStream};
