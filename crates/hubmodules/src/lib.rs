//! Standard module library
//!
//! Module types every hub of a session can spawn by default

mod filter;
mod io;
mod render;

pub use filter::{ColorFactory, IsoSurfaceFactory};
pub use io::{ReaderFactory, WriterFactory};
pub use render::RendererFactory;
use hubsession::ModuleRegistry;

use std::sync::Arc;

/// Register all standard module types with a registry
pub fn register_all(registry: &mut ModuleRegistry) {
    registry.register(Arc::new(io::ReaderFactory));
    registry.register(Arc::new(io::WriterFactory));
    registry.register(Arc::new(filter::IsoSurfaceFactory));
    registry.register(Arc::new(filter::ColorFactory));
    registry.register(Arc::new(render::RendererFactory));
}

/// Registry holding every standard module type
pub fn standard_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    register_all(&mut registry);
    registry
}
