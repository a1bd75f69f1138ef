//! Execution configuration.

use crate::render::RendererRegistry;
use std::rc::Rc;

/// Configuration for executing a stream.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Whether leading filters may be pushed to the row source (default: true).
    /// When false every operation runs in memory over the full row set.
    pub pushdown: bool,
    /// Renderers used to translate pushed filters.
    pub renderers: Rc<RendererRegistry>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            pushdown: true,
            renderers: Rc::new(RendererRegistry::standard()),
        }
    }
}

impl ExecutorConfig {
    /// Creates a configuration that never pushes anything down.
    pub fn in_memory() -> Self {
        Self {
            pushdown: false,
            ..Self::default()
        }
    }

    /// Sets whether pushdown is enabled.
    pub fn with_pushdown(mut self, pushdown: bool) -> Self {
        self.pushdown = pushdown;
        self
    }

    /// Replaces the renderer registry.
    pub fn with_renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = Rc::new(renderers);
        self
    }
}
