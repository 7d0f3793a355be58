//! Renderman Engine
//!
//! Renders the units of a stack into manifest documents:
//!
//! - **Releases** through `helm template` or `helmfile template`
//! - **Kustomizations** through `kustomize build`
//! - **Bundles** by resolving and concatenating their sources
//!
//! Units render concurrently and independently. A failing unit is recorded in
//! the [`RenderResult`] instead of aborting the pass, and the result is always
//! in declared order regardless of completion order.

pub mod engine;
pub mod error;
pub mod renderers;
pub mod result;
pub mod runner;

pub use engine::{DEFAULT_JOBS, RenderEngine, RenderEngineBuilder, RenderEvent, RenderOptions};
pub use error::{EngineError, RenderError, Result};
pub use renderers::{Rendered, Renderer, ToolPaths};
pub use result::{RenderResult, RenderedUnit, UnitFailure};
pub use runner::{DEFAULT_TOOL_TIMEOUT, Invocation, ProcessRunner, ToolOutput, ToolRunner};
