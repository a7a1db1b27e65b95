//! `tagtpl_core` compiles tag-based templates (`<tpl:Name>...</tpl:Name>` and
//! `{{tpl:Name}}`) into MiniJinja source, caching the result on disk.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template file
//!   -> Preprocess (drops `<!-- # ... -->` comments, applies the host snippet policy)
//!   -> Lexer (text, block open/close and value tokens with whitespace control)
//!   -> Tree builder (arena of nodes, recovers from mismatched tags)
//!   -> Extends driver (parses each ancestor into the same tree, layering named blocks)
//!   -> Compiler (dispatches every tag to its registered handler)
//!   -> Cache (atomically persisted artifact, reused while fresh)
//! ```
//!
//! ## Key Types
//!
//! - [`Engine`] holds the search path, handler registry and cache.
//! - [`HandlerRegistry`] maps tag names to [`BlockHandler`]s and
//!   [`ValueHandler`]s.
//! - [`Compilation`] is compiled output plus recovered [`StructuralError`]s.
//! - [`TagtplConfig`] is configuration loaded from `tagtpl.toml`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tagtpl_core::Attributes;
//! use tagtpl_core::Engine;
//!
//! let mut engine = Engine::new(".tagtpl/cache").unwrap();
//! engine.set_path(["themes/custom", "themes/default"]);
//! engine.register_value("title", |_: &Attributes, _: &str| "{{ title }}".to_string());
//!
//! let html = engine
//! 	.render("home.html", serde_json::json!({ "title": "Welcome" }))
//! 	.unwrap();
//! println!("{html}");
//! ```

pub use cache::*;
pub use compiler::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use handlers::*;
pub use lexer::LexOptions;
pub use node::*;
pub use parser::*;
pub use resolver::BlockStack;
pub use search_path::*;
pub use tokens::*;

pub mod cache;
mod compiler;
pub mod config;
mod engine;
#[allow(unused_assignments)]
mod error;
mod handlers;
pub mod lexer;
pub mod node;
mod parser;
mod resolver;
pub mod search_path;
mod tokens;

#[cfg(test)]
mod __fixtures;
