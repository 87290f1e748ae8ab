//! Syntax tree service of routemill.
//!
//! Route modules are parsed into an owned SWC [`Module`](swc_core::ecma::ast::Module),
//! mutated in place by the transforms and printed back with a position map.

mod codegen;
mod error;
mod script;

pub use codegen::{stringify_module, EmitOptions, GeneratedCode, Mapping};
pub use error::{EmitError, ParseError};
pub use script::{parse_route_module, RouteSourceLang, RouteSyntaxTree};
