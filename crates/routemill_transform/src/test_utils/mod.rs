use routemill_parser::{parse_route_module, stringify_module, EmitOptions, RouteSourceLang};
use swc_core::ecma::ast::Module;

pub fn parse_js(raw: &str) -> Module {
    parse_route_module(raw, RouteSourceLang::Jsx).unwrap().module
}

pub fn parse_tsx(raw: &str) -> Module {
    parse_route_module(raw, RouteSourceLang::Tsx).unwrap().module
}

/// Prints a module in the readable form
pub fn print(module: &Module) -> String {
    stringify_module(module, None, EmitOptions::default())
        .unwrap()
        .code
}

/// Asserts that both sources print the same after `$transform` runs over the first one
#[macro_export]
macro_rules! assert_module_eq {
    ($actual: expr, $expected: expr) => {
        assert_eq!(
            $crate::test_utils::print(&$actual),
            $crate::test_utils::print(&$crate::test_utils::parse_tsx($expected))
        )
    };
}
