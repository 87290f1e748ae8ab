mod exports;
mod helpers;
mod manifest;
mod routes;

pub use exports::*;
pub use helpers::{WithPropsHelper, WithPropsHelpers, WITH_PROPS_MODULE};
pub use manifest::*;
pub use routes::*;

/// Interned string used for identifiers and export names throughout the compiler
pub type RouteAtom = swc_core::ecma::atoms::Atom;

#[macro_export]
macro_rules! route_atom {
    ($lit: expr) => {
        $crate::RouteAtom::from($lit)
    };
}
