//! Commonly used words as static symbols (`RouteAtom`)

use routemill_core::{route_atom, RouteAtom, WITH_PROPS_MODULE};

lazy_static! {
    pub static ref DEFAULT: RouteAtom = route_atom!("default");
    pub static ref WITH_PROPS_SOURCE: RouteAtom = route_atom!(WITH_PROPS_MODULE);
}
