use std::str::FromStr;

use flagset::{flags, FlagSet};
use strum_macros::{AsRefStr, EnumString, IntoStaticStr};

use crate::{is_named_component_export, RouteAtom};

/// Virtual module which provides all the `with*Props` helpers
pub const WITH_PROPS_MODULE: &str = "virtual/react-router/with-props";

flags! {
    /// Higher-order components which inject routing context into route components
    #[derive(AsRefStr, EnumString, IntoStaticStr)]
    pub enum WithPropsHelper: u8 {
        /// `params`, `loaderData`, `actionData`, `matches`
        #[strum(serialize = "withComponentProps")]
        ComponentProps,
        /// `params`
        #[strum(serialize = "withHydrateFallbackProps")]
        HydrateFallbackProps,
        /// `params`, `loaderData`, `actionData`, `error`
        #[strum(serialize = "withErrorBoundaryProps")]
        ErrorBoundaryProps,
    }
}

impl WithPropsHelper {
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    #[inline]
    pub fn as_atom(self) -> RouteAtom {
        self.as_str().into()
    }

    /// Helper for a named component export, e.g. `withErrorBoundaryProps` for `ErrorBoundary`
    pub fn for_named_export(name: &str) -> Option<WithPropsHelper> {
        if !is_named_component_export(name) {
            return None;
        }

        WithPropsHelper::from_str(&format!("with{name}Props")).ok()
    }
}

pub type WithPropsHelpers = FlagSet<WithPropsHelper>;
