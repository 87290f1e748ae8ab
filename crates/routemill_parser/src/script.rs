use strum_macros::{AsRefStr, IntoStaticStr};
use swc_core::{
    common::{comments::SingleThreadedComments, BytePos},
    ecma::ast::{EsVersion, Module},
};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
use tracing::debug;

use crate::error::ParseError;

/// Dialect of a route module, picked from its file extension
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum RouteSourceLang {
    Js,
    #[default]
    Jsx,
    Ts,
    Tsx,
}

impl RouteSourceLang {
    /// `routes/home.tsx` is `Tsx`, unknown extensions fall back to `Jsx`
    pub fn from_filename(filename: &str) -> RouteSourceLang {
        // Strip a resource query, e.g. `home.tsx?react-router-route`
        let path = filename.split('?').next().unwrap_or(filename);
        let ext = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();

        match ext {
            "ts" | "mts" | "cts" => RouteSourceLang::Ts,
            "tsx" => RouteSourceLang::Tsx,
            "js" | "mjs" | "cjs" => RouteSourceLang::Js,
            _ => RouteSourceLang::Jsx,
        }
    }

    pub fn syntax(self) -> Syntax {
        match self {
            RouteSourceLang::Js | RouteSourceLang::Jsx => Syntax::Es(EsSyntax {
                jsx: true,
                ..Default::default()
            }),
            RouteSourceLang::Ts => Syntax::Typescript(TsSyntax::default()),
            RouteSourceLang::Tsx => Syntax::Typescript(TsSyntax {
                tsx: true,
                ..Default::default()
            }),
        }
    }
}

/// Parsed route module together with its comments
pub struct RouteSyntaxTree {
    pub module: Module,
    pub comments: SingleThreadedComments,
    pub lang: RouteSourceLang,
}

/// Parses a route module.
///
/// Positions start at `BytePos(1)`, because `BytePos(0)` is reserved for dummy spans.
/// Recoverable parser errors are treated the same as fatal ones.
pub fn parse_route_module(source: &str, lang: RouteSourceLang) -> Result<RouteSyntaxTree, ParseError> {
    let comments = SingleThreadedComments::default();
    let start = BytePos(1);
    let end = BytePos(1 + source.len() as u32);

    let lexer = Lexer::new(
        lang.syntax(),
        EsVersion::EsNext,
        StringInput::new(source, start, end),
        Some(&comments),
    );

    let mut parser = Parser::new_from(lexer);
    let module = parser.parse_module()?;

    if let Some(error) = parser.take_errors().into_iter().next() {
        return Err(error.into());
    }

    debug!(lang = lang.as_ref(), items = module.body.len(), "parsed route module");

    Ok(RouteSyntaxTree {
        module,
        comments,
        lang,
    })
}
