//! Injection of routing props into the route components.
//!
//! `export default function Page() {}` becomes
//! `export default _withComponentProps(function Page() {})`,
//! and the allow-listed named components are wrapped with their own helpers.

use fxhash::FxHashSet;
use itertools::Itertools;
use routemill_core::{RouteAtom, WithPropsHelper, WithPropsHelpers};
use swc_core::{
    common::DUMMY_SP,
    ecma::{
        ast::{
            BindingIdent, CallExpr, Callee, Decl, DefaultDecl, ExportDefaultDecl, ExportDefaultExpr,
            ExportSpecifier, Expr, ExprOrSpread, FnDecl, FnExpr, Ident, ImportDecl, ImportNamedSpecifier,
            ImportSpecifier, Module, ModuleDecl, ModuleExportName, ModuleItem, Pat, Str, VarDecl,
            VarDeclKind, VarDeclarator,
        },
        visit::{Visit, VisitWith},
    },
};
use tracing::debug;

use crate::atoms::{DEFAULT, WITH_PROPS_SOURCE};

/// Wraps the route components and prepends a single import of the used helpers.
/// Returns the set of helpers which were imported.
pub fn transform_route(module: &mut Module) -> WithPropsHelpers {
    normalize_default_export(module);

    let mut uids = UidGenerator::new(module);
    let mut imported: Vec<(WithPropsHelper, Ident)> = Vec::new();

    let mut hoc_uid = |helper: WithPropsHelper| -> Ident {
        let uid = uids.generate(helper.as_str());
        imported.push((helper, uid.clone()));
        uid
    };

    let body = std::mem::take(&mut module.body);
    module.body = body
        .into_iter()
        .map(|module_item| match module_item {
            // export default () => {};
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(mut export_default)) => {
                let uid = hoc_uid(WithPropsHelper::ComponentProps);
                export_default.expr = Box::new(wrap_in_call(uid, export_default.expr));
                ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(export_default))
            }

            // export default function Page() {}
            // Classes and interfaces are not expressions and stay as they are
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(ExportDefaultDecl {
                span,
                decl: DefaultDecl::Fn(fn_expr),
            })) => {
                let uid = hoc_uid(WithPropsHelper::ComponentProps);
                ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(ExportDefaultExpr {
                    span,
                    expr: Box::new(wrap_in_call(uid, Box::new(Expr::Fn(fn_expr)))),
                }))
            }

            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(mut export_decl)) => {
                export_decl.decl = match export_decl.decl {
                    // export const ErrorBoundary = () => {};
                    Decl::Var(mut var_decl) => {
                        for declarator in var_decl.decls.iter_mut() {
                            let Pat::Ident(ref binding) = declarator.name else {
                                continue;
                            };
                            let Some(helper) = WithPropsHelper::for_named_export(&binding.id.sym)
                            else {
                                continue;
                            };
                            let Some(init) = declarator.init.take() else {
                                continue;
                            };

                            let uid = hoc_uid(helper);
                            declarator.init = Some(Box::new(wrap_in_call(uid, init)));
                        }
                        Decl::Var(var_decl)
                    }

                    // export function HydrateFallback() {}
                    Decl::Fn(fn_decl) => match WithPropsHelper::for_named_export(&fn_decl.ident.sym) {
                        Some(helper) => {
                            let uid = hoc_uid(helper);
                            wrap_fn_decl(uid, fn_decl)
                        }
                        None => Decl::Fn(fn_decl),
                    },

                    decl => decl,
                };
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export_decl))
            }

            module_item => module_item,
        })
        .collect();

    let mut helpers = WithPropsHelpers::default();
    if imported.is_empty() {
        return helpers;
    }

    let specifiers = imported
        .into_iter()
        .map(|(helper, local)| {
            helpers |= helper;
            ImportSpecifier::Named(ImportNamedSpecifier {
                span: DUMMY_SP,
                local,
                imported: Some(ModuleExportName::Ident(Ident {
                    sym: helper.as_atom(),
                    ..Default::default()
                })),
                is_type_only: false,
            })
        })
        .collect_vec();

    debug!(
        helpers = %specifiers.len(),
        "injected route component props"
    );

    module.body.insert(
        0,
        ModuleItem::ModuleDecl(ModuleDecl::Import(ImportDecl {
            span: DUMMY_SP,
            specifiers,
            src: Box::new(Str {
                span: DUMMY_SP,
                value: WITH_PROPS_SOURCE.to_owned(),
                raw: None,
            }),
            type_only: false,
            with: None,
            phase: Default::default(),
        })),
    );

    helpers
}

/// Turns `export { Page as default }` into `export default Page` placed at the end of the module.
/// Returns `true` when the module was changed.
pub fn normalize_default_export(module: &mut Module) -> bool {
    let mut default_local: Option<Ident> = None;

    module.body.retain_mut(|module_item| {
        let ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named_export)) = module_item else {
            return true;
        };

        // Re-exports from other modules are not local components
        if named_export.src.is_some() || default_local.is_some() {
            return true;
        }

        let position = named_export.specifiers.iter().position(|specifier| {
            matches!(
                specifier,
                ExportSpecifier::Named(named)
                    if matches!(named.orig, ModuleExportName::Ident(_))
                    && matches!(&named.exported, Some(ModuleExportName::Ident(exported)) if exported.sym == *DEFAULT)
            )
        });
        let Some(position) = position else {
            return true;
        };

        if let ExportSpecifier::Named(named) = named_export.specifiers.remove(position) {
            if let ModuleExportName::Ident(orig) = named.orig {
                default_local = Some(orig);
            }
        }

        !named_export.specifiers.is_empty()
    });

    let Some(local) = default_local else {
        return false;
    };

    module
        .body
        .push(ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(
            ExportDefaultExpr {
                span: DUMMY_SP,
                expr: Box::new(Expr::Ident(local)),
            },
        )));

    true
}

/// `function Name() {}` into `const Name = uid(function Name() {})`
fn wrap_fn_decl(uid: Ident, fn_decl: FnDecl) -> Decl {
    let FnDecl {
        ident, function, ..
    } = fn_decl;

    let fn_expr = FnExpr {
        ident: Some(ident.clone()),
        function,
    };

    Decl::Var(Box::new(VarDecl {
        span: DUMMY_SP,
        ctxt: Default::default(),
        kind: VarDeclKind::Const,
        declare: false,
        decls: vec![VarDeclarator {
            span: DUMMY_SP,
            name: Pat::Ident(BindingIdent {
                id: ident,
                type_ann: None,
            }),
            init: Some(Box::new(wrap_in_call(uid, Box::new(Expr::Fn(fn_expr))))),
            definite: false,
        }],
    }))
}

/// `uid(expr)`
fn wrap_in_call(uid: Ident, expr: Box<Expr>) -> Expr {
    Expr::Call(CallExpr {
        span: DUMMY_SP,
        ctxt: Default::default(),
        callee: Callee::Expr(Box::new(Expr::Ident(uid))),
        args: vec![ExprOrSpread { spread: None, expr }],
        type_args: None,
    })
}

/// Generates `_name`, `_name2`, `_name3`, ... skipping identifiers the module already uses
struct UidGenerator {
    used: FxHashSet<RouteAtom>,
}

impl UidGenerator {
    fn new(module: &Module) -> Self {
        let mut collector = IdentCollector::default();
        module.visit_with(&mut collector);
        UidGenerator {
            used: collector.idents,
        }
    }

    fn generate(&mut self, name: &str) -> Ident {
        let base = format!("_{name}");
        let mut candidate = RouteAtom::from(base.as_str());
        let mut counter = 1;

        while self.used.contains(&candidate) {
            counter += 1;
            candidate = RouteAtom::from(format!("{base}{counter}"));
        }

        self.used.insert(candidate.clone());
        Ident {
            sym: candidate,
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct IdentCollector {
    idents: FxHashSet<RouteAtom>,
}

impl Visit for IdentCollector {
    fn visit_ident(&mut self, n: &Ident) {
        self.idents.insert(n.sym.to_owned());
    }
}
