//! Removal of route exports which must not reach an environment,
//! e.g. `loader` and `action` in the browser bundle.

use routemill_core::{ExportSet, RouteAtom};
use smallvec::SmallVec;
use swc_core::ecma::ast::{
    Decl, ExportSpecifier, Module, ModuleDecl, ModuleExportName, ModuleItem, Pat,
};
use tracing::debug;

use crate::{
    atoms::DEFAULT,
    dead_code::{collect_pat_names, find_live_bindings, sweep_dead_code},
    error::RemoveExportsError,
};

/// Outcome of [`remove_exports`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedExports {
    /// Export names which were removed, in source order
    pub exports: Vec<RouteAtom>,
    /// Number of top-level bindings swept because nothing referenced them anymore
    pub swept_bindings: usize,
}

impl RemovedExports {
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

/// Removes the exports named in `exports_to_remove` together with the declarations
/// which were only reachable from them.
///
/// Destructured exports are validated first, so on error the module is not modified.
/// When no export matches the module is not modified either.
pub fn remove_exports(
    module: &mut Module,
    exports_to_remove: &[&str],
) -> Result<RemovedExports, RemoveExportsError> {
    let should_remove = |name: &str| exports_to_remove.iter().any(|it| *it == name);

    validate_destructured_exports(module, &should_remove)?;

    if !has_matching_export(module, &should_remove) {
        return Ok(RemovedExports::default());
    }

    let previously_live = find_live_bindings(module);
    let mut removed: Vec<RouteAtom> = Vec::new();

    module.body.retain_mut(|module_item| {
        let ModuleItem::ModuleDecl(module_decl) = module_item else {
            return true;
        };

        match module_decl {
            // export { foo };
            // export { bar } from "./module";
            ModuleDecl::ExportNamed(named_export) => {
                if named_export.specifiers.is_empty() {
                    return true;
                }

                named_export.specifiers.retain(|specifier| {
                    let Some(name) = exported_name(specifier) else {
                        return true;
                    };

                    if should_remove(&**name) {
                        removed.push(name.to_owned());
                        return false;
                    }
                    true
                });

                !named_export.specifiers.is_empty()
            }

            ModuleDecl::ExportDecl(export_decl) => match &mut export_decl.decl {
                // export const foo = ...;
                Decl::Var(var_decl) => {
                    var_decl.decls.retain(|declarator| {
                        let Pat::Ident(ref binding) = declarator.name else {
                            // Destructuring was validated already
                            return true;
                        };

                        if should_remove(&*binding.id.sym) {
                            removed.push(binding.id.sym.to_owned());
                            return false;
                        }
                        true
                    });

                    !var_decl.decls.is_empty()
                }

                // export function foo() {}
                Decl::Fn(fn_decl) => {
                    if should_remove(&*fn_decl.ident.sym) {
                        removed.push(fn_decl.ident.sym.to_owned());
                        return false;
                    }
                    true
                }

                // export class Foo {}
                Decl::Class(class_decl) => {
                    if should_remove(&*class_decl.ident.sym) {
                        removed.push(class_decl.ident.sym.to_owned());
                        return false;
                    }
                    true
                }

                _ => true,
            },

            // export default function () {}
            // export default foo;
            ModuleDecl::ExportDefaultDecl(_) | ModuleDecl::ExportDefaultExpr(_) => {
                if should_remove(&**DEFAULT) {
                    removed.push(DEFAULT.to_owned());
                    return false;
                }
                true
            }

            _ => true,
        }
    });

    let swept_bindings = sweep_dead_code(module, &previously_live);

    debug!(
        removed = ?removed,
        swept = swept_bindings,
        "removed route exports"
    );

    Ok(RemovedExports {
        exports: removed,
        swept_bindings,
    })
}

/// Lists every name the module exports.
/// Type-only exports are skipped, default exports are listed as `default`.
pub fn collect_exports(module: &Module) -> ExportSet {
    let mut exports = ExportSet::new();

    for module_item in module.body.iter() {
        let ModuleItem::ModuleDecl(module_decl) = module_item else {
            continue;
        };

        match module_decl {
            ModuleDecl::ExportNamed(named_export) => {
                if named_export.type_only {
                    continue;
                }
                for specifier in named_export.specifiers.iter() {
                    if let ExportSpecifier::Named(named) = specifier {
                        if named.is_type_only {
                            continue;
                        }
                    }
                    if let Some(name) = exported_name(specifier) {
                        exports.insert(name.to_string());
                    }
                }
            }

            ModuleDecl::ExportDecl(export_decl) => match &export_decl.decl {
                Decl::Var(var_decl) => {
                    for declarator in var_decl.decls.iter() {
                        let mut names: SmallVec<[RouteAtom; 1]> = SmallVec::new();
                        collect_pat_names(&declarator.name, &mut names);
                        for name in names {
                            exports.insert(name.to_string());
                        }
                    }
                }
                Decl::Fn(fn_decl) => {
                    exports.insert(fn_decl.ident.sym.to_string());
                }
                Decl::Class(class_decl) => {
                    exports.insert(class_decl.ident.sym.to_string());
                }
                Decl::TsEnum(ts_enum) => {
                    exports.insert(ts_enum.id.sym.to_string());
                }
                _ => {}
            },

            ModuleDecl::ExportDefaultDecl(_) | ModuleDecl::ExportDefaultExpr(_) => {
                exports.insert(DEFAULT.to_string());
            }

            _ => {}
        }
    }

    exports
}

/// Fails when a destructuring pattern in an exported variable declaration binds a name to remove
fn validate_destructured_exports(
    module: &Module,
    should_remove: &impl Fn(&str) -> bool,
) -> Result<(), RemoveExportsError> {
    for module_item in module.body.iter() {
        let ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export_decl)) = module_item else {
            continue;
        };
        let Decl::Var(ref var_decl) = export_decl.decl else {
            continue;
        };

        for declarator in var_decl.decls.iter() {
            if matches!(declarator.name, Pat::Ident(_)) {
                continue;
            }

            let mut names: SmallVec<[RouteAtom; 1]> = SmallVec::new();
            collect_pat_names(&declarator.name, &mut names);

            if let Some(name) = names.into_iter().find(|name| should_remove(&**name)) {
                return Err(RemoveExportsError::UnremovableDestructuredExport {
                    name,
                    span: declarator.span,
                });
            }
        }
    }

    Ok(())
}

fn has_matching_export(module: &Module, should_remove: &impl Fn(&str) -> bool) -> bool {
    collect_exports(module).iter().any(should_remove)
}

/// `foo` in `export { foo }`, `bar` in `export { foo as bar }` and `ns` in `export * as ns from 'x'`
fn exported_name(specifier: &ExportSpecifier) -> Option<&RouteAtom> {
    match specifier {
        ExportSpecifier::Named(named) => {
            Some(module_export_name(named.exported.as_ref().unwrap_or(&named.orig)))
        }
        ExportSpecifier::Namespace(namespace) => Some(module_export_name(&namespace.name)),
        ExportSpecifier::Default(default) => Some(&default.exported.sym),
    }
}

#[inline]
fn module_export_name(name: &ModuleExportName) -> &RouteAtom {
    match name {
        ModuleExportName::Ident(ident) => &ident.sym,
        ModuleExportName::Str(s) => &s.value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{parse_js, parse_tsx, print};
    use routemill_core::{Environment, SERVER_ONLY_ROUTE_EXPORTS};

    macro_rules! test_removal {
        ($source: expr, $remove: expr, $expected: expr) => {{
            let mut module = parse_tsx($source);
            let result = remove_exports(&mut module, $remove);
            assert!(result.is_ok(), "{:?}", result);
            assert_eq!(print(&module), print(&parse_tsx($expected)));
            result.unwrap_or_default()
        }};
    }

    #[test]
    fn it_removes_variable_exports() {
        let result = test_removal!(
            r"
            export const loader = () => {};
            export const meta = () => [];
            ",
            SERVER_ONLY_ROUTE_EXPORTS,
            r"
            export const meta = () => [];
            "
        );
        assert_eq!(result.exports, vec![RouteAtom::from("loader")]);
    }

    #[test]
    fn it_removes_single_declarators() {
        test_removal!(
            r"export const loader = 1, handle = 2;",
            &["loader"],
            r"export const handle = 2;"
        );
    }

    #[test]
    fn it_removes_functions_and_classes() {
        test_removal!(
            r"
            export function action() {}
            export class headers {}
            export function clientAction() {}
            ",
            SERVER_ONLY_ROUTE_EXPORTS,
            r"export function clientAction() {}"
        );
    }

    #[test]
    fn it_removes_specifiers() {
        test_removal!(
            r"
            const loader = () => null;
            const meta = () => [];
            export { loader, meta };
            export { action as default } from './action';
            export { headers } from './headers';
            ",
            &["loader", "default", "headers"],
            r"
            const meta = () => [];
            export { meta };
            "
        );
    }

    #[test]
    fn it_removes_default_exports() {
        test_removal!(
            r"
            export default function Page() {}
            export const handle = {};
            ",
            &["default"],
            r"export const handle = {};"
        );

        test_removal!(
            r"export default 42;",
            &["default"],
            r""
        );
    }

    #[test]
    fn it_sweeps_what_removed_exports_used() {
        let result = test_removal!(
            r#"
            import { db } from "./db.server";
            import { json } from "./utils";
            const getUser = (id) => db.users.find(id);
            export async function loader({ params }) {
                return json(await getUser(params.id));
            }
            export default function Profile() {
                return <div>{json}</div>;
            }
            "#,
            SERVER_ONLY_ROUTE_EXPORTS,
            r#"
            import { json } from "./utils";
            export default function Profile() {
                return <div>{json}</div>;
            }
            "#
        );
        assert_eq!(result.swept_bindings, 2);
    }

    #[test]
    fn it_fails_on_destructured_exports() {
        let source = r"
            import { makeHandlers } from './handlers';
            export const [loader, other] = makeHandlers();
            export default function Page() {}
        ";
        let mut module = parse_js(source);
        let before = print(&module);

        let result = remove_exports(&mut module, SERVER_ONLY_ROUTE_EXPORTS);
        let error = result.unwrap_err();

        assert_eq!(error.export_name(), "loader");
        assert_eq!(error.to_string(), "Cannot remove destructured export \"loader\"");
        assert_eq!(print(&module), before);
    }

    #[test]
    fn it_fails_on_nested_destructured_exports() {
        let mut module = parse_js(r"export const { a: [, { action }] } = handlers;");
        let result = remove_exports(&mut module, &["action"]);
        assert!(matches!(
            result,
            Err(RemoveExportsError::UnremovableDestructuredExport { ref name, .. }) if &**name == "action"
        ));
    }

    #[test]
    fn it_keeps_destructured_exports_not_in_set() {
        test_removal!(
            r"
            export const { meta, links } = makeHandlers();
            export const loader = () => null;
            ",
            SERVER_ONLY_ROUTE_EXPORTS,
            r"export const { meta, links } = makeHandlers();"
        );
    }

    #[test]
    fn it_leaves_tree_untouched_for_disjoint_set() {
        let source = r"
            import { helper } from './helper';
            const unused = () => helper();
            export const meta = () => [];
            export default function Page() {}
        ";
        let mut module = parse_js(source);
        let before = print(&module);

        let result = remove_exports(&mut module, &["loader", "action"]);
        assert_eq!(result.map(|r| r.is_empty()).ok(), Some(true));
        assert_eq!(print(&module), before);
    }

    #[test]
    fn it_never_removes_unknown_names() {
        let source = r"
            export const customThing = 1;
            export function anotherOne() {}
            export const loader = () => customThing;
        ";
        let mut module = parse_js(source);
        let result = remove_exports(&mut module, Environment::Client.exports_to_remove());
        assert!(result.is_ok());

        let exports = collect_exports(&module);
        assert!(exports.contains("customThing"));
        assert!(exports.contains("anotherOne"));
        assert!(!exports.contains("loader"));
    }

    #[test]
    fn it_collects_exports() {
        let module = parse_tsx(
            r"
            import type { Route } from './+types/home';
            export type LoaderData = { a: 1 };
            export interface Props {}
            export const { meta, links: [first] } = handlers;
            export function loader() {}
            export class ErrorBoundary {}
            export enum Kind { A }
            export { a as clientLoader, type b } from './c';
            export * as ns from './ns';
            export * from './all';
            export default function Page() {}
            ",
        );

        let exports = collect_exports(&module);
        let names: Vec<&str> = exports.iter().collect();
        assert_eq!(
            names,
            vec![
                "ErrorBoundary",
                "Kind",
                "clientLoader",
                "default",
                "first",
                "loader",
                "meta",
                "ns"
            ]
        );
        assert!(exports.has_loader());
        assert!(exports.has_client_loader());
        assert!(exports.has_error_boundary());
        assert!(!exports.has_action());
    }
}
