//! Dead code sweep which runs after exports were removed.
//!
//! Top-level declarations form an arena of [`SweepNode`]s addressed by their index.
//! Every other module item is a root. Marking starts at the names referenced by the roots
//! and follows references through the arena. Unmarked nodes which were live before
//! the removal are swept, everything else stays in place.

use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use swc_core::ecma::{
    ast::{
        AssignExpr, AssignTarget, BindingIdent, ClassDecl, ClassExpr, Decl, ExportSpecifier, FnDecl,
        FnExpr, Ident, ImportDecl, ImportSpecifier, Module, ModuleDecl, ModuleExportName,
        ModuleItem, NamedExport, ObjectPatProp, Pat, SimpleAssignTarget, Stmt,
    },
    visit::{Visit, VisitWith},
};
use tracing::debug;

use routemill_core::RouteAtom;

/// Names of the top-level bindings reachable from the module roots
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LiveBindings(FxHashSet<RouteAtom>);

impl LiveBindings {
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|it| &**it == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Where a sweepable declaration lives inside `Module::body`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeLocation {
    /// `function foo() {}` or `class Foo {}` at `body[item]`
    Item(usize),
    /// `const foo = ...` as `body[item].decls[declarator]`
    Declarator(usize, usize),
    /// `import { foo } from '...'` as `body[item].specifiers[specifier]`
    ImportSpecifier(usize, usize),
}

#[derive(Debug)]
struct SweepNode {
    location: NodeLocation,
    bindings: SmallVec<[RouteAtom; 1]>,
    references: FxHashSet<RouteAtom>,
}

#[derive(Debug, Default)]
struct DeclArena {
    nodes: Vec<SweepNode>,
    by_binding: FxHashMap<RouteAtom, SmallVec<[usize; 1]>>,
    root_references: FxHashSet<RouteAtom>,
}

impl DeclArena {
    fn build(module: &Module) -> DeclArena {
        let mut arena = DeclArena::default();

        for (item_idx, item) in module.body.iter().enumerate() {
            match item {
                ModuleItem::Stmt(Stmt::Decl(Decl::Fn(fn_decl))) => {
                    let mut references = FxHashSet::default();
                    fn_decl.visit_with(&mut ReferenceCollector::new(&mut references));
                    arena.push(SweepNode {
                        location: NodeLocation::Item(item_idx),
                        bindings: smallvec::smallvec![fn_decl.ident.sym.to_owned()],
                        references,
                    });
                }

                ModuleItem::Stmt(Stmt::Decl(Decl::Class(class_decl))) => {
                    let mut references = FxHashSet::default();
                    class_decl.visit_with(&mut ReferenceCollector::new(&mut references));
                    arena.push(SweepNode {
                        location: NodeLocation::Item(item_idx),
                        bindings: smallvec::smallvec![class_decl.ident.sym.to_owned()],
                        references,
                    });
                }

                ModuleItem::Stmt(Stmt::Decl(Decl::Var(var_decl))) => {
                    for (decl_idx, declarator) in var_decl.decls.iter().enumerate() {
                        let mut bindings = SmallVec::new();
                        collect_pat_names(&declarator.name, &mut bindings);

                        let mut references = FxHashSet::default();
                        declarator.visit_with(&mut ReferenceCollector::new(&mut references));
                        arena.push(SweepNode {
                            location: NodeLocation::Declarator(item_idx, decl_idx),
                            bindings,
                            references,
                        });
                    }
                }

                ModuleItem::ModuleDecl(ModuleDecl::Import(import_decl)) => {
                    for (spec_idx, specifier) in import_decl.specifiers.iter().enumerate() {
                        let local = match specifier {
                            ImportSpecifier::Named(named) => &named.local,
                            ImportSpecifier::Default(default) => &default.local,
                            ImportSpecifier::Namespace(namespace) => &namespace.local,
                        };
                        arena.push(SweepNode {
                            location: NodeLocation::ImportSpecifier(item_idx, spec_idx),
                            bindings: smallvec::smallvec![local.sym.to_owned()],
                            references: FxHashSet::default(),
                        });
                    }
                }

                // Exports, expression statements, TS declarations and the rest are roots
                _ => {
                    item.visit_with(&mut ReferenceCollector::new(&mut arena.root_references));
                }
            }
        }

        arena
    }

    fn push(&mut self, node: SweepNode) {
        let idx = self.nodes.len();
        for binding in node.bindings.iter() {
            self.by_binding
                .entry(binding.to_owned())
                .or_default()
                .push(idx);
        }
        self.nodes.push(node);
    }

    /// Marks every node reachable from the roots.
    /// Nodes for which `is_candidate` is `false` are treated as roots themselves.
    fn mark(&self, is_candidate: impl Fn(&SweepNode) -> bool) -> Vec<bool> {
        let mut marked = vec![false; self.nodes.len()];
        let mut seen: FxHashSet<&RouteAtom> = FxHashSet::default();
        let mut worklist: Vec<&RouteAtom> = Vec::new();

        for name in self.root_references.iter() {
            if seen.insert(name) {
                worklist.push(name);
            }
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            if is_candidate(node) {
                continue;
            }
            marked[idx] = true;
            for name in node.references.iter() {
                if seen.insert(name) {
                    worklist.push(name);
                }
            }
        }

        while let Some(name) = worklist.pop() {
            let Some(node_indices) = self.by_binding.get(name) else {
                continue;
            };

            for &idx in node_indices.iter() {
                if marked[idx] {
                    continue;
                }
                marked[idx] = true;
                for reference in self.nodes[idx].references.iter() {
                    if seen.insert(reference) {
                        worklist.push(reference);
                    }
                }
            }
        }

        marked
    }
}

/// Finds the top-level bindings which are currently reachable
pub fn find_live_bindings(module: &Module) -> LiveBindings {
    let arena = DeclArena::build(module);
    let marked = arena.mark(|_| true);

    let mut live = FxHashSet::default();
    for (node, is_marked) in arena.nodes.iter().zip(marked) {
        if is_marked {
            live.extend(node.bindings.iter().cloned());
        }
    }

    LiveBindings(live)
}

/// Removes top-level declarations which were live in `previously_live`
/// but are not reachable anymore. Returns the number of removed bindings.
pub fn sweep_dead_code(module: &mut Module, previously_live: &LiveBindings) -> usize {
    let arena = DeclArena::build(module);
    let marked = arena.mark(|node| {
        !node.bindings.is_empty()
            && node
                .bindings
                .iter()
                .all(|binding| previously_live.0.contains(binding))
    });

    let mut removed_items: FxHashSet<usize> = FxHashSet::default();
    let mut removed_parts: FxHashMap<usize, SmallVec<[usize; 2]>> = FxHashMap::default();
    let mut swept = 0;

    for (node, is_marked) in arena.nodes.iter().zip(marked) {
        if is_marked {
            continue;
        }

        debug!(bindings = ?node.bindings, "sweeping unreferenced declaration");
        swept += node.bindings.len();

        match node.location {
            NodeLocation::Item(item_idx) => {
                removed_items.insert(item_idx);
            }
            NodeLocation::Declarator(item_idx, part_idx)
            | NodeLocation::ImportSpecifier(item_idx, part_idx) => {
                removed_parts.entry(item_idx).or_default().push(part_idx);
            }
        }
    }

    if swept == 0 {
        return 0;
    }

    let body = std::mem::take(&mut module.body);
    module.body = body
        .into_iter()
        .enumerate()
        .filter_map(|(item_idx, mut item)| {
            if removed_items.contains(&item_idx) {
                return None;
            }

            let Some(parts) = removed_parts.get(&item_idx) else {
                return Some(item);
            };

            match item {
                ModuleItem::Stmt(Stmt::Decl(Decl::Var(ref mut var_decl))) => {
                    let mut idx = 0;
                    var_decl.decls.retain(|_| {
                        let keep = !parts.contains(&idx);
                        idx += 1;
                        keep
                    });
                    if var_decl.decls.is_empty() {
                        return None;
                    }
                }
                ModuleItem::ModuleDecl(ModuleDecl::Import(ref mut import_decl)) => {
                    let mut idx = 0;
                    import_decl.specifiers.retain(|_| {
                        let keep = !parts.contains(&idx);
                        idx += 1;
                        keep
                    });
                    // The import had specifiers, and all of them were swept
                    if import_decl.specifiers.is_empty() {
                        return None;
                    }
                }
                _ => {}
            }

            Some(item)
        })
        .collect();

    swept
}

/// Collects the bound names of a pattern, e.g. `a`, `b`, `c` in `{ a, b: [b], ...c }`
pub(crate) fn collect_pat_names(pat: &Pat, out: &mut SmallVec<[RouteAtom; 1]>) {
    match pat {
        Pat::Ident(binding) => out.push(binding.id.sym.to_owned()),
        Pat::Array(array_pat) => {
            for elem in array_pat.elems.iter().flatten() {
                collect_pat_names(elem, out);
            }
        }
        Pat::Object(object_pat) => {
            for prop in object_pat.props.iter() {
                match prop {
                    ObjectPatProp::KeyValue(key_value) => {
                        collect_pat_names(&key_value.value, out)
                    }
                    ObjectPatProp::Assign(assign) => {
                        out.push(assign.key.id.sym.to_owned())
                    }
                    ObjectPatProp::Rest(rest) => {
                        collect_pat_names(&rest.arg, out)
                    }
                }
            }
        }
        Pat::Rest(rest) => collect_pat_names(&rest.arg, out),
        Pat::Assign(assign) => collect_pat_names(&assign.left, out),
        Pat::Invalid(_) | Pat::Expr(_) => {}
    }
}

/// Collects names in reference position.
/// Scopes are not tracked, so a shadowed name counts as a reference to the outer one.
struct ReferenceCollector<'r> {
    out: &'r mut FxHashSet<RouteAtom>,
}

impl<'r> ReferenceCollector<'r> {
    fn new(out: &'r mut FxHashSet<RouteAtom>) -> Self {
        ReferenceCollector { out }
    }
}

impl Visit for ReferenceCollector<'_> {
    fn visit_ident(&mut self, n: &Ident) {
        self.out.insert(n.sym.to_owned());
    }

    fn visit_binding_ident(&mut self, n: &BindingIdent) {
        // Binding position, only the type annotation may reference something
        n.type_ann.visit_with(self);
    }

    fn visit_assign_expr(&mut self, n: &AssignExpr) {
        // A reassigned binding stays
        if let AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) = &n.left {
            self.out.insert(binding.id.sym.to_owned());
        }
        n.visit_children_with(self);
    }

    fn visit_fn_decl(&mut self, n: &FnDecl) {
        n.function.visit_with(self);
    }

    fn visit_fn_expr(&mut self, n: &FnExpr) {
        n.function.visit_with(self);
    }

    fn visit_class_decl(&mut self, n: &ClassDecl) {
        n.class.visit_with(self);
    }

    fn visit_class_expr(&mut self, n: &ClassExpr) {
        n.class.visit_with(self);
    }

    fn visit_import_decl(&mut self, _: &ImportDecl) {}

    fn visit_named_export(&mut self, n: &NamedExport) {
        // `export { foo } from './bar'` does not reference a local `foo`
        if n.src.is_some() {
            return;
        }

        for specifier in n.specifiers.iter() {
            if let ExportSpecifier::Named(named) = specifier {
                if let ModuleExportName::Ident(orig) = &named.orig {
                    self.out.insert(orig.sym.to_owned());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{parse_js, print};

    fn sweep_after(source: &str, mutate: impl FnOnce(&mut Module)) -> (String, usize) {
        let mut module = parse_js(source);
        let live = find_live_bindings(&module);
        mutate(&mut module);
        let swept = sweep_dead_code(&mut module, &live);
        (print(&module), swept)
    }

    fn drop_item(idx: usize) -> impl FnOnce(&mut Module) {
        move |module: &mut Module| {
            module.body.remove(idx);
        }
    }

    #[test]
    fn it_finds_live_bindings() {
        let module = parse_js(
            r"
            import { a } from 'a';
            import { unusedImport } from 'b';
            const helper = () => a;
            function unused() { return helper(); }
            export const loader = () => helper();
            ",
        );

        let live = find_live_bindings(&module);
        assert!(live.contains("a"));
        assert!(live.contains("helper"));
        assert!(!live.contains("unused"));
        assert!(!live.contains("unusedImport"));
    }

    #[test]
    fn it_sweeps_bindings_feeding_removed_items() {
        let (code, swept) = sweep_after(
            r"
            import { db } from './db.server';
            import { useState } from 'react';
            const query = () => db.select();
            export const loader = () => query();
            export default function Page() { return useState(0); }
            ",
            drop_item(3),
        );

        assert_eq!(swept, 2);
        assert_eq!(
            code,
            print(&parse_js(
                r"
                import { useState } from 'react';
                export default function Page() { return useState(0); }
                "
            ))
        );
    }

    #[test]
    fn it_keeps_bindings_referenced_elsewhere() {
        let (code, swept) = sweep_after(
            r"
            const shared = 1;
            export const loader = () => shared;
            export const meta = () => shared;
            ",
            drop_item(1),
        );

        assert_eq!(swept, 0);
        assert!(code.contains("const shared = 1"));
    }

    #[test]
    fn it_keeps_authored_dead_code() {
        let (code, swept) = sweep_after(
            r"
            const helper = () => 1;
            function neverCalled() { return helper(); }
            export const loader = () => helper();
            ",
            drop_item(2),
        );

        // `neverCalled` was never live and it still needs `helper`
        assert_eq!(swept, 0);
        assert!(code.contains("function neverCalled"));
        assert!(code.contains("const helper"));
    }

    #[test]
    fn it_sweeps_transitively_and_keeps_side_effect_imports() {
        let (code, swept) = sweep_after(
            r"
            import './styles.css';
            import * as server from './server';
            const a = () => server.go();
            const b = () => a();
            export function action() { return b(); }
            export const handle = {};
            ",
            drop_item(4),
        );

        assert_eq!(swept, 3);
        assert!(code.contains("./styles.css"));
        assert!(!code.contains("server"));
        assert!(code.contains("handle"));
    }

    #[test]
    fn it_removes_single_declarators() {
        let (code, swept) = sweep_after(
            r"
            const a = 1, b = 2;
            export const loader = () => a;
            export const meta = () => b;
            ",
            drop_item(1),
        );

        assert_eq!(swept, 1);
        assert!(code.contains("const b = 2"));
        assert!(!code.contains("a = 1"));
    }

    #[test]
    fn it_keeps_reassigned_bindings() {
        let (code, swept) = sweep_after(
            r"
            let counter = 0;
            counter = 1;
            export const loader = () => counter;
            ",
            drop_item(2),
        );

        assert_eq!(swept, 0);
        assert!(code.contains("let counter = 0"));
    }

    #[test]
    fn it_collects_references() {
        let module = parse_js(
            r"
            import { x } from 'x';
            function f(param) { return param + y; }
            export { z as w };
            export { q } from './q';
            ",
        );

        let mut refs = FxHashSet::default();
        module.visit_with(&mut ReferenceCollector::new(&mut refs));
        assert!(refs.contains(&RouteAtom::from("y")));
        assert!(refs.contains(&RouteAtom::from("z")));
        assert!(refs.contains(&RouteAtom::from("param")));
        assert!(!refs.contains(&RouteAtom::from("x")));
        assert!(!refs.contains(&RouteAtom::from("f")));
        assert!(!refs.contains(&RouteAtom::from("w")));
        assert!(!refs.contains(&RouteAtom::from("q")));
    }
}
