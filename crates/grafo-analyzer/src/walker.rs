//! Semantic extraction from parsed C# syntax trees
//!
//! The walker derives fully qualified names from the namespace/type nesting
//! context rather than source text, and binds invocation receivers through
//! the declaration universe whenever a field, property, local, or parameter
//! type is known. Lines and columns are 1-indexed.

use std::collections::HashMap;
use std::path::Path;

use grafo_core::model::{
    Accessibility, Extraction, ImplementationRelation, InheritanceRelation, MethodInvocation,
    SymbolKind, SymbolRecord, TypeUsage,
};
use tree_sitter::Node;

use crate::compilation::TypeUniverse;
use crate::parser_pool::ParsedSource;

/// A type declaration found by the pre-binding scan.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredType {
    pub name: String,
    pub fully_qualified_name: String,
    pub kind: SymbolKind,
}

/// Walk one bound file and emit its symbols and relation streams.
pub fn walk_file(source: &ParsedSource, project: &str, universe: &TypeUniverse) -> Extraction {
    let mut walker = FileWalker {
        text: &source.text,
        file: &source.path,
        project,
        universe,
        out: Extraction::default(),
    };
    let mut scope = Scope::default();
    walker.visit_children(source.tree.root_node(), &mut scope);
    walker.out
}

/// Light pre-pass collecting every type declaration with its fully
/// qualified name, used to build the solution-wide declaration universe
/// before relation extraction.
pub fn collect_declarations(source: &ParsedSource) -> Vec<DeclaredType> {
    fn scan(node: Node, text: &str, namespace: &mut Vec<String>, out: &mut Vec<DeclaredType>) {
        match node.kind() {
            "namespace_declaration" | "file_scoped_namespace_declaration" => {
                let pushed = node
                    .child_by_field_name("name")
                    .map(|n| node_text(n, text))
                    .filter(|n| !n.is_empty());
                if let Some(name) = &pushed {
                    namespace.push(name.clone());
                }
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    scan(child, text, namespace, out);
                }
                if pushed.is_some() && node.kind() == "namespace_declaration" {
                    namespace.pop();
                }
                return;
            }
            "class_declaration" | "interface_declaration" | "struct_declaration"
            | "enum_declaration" | "record_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = node_text(name_node, text);
                    let kind = type_kind_of(node.kind());
                    namespace.push(name.clone());
                    out.push(DeclaredType {
                        name,
                        fully_qualified_name: namespace.join("."),
                        kind,
                    });
                    let mut cursor = node.walk();
                    for child in node.children(&mut cursor) {
                        scan(child, text, namespace, out);
                    }
                    namespace.pop();
                    return;
                }
            }
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            scan(child, text, namespace, out);
        }
    }

    let mut out = Vec::new();
    let mut namespace = Vec::new();
    scan(source.tree.root_node(), &source.text, &mut namespace, &mut out);
    out
}

fn type_kind_of(node_kind: &str) -> SymbolKind {
    match node_kind {
        "interface_declaration" => SymbolKind::Interface,
        // records are value-type-like
        "struct_declaration" | "record_declaration" => SymbolKind::Struct,
        "enum_declaration" => SymbolKind::Enum,
        _ => SymbolKind::Class,
    }
}

/// The usual convention: leading `I` followed by an uppercase letter.
/// Only consulted when the universe cannot bind the base symbol.
pub fn looks_like_interface(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('I') && chars.next().is_some_and(|c| c.is_ascii_uppercase())
}

/// Strip a generic parameter list: `List<Order>` → `List`.
pub fn strip_generic(name: &str) -> &str {
    match name.find('<') {
        Some(pos) => &name[..pos],
        None => name,
    }
}

// ── Walk state ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct TypeScope {
    name: String,
    fqn: String,
    /// Field and property names mapped to their declared type text.
    members: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
struct MethodScope {
    name: String,
    /// Parameters and locals mapped to their declared type text.
    locals: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
struct Scope {
    namespace: Vec<String>,
    types: Vec<TypeScope>,
    method: Option<MethodScope>,
}

impl Scope {
    fn fqn_of(&self, name: &str) -> String {
        let mut parts: Vec<&str> = self.namespace.iter().map(String::as_str).collect();
        parts.extend(self.types.iter().map(|t| t.name.as_str()));
        parts.push(name);
        parts.join(".")
    }

    fn current_type(&self) -> Option<&TypeScope> {
        self.types.last()
    }
}

struct FileWalker<'a> {
    text: &'a str,
    file: &'a Path,
    project: &'a str,
    universe: &'a TypeUniverse,
    out: Extraction,
}

impl<'a> FileWalker<'a> {
    fn visit_children(&mut self, node: Node, scope: &mut Scope) {
        let mut pushed_file_ns = 0usize;
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            if child.kind() == "file_scoped_namespace_declaration" {
                if let Some(name) = child.child_by_field_name("name") {
                    scope.namespace.push(self.node_text(name));
                    pushed_file_ns += 1;
                }
                // Declarations may be nested under the node or trail it as
                // siblings; both see the pushed namespace.
                self.visit_children(child, scope);
                continue;
            }
            self.visit(child, scope);
        }
        for _ in 0..pushed_file_ns {
            scope.namespace.pop();
        }
    }

    fn visit(&mut self, node: Node, scope: &mut Scope) {
        match node.kind() {
            "namespace_declaration" => {
                let pushed = node.child_by_field_name("name").map(|n| self.node_text(n));
                if let Some(name) = &pushed {
                    scope.namespace.push(name.clone());
                }
                self.visit_children(node, scope);
                if pushed.is_some() {
                    scope.namespace.pop();
                }
            }
            "class_declaration" | "interface_declaration" | "struct_declaration"
            | "record_declaration" => {
                self.handle_type_declaration(node, scope);
            }
            "enum_declaration" => {
                self.handle_enum_declaration(node, scope);
            }
            "method_declaration" => {
                self.handle_method(node, scope, None);
            }
            "constructor_declaration" => {
                self.handle_method(node, scope, Some(".ctor".to_string()));
            }
            "property_declaration" => {
                self.handle_property(node, scope);
            }
            "field_declaration" => {
                self.handle_field(node, scope);
            }
            "variable_declaration" => {
                self.handle_variable_declaration(node, scope);
                self.visit_children(node, scope);
            }
            "invocation_expression" => {
                self.handle_invocation(node, scope);
                self.visit_children(node, scope);
            }
            "object_creation_expression" => {
                if let Some(type_node) = node.child_by_field_name("type") {
                    self.emit_type_usage(type_node, scope);
                }
                self.visit_children(node, scope);
            }
            _ => self.visit_children(node, scope),
        }
    }

    // ── Declarations ────────────────────────────────────────────────────

    fn handle_type_declaration(&mut self, node: Node, scope: &mut Scope) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.node_text(name_node);
        let fqn = scope.fqn_of(&name);
        let kind = type_kind_of(node.kind());
        let modifiers = self.modifiers_of(node);

        self.emit_symbol(&name, &fqn, kind, node, &modifiers, None);
        self.handle_base_list(node, &fqn);

        let members = self.scan_member_types(node);
        scope.types.push(TypeScope { name, fqn, members });
        self.visit_children(node, scope);
        scope.types.pop();
    }

    fn handle_enum_declaration(&mut self, node: Node, scope: &mut Scope) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.node_text(name_node);
        let fqn = scope.fqn_of(&name);
        let modifiers = self.modifiers_of(node);
        // Enum members fold into the enum symbol itself.
        self.emit_symbol(&name, &fqn, SymbolKind::Enum, node, &modifiers, None);
    }

    /// One inheritance relation per non-interface base, one implementation
    /// relation per interface base. The bound kind from the declaration
    /// universe takes precedence over the naming convention.
    fn handle_base_list(&mut self, node: Node, derived_fqn: &str) {
        let mut cursor = node.walk();
        let Some(base_list) = node.children(&mut cursor).find(|c| c.kind() == "base_list") else {
            return;
        };
        let mut cursor = base_list.walk();
        for base in base_list.named_children(&mut cursor) {
            let raw = normalize_type_text(&self.node_text(base));
            if raw.is_empty() {
                continue;
            }
            // Base positions count as type usages of the derived type.
            self.push_usage(raw.clone(), derived_fqn.to_string(), None);

            let simple = strip_generic(raw.rsplit('.').next().unwrap_or(&raw));
            let (target, is_interface) = match self.universe.resolve(&raw) {
                Some((bound_fqn, kind)) => {
                    (bound_fqn.to_string(), kind == SymbolKind::Interface)
                }
                None => (raw.clone(), looks_like_interface(simple)),
            };

            if is_interface {
                self.out.implementations.push(ImplementationRelation {
                    implementing_type: derived_fqn.to_string(),
                    interface_type: target,
                });
            } else {
                self.out.inheritance.push(InheritanceRelation {
                    derived_type: derived_fqn.to_string(),
                    base_type: target,
                });
            }
        }
    }

    fn handle_method(&mut self, node: Node, scope: &mut Scope, forced_name: Option<String>) {
        let name = match forced_name {
            Some(n) => n,
            None => match node.child_by_field_name("name") {
                Some(n) => self.node_text(n),
                None => return,
            },
        };
        if scope.current_type().is_none() {
            return;
        }
        let fqn = format!("{}.{}", scope.current_type().unwrap().fqn, name);
        let modifiers = self.modifiers_of(node);

        let mut locals = HashMap::new();
        let mut signature_params = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                if param.kind() != "parameter" {
                    continue;
                }
                let type_text = param
                    .child_by_field_name("type")
                    .map(|t| {
                        self.emit_type_usage_in_method(t, scope, &name);
                        normalize_type_text(&self.node_text(t))
                    })
                    .unwrap_or_default();
                let param_name = param
                    .child_by_field_name("name")
                    .map(|n| self.node_text(n))
                    .unwrap_or_default();
                if !param_name.is_empty() && !type_text.is_empty() {
                    locals.insert(param_name.clone(), type_text.clone());
                }
                signature_params.push(match (type_text.as_str(), param_name.as_str()) {
                    ("", p) => p.to_string(),
                    (t, "") => t.to_string(),
                    (t, p) => format!("{} {}", t, p),
                });
            }
        }
        let signature = format!("{}({})", name, signature_params.join(", "));

        self.emit_symbol(
            &name,
            &fqn,
            SymbolKind::Method,
            node,
            &modifiers,
            Some(signature),
        );

        // Return type (absent for constructors and void).
        if let Some(returns) = node
            .child_by_field_name("returns")
            .or_else(|| node.child_by_field_name("type"))
        {
            self.emit_type_usage_in_method(returns, scope, &name);
        }

        let previous = scope.method.replace(MethodScope {
            name: name.clone(),
            locals,
        });
        self.visit_children(node, scope);
        scope.method = previous;
    }

    fn handle_property(&mut self, node: Node, scope: &mut Scope) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        if scope.current_type().is_none() {
            return;
        }
        let name = self.node_text(name_node);
        let fqn = format!("{}.{}", scope.current_type().unwrap().fqn, name);
        let modifiers = self.modifiers_of(node);
        self.emit_symbol(&name, &fqn, SymbolKind::Property, node, &modifiers, None);

        if let Some(type_node) = node.child_by_field_name("type") {
            self.emit_type_usage(type_node, scope);
        }

        // Accessor bodies attribute their invocations to the property.
        let previous = scope.method.replace(MethodScope {
            name,
            locals: HashMap::new(),
        });
        self.visit_children(node, scope);
        scope.method = previous;
    }

    fn handle_field(&mut self, node: Node, scope: &mut Scope) {
        if scope.current_type().is_none() {
            return;
        }
        let mut cursor = node.walk();
        let Some(declaration) = node
            .children(&mut cursor)
            .find(|c| c.kind() == "variable_declaration")
        else {
            return;
        };
        let type_node = declaration.child_by_field_name("type");
        if let Some(t) = type_node {
            self.emit_type_usage(t, scope);
        }
        let modifiers = self.modifiers_of(node);

        let mut cursor = declaration.walk();
        for declarator in declaration.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let name = declarator
                .child_by_field_name("name")
                .or_else(|| declarator.named_child(0))
                .map(|n| self.node_text(n))
                .unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            let fqn = format!("{}.{}", scope.current_type().unwrap().fqn, name);
            self.emit_symbol(&name, &fqn, SymbolKind::Field, declarator, &modifiers, None);
        }

        // Field initializers may contain invocations.
        self.visit_children(node, scope);
    }

    fn handle_variable_declaration(&mut self, node: Node, scope: &mut Scope) {
        // Locals only; fields route through handle_field.
        if scope.method.is_none() {
            return;
        }
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        self.emit_type_usage(type_node, scope);
        let type_text = normalize_type_text(&self.node_text(type_node));
        if type_text.is_empty() || type_text == "var" {
            return;
        }
        let mut cursor = node.walk();
        let names: Vec<String> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "variable_declarator")
            .filter_map(|d| {
                d.child_by_field_name("name")
                    .or_else(|| d.named_child(0))
                    .map(|n| self.node_text(n))
            })
            .collect();
        if let Some(method) = scope.method.as_mut() {
            for name in names {
                method.locals.insert(name, type_text.clone());
            }
        }
    }

    // ── Invocations ─────────────────────────────────────────────────────

    fn handle_invocation(&mut self, node: Node, scope: &Scope) {
        let Some(current_type) = scope.current_type() else {
            return;
        };
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };

        let mut tokens = Vec::new();
        self.access_tokens(function, &mut tokens);
        if tokens.is_empty() {
            return;
        }

        let method = tokens.pop().unwrap();
        let receiver = self.bind_receiver(tokens, scope);
        let expression = if receiver.is_empty() {
            // Self-call; the receiver is the enclosing type.
            format!("{}.{}", current_type.name, method)
        } else {
            format!("{}.{}", receiver.join("."), method)
        };

        self.out.invocations.push(MethodInvocation {
            caller_type: current_type.fqn.clone(),
            caller_method: scope.method.as_ref().map(|m| m.name.clone()),
            caller_project: self.project.to_string(),
            invocation_expression: expression,
        });
    }

    /// Flatten a callable expression into its dotted token path, dropping
    /// argument lists and generic arity along the way.
    fn access_tokens(&self, node: Node, out: &mut Vec<String>) {
        match node.kind() {
            "member_access_expression" => {
                if let Some(expression) = node.child_by_field_name("expression") {
                    self.access_tokens(expression, out);
                }
                if let Some(name) = node.child_by_field_name("name") {
                    out.push(strip_generic(&self.node_text(name)).to_string());
                }
            }
            "conditional_access_expression" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.access_tokens(child, out);
                }
            }
            "member_binding_expression" => {
                if let Some(name) = node.child_by_field_name("name") {
                    out.push(strip_generic(&self.node_text(name)).to_string());
                }
            }
            "invocation_expression" => {
                // Chained call: keep the callee path, the call itself adds
                // no token.
                if let Some(function) = node.child_by_field_name("function") {
                    self.access_tokens(function, out);
                }
            }
            "element_access_expression" | "parenthesized_expression" | "cast_expression"
            | "await_expression" => {
                let mut cursor = node.walk();
                if let Some(first) = node.named_children(&mut cursor).next() {
                    self.access_tokens(first, out);
                }
            }
            "generic_name" => {
                out.push(strip_generic(&self.node_text(node)).to_string());
            }
            "identifier" | "this_expression" | "base_expression" => {
                out.push(self.node_text(node));
            }
            "qualified_name" => {
                for part in self.node_text(node).split('.') {
                    out.push(strip_generic(part).to_string());
                }
            }
            _ => {}
        }
    }

    /// Replace the first receiver token with its bound type when the
    /// declaration context knows it (locals, parameters, fields,
    /// properties); `this`/`base` vanish so self members bind next.
    fn bind_receiver(&self, tokens: Vec<String>, scope: &Scope) -> Vec<String> {
        let mut tokens = tokens;
        if matches!(tokens.first().map(String::as_str), Some("this") | Some("base")) {
            tokens.remove(0);
        }
        let mut bound = false;
        if let Some(first) = tokens.first_mut() {
            if let Some(method) = &scope.method {
                if let Some(t) = method.locals.get(first.as_str()) {
                    *first = strip_generic(t).to_string();
                    bound = true;
                }
            }
            if !bound {
                if let Some(t) = scope
                    .current_type()
                    .and_then(|ty| ty.members.get(first.as_str()))
                {
                    *first = strip_generic(t).to_string();
                }
            }
        }
        tokens
    }

    // ── Type usages ─────────────────────────────────────────────────────

    fn emit_type_usage(&mut self, node: Node, scope: &Scope) {
        let method = scope.method.as_ref().map(|m| m.name.clone());
        self.emit_type_usage_inner(node, scope, method);
    }

    fn emit_type_usage_in_method(&mut self, node: Node, scope: &Scope, method: &str) {
        self.emit_type_usage_inner(node, scope, Some(method.to_string()));
    }

    fn emit_type_usage_inner(&mut self, node: Node, scope: &Scope, method: Option<String>) {
        let Some(current_type) = scope.current_type() else {
            return;
        };
        match node.kind() {
            "predefined_type" => {}
            "nullable_type" | "array_type" | "pointer_type" => {
                if let Some(inner) = node
                    .child_by_field_name("type")
                    .or_else(|| node.named_child(0))
                {
                    self.emit_type_usage_inner(inner, scope, method);
                }
            }
            "tuple_type" => {
                let mut cursor = node.walk();
                for element in node.named_children(&mut cursor) {
                    if let Some(inner) = element.child_by_field_name("type") {
                        self.emit_type_usage_inner(inner, scope, method.clone());
                    }
                }
            }
            "generic_name" => {
                self.push_usage(
                    normalize_type_text(&self.node_text(node)),
                    current_type.fqn.clone(),
                    method.clone(),
                );
                let mut cursor = node.walk();
                if let Some(args) = node
                    .named_children(&mut cursor)
                    .find(|c| c.kind() == "type_argument_list")
                {
                    let mut cursor = args.walk();
                    for arg in args.named_children(&mut cursor) {
                        self.emit_type_usage_inner(arg, scope, method.clone());
                    }
                }
            }
            "identifier" | "qualified_name" => {
                let text = normalize_type_text(&self.node_text(node));
                if text != "var" && !text.is_empty() {
                    self.push_usage(text, current_type.fqn.clone(), method);
                }
            }
            _ => {
                let text = normalize_type_text(&self.node_text(node));
                if !text.is_empty()
                    && text != "var"
                    && text != "void"
                    && text.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                {
                    self.push_usage(text, current_type.fqn.clone(), method);
                }
            }
        }
    }

    fn push_usage(&mut self, type_name: String, used_in_type: String, method: Option<String>) {
        self.out.type_usages.push(TypeUsage {
            used_in_type,
            used_in_method: method,
            used_in_project: self.project.to_string(),
            type_name,
        });
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn emit_symbol(
        &mut self,
        name: &str,
        fqn: &str,
        kind: SymbolKind,
        node: Node,
        modifiers: &[String],
        signature: Option<String>,
    ) {
        let position = node.start_position();
        self.out.symbols.push(SymbolRecord {
            name: name.to_string(),
            fully_qualified_name: fqn.to_string(),
            kind,
            project: self.project.to_string(),
            file: self.file.to_path_buf(),
            line: position.row as u32 + 1,
            column: position.column as u32 + 1,
            accessibility: accessibility_from(modifiers),
            is_abstract: modifiers.iter().any(|m| m == "abstract"),
            is_static: modifiers.iter().any(|m| m == "static"),
            is_sealed: modifiers.iter().any(|m| m == "sealed"),
            signature,
        });
    }

    /// Field and property declared types of a type body, for receiver
    /// binding inside its methods.
    fn scan_member_types(&self, type_node: Node) -> HashMap<String, String> {
        let mut members = HashMap::new();
        let Some(body) = type_node.child_by_field_name("body") else {
            return members;
        };
        let mut cursor = body.walk();
        for declaration in body.named_children(&mut cursor) {
            match declaration.kind() {
                "field_declaration" => {
                    let mut inner = declaration.walk();
                    if let Some(variable) = declaration
                        .children(&mut inner)
                        .find(|c| c.kind() == "variable_declaration")
                    {
                        let Some(type_text) = variable
                            .child_by_field_name("type")
                            .map(|t| normalize_type_text(&self.node_text(t)))
                        else {
                            continue;
                        };
                        let mut decl_cursor = variable.walk();
                        for declarator in variable.named_children(&mut decl_cursor) {
                            if declarator.kind() != "variable_declarator" {
                                continue;
                            }
                            if let Some(name) = declarator
                                .child_by_field_name("name")
                                .or_else(|| declarator.named_child(0))
                            {
                                members.insert(self.node_text(name), type_text.clone());
                            }
                        }
                    }
                }
                "property_declaration" => {
                    let name = declaration
                        .child_by_field_name("name")
                        .map(|n| self.node_text(n));
                    let type_text = declaration
                        .child_by_field_name("type")
                        .map(|t| normalize_type_text(&self.node_text(t)));
                    if let (Some(name), Some(type_text)) = (name, type_text) {
                        members.insert(name, type_text);
                    }
                }
                _ => {}
            }
        }
        members
    }

    fn modifiers_of(&self, node: Node) -> Vec<String> {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .filter(|c| c.kind() == "modifier")
            .map(|c| self.node_text(c))
            .collect()
    }

    fn node_text(&self, node: Node) -> String {
        node_text(node, self.text)
    }
}

fn node_text(node: Node, text: &str) -> String {
    node.utf8_text(text.as_bytes()).unwrap_or("").to_string()
}

fn accessibility_from(modifiers: &[String]) -> Option<Accessibility> {
    let has = |m: &str| modifiers.iter().any(|x| x == m);
    if has("public") {
        Some(Accessibility::Public)
    } else if has("private") && has("protected") {
        Some(Accessibility::PrivateProtected)
    } else if has("protected") && has("internal") {
        Some(Accessibility::ProtectedInternal)
    } else if has("protected") {
        Some(Accessibility::Protected)
    } else if has("internal") {
        Some(Accessibility::Internal)
    } else if has("private") {
        Some(Accessibility::Private)
    } else {
        None
    }
}

/// Collapse whitespace inside a type expression: `List< Order >` →
/// `List<Order>`.
fn normalize_type_text(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
