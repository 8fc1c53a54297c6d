//! Class checks: constructors that fail to initialize members, missing
//! virtual destructors in base classes, unused private methods, and classes
//! holding allocated memory without a copy constructor.
//!
//! Only inline definitions are analyzed; out-of-line method bodies are
//! beyond the simplified stream's cheap name resolution and are skipped.

use rustc_hash::FxHashSet;

use crate::errorlogger::{ErrorLogger, ErrorMessage, Severity};
use crate::token::{TokenId, TokenKind, TokenList};

use super::{Check, CheckContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Protected,
    Private,
}

#[derive(Debug)]
struct Method {
    name: String,
    name_token: TokenId,
    access: Access,
    is_virtual: bool,
    /// Body braces for inline definitions.
    body: Option<(TokenId, TokenId)>,
    params: (TokenId, TokenId),
}

#[derive(Debug)]
struct ClassInfo {
    name: String,
    name_token: TokenId,
    bases: Vec<String>,
    /// Member variables: (name, var id).
    members: Vec<(String, u32)>,
    methods: Vec<Method>,
}

impl ClassInfo {
    fn constructors(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter().filter(move |m| m.name == self.name)
    }

    fn destructor(&self) -> Option<&Method> {
        self.methods.iter().find(|m| m.name.starts_with('~'))
    }

    fn has_virtual_methods(&self) -> bool {
        self.methods.iter().any(|m| m.is_virtual)
    }

    fn has_copy_constructor(&self, list: &TokenList) -> bool {
        self.constructors().any(|ctor| {
            // A parameter list mentioning the class name by reference.
            let mut cur = list.next(ctor.params.0);
            let mut saw_name = false;
            let mut saw_ref = false;
            while let Some(id) = cur {
                if id == ctor.params.1 {
                    break;
                }
                if list.text(id) == self.name {
                    saw_name = true;
                }
                if list.text(id) == "&" {
                    saw_ref = true;
                }
                cur = list.next(id);
            }
            saw_name && saw_ref
        })
    }
}

pub struct ClassCheck;

impl Check for ClassCheck {
    fn name(&self) -> &'static str {
        "Class"
    }

    fn run_simplified(&self, ctx: &CheckContext<'_>, logger: &mut dyn ErrorLogger) {
        let list = ctx.tokens;
        let classes = parse_classes(list);
        if classes.is_empty() {
            return;
        }

        for class in &classes {
            if ctx.settings.terminated() {
                return;
            }
            check_constructor(list, class, logger);
            check_unused_private(list, class, logger);
            check_copy_constructor(list, class, logger);
        }
        check_virtual_destructors(list, &classes, logger);
    }

    fn error_messages(&self, logger: &mut dyn ErrorLogger) {
        logger.report_err(&ErrorMessage::at(
            Severity::Style,
            "uninitMemberVar",
            "Member variable 'Class::m' is not initialized in the constructor.",
            "",
            0,
        ));
        logger.report_err(&ErrorMessage::at(
            Severity::Style,
            "noConstructor",
            "The class 'Class' does not have a constructor.",
            "",
            0,
        ));
        logger.report_err(&ErrorMessage::at(
            Severity::Error,
            "virtualDestructor",
            "Class 'Base' which is inherited by class 'Derived' does not have a virtual destructor.",
            "",
            0,
        ));
        logger.report_err(&ErrorMessage::at(
            Severity::Style,
            "unusedPrivateFunction",
            "Unused private function: 'Class::f'",
            "",
            0,
        ));
        logger.report_err(&ErrorMessage::at(
            Severity::Style,
            "noCopyConstructor",
            "Class 'Class' does not have a copy constructor which is recommended since the class contains a pointer to allocated memory.",
            "",
            0,
        ));
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_classes(list: &TokenList) -> Vec<ClassInfo> {
    let mut out = Vec::new();
    for id in list.ids() {
        let keyword = list.text(id);
        if keyword != "class" && keyword != "struct" {
            continue;
        }
        let Some(name_token) = list.next(id) else { continue };
        if !list.token(name_token).is_name() {
            continue;
        }
        // Optional base clause, then the body.
        let mut bases = Vec::new();
        let mut cur = list.next(name_token);
        if let Some(colon) = cur.filter(|c| list.text(*c) == ":") {
            let mut walker = list.next(colon);
            while let Some(b) = walker {
                let text = list.text(b);
                if text == "{" {
                    cur = Some(b);
                    break;
                }
                if list.token(b).is_name()
                    && !matches!(text, "public" | "protected" | "private" | "virtual")
                {
                    bases.push(text.to_string());
                }
                walker = list.next(b);
            }
            if bases.is_empty() && walker.is_none() {
                continue;
            }
            cur = walker;
        }
        let Some(body_open) = cur.filter(|c| list.text(*c) == "{") else {
            continue;
        };
        let Some(body_close) = list.link(body_open) else {
            continue;
        };

        let default_access = if keyword == "class" {
            Access::Private
        } else {
            Access::Public
        };
        let mut info = ClassInfo {
            name: list.text(name_token).to_string(),
            name_token,
            bases,
            members: Vec::new(),
            methods: Vec::new(),
        };
        parse_body(list, body_open, body_close, default_access, &mut info);
        out.push(info);
    }
    out
}

fn parse_body(
    list: &TokenList,
    body_open: TokenId,
    body_close: TokenId,
    default_access: Access,
    info: &mut ClassInfo,
) {
    let mut access = default_access;
    let mut statement_start = true;
    let mut is_virtual = false;
    let mut cur = list.next(body_open);

    while let Some(id) = cur {
        if id == body_close {
            break;
        }
        let text = list.text(id);

        match text {
            "public" | "protected" | "private"
                if list.next(id).is_some_and(|n| list.text(n) == ":") =>
            {
                access = match text {
                    "public" => Access::Public,
                    "protected" => Access::Protected,
                    _ => Access::Private,
                };
                cur = list.at(id, 2);
                statement_start = true;
                is_virtual = false;
                continue;
            }
            "virtual" => {
                is_virtual = true;
                cur = list.next(id);
                continue;
            }
            ";" => {
                statement_start = true;
                is_virtual = false;
                cur = list.next(id);
                continue;
            }
            "~" => {
                // Destructor: ~ Name ( ) ...
                if let Some(dtor_name) = list.next(id) {
                    if let Some(open) = list.next(dtor_name).filter(|n| list.text(*n) == "(") {
                        if let Some(close) = list.link(open) {
                            let body = method_body(list, close);
                            info.methods.push(Method {
                                name: format!("~{}", list.text(dtor_name)),
                                name_token: dtor_name,
                                access,
                                is_virtual,
                                body,
                                params: (open, close),
                            });
                            cur = skip_method(list, close, body);
                            statement_start = false;
                            is_virtual = false;
                            continue;
                        }
                    }
                }
                cur = list.next(id);
                continue;
            }
            _ => {}
        }

        let tok = list.token(id);
        if tok.is_name() {
            // Method: name followed by a linked parameter list.
            if tok.kind == TokenKind::Identifier {
                if let Some(open) = list.next(id).filter(|n| list.text(*n) == "(") {
                    if let Some(close) = list.link(open) {
                        // Distinguish a method from a call inside an inline
                        // body by statement position.
                        if statement_start || is_method_name(list, id) {
                            let body = method_body(list, close);
                            info.methods.push(Method {
                                name: tok.text.clone(),
                                name_token: id,
                                access,
                                is_virtual,
                                body,
                                params: (open, close),
                            });
                            cur = skip_method(list, close, body);
                            statement_start = false;
                            is_virtual = false;
                            continue;
                        }
                    }
                }
                // Member variable: name terminated by `;`.
                if tok.var_id != 0 && list.next(id).is_some_and(|n| list.text(n) == ";") {
                    info.members.push((tok.text.clone(), tok.var_id));
                }
            }
            statement_start = false;
        } else if matches!(text, "{" | "}") {
            statement_start = true;
        } else {
            statement_start = false;
        }
        cur = list.next(id);
    }
}

/// The `{`/`}` pair of an inline method body following its `)`.
fn method_body(list: &TokenList, params_close: TokenId) -> Option<(TokenId, TokenId)> {
    let mut cur = list.next(params_close);
    // Skip qualifiers and an initializer list up to the body.
    let mut guard = 0;
    while let Some(id) = cur {
        match list.text(id) {
            "{" => return list.link(id).map(|close| (id, close)),
            ";" => return None,
            _ => cur = list.next(id),
        }
        guard += 1;
        if guard > 64 {
            return None;
        }
    }
    None
}

fn skip_method(
    list: &TokenList,
    params_close: TokenId,
    body: Option<(TokenId, TokenId)>,
) -> Option<TokenId> {
    match body {
        Some((_, close)) => list.next(close),
        None => list.next(params_close),
    }
}

/// Heuristic: a name directly preceded by a type (or `~`) is a declaration.
fn is_method_name(list: &TokenList, id: TokenId) -> bool {
    let Some(prev) = list.prev(id) else {
        return false;
    };
    let p = list.token(prev);
    p.flags.is_standard_type || p.kind == TokenKind::TypeName || p.text == "*" || p.text == "&"
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Constructor exists but leaves members unwritten, or no constructor at
/// all while the class has data members.
fn check_constructor(list: &TokenList, class: &ClassInfo, logger: &mut dyn ErrorLogger) {
    if class.members.is_empty() {
        return;
    }
    let ctors: Vec<&Method> = class.constructors().collect();
    if ctors.is_empty() {
        logger.report_err(&ErrorMessage::new(
            Severity::Style,
            "noConstructor",
            format!("The class '{}' does not have a constructor.", class.name),
            vec![list.location(class.name_token)],
        ));
        return;
    }
    for ctor in ctors {
        let Some((body_open, body_close)) = ctor.body else {
            continue;
        };
        let initialized = initialized_members(list, ctor, body_open, body_close);
        for (name, _) in &class.members {
            if !initialized.contains(name) {
                logger.report_err(&ErrorMessage::new(
                    Severity::Style,
                    "uninitMemberVar",
                    format!(
                        "Member variable '{}::{}' is not initialized in the constructor.",
                        class.name, name
                    ),
                    vec![list.location(ctor.name_token)],
                ));
            }
        }
    }
}

/// Member names written by the constructor: `m = ...` in the body or
/// `m(...)` in the initializer list. Matching is by name because a member is
/// visible in method bodies before its declaration point.
fn initialized_members(
    list: &TokenList,
    ctor: &Method,
    body_open: TokenId,
    body_close: TokenId,
) -> FxHashSet<String> {
    let mut out = FxHashSet::default();
    // Initializer list between `)` and `{`.
    let mut cur = list.next(ctor.params.1);
    while let Some(id) = cur {
        if id == body_open {
            break;
        }
        let tok = list.token(id);
        if tok.kind == TokenKind::Identifier
            && list.next(id).is_some_and(|n| list.text(n) == "(")
        {
            out.insert(tok.text.clone());
        }
        cur = list.next(id);
    }
    // Assignments in the body.
    let mut cur = list.next(body_open);
    while let Some(id) = cur {
        if id == body_close {
            break;
        }
        let tok = list.token(id);
        if tok.kind == TokenKind::Identifier
            && list
                .next(id)
                .is_some_and(|n| matches!(list.text(n), "=" | "["))
        {
            out.insert(tok.text.clone());
        }
        cur = list.next(id);
    }
    out
}

fn check_unused_private(list: &TokenList, class: &ClassInfo, logger: &mut dyn ErrorLogger) {
    for method in &class.methods {
        if method.access != Access::Private
            || method.name == class.name
            || method.name.starts_with('~')
            || method.name == "operator"
        {
            continue;
        }
        let called = class.methods.iter().any(|m| {
            let Some((body_open, body_close)) = m.body else {
                return false;
            };
            let mut cur = list.next(body_open);
            while let Some(id) = cur {
                if id == body_close {
                    break;
                }
                if id != method.name_token
                    && list.text(id) == method.name
                    && list.next(id).is_some_and(|n| list.text(n) == "(")
                {
                    return true;
                }
                cur = list.next(id);
            }
            false
        });
        if !called {
            logger.report_err(&ErrorMessage::new(
                Severity::Style,
                "unusedPrivateFunction",
                format!("Unused private function: '{}::{}'", class.name, method.name),
                vec![list.location(method.name_token)],
            ));
        }
    }
}

fn check_copy_constructor(list: &TokenList, class: &ClassInfo, logger: &mut dyn ErrorLogger) {
    let allocates = class.constructors().any(|ctor| {
        let Some((body_open, body_close)) = ctor.body else {
            return false;
        };
        let mut cur = list.next(body_open);
        while let Some(id) = cur {
            if id == body_close {
                break;
            }
            if list.text(id) == "new" {
                return true;
            }
            cur = list.next(id);
        }
        false
    });
    if allocates && !class.has_copy_constructor(list) {
        logger.report_err(&ErrorMessage::new(
            Severity::Style,
            "noCopyConstructor",
            format!(
                "Class '{}' does not have a copy constructor which is recommended since the class contains a pointer to allocated memory.",
                class.name
            ),
            vec![list.location(class.name_token)],
        ));
    }
}

/// A base class with virtual methods needs a virtual destructor.
fn check_virtual_destructors(
    list: &TokenList,
    classes: &[ClassInfo],
    logger: &mut dyn ErrorLogger,
) {
    for class in classes {
        for base_name in &class.bases {
            let Some(base) = classes.iter().find(|c| &c.name == base_name) else {
                continue;
            };
            if !base.has_virtual_methods() {
                continue;
            }
            let dtor_is_virtual = base.destructor().is_some_and(|d| d.is_virtual);
            if !dtor_is_virtual {
                logger.report_err(&ErrorMessage::new(
                    Severity::Error,
                    "virtualDestructor",
                    format!(
                        "Class '{}' which is inherited by class '{}' does not have a virtual destructor.",
                        base.name, class.name
                    ),
                    vec![list.location(base.name_token)],
                ));
            }
        }
    }
}
