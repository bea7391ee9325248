//! Script builder
//!
//! Structured model of a flow script: an ordered list of statements grouped
//! into definitions, rendered by one serializer. Generated text is plain
//! data until submission, so every shape is unit-testable without a network
//! call.

use serde_json::Value;
use std::fmt::Write;

const INDENT: &str = "    ";

/// The fixed per-job execution bound baked into every synthesized script.
pub const SCRIPT_TIMEOUT: &str = "1h";

/// One flow statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `name = expr`
    Assign { name: String, expr: String },
    /// `export expr as "name"` - binds a value to a named job output
    Export { name: String, expr: String },
    /// Bare call expression, evaluated for effect
    Call(String),
    /// `raise expr`
    Raise(String),
}

impl Stmt {
    pub fn assign(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Stmt::Assign {
            name: name.into(),
            expr: expr.into(),
        }
    }

    pub fn export(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Stmt::Export {
            name: name.into(),
            expr: expr.into(),
        }
    }

    pub fn call(expr: impl Into<String>) -> Self {
        Stmt::Call(expr.into())
    }

    pub fn raise(expr: impl Into<String>) -> Self {
        Stmt::Raise(expr.into())
    }

    fn render(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str(INDENT);
        }
        match self {
            Stmt::Assign { name, expr } => {
                let _ = writeln!(out, "{} = {}", name, expr);
            }
            Stmt::Export { name, expr } => {
                let _ = writeln!(out, "export {} as \"{}\"", expr, name);
            }
            Stmt::Call(expr) => {
                let _ = writeln!(out, "{}", expr);
            }
            Stmt::Raise(expr) => {
                let _ = writeln!(out, "raise {}", expr);
            }
        }
    }
}

/// One `define name(params) [return a, b] do ... end` block.
#[derive(Debug, Clone, Default)]
pub struct Definition {
    name: String,
    params: Vec<String>,
    returns: Vec<String>,
    on_error: Vec<Stmt>,
    body: Vec<Stmt>,
}

impl Definition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    /// Declare named return bindings. Their presence marks the definition as
    /// output-bearing.
    pub fn returns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.returns = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn stmt(mut self, stmt: Stmt) -> Self {
        self.body.push(stmt);
        self
    }

    /// Attach an error handler rendered as a `sub on error do ... end`
    /// prologue. Raising inside the handler replaces the original failure
    /// with a descriptive one instead of silently unwinding.
    pub fn on_error<I>(mut self, stmts: I) -> Self
    where
        I: IntoIterator<Item = Stmt>,
    {
        self.on_error = stmts.into_iter().collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, out: &mut String, wrap_timeout: bool) {
        let _ = write!(out, "define {}({})", self.name, self.params.join(", "));
        if !self.returns.is_empty() {
            let _ = write!(out, " return {}", self.returns.join(", "));
        }
        out.push_str(" do\n");

        let mut depth = 1;
        if !self.on_error.is_empty() {
            for _ in 0..depth {
                out.push_str(INDENT);
            }
            out.push_str("sub on error do\n");
            for stmt in &self.on_error {
                stmt.render(out, depth + 1);
            }
            for _ in 0..depth {
                out.push_str(INDENT);
            }
            out.push_str("end\n");
        }

        if wrap_timeout {
            for _ in 0..depth {
                out.push_str(INDENT);
            }
            let _ = writeln!(out, "sub timeout: {} do", SCRIPT_TIMEOUT);
            depth += 1;
        }
        for stmt in &self.body {
            stmt.render(out, depth);
        }
        if wrap_timeout {
            depth -= 1;
            for _ in 0..depth {
                out.push_str(INDENT);
            }
            out.push_str("end\n");
        }
        out.push_str("end\n");
    }
}

/// A complete script: a `main` definition whose body runs under the standard
/// bounded-timeout block, plus auxiliary definitions for composite
/// operations.
#[derive(Debug, Clone)]
pub struct Script {
    main: Definition,
    aux: Vec<Definition>,
}

impl Script {
    /// Script with a plain `main()` built from the given statements.
    pub fn main<I>(body: I) -> Self
    where
        I: IntoIterator<Item = Stmt>,
    {
        let mut main = Definition::new("main");
        for stmt in body {
            main = main.stmt(stmt);
        }
        Self {
            main,
            aux: Vec::new(),
        }
    }

    /// Append an auxiliary definition, rendered after `main`.
    pub fn aux(mut self, def: Definition) -> Self {
        self.aux.push(def);
        self
    }

    /// Render the whole script through a single serializer.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.main.render(&mut out, true);
        for def in &self.aux {
            out.push('\n');
            def.render(&mut out, false);
        }
        out
    }
}

/// Render a string as a flow string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Render a JSON value as a flow object/array literal. Flow literals are a
/// superset of JSON, so the serialized form can be spliced verbatim.
pub fn json_literal(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_main_inside_timeout_block() {
        let script = Script::main([
            Stmt::assign("target", "cloud.get(\"/foo/1\")"),
            Stmt::export("type", "target.type"),
        ])
        .render();

        assert_eq!(
            script,
            "define main() do\n\
             \x20   sub timeout: 1h do\n\
             \x20       target = cloud.get(\"/foo/1\")\n\
             \x20       export target.type as \"type\"\n\
             \x20   end\n\
             end\n"
        );
    }

    #[test]
    fn renders_return_clause_only_when_declared() {
        let without = Script::main([Stmt::call("target.destroy()")]).render();
        assert!(!without.contains("return"));

        let mut out = String::new();
        Definition::new("lease")
            .returns(["token", "expiry"])
            .stmt(Stmt::assign("token", "lock.acquire()"))
            .render(&mut out, false);
        assert!(out.starts_with("define lease() return token, expiry do\n"));
    }

    #[test]
    fn renders_aux_definitions_after_main() {
        let script = Script::main([Stmt::call("wait_ready(created)")])
            .aux(
                Definition::new("wait_ready")
                    .param("target")
                    .on_error([Stmt::raise("\"did not reach a ready state\"")])
                    .stmt(Stmt::call("target.await_state(\"READY\")")),
            )
            .render();

        let main_pos = script.find("define main()").expect("main present");
        let aux_pos = script.find("define wait_ready(target)").expect("aux present");
        assert!(main_pos < aux_pos);
        assert!(script.contains("sub on error do\n        raise \"did not reach a ready state\"\n    end\n"));
    }

    #[test]
    fn quote_escapes_specials() {
        assert_eq!(quote("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
    }

    #[test]
    fn json_literal_is_valid_flow_source() {
        let v = json!({ "cpu": 2, "tags": ["a", "b"], "on": false });
        assert_eq!(json_literal(&v), v.to_string());
    }
}
