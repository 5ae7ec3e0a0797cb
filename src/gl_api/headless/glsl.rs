//! Interface checking for the small GLSL dialect the headless context accepts.
//!
//! This is not a compiler. It resolves the global `in`/`out`/`uniform`
//! declarations of a stage and checks that every name used inside function
//! bodies was declared somewhere, which is enough to reject the common
//! mistakes (typos, writing an output that does not exist) with a log in the
//! same shape a driver would produce.

use std::collections::HashSet;

use crate::gl_api::context::ShaderType;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: String,
    /// Explicit `layout(location = N)`, if any.
    pub location: Option<u32>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Interface {
    pub version: String,
    pub inputs: Vec<Variable>,
    pub outputs: Vec<Variable>,
    pub uniforms: Vec<Variable>,
    pub has_main: bool,
}

/// An active vertex attribute of a linked program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub ty: String,
    pub location: u32,
}

const TYPES: &[&str] = &[
    "void", "bool", "int", "uint", "float", "vec2", "vec3", "vec4", "ivec2", "ivec3", "ivec4",
    "uvec2", "uvec3", "uvec4", "bvec2", "bvec3", "bvec4", "mat2", "mat3", "mat4", "mat2x2",
    "mat2x3", "mat2x4", "mat3x2", "mat3x3", "mat3x4", "mat4x2", "mat4x3", "mat4x4", "sampler2D",
    "sampler3D", "samplerCube",
];

const KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "return", "break", "continue", "discard", "const", "in",
    "out", "inout", "uniform", "highp", "mediump", "lowp", "precision", "flat", "smooth",
    "centroid", "invariant", "layout", "location", "true", "false", "struct",
];

const BUILTINS: &[&str] = &[
    "gl_Position", "gl_PointSize", "gl_VertexID", "gl_InstanceID", "gl_FragCoord",
    "gl_FrontFacing", "gl_PointCoord", "gl_FragDepth",
];

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Punct(char),
}

#[derive(Clone, Debug)]
struct Spanned {
    token: Token,
    line: usize,
}

impl Spanned {
    fn ident(&self) -> Option<&str> {
        match self.token {
            Token::Ident(ref name) => Some(name),
            _ => None,
        }
    }

    fn is_punct(&self, c: char) -> bool {
        self.token == Token::Punct(c)
    }
}

fn is_type(name: &str) -> bool {
    TYPES.contains(&name)
}

fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

fn error(line: usize, token: &str, message: &str) -> String {
    format!("ERROR: 0:{}: '{}' : {}", line, token, message)
}

/// Removes `//` and `/* */` comments, keeping line structure intact.
fn strip_comments(source: &str) -> Vec<String> {
    let mut in_block_comment = false;
    source
        .lines()
        .map(|raw_line| {
            let mut line = String::with_capacity(raw_line.len());
            let mut chars = raw_line.chars().peekable();
            while let Some(c) = chars.next() {
                if in_block_comment {
                    if c == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        in_block_comment = false;
                    }
                    continue;
                }
                match (c, chars.peek()) {
                    ('/', Some(&'/')) => break,
                    ('/', Some(&'*')) => {
                        chars.next();
                        in_block_comment = true;
                    }
                    _ => line.push(c),
                }
            }
            line
        })
        .collect()
}

/// Splits `source` into tokens, returning the `#version` value alongside.
/// Preprocessor lines other than `#version` are skipped.
fn tokenize(source: &str) -> Result<(String, Vec<Spanned>), String> {
    let mut version: Option<String> = None;
    let mut tokens = vec![];

    for (index, line) in strip_comments(source).iter().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(directive) = trimmed.strip_prefix('#') {
            let directive = directive.trim_start();
            if let Some(value) = directive.strip_prefix("version") {
                if version.is_some() || !tokens.is_empty() {
                    return Err(error(line_no, "#version", "must occur first in shader"));
                }
                version = Some(value.trim().to_string());
                continue;
            }
        }

        if version.is_none() {
            return Err(error(line_no, "", "No version directive"));
        }
        if trimmed.starts_with('#') {
            continue;
        }

        let mut chars = trimmed.char_indices().peekable();
        while let Some((start, c)) = chars.next() {
            if c.is_whitespace() {
                continue;
            }

            let word = c.is_ascii_alphabetic() || c == '_';
            let number = c.is_ascii_digit()
                || (c == '.' && chars.peek().map_or(false, |&(_, n)| n.is_ascii_digit()));
            if !word && !number {
                tokens.push(Spanned { token: Token::Punct(c), line: line_no });
                continue;
            }

            let mut end = start + c.len_utf8();
            while let Some(&(i, n)) = chars.peek() {
                let continues = n.is_ascii_alphanumeric() || n == '_' || (number && n == '.');
                if !continues {
                    break;
                }
                end = i + n.len_utf8();
                chars.next();
            }

            let text = trimmed[start..end].to_string();
            let token = if word { Token::Ident(text) } else { Token::Number(text) };
            tokens.push(Spanned { token, line: line_no });
        }
    }

    version
        .map(|version| (version, tokens))
        .ok_or_else(|| error(1, "", "No version directive"))
}

/// Value of `location = N` inside a `layout( ... )` qualifier.
fn layout_location(qualifier: &[Spanned]) -> Option<u32> {
    let at = qualifier.iter().position(|t| t.ident() == Some("location"))?;
    match qualifier.get(at + 2)?.token {
        Token::Number(ref value) => value.parse().ok(),
        _ => None,
    }
}

/// Records one global declaration statement (without its `;`).
fn global_declaration(
    statement: &[Spanned],
    interface: &mut Interface,
    globals: &mut HashSet<String>,
) -> Result<(), String> {
    let mut rest = statement;
    let mut location = None;

    if rest.first().and_then(Spanned::ident) == Some("layout") {
        let close = rest
            .iter()
            .position(|t| t.is_punct(')'))
            .ok_or_else(|| error(rest[0].line, "layout", "syntax error"))?;
        location = layout_location(&rest[..close]);
        rest = &rest[close + 1..];
    }

    let idents: Vec<&str> = rest.iter().filter_map(Spanned::ident).collect();
    if idents.first() == Some(&"precision") {
        return Ok(());
    }

    let storage = idents.iter().copied().find(|name| matches!(*name, "in" | "out" | "uniform"));
    let ty = idents.iter().copied().find(|name| is_type(name));
    // The declared name is the first identifier after the type; anything
    // after `=` is an initializer.
    let name = rest
        .iter()
        .take_while(|t| !t.is_punct('=') && !t.is_punct('['))
        .filter_map(Spanned::ident)
        .skip_while(|name| !is_type(name))
        .nth(1);

    let (ty, name) = match (ty, name) {
        (Some(ty), Some(name)) => (ty.to_string(), name.to_string()),
        _ => {
            let line = statement.first().map_or(1, |t| t.line);
            return Err(error(line, "", "syntax error"));
        }
    };

    globals.insert(name.clone());
    let variable = Variable { name, ty, location };
    match storage {
        Some("in") => interface.inputs.push(variable),
        Some("out") => interface.outputs.push(variable),
        Some("uniform") => interface.uniforms.push(variable),
        _ => {}
    }
    Ok(())
}

/// Checks every identifier used in a function body. `header` is the
/// function signature, whose parameters are in scope for the body.
fn check_body(
    header: &[Spanned],
    body: &[Spanned],
    globals: &HashSet<String>,
    errors: &mut Vec<String>,
) {
    let mut locals: HashSet<&str> = HashSet::new();

    // Parameters: every identifier directly after a type inside the parens.
    for pair in header.windows(2) {
        if pair[0].ident().map_or(false, is_type) {
            if let Some(name) = pair[1].ident() {
                locals.insert(name);
            }
        }
    }

    let mut declaring = false;
    let mut paren_depth = 0usize;
    let mut reported: HashSet<(usize, &str)> = HashSet::new();

    for (i, token) in body.iter().enumerate() {
        match token.token {
            Token::Punct('(') => paren_depth += 1,
            Token::Punct(')') => paren_depth = paren_depth.saturating_sub(1),
            Token::Punct(';') | Token::Punct('{') | Token::Punct('}') => declaring = false,
            _ => {}
        }

        let name = match token.ident() {
            Some(name) => name,
            None => continue,
        };

        if is_type(name) {
            // `vec4 x` starts a declaration, `vec4(...)` constructs and
            // leaves the current statement as it was.
            if !body.get(i + 1).map_or(false, |t| t.is_punct('(')) {
                declaring = true;
            }
            continue;
        }
        if is_keyword(name) {
            continue;
        }

        let prev = i.checked_sub(1).map(|p| &body[p]);
        let next = body.get(i + 1);

        if prev.map_or(false, |t| t.is_punct('.')) {
            continue; // swizzle or member access
        }

        let after_type_or_comma = prev.map_or(false, |t| {
            t.ident().map_or(false, is_type) || (t.is_punct(',') && paren_depth == 0)
        });
        if declaring && after_type_or_comma {
            locals.insert(name);
            continue;
        }

        if next.map_or(false, |t| t.is_punct('(')) {
            // Constructors, builtins like `normalize`, and user functions are
            // not checked.
            continue;
        }

        let known = locals.contains(name) || globals.contains(name) || BUILTINS.contains(&name);
        if !known && reported.insert((token.line, name)) {
            errors.push(error(token.line, name, "undeclared identifier"));
        }
    }
}

/// Checks a single stage, producing its interface or a compile log.
pub fn check(stage: ShaderType, source: &str) -> Result<Interface, String> {
    let (version, tokens) = tokenize(source)?;
    let mut interface = Interface { version, ..Interface::default() };
    let mut globals = HashSet::new();
    let mut errors = vec![];

    let mut start = 0;
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].is_punct(';') {
            if let Err(err) = global_declaration(&tokens[start..i], &mut interface, &mut globals) {
                errors.push(err);
            }
            i += 1;
            start = i;
            continue;
        }

        if tokens[i].is_punct('{') {
            let header = &tokens[start..i];
            let name_at = header.iter().position(|t| t.is_punct('('));
            let name = name_at
                .and_then(|at| at.checked_sub(1))
                .and_then(|at| header[at].ident())
                .map(str::to_string);

            let mut depth = 0usize;
            let mut end = i;
            while end < tokens.len() {
                if tokens[end].is_punct('{') {
                    depth += 1;
                } else if tokens[end].is_punct('}') {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                end += 1;
            }
            if end == tokens.len() {
                errors.push(error(tokens[i].line, "", "unexpected end of file"));
                break;
            }

            match name {
                Some(name) => {
                    if name == "main" {
                        interface.has_main = true;
                    }
                    check_body(header, &tokens[i + 1..end], &globals, &mut errors);
                }
                None => errors.push(error(tokens[i].line, "{", "syntax error")),
            }

            i = end + 1;
            start = i;
            continue;
        }

        i += 1;
    }

    if start < tokens.len() {
        let line = tokens[start].line;
        errors.push(error(line, "", "unexpected end of file"));
    }

    if errors.is_empty() {
        log::trace!(
            "{} stage checked: {} inputs, {} outputs",
            stage,
            interface.inputs.len(),
            interface.outputs.len()
        );
        Ok(interface)
    } else {
        errors.push(format!("ERROR: {} compilation errors.  No code generated.", errors.len()));
        Err(errors.join("\n"))
    }
}

/// Matches the vertex outputs against the fragment inputs and assigns
/// attribute locations to the vertex inputs.
pub fn link(vertex: &Interface, fragment: &Interface) -> Result<Vec<Attribute>, String> {
    let mut errors = vec![];

    if !vertex.has_main {
        errors.push("ERROR: Missing entry point: vertex shader has no main()".to_string());
    }
    if !fragment.has_main {
        errors.push("ERROR: Missing entry point: fragment shader has no main()".to_string());
    }
    if vertex.version != fragment.version {
        errors.push(format!(
            "ERROR: Version mismatch: vertex shader is '{}', fragment shader is '{}'",
            vertex.version, fragment.version
        ));
    }

    for input in &fragment.inputs {
        match vertex.outputs.iter().find(|out| out.name == input.name) {
            None => errors.push(format!(
                "ERROR: Input of fragment shader '{}' not written by vertex shader",
                input.name
            )),
            Some(out) if out.ty != input.ty => errors.push(format!(
                "ERROR: Types of '{}' differ between vertex and fragment shaders ({} vs {})",
                input.name, out.ty, input.ty
            )),
            Some(_) => {}
        }
    }

    if !errors.is_empty() {
        return Err(errors.join("\n"));
    }

    let mut taken: HashSet<u32> = vertex.inputs.iter().filter_map(|v| v.location).collect();
    let mut next = 0;
    let attributes = vertex
        .inputs
        .iter()
        .map(|input| {
            let location = input.location.unwrap_or_else(|| {
                while taken.contains(&next) {
                    next += 1;
                }
                taken.insert(next);
                next
            });
            Attribute { name: input.name.clone(), ty: input.ty.clone(), location }
        })
        .collect();

    Ok(attributes)
}
