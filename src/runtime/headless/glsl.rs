//! A checker for the subset of GLSL ES 3.00 the headless backend understands.
//!
//! The checker does not evaluate shaders. It extracts a shader's interface (its `in`, `out` and
//! `uniform` declarations), determines which declarations are active (referenced from a function
//! body), and rejects the errors a WebGL 2.0 compiler or linker would report for that interface.
//! Diagnostics follow the `ERROR: 0:<line>: '<token>' : <message>` format of browser info logs.
//!
//! Structs, interface blocks and the preprocessor (beyond `#version`, which is required) are not
//! supported; preprocessor lines other than `#version` are ignored.
use fnv::FnvHashSet;

use crate::pipeline::reflection::{ActiveInfo, ValueType};
use crate::pipeline::{strip_comments, ShaderStage};

const BUILTINS: &[&str] = &[
    "gl_Position",
    "gl_PointSize",
    "gl_FragCoord",
    "gl_FrontFacing",
    "gl_PointCoord",
    "gl_FragDepth",
    "gl_VertexID",
    "gl_InstanceID",
];

const REMOVED_BUILTINS: &[&str] = &["gl_FragColor", "gl_FragData"];

#[derive(Clone, Debug)]
struct Token {
    text: String,
    line: usize,
}

impl Token {
    fn is(&self, text: &str) -> bool {
        self.text == text
    }

    fn is_identifier(&self) -> bool {
        self.text
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Storage {
    In,
    Out,
    Uniform,
    Const,
    Global,
}

#[derive(Clone, PartialEq, Debug)]
pub(crate) struct Declaration {
    pub(crate) name: String,
    pub(crate) value_type: ValueType,
    pub(crate) location: Option<u32>,
    pub(crate) array_size: Option<u32>,
    pub(crate) active: bool,
    line: usize,
}

/// The interface of a successfully compiled shader.
#[derive(Clone, PartialEq, Debug)]
pub(crate) struct ShaderInterface {
    pub(crate) stage: ShaderStage,
    pub(crate) inputs: Vec<Declaration>,
    pub(crate) outputs: Vec<Declaration>,
    pub(crate) uniforms: Vec<Declaration>,
}

/// The interface of a successfully linked program.
#[derive(Clone, PartialEq, Debug)]
pub(crate) struct ProgramInterface {
    /// Active attributes with their assigned locations.
    pub(crate) attributes: Vec<(ActiveInfo, u32)>,
    /// Active uniforms, arrays reported as `name[0]`.
    pub(crate) uniforms: Vec<ActiveInfo>,
}

struct Function {
    name: Token,
    return_type: Token,
    parameters: Vec<Token>,
    body: Vec<Token>,
}

fn error(line: usize, token: &str, message: &str) -> String {
    format!("ERROR: 0:{}: '{}' : {}\n", line, token, message)
}

pub(crate) fn compile(stage: ShaderStage, source: &str) -> Result<ShaderInterface, String> {
    let stripped = strip_comments(source);
    let mut lines = stripped.lines();
    let version: Vec<&str> = lines.next().unwrap_or("").split_whitespace().collect();

    if version != ["#version", "300", "es"] {
        return Err(error(
            1,
            "",
            "unsupported or missing version directive, expected `#version 300 es`",
        ));
    }

    let mut body = String::new();

    for line in lines {
        if !line.trim_start().starts_with('#') {
            body.push_str(line);
        }

        body.push('\n');
    }

    let tokens = tokenize(&body, 2);
    let (statements, functions) = split_units(&tokens)?;

    let mut precision_float = false;
    let mut globals: Vec<(Storage, Declaration)> = Vec::new();

    for statement in &statements {
        if statement[0].is("precision") {
            match statement.as_slice() {
                [_, qualifier, value_type]
                    if is_precision_qualifier(&qualifier.text) && is_type_name(&value_type.text) =>
                {
                    if value_type.is("float") {
                        precision_float = true;
                    }
                }
                _ => return Err(error(statement[0].line, "precision", "syntax error")),
            }

            continue;
        }

        for (storage, declaration) in parse_declaration(stage, statement)? {
            if let Some((_, existing)) = globals.iter().find(|(_, d)| d.name == declaration.name) {
                return Err(error(
                    declaration.line,
                    &existing.name,
                    "redefinition",
                ));
            }

            globals.push((storage, declaration));
        }
    }

    if stage == ShaderStage::Fragment && !precision_float {
        let line = statements.first().map(|s| s[0].line).unwrap_or(2);

        return Err(error(line, "", "No precision specified for (float)"));
    }

    let main = check_functions(&functions, tokens.last().map(|t| t.line).unwrap_or(1))?;

    let mut declared: FnvHashSet<&str> = BUILTINS.iter().copied().collect();

    for (_, declaration) in &globals {
        declared.insert(&declaration.name);
    }

    for function in &functions {
        declared.insert(&function.name.text);
        collect_locals(&function.parameters, &mut declared);
        collect_locals(&function.body, &mut declared);
    }

    let mut referenced: FnvHashSet<&str> = FnvHashSet::default();

    for function in &functions {
        check_body(&function.body, &declared)?;

        for token in &function.body {
            if token.is_identifier() {
                referenced.insert(&token.text);
            }
        }
    }

    if stage == ShaderStage::Vertex && !referenced.contains("gl_Position") {
        return Err(error(
            main.name.line,
            "main",
            "vertex shader does not write gl_Position",
        ));
    }

    let mut interface = ShaderInterface {
        stage,
        inputs: Vec::new(),
        outputs: Vec::new(),
        uniforms: Vec::new(),
    };

    for (storage, mut declaration) in globals {
        declaration.active = referenced.contains(declaration.name.as_str());

        match storage {
            Storage::In => interface.inputs.push(declaration),
            Storage::Out => interface.outputs.push(declaration),
            Storage::Uniform => interface.uniforms.push(declaration),
            Storage::Const | Storage::Global => (),
        }
    }

    Ok(interface)
}

pub(crate) fn link(
    vertex: &ShaderInterface,
    fragment: &ShaderInterface,
    max_vertex_attributes: u32,
) -> Result<ProgramInterface, String> {
    for input in fragment.inputs.iter().filter(|input| input.active) {
        let output = vertex
            .outputs
            .iter()
            .find(|output| output.name == input.name)
            .ok_or_else(|| {
                format!(
                    "ERROR: fragment shader input '{}' is not written by the vertex shader\n",
                    input.name
                )
            })?;

        if output.value_type != input.value_type || output.array_size != input.array_size {
            return Err(format!(
                "ERROR: '{}' is declared as `{}` in the vertex shader and as `{}` in the \
                 fragment shader\n",
                input.name, output.value_type, input.value_type
            ));
        }
    }

    for uniform in &fragment.uniforms {
        if let Some(other) = vertex.uniforms.iter().find(|u| u.name == uniform.name) {
            if other.value_type != uniform.value_type || other.array_size != uniform.array_size {
                return Err(format!(
                    "ERROR: uniform '{}' is declared with different types in the vertex and \
                     fragment shaders\n",
                    uniform.name
                ));
            }
        }
    }

    if fragment.outputs.is_empty() {
        return Err("ERROR: fragment shader does not declare an output\n".to_string());
    }

    if fragment.outputs.len() > 1 && fragment.outputs.iter().any(|o| o.location.is_none()) {
        return Err(
            "ERROR: fragment shaders with multiple outputs must declare every output location\n"
                .to_string(),
        );
    }

    let attributes = assign_attribute_locations(&vertex.inputs, max_vertex_attributes)?;

    let mut uniforms: Vec<ActiveInfo> = Vec::new();

    for uniform in vertex
        .uniforms
        .iter()
        .chain(fragment.uniforms.iter())
        .filter(|uniform| uniform.active)
    {
        let name = match uniform.array_size {
            Some(_) => format!("{}[0]", uniform.name),
            None => uniform.name.clone(),
        };

        if uniforms.iter().all(|existing| existing.name != name) {
            uniforms.push(ActiveInfo {
                name,
                value_type: uniform.value_type,
                size: uniform.array_size.unwrap_or(1),
            });
        }
    }

    Ok(ProgramInterface {
        attributes,
        uniforms,
    })
}

fn assign_attribute_locations(
    inputs: &[Declaration],
    max: u32,
) -> Result<Vec<(ActiveInfo, u32)>, String> {
    let mut used = vec![false; max as usize];
    let mut assigned: Vec<(ActiveInfo, u32)> = Vec::new();

    let info = |input: &Declaration| ActiveInfo {
        name: input.name.clone(),
        value_type: input.value_type,
        size: 1,
    };

    for input in inputs.iter().filter(|input| input.active) {
        if let Some(location) = input.location {
            let end = match location.checked_add(input.value_type.location_count()) {
                Some(end) if end <= max => end,
                _ => {
                    return Err(format!(
                        "ERROR: attribute '{}' location {} exceeds the maximum of {} vertex \
                         attributes\n",
                        input.name, location, max
                    ))
                }
            };

            for slot in location..end {
                if used[slot as usize] {
                    return Err(format!(
                        "ERROR: attribute '{}' overlaps location {} of another attribute\n",
                        input.name, slot
                    ));
                }

                used[slot as usize] = true;
            }

            assigned.push((info(input), location));
        }
    }

    for input in inputs
        .iter()
        .filter(|input| input.active && input.location.is_none())
    {
        let count = input.value_type.location_count() as usize;

        let start = (0..used.len())
            .find(|&start| {
                start + count <= used.len() && used[start..start + count].iter().all(|u| !u)
            })
            .ok_or_else(|| {
                format!(
                    "ERROR: too many vertex attributes; '{}' does not fit in {} locations\n",
                    input.name, max
                )
            })?;

        for slot in &mut used[start..start + count] {
            *slot = true;
        }

        assigned.push((info(input), start as u32));
    }

    Ok(assigned)
}

fn tokenize(text: &str, first_line: usize) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut line = first_line;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            line += 1;
            i += 1;
        } else if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_alphanumeric() || c == '_' || (c == '.' && next_is_digit(&chars, i)) {
            let start = i;
            let numeric = !(c.is_ascii_alphabetic() || c == '_');

            while i < chars.len()
                && (chars[i].is_ascii_alphanumeric()
                    || chars[i] == '_'
                    || (numeric && chars[i] == '.'))
            {
                i += 1;
            }

            tokens.push(Token {
                text: chars[start..i].iter().collect(),
                line,
            });
        } else {
            tokens.push(Token {
                text: c.to_string(),
                line,
            });

            i += 1;
        }
    }

    tokens
}

fn next_is_digit(chars: &[char], i: usize) -> bool {
    chars.get(i + 1).map(|c| c.is_ascii_digit()).unwrap_or(false)
}

fn split_units(tokens: &[Token]) -> Result<(Vec<Vec<Token>>, Vec<Function>), String> {
    let mut statements = Vec::new();
    let mut functions = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];

        match token.text.as_str() {
            ";" => {
                if !current.is_empty() {
                    statements.push(std::mem::take(&mut current));
                }

                i += 1;
            }
            "{" => {
                let mut depth = 0;
                let mut end = None;

                for (j, t) in tokens.iter().enumerate().skip(i) {
                    if t.is("{") {
                        depth += 1;
                    } else if t.is("}") {
                        depth -= 1;

                        if depth == 0 {
                            end = Some(j);

                            break;
                        }
                    }
                }

                let end = end.ok_or_else(|| error(token.line, "", "unexpected end of file"))?;
                let header = std::mem::take(&mut current);

                functions.push(parse_function_header(header, tokens[i + 1..end].to_vec(), token)?);

                i = end + 1;
            }
            "}" => return Err(error(token.line, "}", "syntax error")),
            _ => {
                current.push(token.clone());

                i += 1;
            }
        }
    }

    if let Some(last) = current.last() {
        return Err(error(last.line, &last.text, "syntax error, unexpected end of file"));
    }

    Ok((statements, functions))
}

fn parse_function_header(
    header: Vec<Token>,
    body: Vec<Token>,
    brace: &Token,
) -> Result<Function, String> {
    if header.first().map(|t| t.is("struct")).unwrap_or(false) || header.len() == 2 {
        let token = header.last().map(|t| t.text.as_str()).unwrap_or("{");

        return Err(error(
            brace.line,
            token,
            "structs and interface blocks are not supported",
        ));
    }

    match header.as_slice() {
        [return_type, name, open, parameters @ .., close]
            if (return_type.is("void") || is_type_name(&return_type.text))
                && name.is_identifier()
                && open.is("(")
                && close.is(")") =>
        {
            Ok(Function {
                name: name.clone(),
                return_type: return_type.clone(),
                parameters: parameters.to_vec(),
                body,
            })
        }
        _ => {
            let token = header.first().unwrap_or(brace);

            Err(error(token.line, &token.text, "syntax error"))
        }
    }
}

fn check_functions(functions: &[Function], last_line: usize) -> Result<&Function, String> {
    let mut main = None;

    for function in functions.iter().filter(|f| f.name.is("main")) {
        if main.is_some() {
            return Err(error(
                function.name.line,
                "main",
                "function already has a body",
            ));
        }

        if !function.return_type.is("void") {
            return Err(error(
                function.name.line,
                "main",
                "main function cannot return a value",
            ));
        }

        match function.parameters.as_slice() {
            [] => (),
            [only] if only.is("void") => (),
            _ => {
                return Err(error(
                    function.name.line,
                    "main",
                    "function cannot take any parameter(s)",
                ))
            }
        }

        main = Some(function);
    }

    main.ok_or_else(|| error(last_line, "", "Missing main()"))
}

fn parse_declaration(
    stage: ShaderStage,
    statement: &[Token],
) -> Result<Vec<(Storage, Declaration)>, String> {
    let mut cursor = 0;
    let mut location = None;

    let at = |cursor: usize| -> Result<&Token, String> {
        statement.get(cursor).ok_or_else(|| {
            let last = &statement[statement.len() - 1];

            error(last.line, &last.text, "syntax error, unexpected end of statement")
        })
    };

    if statement[0].is("layout") {
        let tokens = [at(1)?, at(2)?, at(3)?, at(4)?, at(5)?];

        if !(tokens[0].is("(")
            && tokens[1].is("location")
            && tokens[2].is("=")
            && tokens[4].is(")"))
        {
            return Err(error(tokens[0].line, &tokens[1].text, "unsupported layout qualifier"));
        }

        let value = tokens[3]
            .text
            .parse::<u32>()
            .map_err(|_| error(tokens[3].line, &tokens[3].text, "invalid location"))?;

        location = Some(value);
        cursor = 6;
    }

    while ["flat", "smooth", "centroid"].contains(&at(cursor)?.text.as_str()) {
        cursor += 1;
    }

    let storage = match at(cursor)?.text.as_str() {
        "in" => Storage::In,
        "out" => Storage::Out,
        "uniform" => Storage::Uniform,
        "const" => Storage::Const,
        _ => Storage::Global,
    };

    if storage != Storage::Global {
        cursor += 1;
    }

    if is_precision_qualifier(&at(cursor)?.text) {
        cursor += 1;
    }

    let type_token = at(cursor)?;

    if type_token.is("void") {
        // A function prototype.
        return Ok(Vec::new());
    }

    let value_type = ValueType::from_glsl_name(&type_token.text)
        .ok_or_else(|| error(type_token.line, &type_token.text, "syntax error"))?;

    cursor += 1;

    if statement.get(cursor + 1).map(|t| t.is("(")).unwrap_or(false) {
        return Ok(Vec::new());
    }

    let mut declarations = Vec::new();

    loop {
        let name = at(cursor)?;

        if !name.is_identifier() || is_type_name(&name.text) {
            return Err(error(name.line, &name.text, "syntax error"));
        }

        cursor += 1;

        let mut array_size = None;

        if statement.get(cursor).map(|t| t.is("[")).unwrap_or(false) {
            let size = at(cursor + 1)?;

            array_size = Some(
                size.text
                    .parse::<u32>()
                    .ok()
                    .filter(|size| *size > 0)
                    .ok_or_else(|| {
                        error(
                            size.line,
                            &size.text,
                            "array size must be a positive integer constant",
                        )
                    })?,
            );

            if !at(cursor + 2)?.is("]") {
                return Err(error(size.line, &size.text, "syntax error"));
            }

            cursor += 3;
        }

        let mut initialized = false;

        if statement.get(cursor).map(|t| t.is("=")).unwrap_or(false) {
            if storage != Storage::Const && storage != Storage::Global {
                return Err(error(
                    name.line,
                    &name.text,
                    "cannot initialize this type of qualifier",
                ));
            }

            initialized = true;

            // Skip the initializer up to the next top-level comma.
            let mut depth = 0;

            cursor += 1;

            while let Some(token) = statement.get(cursor) {
                if token.is("(") {
                    depth += 1;
                } else if token.is(")") {
                    depth -= 1;
                } else if token.is(",") && depth == 0 {
                    break;
                }

                cursor += 1;
            }
        }

        if storage == Storage::Const && !initialized {
            return Err(error(
                name.line,
                &name.text,
                "variables with qualifier 'const' must be initialized",
            ));
        }

        check_qualifiers(stage, storage, location, value_type, array_size, name)?;

        declarations.push((
            storage,
            Declaration {
                name: name.text.clone(),
                value_type,
                location,
                array_size,
                active: false,
                line: name.line,
            },
        ));

        match statement.get(cursor) {
            None => break,
            Some(token) if token.is(",") => {
                if location.is_some() {
                    return Err(error(
                        token.line,
                        ",",
                        "a location may only be assigned to a single declaration",
                    ));
                }

                cursor += 1;
            }
            Some(token) => return Err(error(token.line, &token.text, "syntax error")),
        }
    }

    Ok(declarations)
}

fn check_qualifiers(
    stage: ShaderStage,
    storage: Storage,
    location: Option<u32>,
    value_type: ValueType,
    array_size: Option<u32>,
    name: &Token,
) -> Result<(), String> {
    let is_sampler = !value_type.is_attribute_type()
        && ![
            ValueType::Bool,
            ValueType::BoolVector2,
            ValueType::BoolVector3,
            ValueType::BoolVector4,
        ]
        .contains(&value_type);

    if is_sampler && storage != Storage::Uniform {
        return Err(error(
            name.line,
            &name.text,
            "samplers must be declared as uniforms",
        ));
    }

    let location_allowed = match (stage, storage) {
        (ShaderStage::Vertex, Storage::In) | (ShaderStage::Fragment, Storage::Out) => true,
        _ => false,
    };

    if location.is_some() && !location_allowed {
        return Err(error(
            name.line,
            "layout",
            "location qualifiers are only allowed on vertex inputs and fragment outputs",
        ));
    }

    match (stage, storage) {
        (ShaderStage::Vertex, Storage::In) => {
            if !value_type.is_attribute_type() {
                return Err(error(
                    name.line,
                    &name.text,
                    "vertex shader inputs cannot be boolean or opaque types",
                ));
            }

            if array_size.is_some() {
                return Err(error(
                    name.line,
                    &name.text,
                    "vertex shader inputs cannot be arrays",
                ));
            }
        }
        (_, Storage::In) | (_, Storage::Out) => {
            if !value_type.is_attribute_type() {
                return Err(error(
                    name.line,
                    &name.text,
                    "shader inputs and outputs cannot be boolean or opaque types",
                ));
            }

            if stage == ShaderStage::Fragment
                && storage == Storage::Out
                && value_type.location_count() > 1
            {
                return Err(error(
                    name.line,
                    &name.text,
                    "fragment shader outputs cannot be matrices",
                ));
            }
        }
        _ => (),
    }

    Ok(())
}

fn collect_locals<'a>(tokens: &'a [Token], declared: &mut FnvHashSet<&'a str>) {
    for pair in tokens.windows(2) {
        if (is_type_name(&pair[0].text) || pair[0].is("void")) && pair[1].is_identifier() {
            declared.insert(&pair[1].text);
        }
    }
}

fn check_body(body: &[Token], declared: &FnvHashSet<&str>) -> Result<(), String> {
    let mut depth: i32 = 0;

    for (i, token) in body.iter().enumerate() {
        let next = body.get(i + 1);

        if token.is("(") {
            depth += 1;
        } else if token.is(")") {
            depth -= 1;

            if depth < 0 {
                return Err(error(token.line, ")", "syntax error"));
            }
        }

        if REMOVED_BUILTINS.contains(&token.text.as_str()) {
            return Err(error(token.line, &token.text, "undeclared identifier"));
        }

        // Binary operators missing their right operand; `++` and `--` are fine.
        let doubled = i > 0 && body[i - 1].text == token.text;

        if ["+", "-", "*", "/"].contains(&token.text.as_str()) && !doubled {
            if let Some(next) = next {
                if next.is(";") || next.is(")") || next.is(",") {
                    return Err(error(next.line, &next.text, "syntax error"));
                }
            }
        }

        // Assignments to identifiers that were never declared.
        if token.is_identifier() && next.map(|n| n.is("=")).unwrap_or(false) {
            let comparison = body.get(i + 2).map(|t| t.is("=")).unwrap_or(false);
            let member = i > 0 && body[i - 1].is(".");

            if !comparison && !member && !declared.contains(token.text.as_str()) {
                return Err(error(token.line, &token.text, "undeclared identifier"));
            }
        }
    }

    if depth != 0 {
        let line = body.last().map(|t| t.line).unwrap_or(1);

        return Err(error(line, "", "syntax error, unbalanced parentheses"));
    }

    Ok(())
}

fn is_precision_qualifier(text: &str) -> bool {
    text == "lowp" || text == "mediump" || text == "highp"
}

fn is_type_name(text: &str) -> bool {
    ValueType::from_glsl_name(text).is_some()
}
