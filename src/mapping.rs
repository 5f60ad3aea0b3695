//! ProGuard / R8 `mapping.txt` support: restores original names on obfuscated references.
//!
//! ```text
//! com.example.Foo -> a.a.a:
//!     java.lang.String name -> a
//!     1:4:void bar(int,com.example.Bar):12:15 -> b
//! ```
//!
//! Type lines map an original class to its obfuscated name; indented member lines belong to the
//! type above them. Member types are written with original names, so method lookups happen after
//! the parameter and return types have been mapped back.

use crate::types::{FieldRecord, MethodRecord, Primitive, TypeDescriptor};
use log::debug;
use nom::bytes::complete::{is_not, tag, take_while, take_while1};
use nom::character::complete::{char, digit1, space1};
use nom::combinator::opt;
use nom::sequence::{delimited, pair, tuple};
use nom::IResult;
use std::collections::HashMap;
use std::path::Path;
use std::{fmt, fs, io};

#[derive(Debug)]
pub enum MappingError {
    Io { path: String, error: io::Error },
    Parse { line: usize, kind: &'static str, text: String },
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingError::Io { path, error } if error.kind() == io::ErrorKind::NotFound => {
                write!(f, "File {path} not found.")
            }
            MappingError::Io { path, error } => write!(f, "Unable to read {path}: {error}"),
            MappingError::Parse { line, kind, text } => {
                write!(f, "Unable to parse line {line} as {kind} mapping: {text}")
            }
        }
    }
}

impl std::error::Error for MappingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MappingError::Io { error, .. } => Some(error),
            MappingError::Parse { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MethodSignature {
    return_type: TypeDescriptor,
    name: String,
    parameter_types: Vec<TypeDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TypeMapping {
    original: TypeDescriptor,
    fields: HashMap<String, String>,
    methods: HashMap<MethodSignature, String>,
}

impl TypeMapping {
    fn new(original: TypeDescriptor) -> Self {
        TypeMapping {
            original,
            fields: HashMap::new(),
            methods: HashMap::new(),
        }
    }
}

/// Obfuscated type -> original type and member names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiMapping {
    types: HashMap<TypeDescriptor, TypeMapping>,
}

struct MemberLine<'a> {
    member_type: &'a str,
    original: &'a str,
    parameters: Option<&'a str>,
    obfuscated: &'a str,
}

impl ApiMapping {
    pub fn from_file(path: impl AsRef<Path>) -> Result<ApiMapping, MappingError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|error| MappingError::Io {
            path: path.display().to_string(),
            error,
        })?;
        ApiMapping::parse(&text)
    }

    pub fn parse(text: &str) -> Result<ApiMapping, MappingError> {
        let mut types = HashMap::new();
        let mut current: Option<(TypeDescriptor, TypeMapping)> = None;

        for (index, line) in text.split('\n').enumerate() {
            let line = line.trim_end_matches('\r');
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parse_error = |kind| MappingError::Parse {
                line: index + 1,
                kind,
                text: line.to_string(),
            };

            if trimmed.len() != line.len() {
                let member = match parse_member_line(line) {
                    Ok((_, member)) => member,
                    Err(_) => return Err(parse_error("member")),
                };
                let Some((_, mapping)) = current.as_mut() else {
                    return Err(parse_error("member"));
                };
                match member.parameters {
                    Some(parameters) => {
                        let signature = MethodSignature {
                            return_type: human_type(member.member_type),
                            name: member.obfuscated.to_string(),
                            parameter_types: parameters
                                .split(',')
                                .filter(|p| !p.is_empty())
                                .map(human_type)
                                .collect(),
                        };
                        mapping.methods.insert(signature, member.original.to_string());
                    }
                    None => {
                        mapping
                            .fields
                            .insert(member.obfuscated.to_string(), member.original.to_string());
                    }
                }
            } else {
                let (original, obfuscated) = parse_type_line(line).ok_or(parse_error("type"))?;
                if let Some((obfuscated, mapping)) = current.take() {
                    types.insert(obfuscated, mapping);
                }
                current = Some((human_type(obfuscated), TypeMapping::new(human_type(original))));
            }
        }
        if let Some((obfuscated, mapping)) = current {
            types.insert(obfuscated, mapping);
        }

        let mapping = ApiMapping { types };
        debug!(
            "mapping: {} types, {} methods, {} fields",
            mapping.types.len(),
            mapping.types.values().map(|t| t.methods.len()).sum::<usize>(),
            mapping.types.values().map(|t| t.fields.len()).sum::<usize>()
        );
        Ok(mapping)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The original type, keeping array dimensions; unmapped types come back unchanged.
    pub fn map_type(&self, t: &TypeDescriptor) -> TypeDescriptor {
        let (component, arity) = t.component();
        match self.types.get(component) {
            Some(mapping) => mapping.original.clone().as_array(arity),
            None => t.clone(),
        }
    }

    /// Methods of types absent from the mapping are returned as they are.
    pub fn map_method(&self, method: &MethodRecord) -> MethodRecord {
        let (component, arity) = method.declaring_type.component();
        let Some(mapping) = self.types.get(component) else {
            return method.clone();
        };
        let signature = MethodSignature {
            return_type: self.map_type(&method.return_type),
            name: method.name.clone(),
            parameter_types: method.parameter_types.iter().map(|t| self.map_type(t)).collect(),
        };
        let name = match mapping.methods.get(&signature) {
            Some(original) => original.clone(),
            None => signature.name,
        };
        MethodRecord {
            declaring_type: mapping.original.clone().as_array(arity),
            name,
            parameter_types: signature.parameter_types,
            return_type: signature.return_type,
        }
    }

    pub fn map_field(&self, field: &FieldRecord) -> FieldRecord {
        let (component, arity) = field.declaring_type.component();
        let Some(mapping) = self.types.get(component) else {
            return field.clone();
        };
        FieldRecord {
            declaring_type: mapping.original.clone().as_array(arity),
            name: mapping
                .fields
                .get(&field.name)
                .unwrap_or(&field.name)
                .clone(),
            field_type: self.map_type(&field.field_type),
        }
    }
}

// `com.example.Foo -> a.a.a:`
fn parse_type_line(line: &str) -> Option<(&str, &str)> {
    let (original, obfuscated) = line.strip_suffix(':')?.split_once(" -> ")?;
    if original.is_empty() || obfuscated.is_empty() {
        return None;
    }
    Some((original, obfuscated))
}

// `    1:4:void bar(int,com.example.Bar):12:15 -> b` or `    java.lang.String name -> a`
fn parse_member_line(line: &str) -> IResult<&str, MemberLine<'_>> {
    let (input, _) = space1(line)?;
    let (input, _) = opt(tuple((digit1, char(':'), digit1, char(':'))))(input)?;
    let (input, member_type) = is_not(" ")(input)?;
    let (input, _) = char(' ')(input)?;
    let (input, original) = is_not(" (:")(input)?;
    let (input, parameters) =
        opt(delimited(char('('), take_while(|c: char| c != ')'), char(')')))(input)?;
    let (input, _) = opt(tuple((char(':'), digit1, opt(pair(char(':'), digit1)))))(input)?;
    let (input, _) = tag(" -> ")(input)?;
    let (input, obfuscated) = take_while1(|c: char| !c.is_whitespace())(input)?;
    Ok((
        input,
        MemberLine {
            member_type,
            original,
            parameters,
            obfuscated,
        },
    ))
}

// `java.lang.String[][]` -> `[[Ljava/lang/String;`
fn human_type(name: &str) -> TypeDescriptor {
    let base = name.trim_end_matches(|c| c == '[' || c == ']');
    let arity = (name.len() - base.len()) / 2;
    let component = match Primitive::from_java_name(base) {
        Some(p) => TypeDescriptor::Primitive(p),
        None => TypeDescriptor::Object(base.replace('.', "/")),
    };
    component.as_array(arity)
}
