/* Type descriptors and member records as read from a dex image, and their Java-like rendering. */
/* Descriptors are stored in the dex native (also JNI) format e.g. [Ljava/lang/String; */

use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{anychar, char};
use nom::combinator::{all_consuming, map, map_opt};
use nom::sequence::{delimited, preceded};
use nom::{IResult, Parser};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::error::Error;
use std::fmt;

// Dex images cap array types at 255 dimensions.
const MAX_ARRAY_DIMENSIONS: usize = 255;

/// Error raised when a type token is not a valid descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The token bottoms out in a single character that is not a primitive code.
    UnknownPrimitive(char),
    /// The token is empty, an unterminated object type, or has trailing characters.
    Malformed(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::UnknownPrimitive(c) => write!(f, "Unknown type: {c}"),
            DecodeError::Malformed(token) => write!(f, "Malformed type descriptor: {token:?}"),
        }
    }
}

impl Error for DecodeError {}

/// The nine primitive descriptor codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Void,
    Boolean,
}

impl Primitive {
    pub fn from_code(code: char) -> Option<Primitive> {
        Some(match code {
            'B' => Primitive::Byte,
            'C' => Primitive::Char,
            'D' => Primitive::Double,
            'F' => Primitive::Float,
            'I' => Primitive::Int,
            'J' => Primitive::Long,
            'S' => Primitive::Short,
            'V' => Primitive::Void,
            'Z' => Primitive::Boolean,
            _ => return None,
        })
    }

    pub fn from_java_name(name: &str) -> Option<Primitive> {
        Some(match name {
            "byte" => Primitive::Byte,
            "char" => Primitive::Char,
            "double" => Primitive::Double,
            "float" => Primitive::Float,
            "int" => Primitive::Int,
            "long" => Primitive::Long,
            "short" => Primitive::Short,
            "void" => Primitive::Void,
            "boolean" => Primitive::Boolean,
            _ => return None,
        })
    }

    pub fn code(&self) -> char {
        match self {
            Primitive::Byte => 'B',
            Primitive::Char => 'C',
            Primitive::Double => 'D',
            Primitive::Float => 'F',
            Primitive::Int => 'I',
            Primitive::Long => 'J',
            Primitive::Short => 'S',
            Primitive::Void => 'V',
            Primitive::Boolean => 'Z',
        }
    }

    pub fn java_name(&self) -> &'static str {
        match self {
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Double => "double",
            Primitive::Float => "float",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Short => "short",
            Primitive::Void => "void",
            Primitive::Boolean => "boolean",
        }
    }
}

/// Represents a decoded type: primitive, object or array of another type
///
/// # Examples
///
/// ```
///  use dex_method_list::types::TypeDescriptor;
///
///  let t = TypeDescriptor::decode("[[Ljava/lang/String;").unwrap();
///  assert_eq!(t.render(false), "java.lang.String[][]");
///  assert_eq!(t.render(true), "String[][]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDescriptor {
    Primitive(Primitive),
    /// Internal slash-separated name, e.g. `java/lang/String`.
    Object(String),
    Array(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    pub fn decode(token: &str) -> Result<TypeDescriptor, DecodeError> {
        if token.len() - token.trim_start_matches('[').len() > MAX_ARRAY_DIMENSIONS {
            return Err(DecodeError::Malformed(token.to_string()));
        }
        match all_consuming(parse_descriptor).parse(token) {
            Ok((_, descriptor)) => Ok(descriptor),
            Err(_) => Err(classify_failure(token)),
        }
    }

    /// Renders the Java-like name. With `strip_package` object types keep only their simple name.
    pub fn render(&self, strip_package: bool) -> String {
        match self {
            TypeDescriptor::Primitive(p) => p.java_name().to_string(),
            TypeDescriptor::Object(name) if strip_package => {
                name.rsplit('/').next().unwrap_or(name.as_str()).to_string()
            }
            TypeDescriptor::Object(name) => name.replace('/', "."),
            TypeDescriptor::Array(element) => format!("{}[]", element.render(strip_package)),
        }
    }

    /// Drops the counter of a desugared lambda class, `Foo$$Lambda$26` -> `Foo$$Lambda`.
    pub fn without_lambda_suffix(&self) -> TypeDescriptor {
        match self {
            TypeDescriptor::Object(name) => match name.rsplit_once('$') {
                Some((prefix, counter))
                    if prefix.ends_with("$$Lambda")
                        && !counter.is_empty()
                        && counter.bytes().all(|b| b.is_ascii_digit()) =>
                {
                    TypeDescriptor::Object(prefix.to_string())
                }
                _ => self.clone(),
            },
            TypeDescriptor::Array(element) => {
                TypeDescriptor::Array(Box::new(element.without_lambda_suffix()))
            }
            TypeDescriptor::Primitive(_) => self.clone(),
        }
    }

    /// Splits off array dimensions: `[[I` -> (`I`, 2).
    pub fn component(&self) -> (&TypeDescriptor, usize) {
        match self {
            TypeDescriptor::Array(element) => {
                let (component, arity) = element.component();
                (component, arity + 1)
            }
            _ => (self, 0),
        }
    }

    pub fn as_array(self, arity: usize) -> TypeDescriptor {
        (0..arity).fold(self, |t, _| TypeDescriptor::Array(Box::new(t)))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(p) => write!(f, "{}", p.code()),
            TypeDescriptor::Object(name) => write!(f, "L{name};"),
            TypeDescriptor::Array(element) => write!(f, "[{element}"),
        }
    }
}

/// Decodes one descriptor token.
pub fn decode(token: &str) -> Result<TypeDescriptor, DecodeError> {
    TypeDescriptor::decode(token)
}

pub fn render(descriptor: &TypeDescriptor, strip_package: bool) -> String {
    descriptor.render(strip_package)
}

fn parse_descriptor(input: &str) -> IResult<&str, TypeDescriptor> {
    alt((parse_array, parse_object, parse_primitive)).parse(input)
}

fn parse_array(input: &str) -> IResult<&str, TypeDescriptor> {
    map(preceded(char('['), parse_descriptor), |element| {
        TypeDescriptor::Array(Box::new(element))
    })
    .parse(input)
}

fn parse_object(input: &str) -> IResult<&str, TypeDescriptor> {
    map(
        delimited(char('L'), take_while1(|c: char| c != ';'), char(';')),
        |name: &str| TypeDescriptor::Object(name.to_string()),
    )
    .parse(input)
}

fn parse_primitive(input: &str) -> IResult<&str, TypeDescriptor> {
    map_opt(anychar, |c: char| Primitive::from_code(c).map(TypeDescriptor::Primitive)).parse(input)
}

// Past the array prefixes a lone non-object character is an unknown primitive; anything else is
// structurally broken.
fn classify_failure(token: &str) -> DecodeError {
    let element = token.trim_start_matches('[');
    let mut chars = element.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c != 'L' => DecodeError::UnknownPrimitive(c),
        _ => DecodeError::Malformed(token.to_string()),
    }
}

/// One method reference: declaring type, name, ordered parameter types and return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRecord {
    pub declaring_type: TypeDescriptor,
    pub name: String,
    pub parameter_types: Vec<TypeDescriptor>,
    pub return_type: TypeDescriptor,
}

impl MethodRecord {
    /// Builds a record from raw descriptor tokens.
    pub fn from_descriptors(
        declaring_type: &str,
        name: &str,
        parameter_types: &[&str],
        return_type: &str,
    ) -> Result<MethodRecord, DecodeError> {
        Ok(MethodRecord {
            declaring_type: decode(declaring_type)?,
            name: name.to_string(),
            parameter_types: parameter_types
                .iter()
                .map(|p| decode(p))
                .collect::<Result<Vec<_>, _>>()?,
            return_type: decode(return_type)?,
        })
    }

    /// `java.lang.Object <init>()`: the declaring type fully qualified, every parameter by
    /// simple name, no return type. With `hide_synthetic_numbers` the counters javac and D8
    /// append to synthetic names are dropped from the declaring type and the method name.
    pub fn render(&self, hide_synthetic_numbers: bool) -> String {
        let parameters = self
            .parameter_types
            .iter()
            .map(|p| p.render(true))
            .collect::<Vec<_>>()
            .join(", ");
        if hide_synthetic_numbers {
            format!(
                "{} {}({})",
                self.declaring_type.without_lambda_suffix().render(false),
                hide_method_numbers(&self.name),
                parameters
            )
        } else {
            format!("{} {}({})", self.declaring_type.render(false), self.name, parameters)
        }
    }
}

impl fmt::Display for MethodRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render(false))
    }
}

/// One field reference: `com.example.Foo count: int`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRecord {
    pub declaring_type: TypeDescriptor,
    pub name: String,
    pub field_type: TypeDescriptor,
}

impl FieldRecord {
    pub fn from_descriptors(
        declaring_type: &str,
        name: &str,
        field_type: &str,
    ) -> Result<FieldRecord, DecodeError> {
        Ok(FieldRecord {
            declaring_type: decode(declaring_type)?,
            name: name.to_string(),
            field_type: decode(field_type)?,
        })
    }

    /// Field names are compiler-chosen (`this$0`, `val$x`) and keep their numbers; only the
    /// lambda class counter of the declaring type is hidden.
    pub fn render(&self, hide_synthetic_numbers: bool) -> String {
        let declaring_type = if hide_synthetic_numbers {
            self.declaring_type.without_lambda_suffix()
        } else {
            self.declaring_type.clone()
        };
        format!(
            "{} {}: {}",
            declaring_type.render(false),
            self.name,
            self.field_type.render(true)
        )
    }
}

impl fmt::Display for FieldRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render(false))
    }
}

/// Formats one signature line for a method record.
pub fn format(record: &MethodRecord) -> String {
    record.render(false)
}

/// Synthetic method names without their counters. Lambda bodies lose the first inner
/// `$<digits>` segment (`lambda$refresh$14$Main` -> `lambda$refresh$Main`); other names lose a
/// trailing one (`access$000` -> `access`).
pub fn hide_method_numbers(name: &str) -> Cow<'_, str> {
    if name.starts_with("lambda$") {
        return match number_segment(name) {
            Some((start, end)) => Cow::Owned(format!("{}{}", &name[..start], &name[end..])),
            None => Cow::Borrowed(name),
        };
    }
    Cow::Borrowed(strip_synthetic_suffix(name))
}

// Byte range of the first `$<digits>` that is directly followed by another `$`.
fn number_segment(name: &str) -> Option<(usize, usize)> {
    let bytes = name.as_bytes();
    for (start, b) in bytes.iter().enumerate() {
        if *b != b'$' {
            continue;
        }
        let digits = bytes[start + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let end = start + 1 + digits;
        if digits > 0 && bytes.get(end) == Some(&b'$') {
            return Some((start, end));
        }
    }
    None
}

/// `access$000` -> `access`. Names without a numeric `$` suffix, or with nothing before it, are
/// returned unchanged.
pub fn strip_synthetic_suffix(name: &str) -> &str {
    match name.rsplit_once('$') {
        Some((prefix, digits))
            if !prefix.is_empty()
                && !digits.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            prefix
        }
        _ => name,
    }
}
