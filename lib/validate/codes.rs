//! Validation codes.

use serde::Serialize;
use std::fmt;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Validation error codes.
///
/// These represent errors that always block a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    /// E001: Name is empty.
    #[serde(rename = "E001")]
    EmptyName,

    /// E002: Name exceeds the maximum length.
    #[serde(rename = "E002")]
    NameTooLong,

    /// E003: Name contains characters outside `[a-z0-9_]`.
    #[serde(rename = "E003")]
    InvalidNameCharacters,

    /// E004: Name already used in the same collection.
    #[serde(rename = "E004")]
    DuplicateName,

    /// E005: Schema is not a JSON object.
    #[serde(rename = "E005")]
    SchemaNotObject,

    /// E006: Schema root `type` is not `"object"`.
    #[serde(rename = "E006")]
    SchemaRootType,

    /// E007: A `properties` key is not a valid parameter name.
    #[serde(rename = "E007")]
    InvalidPropertyName,

    /// E008: `properties` (or one of its entries) is malformed.
    #[serde(rename = "E008")]
    InvalidProperties,

    /// E009: `required` is not an array of strings.
    #[serde(rename = "E009")]
    InvalidRequired,

    /// E010: `required` references an undeclared property.
    #[serde(rename = "E010")]
    UndeclaredRequired,

    /// E011: `$ref` is not supported.
    #[serde(rename = "E011")]
    RefNotSupported,

    /// E012: Function source failed to parse.
    #[serde(rename = "E012")]
    FunctionParse,

    /// E013: Source is not a single function expression.
    #[serde(rename = "E013")]
    NotAFunction,

    /// E014: Function declares more than `(params, context)`.
    #[serde(rename = "E014")]
    FunctionArity,

    /// E015: Resource uri is not scheme-qualified.
    #[serde(rename = "E015")]
    InvalidUri,

    /// E016: Resource uri already used.
    #[serde(rename = "E016")]
    DuplicateUri,

    /// E017: Static content declared as json does not parse.
    #[serde(rename = "E017")]
    InvalidStaticJson,

    /// E018: Unsupported HTTP method.
    #[serde(rename = "E018")]
    InvalidHttpMethod,

    /// E019: HTTP url is empty or not http(s).
    #[serde(rename = "E019")]
    InvalidHttpUrl,

    /// E020: Prompt template is empty.
    #[serde(rename = "E020")]
    EmptyTemplate,

    /// E021: Prompt argument is invalid or duplicated.
    #[serde(rename = "E021")]
    InvalidArgument,

    /// E022: Invocation params do not satisfy the input schema.
    #[serde(rename = "E022")]
    InvalidParams,

    /// E023: A required prompt argument was not supplied.
    #[serde(rename = "E023")]
    MissingArgument,

    /// E024: Schema is not well-formed against the JSON Schema meta-schema.
    #[serde(rename = "E024")]
    MalformedSchema,
}

/// Validation warning codes.
///
/// These never block a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningCode {
    /// W001: Template placeholder has no declared argument.
    #[serde(rename = "W001")]
    UnresolvedPlaceholder,

    /// W002: Declared argument never used by the template.
    #[serde(rename = "W002")]
    UnusedArgument,

    /// W003: Description is empty.
    #[serde(rename = "W003")]
    MissingDescription,
}

/// A validation code that can be either an error or warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ValidationCode {
    /// An error code.
    Error(ErrorCode),
    /// A warning code.
    Warning(WarningCode),
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ErrorCode {
    /// Whether this code reports a uniqueness collision rather than bad input.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ErrorCode::DuplicateName | ErrorCode::DuplicateUri)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorCode::EmptyName => "E001",
            ErrorCode::NameTooLong => "E002",
            ErrorCode::InvalidNameCharacters => "E003",
            ErrorCode::DuplicateName => "E004",
            ErrorCode::SchemaNotObject => "E005",
            ErrorCode::SchemaRootType => "E006",
            ErrorCode::InvalidPropertyName => "E007",
            ErrorCode::InvalidProperties => "E008",
            ErrorCode::InvalidRequired => "E009",
            ErrorCode::UndeclaredRequired => "E010",
            ErrorCode::RefNotSupported => "E011",
            ErrorCode::FunctionParse => "E012",
            ErrorCode::NotAFunction => "E013",
            ErrorCode::FunctionArity => "E014",
            ErrorCode::InvalidUri => "E015",
            ErrorCode::DuplicateUri => "E016",
            ErrorCode::InvalidStaticJson => "E017",
            ErrorCode::InvalidHttpMethod => "E018",
            ErrorCode::InvalidHttpUrl => "E019",
            ErrorCode::EmptyTemplate => "E020",
            ErrorCode::InvalidArgument => "E021",
            ErrorCode::InvalidParams => "E022",
            ErrorCode::MissingArgument => "E023",
            ErrorCode::MalformedSchema => "E024",
        };
        write!(f, "{}", code)
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            WarningCode::UnresolvedPlaceholder => "W001",
            WarningCode::UnusedArgument => "W002",
            WarningCode::MissingDescription => "W003",
        };
        write!(f, "{}", code)
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationCode::Error(e) => write!(f, "{}", e),
            ValidationCode::Warning(w) => write!(f, "{}", w),
        }
    }
}

impl From<ErrorCode> for ValidationCode {
    fn from(code: ErrorCode) -> Self {
        ValidationCode::Error(code)
    }
}

impl From<WarningCode> for ValidationCode {
    fn from(code: WarningCode) -> Self {
        ValidationCode::Warning(code)
    }
}
