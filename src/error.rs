use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Role of the element that rejected a value, used in validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Element,
    Group,
    MultiLine,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Role::Element => "element",
            Role::Group => "group element",
            Role::MultiLine => "multi-line element",
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("value [{value}] is not allowed for the [{name}] {role}")]
    Validation {
        value: String,
        name: String,
        role: Role,
    },
    #[error("element \"{key}\" not found in the {payload} payload")]
    NotFound { key: String, payload: String },
    #[error("{0}")]
    Parse(String),
    #[error("malformed xml at line {line}, column {column}: {message}")]
    MalformedXml {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("empty xml document cannot be parsed into a payload")]
    EmptyDocument,
    #[error("failed to write xml: {0}")]
    XmlWrite(String),
    #[error("the [{0}] element must not be modified once it is set")]
    ReadOnly(String),
    #[error("duplicate attribute alias \"{0}\"")]
    DuplicateAlias(String),
    #[error("the {0} payload is read-only")]
    ReadOnlyPayload(String),
    #[error("a line inside a text block may not be modified")]
    LineModification,
    #[error("a line inside a text block may not be deleted")]
    LineDeletion,
    #[error("value [{value}] cannot overwrite a {payload} payload")]
    Overwrite { value: String, payload: String },
    #[error("cannot add a value to a non-group element ({0})")]
    NotAGroup(String),
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("value [{0}] is not a valid ROA resource class")]
    InvalidResourceClass(String),
    #[cfg(feature = "json")]
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn validation(value: impl std::fmt::Display, name: &str, role: Role) -> Self {
        Error::Validation {
            value: value.to_string(),
            name: name.to_string(),
            role,
        }
    }

    pub(crate) fn not_found(key: &str, payload: &str) -> Self {
        Error::NotFound {
            key: key.to_string(),
            payload: payload.to_string(),
        }
    }
}

/// Error codes reported by the registry in an `error` response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("unspecified error")]
    Unspecified,
    #[error("schema validation failed")]
    SchemaValidation,
    #[error("entity validation failed")]
    EntityValidation,
    #[error("bad request")]
    BadRequest,
    #[error("authentication failed")]
    Authentication,
    #[error("object not found")]
    ObjectNotFound,
    #[error("object not removeable")]
    NotRemoveable,
    #[error("service outage")]
    Outage,
}

impl ApiError {
    pub fn code(&self) -> u16 {
        match self {
            ApiError::Unspecified => 0,
            ApiError::SchemaValidation => 1,
            ApiError::EntityValidation => 2,
            ApiError::BadRequest => 400,
            ApiError::Authentication => 403,
            ApiError::ObjectNotFound => 404,
            ApiError::NotRemoveable => 409,
            ApiError::Outage => 503,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "E_UNSPECIFIED" => ApiError::Unspecified,
            "E_SCHEMA_VALIDATION" => ApiError::SchemaValidation,
            "E_ENTITY_VALIDATION" => ApiError::EntityValidation,
            "E_BAD_REQUEST" => ApiError::BadRequest,
            "E_AUTHENTICATION" => ApiError::Authentication,
            "E_OBJECT_NOT_FOUND" => ApiError::ObjectNotFound,
            "E_NOT_REMOVEABLE" => ApiError::NotRemoveable,
            "E_OUTAGE" => ApiError::Outage,
            _ => return None,
        })
    }
}
