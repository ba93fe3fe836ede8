use thiserror::Error;

/// The validator output does not have the shape the index builder needs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormatError {
    #[error("error Output must follow Draft 2019-09: root must have valid: false")]
    RootNotInvalid,
    #[error("error Output must follow Draft 2019-09: root has no errors")]
    EmptyErrors,
    #[error("error Output must follow Draft 2019-09: missing instanceLocation at {path}")]
    MissingInstanceLocation { path: String },
    #[error(
        "error Output must follow Draft 2019-09: missing keywordLocation and absoluteKeywordLocation at {path}"
    )]
    MissingKeywordLocation { path: String },
    #[error("unable to resolve keywordLocation {keyword_location}: {reason}")]
    UnresolvableKeywordLocation { keyword_location: String, reason: String },
    #[error("malformed output at JSON path {path} → {message}")]
    Malformed { path: String, message: String },
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unknown schema {uri}")]
    UnknownSchema { uri: String },
    #[error("invalid pointer {pointer} in {uri}")]
    InvalidPointer { uri: String, pointer: String },
    #[error("invalid regex at {location}: {source}")]
    InvalidRegex {
        location: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid reference {reference}: {reason}")]
    InvalidReference { reference: String, reason: String },
    #[error("invalid keyword at {location}: {reason}")]
    InvalidKeyword { location: String, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocalizationError {
    #[error("Localization error: message '{id}' not found.")]
    MissingMessage { locale: String, id: String },
    #[error("unknown locale {locale}")]
    UnknownLocale { locale: String },
}

#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Localization(#[from] LocalizationError),
}
