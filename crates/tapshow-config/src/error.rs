use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse KDL")]
    #[diagnostic(code(tapshow::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: kdl::KdlError,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(tapshow::config::invalid))]
    Invalid { message: String },

    #[error("Invalid value for `{option}`: expected {expected}")]
    #[diagnostic(
        code(tapshow::config::wrong_type),
        help("see `tapshow init` for a commented default configuration")
    )]
    WrongType {
        option: String,
        expected: &'static str,
        #[source_code]
        src: String,
        #[label("this value")]
        span: miette::SourceSpan,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
