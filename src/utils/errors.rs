#![forbid(unsafe_code)]

use thiserror::Error;

/// Error enumerates the errors returned by this application.
#[derive(Error, Debug)]
pub enum Errors {
    /// Input parameter logging.
    #[error("greet_server input parameters:\n{}", .0)]
    InputParms(String),

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Inaccessible logger configuration file.
    #[error("Unable to access the Log4rs configuration file: {}", .0)]
    Log4rsInitialization(String),

    #[error("Reading application configuration file: {}", .0)]
    ReadingConfigFile(String),

    #[error("Unable to parse TOML file: {}", .0)]
    TOMLParseError(String),

    /// A page template could not be rendered.
    #[error("Unable to render the {} page: {}", .0, .1)]
    PageRenderError(String, String),

    /// The HTML body could not be written to the response.
    #[error("Unable to write the HTML response: {}", .0)]
    ResponseWriteError(String),

    /// The fallback HTTP error status could not be sent.
    #[error("Unable to send the HTTP error status: {}", .0)]
    StatusNotifyError(String),

    #[error("{}", .0)]
    GreetError(String),
}
