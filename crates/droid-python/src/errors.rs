use thiserror::Error;

/// Failure classes reported across the host boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigurationDecodeFailure,
    InitializationFailure,
    ImportFailure,
    Busy,
    Interpreter,
    ScriptExit,
}

/// Import or top-level execution of the entry module raised
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to import module '{module}': {message}")]
pub struct ImportError {
    pub module: String,
    pub message: String,
    /// Formatted interpreter traceback, when one was available
    pub traceback: Option<String>,
}

impl ImportError {
    pub fn new(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            message: message.into(),
            traceback: None,
        }
    }

    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }
}

/// Errors that can occur during bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to decode {0}")]
    ConfigurationDecode(String),

    #[error("Failed to initialize Python interpreter: {0}")]
    Initialization(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("An interpreter is already running in this process")]
    AlreadyRunning,

    #[error("Python error: {0}")]
    Python(String),

    /// The entry script raised `SystemExit` with a non-zero status
    #[error("Python script exited with status {0}")]
    ScriptExit(i32),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::ConfigurationDecode(_) => ErrorKind::ConfigurationDecodeFailure,
            BridgeError::Initialization(_) => ErrorKind::InitializationFailure,
            BridgeError::Import(_) => ErrorKind::ImportFailure,
            BridgeError::AlreadyRunning => ErrorKind::Busy,
            BridgeError::Python(_) => ErrorKind::Interpreter,
            BridgeError::ScriptExit(_) => ErrorKind::ScriptExit,
        }
    }

    /// Stable integer handed back to hosts that only understand status codes.
    /// Zero is reserved for success.
    pub fn status_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::ConfigurationDecodeFailure => 1,
            ErrorKind::InitializationFailure => 2,
            ErrorKind::ImportFailure => 3,
            ErrorKind::Busy => 4,
            ErrorKind::Interpreter => 5,
            ErrorKind::ScriptExit => 6,
        }
    }
}

/// Generic conversion from PyErr to BridgeError.
///
/// NOTE: This conversion drops the traceback. Import failures go through
/// `ImportError` instead so the traceback reaches the log.
impl From<pyo3::PyErr> for BridgeError {
    fn from(err: pyo3::PyErr) -> Self {
        BridgeError::Python(format!("{}", err))
    }
}
