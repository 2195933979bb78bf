use std::fmt;

#[derive(Debug)]
pub enum ProbeError {
    MachCallFailed(&'static str, i32),
    Io(String, std::io::Error),
    Parse(String),
    Unsupported(&'static str),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::MachCallFailed(call, code) => {
                write!(f, "{} returned {}", call, code)
            }
            ProbeError::Io(path, err) => {
                write!(f, "reading {} failed: {}", path, err)
            }
            ProbeError::Parse(msg) => write!(f, "parse error: {}", msg),
            ProbeError::Unsupported(what) => {
                write!(f, "{} is not supported on this platform", what)
            }
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Io(_, err) => Some(err),
            _ => None,
        }
    }
}
