use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Usage,
    Config,
    Session,
    Lookup,
    Fingerprint,
    Timeout,
    Other,
}

impl ErrorClass {
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorClass::Usage => 2,
            ErrorClass::Config
            | ErrorClass::Session
            | ErrorClass::Lookup
            | ErrorClass::Fingerprint
            | ErrorClass::Timeout
            | ErrorClass::Other => 1,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ErrorClass::Usage => "USAGE",
            ErrorClass::Config => "CONFIG",
            ErrorClass::Session => "SESSION",
            ErrorClass::Lookup => "LOOKUP",
            ErrorClass::Fingerprint => "FINGERPRINT",
            ErrorClass::Timeout => "TIMEOUT",
            ErrorClass::Other => "ERROR",
        }
    }
}

#[derive(Debug)]
pub struct VmInfoError {
    pub class: ErrorClass,
    pub message: String,
}

impl VmInfoError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self { class, message: message.into() }
    }

    pub fn usage(msg: impl Into<String>) -> Self { Self::new(ErrorClass::Usage, msg) }
    pub fn config(msg: impl Into<String>) -> Self { Self::new(ErrorClass::Config, msg) }
    pub fn session(msg: impl Into<String>) -> Self { Self::new(ErrorClass::Session, msg) }
    pub fn lookup(msg: impl Into<String>) -> Self { Self::new(ErrorClass::Lookup, msg) }
    pub fn fingerprint(msg: impl Into<String>) -> Self { Self::new(ErrorClass::Fingerprint, msg) }
    pub fn timeout(msg: impl Into<String>) -> Self { Self::new(ErrorClass::Timeout, msg) }
    pub fn other(msg: impl Into<String>) -> Self { Self::new(ErrorClass::Other, msg) }

    pub fn format_stderr(&self) -> String {
        format!("error[{}]: {}", self.class.tag(), self.message)
    }
}

impl fmt::Display for VmInfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_stderr())
    }
}

impl std::error::Error for VmInfoError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classes_exit_one() {
        for class in [ErrorClass::Config, ErrorClass::Session, ErrorClass::Lookup, ErrorClass::Timeout, ErrorClass::Other] {
            assert_eq!(class.exit_code(), 1, "{:?}", class);
        }
        assert_eq!(ErrorClass::Usage.exit_code(), 2);
    }

    #[test]
    fn stderr_line_is_tagged() {
        let e = VmInfoError::lookup("vm 'web01' not found");
        assert_eq!(e.to_string(), "error[LOOKUP]: vm 'web01' not found");
        assert!(!e.to_string().contains('\n'));
    }
}
