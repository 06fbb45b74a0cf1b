use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    AuthenticationFailed(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::AuthenticationFailed(_) => ExitCode::AuthenticationFailed,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::AuthenticationFailed(e) | Self::RuntimeError(e) => e,
        }
    }
}

impl From<callbench_core::Error> for RunError {
    fn from(err: callbench_core::Error) -> Self {
        use callbench_core::Error;

        match err {
            Error::Authentication(_) => Self::AuthenticationFailed(err.into()),
            Error::InvalidTiers
            | Error::InvalidDuration
            | Error::InvalidInterval
            | Error::EmptyScenarioCatalog
            | Error::InvalidBaseUrl(_)
            | Error::InvalidIterations(_) => Self::InvalidInput(err.into()),
            Error::Join(_) => Self::RuntimeError(err.into()),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.anyhow())
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let invalid = RunError::from(callbench_core::Error::InvalidTiers);
        assert_eq!(invalid.exit_code(), ExitCode::InvalidInput);

        let auth = RunError::from(callbench_core::Error::Authentication(
            callbench_core::load::AuthError::Rejected { status: 401 },
        ));
        assert_eq!(auth.exit_code(), ExitCode::AuthenticationFailed);
        assert_eq!(auth.exit_code().as_i32(), 20);
        assert!(auth.to_string().contains("401"));
    }
}
