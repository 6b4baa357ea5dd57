//! Credential action error types.

/// Failure of a credential-store action.
#[derive(Debug, thiserror::Error)]
pub enum CtlError {
    /// The tool could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool exited unsuccessfully.
    #[error("{program} exited with {code:?}: {output}")]
    Failed {
        program: String,
        code: Option<i32>,
        output: String,
    },

    /// The tool did not finish in time and was killed.
    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
}
