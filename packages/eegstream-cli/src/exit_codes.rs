use eegstream::EegError;

pub const SUCCESS: i32 = 0;
pub const INPUT_ERROR: i32 = 1;
pub const EXECUTION_ERROR: i32 = 2;

/// Bad input from the user maps to INPUT_ERROR, everything else to EXECUTION_ERROR
pub fn for_error(err: &EegError) -> i32 {
    match err {
        EegError::NotFound(_)
        | EegError::Format(_)
        | EegError::Config(_)
        | EegError::MissingChannel { .. }
        | EegError::InvalidWindow(_)
        | EegError::InvalidAnnotation(_) => INPUT_ERROR,
        EegError::Io(_) | EegError::NoRecordingOpen => EXECUTION_ERROR,
    }
}

/// Print an error and return its exit code
pub fn report(err: &EegError) -> i32 {
    eprintln!("Error: {}", err);
    for_error(err)
}
