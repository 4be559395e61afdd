use crate::error::{Result, SageError};

const MAX_INPUT_PATH_BYTES: usize = 32 * 1024;
const MAX_COMPONENTS: usize = 4096;
const MAX_COMPONENT_BYTES: usize = 255;

/// Normalize a request's relative path to `a/b/c` form.
///
/// Backslashes become separators, `.` and empty segments drop out and `..`
/// folds into its parent. Absolute paths, drive-letter and UNC roots, and
/// anything that climbs above the layer root are rejected.
pub fn normalize_relative(input: &str) -> Result<String> {
    let invalid = |reason: &'static str| SageError::InvalidPath {
        path: input.to_string(),
        reason,
    };

    if input.len() > MAX_INPUT_PATH_BYTES {
        return Err(invalid("path too long"));
    }
    if input.contains('\0') {
        return Err(invalid("path contains a NUL byte"));
    }

    let normalized = if input.contains('\\') {
        log::trace!("input '{input}' contained backslashes; normalized to forward slashes");
        input.replace('\\', "/")
    } else {
        input.to_string()
    };

    if normalized.starts_with('/') {
        return Err(invalid("absolute paths are not allowed"));
    }
    let bytes = normalized.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(invalid("drive-letter paths are not allowed"));
    }

    let mut components: Vec<&str> = Vec::new();
    for part in normalized.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                if components.pop().is_none() {
                    return Err(invalid("path escapes the layer root"));
                }
            }
            _ => {
                if part.len() > MAX_COMPONENT_BYTES {
                    return Err(invalid("path component too long"));
                }
                components.push(part);
                if components.len() > MAX_COMPONENTS {
                    return Err(invalid("too many path components"));
                }
            }
        }
    }

    if components.is_empty() {
        return Err(invalid("path is empty"));
    }
    Ok(components.join("/"))
}

/// Category and locale names become single directory names.
pub fn validate_segment(kind: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(SageError::InvalidPath {
            path: value.to_string(),
            reason: kind,
        });
    }
    Ok(())
}
