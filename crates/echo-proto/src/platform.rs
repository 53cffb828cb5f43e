use std::path::PathBuf;

/// Port the Echo server listens on when the address is a bare host.
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Address used before anything has been saved or scanned.
pub const DEFAULT_SERVER_HOST: &str = "192.168.10.8";

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/echo/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("echo")
    }
    #[cfg(windows)]
    {
        // Portable installs keep their data beside the executable
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let portable_data = exe_dir.join("data");
                if portable_data.exists() {
                    return portable_data;
                }
            }
        }

        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("echo")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(windows)]
    {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let portable_config = exe_dir.join("config.toml");
                if portable_config.exists() {
                    return exe_dir.to_path_buf();
                }
            }
        }
    }

    // On macOS and Linux, always use ~/.config/echo/
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("echo")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("echo")
    }
}

/// File holding the last-used server address.
pub fn server_state_file() -> PathBuf {
    data_dir().join("server.toml")
}

#[cfg(unix)]
fn binary_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(windows)]
fn binary_names(name: &str) -> Vec<String> {
    vec![format!("{name}.exe"), name.to_string()]
}

fn find_beside_exe(names: &[String]) -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    for name in names {
        let p = dir.join(name);
        if p.exists() {
            return Some(p);
        }
        let p = dir.join("external").join(name);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn find_on_path(names: &[String]) -> Option<PathBuf> {
    let path = std::env::var("PATH").ok()?;
    #[cfg(unix)]
    let sep = ":";
    #[cfg(windows)]
    let sep = ";";
    for dir in path.split(sep) {
        for name in names {
            let p = PathBuf::from(dir).join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }
    None
}

/// Resolve the QR scanner command.
///
/// Absolute or relative paths are taken as-is when they exist. Bare names are
/// looked up beside the current exe (and its `external/` folder), then on PATH.
pub fn find_scanner_binary(command: &str) -> Option<PathBuf> {
    if command.is_empty() {
        return None;
    }
    let direct = PathBuf::from(command);
    if direct.components().count() > 1 {
        return direct.exists().then_some(direct);
    }
    let names = binary_names(command);
    find_beside_exe(&names).or_else(|| find_on_path(&names))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scanner_command_is_never_found() {
        assert!(find_scanner_binary("").is_none());
    }

    #[test]
    fn test_missing_scanner_path_is_not_found() {
        assert!(find_scanner_binary("/definitely/not/here/zbarcam").is_none());
    }

    #[test]
    fn test_state_file_lives_in_data_dir() {
        assert!(server_state_file().starts_with(data_dir()));
    }
}
