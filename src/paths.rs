use std::{env, path::PathBuf};

#[derive(Debug, Clone)]
pub struct Paths {
    pub config: PathBuf,
    pub scratch: PathBuf,
}

/// Directory holding `config.toml`.
///
/// `$XDG_CONFIG_HOME/gitpost`, or `$HOME/.config/gitpost` when XDG is unset.
pub fn gitpost_home() -> PathBuf {
    let xdg = env::var_os("XDG_CONFIG_HOME");
    let base = xdg
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config"));
    base.join("gitpost")
}

pub fn paths() -> Paths {
    let home = gitpost_home();
    Paths {
        config: home.join("config.toml"),
        scratch: env::temp_dir().join("gitpost"),
    }
}
