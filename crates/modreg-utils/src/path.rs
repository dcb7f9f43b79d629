use std::{env, path::PathBuf};

pub trait PathResolver {
    /// Returns the user's home directory
    ///
    /// On Unix this is `HOME`, on Windows `USERPROFILE`. Returns `None` when the variable is
    /// unset or empty.
    ///
    /// # Example
    ///
    /// ```
    /// use modreg_utils::path::{PathResolver, SystemPathResolver};
    ///
    /// let resolver = SystemPathResolver;
    /// let home = resolver.home_dir();
    /// println!("Home dir is {:#?}", home);
    /// ```
    fn home_dir(&self) -> Option<PathBuf>;

    /// Returns the directory holding system-wide configuration
    ///
    /// On Unix this is always `/etc`. On Windows it is `ProgramData`, if set.
    fn system_config_dir(&self) -> Option<PathBuf>;
}

/// The default [`PathResolver`] implementation backed by environment variables.
pub struct SystemPathResolver;

impl PathResolver for SystemPathResolver {
    fn home_dir(&self) -> Option<PathBuf> {
        let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
        non_empty_var(var)
    }

    fn system_config_dir(&self) -> Option<PathBuf> {
        if cfg!(windows) {
            non_empty_var("ProgramData")
        } else {
            Some(PathBuf::from("/etc"))
        }
    }
}

fn non_empty_var(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Returns the user's home directory using [`SystemPathResolver`].
pub fn home_dir() -> Option<PathBuf> {
    SystemPathResolver.home_dir()
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn with_var<F: FnOnce()>(key: &str, value: Option<&str>, f: F) {
        let old = env::var_os(key);
        match value {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }
        f();
        match old {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_home_dir_from_env() {
        with_var("HOME", Some("/home/modreg"), || {
            assert_eq!(home_dir(), Some(PathBuf::from("/home/modreg")));
        });
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_home_dir_unset_or_empty() {
        with_var("HOME", None, || assert_eq!(home_dir(), None));
        with_var("HOME", Some(""), || assert_eq!(home_dir(), None));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_config_dir() {
        assert_eq!(
            SystemPathResolver.system_config_dir(),
            Some(PathBuf::from("/etc"))
        );
    }
}
