use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::utils::{compute_absolute_path, is_executable};

/// 等待编译器退出的默认时长
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// 未指定编译器时依次尝试的名字
pub const FALLBACK_COMPILERS: [&str; 2] = ["gcc", "cc"];

/// 进程级的工具链发现配置，每次运行只读取一次 `CC` 与 `PATH`
#[derive(Debug, Clone, Default)]
pub struct ToolchainConfig {
    cc: Option<String>,
    search_path: Option<OsString>,
}

impl ToolchainConfig {
    pub fn new(cc: Option<String>, search_path: Option<OsString>) -> Self {
        ToolchainConfig { cc, search_path }
    }

    pub fn from_env() -> Self {
        let config = ToolchainConfig {
            cc: env::var("CC").ok(),
            search_path: env::var_os("PATH"),
        };
        debug!("toolchain config from environment: {:?}", config);
        config
    }

    /// 默认编译器：`CC` 的第一个词，否则 PATH 上第一个能找到的 gcc/cc
    pub fn default_compiler(&self) -> String {
        if let Some(cc) = self.cc.as_deref().and_then(|cc| cc.split_whitespace().next()) {
            debug!("using compiler from CC: {}", cc);
            return cc.to_string();
        }

        let found = FALLBACK_COMPILERS
            .iter()
            .find(|name| self.locate(name).is_some())
            .unwrap_or(&FALLBACK_COMPILERS[0]);
        debug!("default compiler: {}", found);
        found.to_string()
    }

    /// 定位编译器可执行文件；带路径分隔符的按路径检查，否则在 PATH 中搜索
    pub fn locate(&self, compiler: &str) -> Option<PathBuf> {
        if compiler.is_empty() {
            return None;
        }

        let candidate = Path::new(compiler);
        if candidate.components().count() > 1 || candidate.is_absolute() {
            let found = is_executable(candidate)
                .then(|| compute_absolute_path(candidate).unwrap_or_else(|_| candidate.to_path_buf()));
            debug!("checked compiler path {}: {:?}", compiler, found);
            return found;
        }

        let search_path = self.search_path.as_ref()?;
        let found = env::split_paths(search_path)
            .filter(|dir| !dir.as_os_str().is_empty())
            .flat_map(|dir| executable_names(compiler).into_iter().map(move |name| dir.join(name)))
            .find(|path| is_executable(path));
        debug!("searched PATH for {}: {:?}", compiler, found);
        found
    }
}

#[cfg(windows)]
fn executable_names(name: &str) -> Vec<String> {
    if Path::new(name).extension().is_some() {
        vec![name.to_string()]
    } else {
        vec![format!("{}.exe", name), name.to_string()]
    }
}

#[cfg(not(windows))]
fn executable_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn make_tool(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn cc_variable_wins_and_drops_flags() {
        let config = ToolchainConfig::new(Some("clang-18 -m32".to_string()), None);
        assert_eq!(config.default_compiler(), "clang-18");
    }

    #[test]
    fn blank_cc_falls_back_to_search() {
        let dir = tempfile::tempdir().unwrap();
        make_tool(dir.path(), "cc");
        let config = ToolchainConfig::new(Some("   ".to_string()), Some(dir.path().into()));
        assert_eq!(config.default_compiler(), "cc");
    }

    #[test]
    fn gcc_preferred_over_cc() {
        let dir = tempfile::tempdir().unwrap();
        make_tool(dir.path(), "cc");
        make_tool(dir.path(), "gcc");
        let config = ToolchainConfig::new(None, Some(dir.path().into()));
        assert_eq!(config.default_compiler(), "gcc");
    }

    #[test]
    fn nothing_found_defaults_to_gcc() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolchainConfig::new(None, Some(dir.path().into()));
        assert_eq!(config.default_compiler(), "gcc");
    }

    #[test]
    fn locate_searches_each_directory() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let tool = make_tool(second.path(), "my-gcc");
        let path = env::join_paths([first.path(), second.path()]).unwrap();
        let config = ToolchainConfig::new(None, Some(path));

        assert_eq!(config.locate("my-gcc"), Some(tool));
        assert_eq!(config.locate("missing-gcc"), None);
        assert_eq!(config.locate(""), None);
    }

    #[test]
    fn locate_checks_explicit_paths() {
        let dir = tempfile::tempdir().unwrap();
        let tool = make_tool(dir.path(), "gcc-13");
        let config = ToolchainConfig::new(None, None);

        assert_eq!(config.locate(tool.to_str().unwrap()), Some(tool.clone()));
        assert_eq!(config.locate(dir.path().join("nope").to_str().unwrap()), None);

        // 不可执行的文件不算
        let plain = dir.path().join("notes.txt");
        fs::write(&plain, "x").unwrap();
        assert_eq!(config.locate(plain.to_str().unwrap()), None);
    }

    #[test]
    fn locate_without_search_path() {
        let config = ToolchainConfig::new(None, None);
        assert_eq!(config.locate("gcc"), None);
    }
}
