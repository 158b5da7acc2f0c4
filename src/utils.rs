use std::path::{Component, Path, PathBuf};

use log::LevelFilter;

/// 初始化日志：调试模式下输出 Debug 级别，否则只输出警告；`RUST_LOG` 优先
pub fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

/// 逻辑上计算绝对路径（不解析符号链接，不要求路径存在）
pub fn compute_absolute_path(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    // 逻辑消除 ".." 和 "."
    let mut clean_path = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                clean_path.pop();
            }
            Component::Normal(c) => clean_path.push(c),
            Component::RootDir | Component::Prefix(_) => clean_path.push(component.as_os_str()),
            Component::CurDir => {}
        }
    }

    if clean_path.as_os_str().is_empty() {
        Ok(PathBuf::from("."))
    } else {
        Ok(clean_path)
    }
}

/// 是否为可执行的普通文件
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// 按 shell 规则粗略切分一行：空白分隔，单双引号包住的内容视为一个词
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    in_word = true;
                }
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    current.push(c);
                    in_word = true;
                }
            },
        }
    }
    if in_word {
        words.push(current);
    }
    words
}
