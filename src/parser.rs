use std::collections::HashSet;
use std::path::Path;

use log::debug;

use crate::models::ResolvedFlags;
use crate::utils::split_command_line;

/// 编译器驱动回显请求参数的行，内容是 `-march=native` 本身而非展开结果
const ECHO_PREFIX: &str = "COLLECT_GCC_OPTIONS=";

/// 诊断输出中没有任何可识别的展开结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedOutput;

/// 解析 `-march=native -mtune=native -E -v -` 的诊断输出
pub fn parse_probe_output(text: &str) -> Result<ResolvedFlags, UnrecognizedOutput> {
    let mut flags = ResolvedFlags::default();
    let mut seen = HashSet::new();
    let mut saw_compiler_proper = false;
    let mut saw_native_arch = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with(ECHO_PREFIX) {
            continue;
        }

        let words = split_command_line(trimmed);
        let proper_line = words.first().is_some_and(|w| is_compiler_proper(w));
        // 非 cc1 行只认以参数开头的行，避免 "Configured with: ... CFLAGS='-march=...'"
        let flag_line = words.first().is_some_and(|w| w.starts_with('-'));
        if !proper_line && !(flag_line && words.iter().any(|w| is_concrete_arch_or_tune(w))) {
            continue;
        }
        saw_compiler_proper |= proper_line;
        debug!("expansion line: {}", trimmed);

        // 跳过 cc1 程序路径本身
        let mut iter = words.iter().skip(usize::from(proper_line)).peekable();
        while let Some(word) = iter.next() {
            if word.starts_with("-march=") {
                if is_concrete_arch_or_tune(word) {
                    flags.arch_flag = Some(word.clone());
                } else {
                    saw_native_arch = true;
                }
            } else if word.starts_with("-mtune=") {
                if is_concrete_arch_or_tune(word) {
                    flags.tune_flag = Some(word.clone());
                }
            } else if word.starts_with("--param=") {
                push_unique(&mut flags.other_flags, &mut seen, word.clone());
            } else if word == "--param" {
                // 旧版 gcc 把 --param 与取值分成两个词
                if let Some(value) = iter.next_if(|v| !v.starts_with('-')) {
                    push_unique(&mut flags.other_flags, &mut seen, format!("--param={}", value));
                }
            } else if word.len() > 2 && word.starts_with("-m") {
                push_unique(&mut flags.other_flags, &mut seen, word.clone());
            }
        }
    }

    if flags.arch_flag.is_none() && !saw_compiler_proper {
        debug!("no -march= expansion and no compiler invocation in output");
        return Err(UnrecognizedOutput);
    }
    // cc1 收到的仍是 -march=native：编译器没有做本机探测
    if flags.arch_flag.is_none() && saw_native_arch {
        debug!("-march=native reached the compiler unexpanded");
        return Err(UnrecognizedOutput);
    }

    debug!(
        "parsed arch={:?} tune={:?} others={}",
        flags.arch_flag,
        flags.tune_flag,
        flags.other_flags.len()
    );
    Ok(flags)
}

/// 编译器本体（cc1、cc1plus 等）的调用行
fn is_compiler_proper(program: &str) -> bool {
    Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("cc1"))
}

fn is_concrete_arch_or_tune(word: &str) -> bool {
    word.strip_prefix("-march=")
        .or_else(|| word.strip_prefix("-mtune="))
        .is_some_and(|v| !v.is_empty() && v != "native")
}

fn push_unique(out: &mut Vec<String>, seen: &mut HashSet<String>, flag: String) {
    if seen.insert(flag.clone()) {
        out.push(flag);
    }
}
