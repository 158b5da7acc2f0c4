use crate::models::ResolvedFlags;

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// All flags on one line, ready for CFLAGS
    #[default]
    Gcc,
    /// One flag per line
    Plain,
    /// Pretty-printed JSON object
    Json,
}

/// 输出前的精简选项
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub keep_identical_mtune: bool,
    pub keep_mno_flags: bool,
    pub without_params: bool,
}

/// 按选项去掉冗余参数，返回新的结果
pub fn apply_options(flags: &ResolvedFlags, options: &RenderOptions) -> ResolvedFlags {
    let tune_flag = match (flags.arch_value(), flags.tune_value()) {
        (Some(arch), Some(tune)) if arch == tune && !options.keep_identical_mtune => {
            log::debug!("dropping -mtune={} identical to -march", tune);
            None
        }
        _ => flags.tune_flag.clone(),
    };

    let other_flags = flags
        .other_flags
        .iter()
        .filter(|f| options.keep_mno_flags || !f.starts_with("-mno-"))
        .filter(|f| !options.without_params || !f.starts_with("--param"))
        .cloned()
        .collect();

    ResolvedFlags {
        arch_flag: flags.arch_flag.clone(),
        tune_flag,
        other_flags,
    }
}

/// 生成最终输出文本（以换行结尾；无参数时为空串）
pub fn render(flags: &ResolvedFlags, format: OutputFormat) -> Result<String, serde_json::Error> {
    let all = flags.all_flags();
    let text = match format {
        OutputFormat::Gcc if all.is_empty() => String::new(),
        OutputFormat::Gcc => format!("{}\n", all.join(" ")),
        OutputFormat::Plain => all.iter().map(|f| format!("{}\n", f)).collect(),
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(flags)?),
    };
    Ok(text)
}
