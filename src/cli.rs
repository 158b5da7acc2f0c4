use std::ffi::OsString;
use std::time::Duration;

use clap::Parser;

use crate::generator::{OutputFormat, RenderOptions};

/// 命令行参数结构
#[derive(Parser, Debug)]
#[command(
    name = "resolve-march-native",
    version,
    about = "Determine what GCC flags -march=native would resolve into"
)]
pub struct CliArgs {
    /// Compiler to query (default: $CC, else gcc or cc from PATH)
    #[arg(long = "cc", value_name = "PATH")]
    pub cc: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Gcc)]
    pub format: OutputFormat,

    /// Seconds to wait for the compiler before giving up
    #[arg(long, value_name = "SECS", default_value_t = 5.0)]
    pub timeout: f64,

    /// Keep -mtune= even when it names the same CPU as -march=
    #[arg(long)]
    pub keep_identical_mtune: bool,

    /// Keep -mno-* flags
    #[arg(long)]
    pub keep_mno_flags: bool,

    /// Drop --param entries (cache sizes)
    #[arg(long)]
    pub without_params: bool,

    /// Print debug logging to stderr
    #[arg(short, long)]
    pub debug: bool,

    /// Extra arguments passed to the compiler (after --)
    #[arg(last = true, value_name = "COMPILER_ARGS")]
    pub extra_args: Vec<String>,
}

impl CliArgs {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            keep_identical_mtune: self.keep_identical_mtune,
            keep_mno_flags: self.keep_mno_flags,
            without_params: self.without_params,
        }
    }

    /// 非法取值（负数、NaN、过大）时退回默认值
    pub fn timeout(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.timeout).ok()
    }
}

/// 解析进程命令行参数
pub fn parse_args() -> Result<CliArgs, clap::Error> {
    CliArgs::try_parse()
}

/// 解析给定的参数列表（第一个元素为程序名）
pub fn parse_args_from<I, T>(args: I) -> Result<CliArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CliArgs::try_parse_from(args)
}
