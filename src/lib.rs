// 公共API暴露
mod cli;
mod config;
mod error;
mod generator;
mod models;
mod parser;
mod probe;
mod resolver;
mod utils;

pub use cli::{CliArgs, parse_args, parse_args_from};
pub use config::{DEFAULT_TIMEOUT, FALLBACK_COMPILERS, ToolchainConfig};
pub use error::{InvocationFailure, ResolveError};
pub use generator::{OutputFormat, RenderOptions, apply_options, render};
pub use models::{ResolveRequest, ResolvedFlags};
pub use parser::{UnrecognizedOutput, parse_probe_output};
pub use probe::{ProbeOutput, run_probe};
pub use resolver::{NativeFlagResolver, resolve};
pub use utils::{init_logging, split_command_line};
