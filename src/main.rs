use std::io::Write;
use std::process::ExitCode;

use log::{debug, warn};
use resolve_march_native::{
    CliArgs, NativeFlagResolver, ResolveRequest, ToolchainConfig, apply_options, init_logging,
    parse_args, render,
};

// sysexits.h 的取值，避开解析失败用的 1/2/3
const EXIT_USAGE: u8 = 64;
const EXIT_SOFTWARE: u8 = 70;
const EXIT_IOERR: u8 = 74;

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                // --help / --version
                ExitCode::SUCCESS
            };
        }
    };
    init_logging(args.debug);
    debug!("arguments: {:?}", args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run(args: &CliArgs) -> Result<(), u8> {
    // CC/PATH 每次运行只读取一次
    let config = ToolchainConfig::from_env();
    let compiler = args
        .cc
        .clone()
        .unwrap_or_else(|| config.default_compiler());
    let request = ResolveRequest::new(compiler).with_extra_args(args.extra_args.iter().cloned());

    let mut resolver = NativeFlagResolver::new(config);
    match args.timeout() {
        Some(timeout) => resolver = resolver.with_timeout(timeout),
        None => warn!("ignoring invalid timeout {}, using default", args.timeout),
    }

    let flags = resolver.resolve(&request).map_err(|err| {
        eprintln!("Error: {}", err);
        err.exit_code()
    })?;

    let flags = apply_options(&flags, &args.render_options());
    let text = render(&flags, args.format).map_err(|err| {
        eprintln!("Error: failed to format output: {}", err);
        EXIT_SOFTWARE
    })?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|err| {
            eprintln!("Error: failed to write output: {}", err);
            EXIT_IOERR
        })
}
