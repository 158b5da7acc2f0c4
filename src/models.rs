use serde::Serialize;

/// 一次解析请求：要探测的编译器以及透传给它的额外参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    compiler: String,
    extra_args: Vec<String>,
}

impl ResolveRequest {
    pub fn new(compiler: impl Into<String>) -> Self {
        ResolveRequest {
            compiler: compiler.into(),
            extra_args: Vec::new(),
        }
    }

    /// 附加透传参数（例如 `-m32`），顺序保持不变
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }
}

/// `-march=native -mtune=native` 展开后的具体参数
///
/// `other_flags` 只含展开带来的参数，请求里透传的参数不会出现在这里。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedFlags {
    pub arch_flag: Option<String>,  // 例如 -march=skylake
    pub tune_flag: Option<String>,  // 例如 -mtune=skylake
    pub other_flags: Vec<String>,   // -mavx2, --param=l1-cache-size=32 ...
}

impl ResolvedFlags {
    /// `-march=` 后面的值
    pub fn arch_value(&self) -> Option<&str> {
        self.arch_flag
            .as_deref()
            .and_then(|f| f.strip_prefix("-march="))
    }

    /// `-mtune=` 后面的值
    pub fn tune_value(&self) -> Option<&str> {
        self.tune_flag
            .as_deref()
            .and_then(|f| f.strip_prefix("-mtune="))
    }

    /// 按 arch、tune、其他 的顺序返回全部参数
    pub fn all_flags(&self) -> Vec<&str> {
        self.arch_flag
            .iter()
            .chain(self.tune_flag.iter())
            .chain(self.other_flags.iter())
            .map(String::as_str)
            .collect()
    }
}
