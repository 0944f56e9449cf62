/// 评测模式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// 并行模式：多个模型同时评测
    Parallel,
    /// 详细模式：一次评测一个模型，逐题打印原始输出
    Verbose,
}

impl RunMode {
    /// 从字符串解析评测模式，无法识别时回退到并行模式
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "verbose" | "debug" | "2" => RunMode::Verbose,
            _ => RunMode::Parallel,
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// Ollama 服务地址
    pub ollama_base_url: String,
    /// 题库 CSV 文件路径
    pub question_csv: String,
    /// 每个模型的题目数量上限（None 表示全部）
    pub max_questions: Option<usize>,
    /// 同一模型相邻两题之间的间隔（毫秒）
    pub question_delay_ms: u64,
    /// 评测模式
    pub mode: RunMode,
    /// 模型选择（"all"，或逗号分隔的名称/序号列表）
    pub model_selection: String,
    /// 同时评测的模型数量
    pub max_concurrent_models: usize,
    /// 选项乱序的随机种子（同一次运行内所有模型共享）
    pub shuffle_seed: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 结果 CSV 输出目录
    pub report_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            question_csv: "trivia_questions.csv".to_string(),
            max_questions: None,
            question_delay_ms: 1000,
            mode: RunMode::Parallel,
            model_selection: "all".to_string(),
            max_concurrent_models: 4,
            shuffle_seed: 42,
            verbose_logging: false,
            report_dir: ".".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            ollama_base_url: std::env::var("OLLAMA_BASE_URL").unwrap_or(default.ollama_base_url),
            question_csv: std::env::var("QUESTION_CSV").unwrap_or(default.question_csv),
            max_questions: std::env::var("MAX_QUESTIONS").ok().and_then(|v| v.parse().ok()),
            question_delay_ms: std::env::var("QUESTION_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.question_delay_ms),
            mode: std::env::var("RUN_MODE").map(|v| RunMode::parse(&v)).unwrap_or(default.mode),
            model_selection: std::env::var("MODEL_SELECTION").unwrap_or(default.model_selection),
            max_concurrent_models: std::env::var("MAX_CONCURRENT_MODELS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_models),
            shuffle_seed: std::env::var("SHUFFLE_SEED").ok().and_then(|v| v.parse().ok()).unwrap_or(default.shuffle_seed),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            report_dir: std::env::var("REPORT_DIR").unwrap_or(default.report_dir),
        }
    }
}
