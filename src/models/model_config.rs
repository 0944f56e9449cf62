use std::fmt;
use std::time::Duration;

/// 固定采样温度，所有模型一致
pub const TEMPERATURE: f32 = 0.1;

/// 推理类模型家族
///
/// 这些家族的模型会输出 <think> 推理段，需要更大的 token 预算
/// 和更长的超时才能等到最终答案
static REASONING_FAMILIES: phf::Set<&'static str> = phf::phf_set! {
    "deepseek",
    "deepseek-r1",
    "qwen3",
    "qwq",
    "magistral",
};

/// 模型规模档位
///
/// 按 Ollama 上报的模型体积划分，体积越大档位越高
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
    Huge,
}

impl SizeClass {
    /// 从模型体积（字节）推导规模档位
    pub fn from_size_bytes(size_bytes: u64) -> Self {
        const GIB: u64 = 1024 * 1024 * 1024;
        match size_bytes {
            s if s < 2 * GIB => SizeClass::Small,
            s if s < 6 * GIB => SizeClass::Medium,
            s if s < 15 * GIB => SizeClass::Large,
            _ => SizeClass::Huge,
        }
    }

    /// 获取档位名称
    pub fn name(self) -> &'static str {
        match self {
            SizeClass::Small => "small",
            SizeClass::Medium => "medium",
            SizeClass::Large => "large",
            SizeClass::Huge => "huge",
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 单个档位的请求预算
#[derive(Debug, Clone, Copy)]
pub struct SizeProfile {
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

/// 档位 → 预算的对照表
///
/// 档位越高超时越长、token 预算越大，按表查找而不是散落的分支判断
const SIZE_PROFILES: [(SizeClass, SizeProfile); 4] = [
    (
        SizeClass::Small,
        SizeProfile {
            timeout_secs: 30,
            max_tokens: 300,
        },
    ),
    (
        SizeClass::Medium,
        SizeProfile {
            timeout_secs: 45,
            max_tokens: 500,
        },
    ),
    (
        SizeClass::Large,
        SizeProfile {
            timeout_secs: 60,
            max_tokens: 1000,
        },
    ),
    (
        SizeClass::Huge,
        SizeProfile {
            timeout_secs: 120,
            max_tokens: 2000,
        },
    ),
];

/// 查表获取档位预算
fn lookup_profile(size_class: SizeClass) -> SizeProfile {
    SIZE_PROFILES
        .iter()
        .find(|(class, _)| *class == size_class)
        .map(|(_, profile)| *profile)
        // 对照表覆盖全部档位，兜底取最大预算
        .unwrap_or(SIZE_PROFILES[SIZE_PROFILES.len() - 1].1)
}

/// 判断是否属于推理类模型家族
fn is_reasoning_family(model_name: &str) -> bool {
    let lowered = model_name.to_lowercase();
    REASONING_FAMILIES
        .iter()
        .any(|family| lowered.contains(family))
}

/// 模型评测配置
///
/// 构建后不再修改；超时和 token 预算由规模档位查表得出
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// 模型名称（含 tag，如 qwen3:8b）
    pub name: String,
    /// 模型体积（字节），来自 Ollama 的模型列表
    pub size_bytes: u64,
    /// 规模档位
    pub size_class: SizeClass,
    /// 单次请求超时
    pub timeout: Duration,
    /// 单次回答的 token 预算
    pub max_tokens: u32,
    /// 采样温度
    pub temperature: f32,
}

impl ModelConfig {
    /// 根据模型名称和体积推导评测配置
    pub fn resolve(name: impl Into<String>, size_bytes: u64) -> Self {
        let name = name.into();
        let size_class = SizeClass::from_size_bytes(size_bytes);
        let profile = lookup_profile(size_class);

        let (mut timeout_secs, mut max_tokens) = (profile.timeout_secs, profile.max_tokens);

        // 推理类模型不论体积大小，都要留出完整推理段的余量
        if is_reasoning_family(&name) {
            timeout_secs = timeout_secs.max(120);
            max_tokens = max_tokens.max(2000);
        }

        Self {
            name,
            size_bytes,
            size_class,
            timeout: Duration::from_secs(timeout_secs),
            max_tokens,
            temperature: TEMPERATURE,
        }
    }

    /// 模型体积（GB），用于展示
    pub fn size_gb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    }
}
