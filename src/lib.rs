//! # Trivia Model Bench
//!
//! 一个用本地推理服务对比多个语言模型答题能力的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 题目、选项顺序、评测记录等核心数据结构
//! - `loaders/` - 从 CSV 题库加载题目
//! - `ModelConfig` - 按模型规模查表推导超时与 token 预算
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单次调用
//! - `OllamaClient` - 与推理服务的 HTTP 交互能力
//! - `AnswerExtractor` - 从自由文本中提取选项字母的能力
//! - `aggregator` - 记录折叠为模型汇总的能力
//! - `ReportWriter` - 写结果 CSV 的能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一道题"的完整评测流程
//! - `EvalCtx` - 上下文封装（模型 + 题目序号）
//! - `QuestionFlow` - 流程编排（请求 → 提取 → 判分 → 记录）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_runner` - 批量评测编排器，管理并发与收集
//! - `orchestrator/model_runner` - 单模型评测流，顺序遍历题目序列
//!
//! ## 公平性约定
//!
//! 一次运行内，每道题的选项顺序只乱序一次，
//! 所有模型看到完全相同的题面和字母映射

pub mod config;
pub mod error;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, RunMode};
pub use error::{AppError, AppResult};
pub use models::{
    prepare_questions, ChoiceSet, Difficulty, EvaluationRecord, Letter, ModelConfig, ModelSummary,
    PreparedQuestion, Question,
};
pub use orchestrator::App;
pub use services::{AnswerExtractor, OllamaClient};
pub use workflow::{EvalCtx, QuestionFlow};
