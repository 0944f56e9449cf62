//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责多模型评测的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_runner` - 批量评测编排器
//! - 管理应用生命周期（初始化、运行、统计）
//! - 发现并选择参评模型
//! - 准备所有模型共享的题目序列
//! - 控制并发数量（Semaphore）
//! - 通过收集通道汇总各流的评测记录
//!
//! ### `model_runner` - 单模型评测流
//! - 驱动一个模型顺序答完整套题目
//! - 控制题间间隔
//! - 连接失败时中止本流，不影响其他流
//!
//! ### `progress` - 全局进度计数器
//! - 并行模式下唯一的共享可变状态，仅用于展示
//!
//! ## 层次关系
//!
//! ```text
//! batch_runner (调度 Vec<ModelConfig>)
//!     ↓
//! model_runner (遍历 Vec<PreparedQuestion>)
//!     ↓
//! workflow::QuestionFlow (评测单个 PreparedQuestion)
//!     ↓
//! services (能力层：ollama / extractor / aggregator / report)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_runner 管批量，model_runner 管单个模型
//! 2. **公平隔离**：题目序列只读共享，评测流之间无可变共享状态
//! 3. **失败隔离**：单流失败不级联，残局照常汇总出榜
//! 4. **无业务逻辑**：只做调度和统计，不做提取与判分

pub mod batch_runner;
pub mod model_runner;
pub mod progress;

// 重新导出主要类型
pub use batch_runner::{select_model_infos, App};
pub use model_runner::{StreamReport, StreamStatus};
pub use progress::Progress;
