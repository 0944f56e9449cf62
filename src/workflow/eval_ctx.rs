//! 评测上下文
//!
//! 封装"哪个模型正在答第几题"这一信息

use std::fmt::Display;

/// 评测上下文
///
/// 包含评测单道题所需的全部上下文信息
#[derive(Debug, Clone)]
pub struct EvalCtx {
    /// 模型名称
    pub model_name: String,

    /// 评测流序号（仅用于日志显示）
    pub stream_index: usize,

    /// 当前题目序号（从1开始）
    pub question_index: usize,

    /// 本次运行的题目总数
    pub total_questions: usize,
}

impl EvalCtx {
    /// 创建新的评测上下文
    pub fn new(
        model_name: String,
        stream_index: usize,
        question_index: usize,
        total_questions: usize,
    ) -> Self {
        Self {
            model_name,
            stream_index,
            question_index,
            total_questions,
        }
    }
}

impl Display for EvalCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} 题 {}/{}]",
            self.model_name, self.question_index, self.total_questions
        )
    }
}
