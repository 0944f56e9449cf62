//! 单题评测流程 - 流程层
//!
//! 核心职责：定义"一道题"的完整评测流程
//!
//! 流程顺序：
//! 1. 把题目提示词发给模型
//! 2. 从原始回复中提取选项字母
//! 3. 判分并生成评测记录
//!
//! 无论请求成功与否，每次评测都产出且只产出一条记录，
//! 失败会被如实记录，不会被静默丢弃

use anyhow::Result;
use tracing::debug;

use crate::config::Config;
use crate::models::model_config::ModelConfig;
use crate::models::question::PreparedQuestion;
use crate::models::record::{AnswerOutcome, EvaluationRecord};
use crate::services::{AnswerExtractor, OllamaClient};
use crate::workflow::eval_ctx::EvalCtx;

/// 单题评测流程
///
/// - 编排完整的单题评测：请求 → 提取 → 判分
/// - 不持有可变状态，可被多个评测流安全共享
/// - 只依赖业务能力（services）
pub struct QuestionFlow {
    client: OllamaClient,
    extractor: AnswerExtractor,
}

impl QuestionFlow {
    /// 创建新的单题评测流程
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(config),
            extractor: AnswerExtractor::new()?,
        })
    }

    /// 评测一道题
    ///
    /// # 参数
    /// - `model`: 模型评测配置
    /// - `prepared`: 准备就绪的题目（含共享的选项顺序）
    /// - `ctx`: 评测上下文（用于日志）
    ///
    /// # 返回
    /// 返回本题的评测记录
    pub async fn run(
        &self,
        model: &ModelConfig,
        prepared: &PreparedQuestion,
        ctx: &EvalCtx,
    ) -> EvaluationRecord {
        let reply = self.client.ask(model, &prepared.prompt).await;
        let elapsed_secs = reply.elapsed.as_secs_f64();
        let correct_letter = prepared.choices.correct_letter();

        match reply.outcome {
            Ok(raw) => {
                let outcome = match self.extractor.extract(&raw, &prepared.choices) {
                    Some(letter) => AnswerOutcome::Letter(letter),
                    None => AnswerOutcome::Unrecognized,
                };
                let is_correct = outcome.letter() == Some(correct_letter);

                debug!(
                    "{} 提取结果: {} (正确字母: {})",
                    ctx,
                    outcome.label(),
                    correct_letter
                );

                EvaluationRecord {
                    model_name: model.name.clone(),
                    question_id: prepared.question.id,
                    question_index: prepared.index,
                    question_text: prepared.question.text.clone(),
                    difficulty: prepared.question.difficulty,
                    correct_letter,
                    outcome,
                    is_correct,
                    raw_response: raw,
                    elapsed_secs,
                }
            }
            Err(kind) => {
                debug!("{} 请求失败: {}", ctx, kind);

                EvaluationRecord {
                    model_name: model.name.clone(),
                    question_id: prepared.question.id,
                    question_index: prepared.index,
                    question_text: prepared.question.text.clone(),
                    difficulty: prepared.question.difficulty,
                    correct_letter,
                    outcome: AnswerOutcome::Failed(kind),
                    is_correct: false,
                    raw_response: kind.label().to_string(),
                    elapsed_secs,
                }
            }
        }
    }
}
