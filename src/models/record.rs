use std::collections::BTreeMap;
use std::fmt;

use crate::models::question::{Difficulty, Letter};

/// 请求失败类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 超过该模型配置的超时时间
    Timeout,
    /// 推理服务不可达
    ConnectionError,
    /// 服务有响应但缺少可用的文本字段
    MalformedResponse,
}

impl FailureKind {
    /// 获取用于记录和报表的标签
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Timeout => "TIMEOUT",
            FailureKind::ConnectionError => "CONNECTION_ERROR",
            FailureKind::MalformedResponse => "MALFORMED_RESPONSE",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 单题作答结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// 从模型输出中提取到了选项字母
    Letter(Letter),
    /// 模型有回复，但无法提取出任何字母
    Unrecognized,
    /// 请求失败，没有拿到回复
    Failed(FailureKind),
}

impl AnswerOutcome {
    /// 提取到的字母（失败或无法识别时为 None）
    pub fn letter(&self) -> Option<Letter> {
        match self {
            AnswerOutcome::Letter(letter) => Some(*letter),
            _ => None,
        }
    }

    /// 获取用于记录和报表的标签
    pub fn label(&self) -> String {
        match self {
            AnswerOutcome::Letter(letter) => letter.to_string(),
            AnswerOutcome::Unrecognized => "UNRECOGNIZED".to_string(),
            AnswerOutcome::Failed(kind) => kind.label().to_string(),
        }
    }
}

/// 评测记录
///
/// 每个（模型, 题目）组合在一次运行中至多生成一条，创建后不再修改。
/// 请求失败同样生成记录，保证失败可追溯而不是被静默丢弃
#[derive(Debug, Clone)]
pub struct EvaluationRecord {
    pub model_name: String,
    /// 题库内的题目编号
    pub question_id: usize,
    /// 本次运行内的题目序号（1 起始）
    pub question_index: usize,
    pub question_text: String,
    pub difficulty: Difficulty,
    /// 本题的正确字母（由共享的选项顺序决定）
    pub correct_letter: Letter,
    pub outcome: AnswerOutcome,
    pub is_correct: bool,
    /// 模型的原始回复（失败时为失败说明）
    pub raw_response: String,
    pub elapsed_secs: f64,
}

/// 单个难度档的小计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DifficultyStats {
    pub attempted: usize,
    pub correct: usize,
}

impl DifficultyStats {
    pub fn accuracy(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.correct as f64 / self.attempted as f64
        }
    }
}

/// 模型评测汇总
///
/// 由评测记录折叠得出的只读视图，不独立存储
#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub model_name: String,
    /// 实际作答的题目数（含失败的请求）
    pub attempted: usize,
    pub correct: usize,
    /// 有回复但提取不出字母的题目数
    pub unrecognized: usize,
    /// 请求失败的题目数
    pub failed: usize,
    /// 按难度划分的小计
    pub by_difficulty: BTreeMap<Difficulty, DifficultyStats>,
    /// 各字母被选择的次数（A/B/C/D），用于发现"永远答同一个字母"的退化模型
    pub letter_counts: [usize; 4],
    /// 评测流因服务不可达而提前中止
    pub aborted: bool,
}

impl ModelSummary {
    /// 正确率 = 正确数 / 作答数
    pub fn accuracy(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.correct as f64 / self.attempted as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(AnswerOutcome::Letter(Letter::B).label(), "B");
        assert_eq!(AnswerOutcome::Unrecognized.label(), "UNRECOGNIZED");
        assert_eq!(
            AnswerOutcome::Failed(FailureKind::Timeout).label(),
            "TIMEOUT"
        );
        assert_eq!(
            AnswerOutcome::Failed(FailureKind::ConnectionError).label(),
            "CONNECTION_ERROR"
        );
    }

    #[test]
    fn test_outcome_letter() {
        assert_eq!(AnswerOutcome::Letter(Letter::C).letter(), Some(Letter::C));
        assert_eq!(AnswerOutcome::Unrecognized.letter(), None);
        assert_eq!(
            AnswerOutcome::Failed(FailureKind::MalformedResponse).letter(),
            None
        );
    }

    #[test]
    fn test_accuracy_rounding() {
        let summary = ModelSummary {
            model_name: "test".to_string(),
            attempted: 200,
            correct: 157,
            unrecognized: 0,
            failed: 0,
            by_difficulty: BTreeMap::new(),
            letter_counts: [0; 4],
            aborted: false,
        };
        assert!((summary.accuracy() - 0.785).abs() < 1e-9);
    }

    #[test]
    fn test_accuracy_empty() {
        let stats = DifficultyStats::default();
        assert_eq!(stats.accuracy(), 0.0);
    }
}
