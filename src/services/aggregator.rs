//! 结果汇总 - 业务能力层
//!
//! 把零散的评测记录折叠成每个模型的汇总视图。
//! 折叠只依赖记录本身，与记录到达顺序无关：并行模式下
//! 各模型的记录交错收集，汇总结果必须完全一致

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::warn;

use crate::models::question::Letter;
use crate::models::record::{AnswerOutcome, EvaluationRecord, FailureKind, ModelSummary};

/// 把评测记录折叠成模型汇总列表，按正确率降序排列
///
/// 失败的请求计入作答数但不计入正确数；
/// 出现过连接失败的模型被标记为提前中止（结果不完整）
pub fn summarize(records: &[EvaluationRecord]) -> Vec<ModelSummary> {
    let mut by_model: BTreeMap<&str, ModelSummary> = BTreeMap::new();

    for record in records {
        let summary = by_model
            .entry(record.model_name.as_str())
            .or_insert_with(|| ModelSummary {
                model_name: record.model_name.clone(),
                attempted: 0,
                correct: 0,
                unrecognized: 0,
                failed: 0,
                by_difficulty: BTreeMap::new(),
                letter_counts: [0; 4],
                aborted: false,
            });

        summary.attempted += 1;
        if record.is_correct {
            summary.correct += 1;
        }

        let difficulty = summary.by_difficulty.entry(record.difficulty).or_default();
        difficulty.attempted += 1;
        if record.is_correct {
            difficulty.correct += 1;
        }

        match record.outcome {
            AnswerOutcome::Letter(letter) => {
                summary.letter_counts[letter.index()] += 1;
            }
            AnswerOutcome::Unrecognized => {
                summary.unrecognized += 1;
            }
            AnswerOutcome::Failed(kind) => {
                summary.failed += 1;
                if kind == FailureKind::ConnectionError {
                    summary.aborted = true;
                }
            }
        }
    }

    let mut summaries: Vec<ModelSummary> = by_model.into_values().collect();
    summaries.sort_by(|a, b| {
        b.accuracy()
            .partial_cmp(&a.accuracy())
            .unwrap_or(Ordering::Equal)
    });
    summaries
}

/// 公平性自检
///
/// 同一道题在所有模型的记录里必须对应同一个正确字母，
/// 字母不一致说明选项顺序没有被正确共享。
/// 模型之间答题数量不一致只告警（被中止的流本来就答不满）
///
/// # 返回
/// 正确字母是否在所有模型间一致
pub fn verify_consistency(records: &[EvaluationRecord]) -> bool {
    let mut correct_letters: BTreeMap<usize, Letter> = BTreeMap::new();
    let mut consistent = true;

    for record in records {
        match correct_letters.entry(record.question_id) {
            std::collections::btree_map::Entry::Occupied(entry) => {
                if *entry.get() != record.correct_letter {
                    warn!(
                        "❌ 题目 {} 的正确字母不一致: {} vs {} (模型 {})",
                        record.question_id,
                        entry.get(),
                        record.correct_letter,
                        record.model_name
                    );
                    consistent = false;
                }
            }
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(record.correct_letter);
            }
        }
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.model_name.as_str()).or_default() += 1;
    }
    let distinct: std::collections::BTreeSet<usize> = counts.values().copied().collect();
    if distinct.len() > 1 {
        warn!("⚠️ 模型答题数量不一致（存在被中止的评测流）: {:?}", counts);
    }

    consistent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Difficulty;

    fn make_record(
        model: &str,
        question_id: usize,
        difficulty: Difficulty,
        correct_letter: Letter,
        outcome: AnswerOutcome,
    ) -> EvaluationRecord {
        let is_correct = outcome.letter() == Some(correct_letter);
        EvaluationRecord {
            model_name: model.to_string(),
            question_id,
            question_index: question_id,
            question_text: format!("question {}", question_id),
            difficulty,
            correct_letter,
            outcome,
            is_correct,
            raw_response: String::new(),
            elapsed_secs: 0.5,
        }
    }

    fn sample_records() -> Vec<EvaluationRecord> {
        vec![
            make_record("m1", 1, Difficulty::Easy, Letter::A, AnswerOutcome::Letter(Letter::A)),
            make_record("m1", 2, Difficulty::Easy, Letter::B, AnswerOutcome::Letter(Letter::C)),
            make_record("m1", 3, Difficulty::Hard, Letter::D, AnswerOutcome::Letter(Letter::D)),
            make_record("m1", 4, Difficulty::Hard, Letter::A, AnswerOutcome::Unrecognized),
            make_record("m2", 1, Difficulty::Easy, Letter::A, AnswerOutcome::Letter(Letter::A)),
            make_record("m2", 2, Difficulty::Easy, Letter::B, AnswerOutcome::Letter(Letter::B)),
        ]
    }

    #[test]
    fn test_summarize_counts() {
        let summaries = summarize(&sample_records());
        assert_eq!(summaries.len(), 2);

        // m2 正确率更高，排在前面
        assert_eq!(summaries[0].model_name, "m2");
        assert_eq!(summaries[0].attempted, 2);
        assert_eq!(summaries[0].correct, 2);

        let m1 = &summaries[1];
        assert_eq!(m1.model_name, "m1");
        assert_eq!(m1.attempted, 4);
        assert_eq!(m1.correct, 2);
        assert_eq!(m1.unrecognized, 1);
        assert_eq!(m1.failed, 0);
        assert!(!m1.aborted);
    }

    #[test]
    fn test_summarize_per_difficulty() {
        let summaries = summarize(&sample_records());
        let m1 = summaries.iter().find(|s| s.model_name == "m1").unwrap();

        let easy = m1.by_difficulty.get(&Difficulty::Easy).unwrap();
        assert_eq!(easy.attempted, 2);
        assert_eq!(easy.correct, 1);

        let hard = m1.by_difficulty.get(&Difficulty::Hard).unwrap();
        assert_eq!(hard.attempted, 2);
        assert_eq!(hard.correct, 1);
    }

    #[test]
    fn test_summarize_letter_bias() {
        let records = vec![
            make_record("m", 1, Difficulty::Easy, Letter::A, AnswerOutcome::Letter(Letter::C)),
            make_record("m", 2, Difficulty::Easy, Letter::B, AnswerOutcome::Letter(Letter::C)),
            make_record("m", 3, Difficulty::Easy, Letter::C, AnswerOutcome::Letter(Letter::C)),
        ];
        let summaries = summarize(&records);
        // 永远答 C 的退化模型在字母分布里一眼可见
        assert_eq!(summaries[0].letter_counts, [0, 0, 3, 0]);
    }

    #[test]
    fn test_summarize_order_independent() {
        let records = sample_records();
        let forward = summarize(&records);

        let mut reversed = records;
        reversed.reverse();
        let backward = summarize(&reversed);

        assert_eq!(forward.len(), backward.len());
        for (a, b) in forward.iter().zip(backward.iter()) {
            assert_eq!(a.model_name, b.model_name);
            assert_eq!(a.attempted, b.attempted);
            assert_eq!(a.correct, b.correct);
            assert_eq!(a.letter_counts, b.letter_counts);
            assert_eq!(a.by_difficulty, b.by_difficulty);
        }
    }

    #[test]
    fn test_aborted_stream_marked_partial() {
        let mut records = Vec::new();
        // m1 在第 5 题遇到连接失败，只留下 4 条完成记录 + 1 条失败记录
        for i in 1..=4 {
            records.push(make_record(
                "m1",
                i,
                Difficulty::Medium,
                Letter::A,
                AnswerOutcome::Letter(Letter::A),
            ));
        }
        records.push(make_record(
            "m1",
            5,
            Difficulty::Medium,
            Letter::B,
            AnswerOutcome::Failed(FailureKind::ConnectionError),
        ));
        // m2 完整答完 10 题
        for i in 1..=10 {
            records.push(make_record(
                "m2",
                i,
                Difficulty::Medium,
                Letter::A,
                AnswerOutcome::Letter(Letter::A),
            ));
        }

        let summaries = summarize(&records);
        let m1 = summaries.iter().find(|s| s.model_name == "m1").unwrap();
        let m2 = summaries.iter().find(|s| s.model_name == "m2").unwrap();

        assert_eq!(m1.attempted, 5);
        assert!(m1.attempted < 10);
        assert!(m1.aborted);
        assert_eq!(m1.failed, 1);
        assert_eq!(m2.attempted, 10);
        assert!(!m2.aborted);
    }

    #[test]
    fn test_timeout_counts_attempted_not_correct() {
        let records = vec![make_record(
            "m",
            1,
            Difficulty::Easy,
            Letter::A,
            AnswerOutcome::Failed(FailureKind::Timeout),
        )];
        let summaries = summarize(&records);
        assert_eq!(summaries[0].attempted, 1);
        assert_eq!(summaries[0].correct, 0);
        assert_eq!(summaries[0].failed, 1);
        assert!(!summaries[0].aborted);
    }

    #[test]
    fn test_consistency_check() {
        assert!(verify_consistency(&sample_records()));

        let mut conflicting = sample_records();
        conflicting.push(make_record(
            "m2",
            3,
            Difficulty::Hard,
            Letter::B, // m1 的第 3 题正确字母是 D
            AnswerOutcome::Letter(Letter::B),
        ));
        assert!(!verify_consistency(&conflicting));
    }
}
