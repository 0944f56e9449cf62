//! 结果写出服务 - 业务能力层
//!
//! 只负责把评测结果落盘成两个 CSV 工件，不关心评测流程：
//! - 汇总表：每个模型一行（排行榜数据）
//! - 明细表：每条评测记录一行（逐题复盘用）

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::question::{Difficulty, Letter};
use crate::models::record::{EvaluationRecord, ModelSummary};

/// 结果写出服务
///
/// 职责：
/// - 把模型汇总列表写成 summary CSV
/// - 把完整评测记录写成 detailed CSV
/// - 只消费两个只读结构，不参与统计
pub struct ReportWriter {
    report_dir: String,
}

impl ReportWriter {
    /// 创建新的结果写出服务
    pub fn new(config: &Config) -> Self {
        Self {
            report_dir: config.report_dir.clone(),
        }
    }

    /// 使用自定义输出目录创建
    pub fn with_dir(dir: impl Into<String>) -> Self {
        Self {
            report_dir: dir.into(),
        }
    }

    /// 写出汇总与明细两个 CSV 文件
    ///
    /// 文件名带时间戳，同一目录下多次运行互不覆盖
    ///
    /// # 返回
    /// 返回 (汇总文件路径, 明细文件路径)
    pub fn write_all(
        &self,
        summaries: &[ModelSummary],
        records: &[EvaluationRecord],
    ) -> AppResult<(PathBuf, PathBuf)> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let dir = Path::new(&self.report_dir);

        let summary_path = dir.join(format!("model_comparison_summary_{}.csv", timestamp));
        let detailed_path = dir.join(format!("model_comparison_detailed_{}.csv", timestamp));

        self.write_summary(&summary_path, summaries)?;
        self.write_detailed(&detailed_path, records)?;

        info!("💾 结果已保存:");
        info!("   📊 汇总: {}", summary_path.display());
        info!("   📋 明细: {}", detailed_path.display());

        Ok((summary_path, detailed_path))
    }

    /// 写出模型汇总表
    fn write_summary(&self, path: &Path, summaries: &[ModelSummary]) -> AppResult<()> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        writer
            .write_record([
                "model",
                "accuracy",
                "correct",
                "attempted",
                "unrecognized",
                "failed",
                "aborted",
                "easy_accuracy",
                "medium_accuracy",
                "hard_accuracy",
                "count_a",
                "count_b",
                "count_c",
                "count_d",
            ])
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        for summary in summaries {
            let difficulty_accuracy = |difficulty: Difficulty| {
                summary
                    .by_difficulty
                    .get(&difficulty)
                    .map(|stats| format!("{:.3}", stats.accuracy()))
                    .unwrap_or_default()
            };

            writer
                .write_record([
                    summary.model_name.clone(),
                    format!("{:.3}", summary.accuracy()),
                    summary.correct.to_string(),
                    summary.attempted.to_string(),
                    summary.unrecognized.to_string(),
                    summary.failed.to_string(),
                    summary.aborted.to_string(),
                    difficulty_accuracy(Difficulty::Easy),
                    difficulty_accuracy(Difficulty::Medium),
                    difficulty_accuracy(Difficulty::Hard),
                    summary.letter_counts[Letter::A.index()].to_string(),
                    summary.letter_counts[Letter::B.index()].to_string(),
                    summary.letter_counts[Letter::C.index()].to_string(),
                    summary.letter_counts[Letter::D.index()].to_string(),
                ])
                .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        }

        writer
            .flush()
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        Ok(())
    }

    /// 写出逐题明细表
    fn write_detailed(&self, path: &Path, records: &[EvaluationRecord]) -> AppResult<()> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        writer
            .write_record([
                "model",
                "question_id",
                "question_num",
                "difficulty",
                "question",
                "correct_letter",
                "chosen",
                "is_correct",
                "elapsed_secs",
                "raw_response",
            ])
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        for record in records {
            writer
                .write_record([
                    record.model_name.clone(),
                    record.question_id.to_string(),
                    record.question_index.to_string(),
                    record.difficulty.to_string(),
                    record.question_text.clone(),
                    record.correct_letter.to_string(),
                    record.outcome.label(),
                    record.is_correct.to_string(),
                    format!("{:.2}", record.elapsed_secs),
                    record.raw_response.clone(),
                ])
                .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        }

        writer
            .flush()
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Difficulty;
    use crate::models::record::AnswerOutcome;
    use std::collections::BTreeMap;

    fn sample_summary(name: &str) -> ModelSummary {
        let mut by_difficulty = BTreeMap::new();
        by_difficulty.insert(
            Difficulty::Easy,
            crate::models::record::DifficultyStats {
                attempted: 2,
                correct: 1,
            },
        );
        ModelSummary {
            model_name: name.to_string(),
            attempted: 2,
            correct: 1,
            unrecognized: 0,
            failed: 0,
            by_difficulty,
            letter_counts: [1, 1, 0, 0],
            aborted: false,
        }
    }

    fn sample_record(model: &str) -> EvaluationRecord {
        EvaluationRecord {
            model_name: model.to_string(),
            question_id: 1,
            question_index: 1,
            question_text: "Who painted the Mona Lisa?".to_string(),
            difficulty: Difficulty::Easy,
            correct_letter: Letter::B,
            outcome: AnswerOutcome::Letter(Letter::B),
            is_correct: true,
            raw_response: "The answer is B".to_string(),
            elapsed_secs: 1.25,
        }
    }

    #[test]
    fn test_write_all_creates_both_files() {
        let dir = std::env::temp_dir().join("trivia_bench_report_test");
        std::fs::create_dir_all(&dir).unwrap();

        let writer = ReportWriter::with_dir(dir.to_string_lossy().to_string());
        let summaries = vec![sample_summary("m1"), sample_summary("m2")];
        let records = vec![sample_record("m1"), sample_record("m2")];

        let (summary_path, detailed_path) = writer.write_all(&summaries, &records).unwrap();

        let summary_text = std::fs::read_to_string(&summary_path).unwrap();
        // 表头 + 每个模型一行
        assert_eq!(summary_text.lines().count(), 3);
        assert!(summary_text.starts_with("model,accuracy,"));
        assert!(summary_text.contains("m1,0.500,1,2"));

        let detailed_text = std::fs::read_to_string(&detailed_path).unwrap();
        assert_eq!(detailed_text.lines().count(), 3);
        assert!(detailed_text.contains("Who painted the Mona Lisa?"));
        assert!(detailed_text.contains("The answer is B"));

        std::fs::remove_file(summary_path).ok();
        std::fs::remove_file(detailed_path).ok();
    }
}
