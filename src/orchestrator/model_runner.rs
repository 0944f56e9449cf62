//! 单模型评测流 - 编排层
//!
//! ## 职责
//!
//! 本模块负责驱动一个模型按固定顺序答完整套题目。
//!
//! ## 核心功能
//!
//! 1. **顺序答题**：流内严格串行，保证单模型的请求节奏可控
//! 2. **间隔控制**：题与题之间按配置休眠
//! 3. **记录上送**：每条评测记录发进统一的收集通道
//! 4. **失败隔离**：连接失败只中止本流，不影响其他模型
//! 5. **响应中断**：收到中断信号后不再派发新题

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

use crate::models::model_config::ModelConfig;
use crate::models::question::PreparedQuestion;
use crate::models::record::{AnswerOutcome, EvaluationRecord, FailureKind};
use crate::orchestrator::progress::Progress;
use crate::utils::logging::truncate_text;
use crate::workflow::{EvalCtx, QuestionFlow};

/// 评测流的结束状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// 答完了全部题目
    Completed,
    /// 因服务不可达提前中止
    Aborted,
    /// 因用户中断提前停止
    Interrupted,
}

/// 单个评测流的统计
#[derive(Debug)]
pub struct StreamReport {
    pub model_name: String,
    pub attempted: usize,
    pub correct: usize,
    /// 有回复但提取不出字母的题目数
    pub extraction_failures: usize,
    pub status: StreamStatus,
    pub elapsed: Duration,
}

impl StreamReport {
    pub fn accuracy(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.correct as f64 / self.attempted as f64
        }
    }
}

/// 驱动一个模型答完整套题（并行模式）
///
/// 记录实时发进收集通道；本函数只返回流级统计
///
/// # 参数
/// - `flow`: 单题评测流程（所有流共享）
/// - `model`: 模型评测配置
/// - `questions`: 共享的题目序列（所有模型同一份）
/// - `stream_index`: 流序号（用于日志）
/// - `delay`: 相邻两题之间的间隔
/// - `cancel`: 用户中断标志
/// - `progress`: 全局进度计数器
/// - `tx`: 评测记录收集通道
pub async fn run_stream(
    flow: &QuestionFlow,
    model: &ModelConfig,
    questions: &[PreparedQuestion],
    stream_index: usize,
    delay: Duration,
    cancel: &AtomicBool,
    progress: &Progress,
    tx: &UnboundedSender<EvaluationRecord>,
) -> StreamReport {
    info!(
        "🚀 [流 {}] 开始评测 {} ({:.1} GB, {} 档)",
        stream_index,
        model.name,
        model.size_gb(),
        model.size_class
    );

    let started = Instant::now();
    let total = questions.len();
    let mut attempted = 0usize;
    let mut correct = 0usize;
    let mut extraction_failures = 0usize;
    let mut status = StreamStatus::Completed;

    for prepared in questions {
        if cancel.load(Ordering::SeqCst) {
            warn!("⚠️ [流 {}] {} 收到中断信号，停止派发新题", stream_index, model.name);
            status = StreamStatus::Interrupted;
            break;
        }

        let ctx = EvalCtx::new(model.name.clone(), stream_index, prepared.index, total);
        let record = flow.run(model, prepared, &ctx).await;

        attempted += 1;
        if record.is_correct {
            correct += 1;
        }
        if record.outcome == AnswerOutcome::Unrecognized {
            extraction_failures += 1;
        }
        let fatal = matches!(
            record.outcome,
            AnswerOutcome::Failed(FailureKind::ConnectionError)
        );

        if tx.send(record).is_err() {
            warn!("⚠️ [流 {}] 收集通道已关闭", stream_index);
        }
        progress.question_done();

        // 定期播报本流的进度
        if attempted == 1 || attempted % 5 == 0 {
            info!(
                "📊 [流 {}] {}: 第 {}/{} 题 - 正确率 {:.1}%",
                stream_index,
                model.name,
                attempted,
                total,
                correct as f64 / attempted as f64 * 100.0
            );
        }

        if fatal {
            error!(
                "❌ [流 {}] {} 服务不可达，中止该模型的剩余题目",
                stream_index, model.name
            );
            status = StreamStatus::Aborted;
            break;
        }

        if !delay.is_zero() && attempted < total {
            tokio::time::sleep(delay).await;
        }
    }

    let elapsed = started.elapsed();
    let report = StreamReport {
        model_name: model.name.clone(),
        attempted,
        correct,
        extraction_failures,
        status,
        elapsed,
    };

    log_stream_finished(stream_index, &report);
    progress.model_done(&model.name);

    report
}

/// 驱动一个模型答完整套题（详细模式）
///
/// 逐题打印题面、模型原始回复和提取结果，用于诊断而不是吞吐。
/// 记录直接返回给调用方
pub async fn run_verbose(
    flow: &QuestionFlow,
    model: &ModelConfig,
    questions: &[PreparedQuestion],
    delay: Duration,
    cancel: &AtomicBool,
) -> (Vec<EvaluationRecord>, StreamReport) {
    info!("\n🤖 评测模型: {}", model.name);
    info!("{}", "-".repeat(50));

    let started = Instant::now();
    let total = questions.len();
    let mut records = Vec::new();
    let mut correct = 0usize;
    let mut extraction_failures = 0usize;
    let mut status = StreamStatus::Completed;

    for prepared in questions {
        if cancel.load(Ordering::SeqCst) {
            warn!("⚠️ 收到中断信号，停止派发新题");
            status = StreamStatus::Interrupted;
            break;
        }

        info!("\n📝 题 {}/{}:", prepared.index, total);
        info!("❓ {}", prepared.question.text);
        info!(
            "✅ 正确答案: {} ({})",
            prepared.choices.correct_letter(),
            prepared.choices.correct_text()
        );
        info!("📋 选项:");
        for (letter, text) in prepared.choices.iter() {
            info!("   {}) {}", letter, text);
        }

        let ctx = EvalCtx::new(model.name.clone(), 1, prepared.index, total);
        let record = flow.run(model, prepared, &ctx).await;

        match &record.outcome {
            AnswerOutcome::Letter(letter) => {
                info!("🤖 模型原始回复:");
                info!("   '{}'", truncate_text(&record.raw_response, 200));
                info!("🔍 提取字母: {}", letter);
                if record.is_correct {
                    correct += 1;
                    info!("✅ 正确! ({} = {})", letter, record.correct_letter);
                } else {
                    info!("❌ 错误 ({} ≠ {})", letter, record.correct_letter);
                }
            }
            AnswerOutcome::Unrecognized => {
                extraction_failures += 1;
                info!("🤖 模型原始回复:");
                info!("   '{}'", truncate_text(&record.raw_response, 200));
                info!("❌ 提取失败 - 回复中找不到选项字母");
            }
            AnswerOutcome::Failed(kind) => {
                info!("❌ 请求失败: {}", kind);
            }
        }

        let fatal = matches!(
            record.outcome,
            AnswerOutcome::Failed(FailureKind::ConnectionError)
        );
        records.push(record);

        let attempted = records.len();
        info!(
            "📊 当前得分: {:.1}% ({}/{}) | 提取率 {:.0}%",
            correct as f64 / attempted as f64 * 100.0,
            correct,
            attempted,
            (attempted - extraction_failures) as f64 / attempted as f64 * 100.0
        );

        if fatal {
            error!("❌ {} 服务不可达，中止该模型的剩余题目", model.name);
            status = StreamStatus::Aborted;
            break;
        }

        if !delay.is_zero() && attempted < total {
            tokio::time::sleep(delay).await;
        }
    }

    let report = StreamReport {
        model_name: model.name.clone(),
        attempted: records.len(),
        correct,
        extraction_failures,
        status,
        elapsed: started.elapsed(),
    };

    (records, report)
}

// ========== 日志辅助函数 ==========

fn log_stream_finished(stream_index: usize, report: &StreamReport) {
    info!("\n✅ [流 {}] 完成 - {}:", stream_index, report.model_name);
    info!(
        "   📊 正确率: {:.1}% ({}/{})",
        report.accuracy() * 100.0,
        report.correct,
        report.attempted
    );
    if report.attempted > 0 {
        info!(
            "   🔍 提取率: {:.0}%",
            (report.attempted - report.extraction_failures) as f64 / report.attempted as f64
                * 100.0
        );
    }
    info!("   ⏱️ 耗时: {:.1} 分钟", report.elapsed.as_secs_f64() / 60.0);
    if report.status == StreamStatus::Aborted {
        info!("   ⚠️ 评测流被中止，结果不完整");
    }
}
