//! 批量评测编排 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责多模型评测的编排和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：确认推理服务可达，发现可用模型
//! 2. **模型选择**：按配置选出参评模型并推导各自的评测配置
//! 3. **题目准备**：加载题库并生成所有模型共享的固定题目序列
//! 4. **并发控制**：使用 Semaphore 限制同时评测的模型数量
//! 5. **记录收集**：各评测流的记录经统一通道汇入一个结果集
//! 6. **全局统计**：汇总、排行、一致性自检、落盘
//!
//! ## 设计特点
//!
//! - **流间隔离**：评测流之间不共享可变结果，只共享只读题目序列
//! - **失败隔离**：单个模型的失败不影响其他模型，残局照常出榜
//! - **向下委托**：委托 model_runner 驱动单个模型

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use crate::config::{Config, RunMode};
use crate::error::{AppError, AppResult, BusinessError};
use crate::models::model_config::ModelConfig;
use crate::models::question::{prepare_questions, Letter, PreparedQuestion};
use crate::models::record::{EvaluationRecord, ModelSummary};
use crate::models::load_question_bank;
use crate::orchestrator::model_runner;
use crate::orchestrator::progress::Progress;
use crate::services::ollama::ModelInfo;
use crate::services::{summarize, verify_consistency, OllamaClient, ReportWriter};
use crate::utils::logging::estimate_minutes;
use crate::workflow::QuestionFlow;

/// 应用主结构
pub struct App {
    config: Config,
    /// 推理服务上发现的全部文本模型
    available: Vec<ModelInfo>,
}

impl App {
    /// 初始化应用
    ///
    /// 启动时先确认推理服务可达并列出可用模型，
    /// 服务不可达属于结构性错误，直接终止
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let client = OllamaClient::new(&config);
        let available = client.list_models().await?;

        info!("✅ 推理服务可访问: {}", config.ollama_base_url);
        info!("🤖 可用文本模型: {}", available.len());
        for (i, model) in available.iter().enumerate() {
            info!(
                "  {}. {} ({:.1} GB)",
                i + 1,
                model.name,
                model.size as f64 / (1024.0 * 1024.0 * 1024.0)
            );
        }

        Ok(Self { config, available })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        // 选择参评模型
        let selected = select_model_infos(&self.available, &self.config.model_selection)?;
        let models: Vec<ModelConfig> = selected
            .iter()
            .map(|m| ModelConfig::resolve(&m.name, m.size))
            .collect();
        log_selected_models(&models);

        // 加载题库
        let bank = load_question_bank(&self.config.question_csv).await?;

        // 准备题目：固定选项顺序，所有模型共享同一份序列
        let prepared = prepare_questions(&bank, self.config.max_questions, self.config.shuffle_seed);
        if prepared.is_empty() {
            return Err(AppError::Business(BusinessError::EmptyQuestionBank {
                path: self.config.question_csv.clone(),
            })
            .into());
        }

        log_run_plan(&self.config, models.len(), prepared.len());

        // 监听用户中断：停止派发新题，但保留已完成的记录
        let cancel = Arc::new(AtomicBool::new(false));
        spawn_interrupt_watcher(cancel.clone());

        let records = match self.config.mode {
            RunMode::Parallel => self.run_parallel(&models, prepared, cancel).await?,
            RunMode::Verbose => self.run_verbose(&models, prepared, cancel).await?,
        };

        if records.is_empty() {
            warn!("⚠️ 没有产生任何评测记录，跳过统计");
            return Ok(());
        }

        // 汇总与自检
        let summaries = summarize(&records);
        if verify_consistency(&records) {
            info!("✅ 一致性自检通过：所有模型看到相同的正确字母");
        }

        print_leaderboard(&summaries, &models);

        // 落盘两个 CSV 工件
        ReportWriter::new(&self.config).write_all(&summaries, &records)?;

        Ok(())
    }

    /// 并行模式：每个模型一个评测流，流内串行、流间并发
    async fn run_parallel(
        &self,
        models: &[ModelConfig],
        prepared: Vec<PreparedQuestion>,
        cancel: Arc<AtomicBool>,
    ) -> Result<Vec<EvaluationRecord>> {
        let worker_slots = self.config.max_concurrent_models.max(1).min(models.len());
        let semaphore = Arc::new(Semaphore::new(worker_slots));
        let questions = Arc::new(prepared);
        let progress = Arc::new(Progress::new(models.len(), questions.len()));
        let flow = Arc::new(QuestionFlow::new(&self.config)?);
        let delay = Duration::from_millis(self.config.question_delay_ms);

        let (tx, mut rx) = mpsc::unbounded_channel::<EvaluationRecord>();

        // 所有流的记录经同一条通道汇入一个结果集，流之间不共享可变列表
        let collector = tokio::spawn(async move {
            let mut records = Vec::new();
            while let Some(record) = rx.recv().await {
                records.push(record);
            }
            records
        });

        let mut handles = Vec::new();
        for (i, model) in models.iter().enumerate() {
            let permit = semaphore.clone().acquire_owned().await?;

            let flow = flow.clone();
            let questions = questions.clone();
            let progress = progress.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();
            let model = model.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                model_runner::run_stream(
                    &flow,
                    &model,
                    &questions,
                    i + 1,
                    delay,
                    &cancel,
                    &progress,
                    &tx,
                )
                .await
            });
            handles.push(handle);
        }
        drop(tx);

        // 等待所有评测流结束
        for result in join_all(handles).await {
            if let Err(e) = result {
                error!("❌ 评测流任务执行失败: {}", e);
            }
        }

        let records = collector.await?;
        Ok(records)
    }

    /// 详细模式：一次评测一个模型，逐题打印诊断信息
    async fn run_verbose(
        &self,
        models: &[ModelConfig],
        prepared: Vec<PreparedQuestion>,
        cancel: Arc<AtomicBool>,
    ) -> Result<Vec<EvaluationRecord>> {
        let flow = QuestionFlow::new(&self.config)?;
        let delay = Duration::from_millis(self.config.question_delay_ms);
        let mut all_records = Vec::new();

        for model in models {
            if cancel.load(Ordering::SeqCst) {
                warn!("⚠️ 收到中断信号，跳过剩余模型");
                break;
            }
            let (records, report) =
                model_runner::run_verbose(&flow, model, &prepared, delay, &cancel).await;
            info!(
                "\n📊 {} 最终得分: {:.1}%",
                model.name,
                report.accuracy() * 100.0
            );
            all_records.extend(records);
        }

        Ok(all_records)
    }
}

/// 按配置从可用模型中选出参评模型
///
/// 支持 "all"、模型名称、1 起始的序号，逗号分隔可混用。
/// 名称找不到只告警跳过；序号越界是配置错误，直接终止；
/// 选择结果为空同样终止，没有模型就没有评测
pub fn select_model_infos(available: &[ModelInfo], selection: &str) -> AppResult<Vec<ModelInfo>> {
    let selection = selection.trim();

    let mut chosen: Vec<&ModelInfo> = Vec::new();
    if selection.is_empty() || selection.eq_ignore_ascii_case("all") {
        chosen.extend(available.iter());
    } else {
        for token in selection.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }

            if let Ok(index) = token.parse::<usize>() {
                if index == 0 || index > available.len() {
                    return Err(AppError::Business(BusinessError::ModelIndexOutOfRange {
                        index,
                        max_index: available.len(),
                    }));
                }
                chosen.push(&available[index - 1]);
            } else {
                // 允许省略 tag：qwen3 匹配 qwen3:8b
                match available
                    .iter()
                    .find(|m| m.name == token || m.name.split(':').next() == Some(token))
                {
                    Some(model) => chosen.push(model),
                    None => warn!("⚠️ 找不到模型 '{}'，跳过", token),
                }
            }
        }
    }

    // 去重，保持首次出现的顺序
    let mut seen: HashSet<&str> = HashSet::new();
    let deduped: Vec<ModelInfo> = chosen
        .into_iter()
        .filter(|m| seen.insert(m.name.as_str()))
        .cloned()
        .collect();

    if deduped.is_empty() {
        return Err(AppError::Business(BusinessError::NoModelsSelected));
    }

    Ok(deduped)
}

/// 监听 Ctrl-C：置位中断标志，在途请求自然完成或自行超时
fn spawn_interrupt_watcher(cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("\n⚠️ 收到中断信号，停止派发新题（已完成的记录会保留并出榜）");
            cancel.store(true, Ordering::SeqCst);
        }
    });
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 多模型选择题评测");
    info!("📡 推理服务: {}", config.ollama_base_url);
    info!("{}", "=".repeat(60));
}

fn log_selected_models(models: &[ModelConfig]) {
    info!("✓ 选中 {} 个模型:", models.len());
    for model in models {
        info!(
            "  • {} ({:.1} GB, {} 档, 超时 {}s, token 预算 {})",
            model.name,
            model.size_gb(),
            model.size_class,
            model.timeout.as_secs(),
            model.max_tokens
        );
    }
}

fn log_run_plan(config: &Config, model_count: usize, question_count: usize) {
    let worker_slots = config.max_concurrent_models.max(1).min(model_count.max(1));
    info!("\n{}", "=".repeat(60));
    info!("🏁 评测计划");
    info!("  • 🤖 模型: {}", model_count);
    info!("  • 🎯 每个模型题目数: {}", question_count);
    info!("  • 📊 总题数: {}", model_count * question_count);
    info!("  • ⏱️ 题间间隔: {} ms", config.question_delay_ms);
    info!("  • 🎲 乱序种子: {} (所有模型共享同一选项顺序)", config.shuffle_seed);
    match config.mode {
        RunMode::Parallel => {
            info!("  • 🔄 并行评测流: {}", worker_slots);
            info!(
                "  • 🕐 间隔开销约 {:.1} 分钟（不含推理耗时）",
                estimate_minutes(model_count * question_count, config.question_delay_ms, worker_slots)
            );
        }
        RunMode::Verbose => {
            info!("  • 🔧 详细模式：一次评测一个模型");
        }
    }
    info!("{}", "=".repeat(60));
}

/// 打印最终排行榜
fn print_leaderboard(summaries: &[ModelSummary], models: &[ModelConfig]) {
    let size_gb = |name: &str| {
        models
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.size_gb())
            .unwrap_or(0.0)
    };

    info!("\n{}", "=".repeat(70));
    info!("🏆 最终排行榜");
    info!("{}", "=".repeat(70));

    for (rank, summary) in summaries.iter().enumerate() {
        let medal = match rank {
            0 => "🥇".to_string(),
            1 => "🥈".to_string(),
            2 => "🥉".to_string(),
            _ => format!("{:2}.", rank + 1),
        };
        let partial = if summary.aborted { " ⚠️ 不完整" } else { "" };
        info!(
            "{} {:<24} {:>5.1}% {:>4}/{:<4} {:>5.1} GB{}",
            medal,
            summary.model_name,
            summary.accuracy() * 100.0,
            summary.correct,
            summary.attempted,
            size_gb(&summary.model_name),
            partial
        );
    }

    // 前三名的难度细分
    info!("\n📊 难度细分 (前 3 名):");
    for summary in summaries.iter().take(3) {
        info!("  {} ({:.1}%)", summary.model_name, summary.accuracy() * 100.0);
        for (difficulty, stats) in &summary.by_difficulty {
            info!(
                "    • {}: {:5.1}% ({}/{})",
                difficulty,
                stats.accuracy() * 100.0,
                stats.correct,
                stats.attempted
            );
        }
    }

    // 字母偏好诊断：总选同一个字母的模型答案与内容无关
    for summary in summaries {
        let total: usize = summary.letter_counts.iter().sum();
        if total >= 5 {
            let max = summary.letter_counts.iter().max().copied().unwrap_or(0);
            if max as f64 / total as f64 >= 0.8 {
                let distribution: Vec<String> = Letter::ALL
                    .iter()
                    .map(|l| format!("{}:{}", l, summary.letter_counts[l.index()]))
                    .collect();
                warn!(
                    "⚠️ {} 的答案严重偏向单一字母 ({})，结果可能与题目内容无关",
                    summary.model_name,
                    distribution.join(" ")
                );
            }
        }
    }

    // 推荐
    if let Some(best) = summaries.first() {
        info!("\n🎯 推荐:");
        info!(
            "   最佳模型: {} ({:.1}%)",
            best.model_name,
            best.accuracy() * 100.0
        );
        if let Some(second) = summaries.get(1) {
            let diff = (best.accuracy() - second.accuracy()) * 100.0;
            if diff < 2.0 {
                info!("   ⚖️ 与 {} 非常接近 (差距 {:.1}%)", second.model_name, diff);
            } else if size_gb(&best.model_name) > size_gb(&second.model_name) * 1.5 {
                info!("   💡 {} 体积更小，可能是更好的折中", second.model_name);
            }
        }
    }
    info!("{}", "=".repeat(70));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_models() -> Vec<ModelInfo> {
        let json = r#"[
            {"name":"qwen3:8b","size":5026604032},
            {"name":"llama3:8b","size":4661224676},
            {"name":"gemma:2b","size":1678456789}
        ]"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_select_all() {
        let models = sample_models();
        let selected = select_model_infos(&models, "all").unwrap();
        assert_eq!(selected.len(), 3);
        let selected = select_model_infos(&models, "  ").unwrap();
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_select_by_name_and_index() {
        let models = sample_models();
        let selected = select_model_infos(&models, "llama3:8b,1").unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].name, "llama3:8b");
        assert_eq!(selected[1].name, "qwen3:8b");
    }

    #[test]
    fn test_select_by_prefix_without_tag() {
        let models = sample_models();
        let selected = select_model_infos(&models, "gemma").unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "gemma:2b");
    }

    #[test]
    fn test_select_dedup() {
        let models = sample_models();
        let selected = select_model_infos(&models, "1,qwen3:8b,qwen3").unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_select_index_out_of_range() {
        let models = sample_models();
        let result = select_model_infos(&models, "4");
        assert!(matches!(
            result,
            Err(AppError::Business(BusinessError::ModelIndexOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_select_unknown_names_rejected_when_empty() {
        let models = sample_models();
        // 未知名称被跳过，结果为空时报 NoModelsSelected
        let result = select_model_infos(&models, "mistral,phi4");
        assert!(matches!(
            result,
            Err(AppError::Business(BusinessError::NoModelsSelected))
        ));
    }
}
