/// 日志工具模块
///
/// 提供日志格式化的辅助函数

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 估算并行模式的总耗时（分钟）
///
/// 只考虑题间间隔，不含模型自身的推理耗时，仅用于启动时的提示
pub fn estimate_minutes(
    total_questions: usize,
    delay_ms: u64,
    worker_slots: usize,
) -> f64 {
    if worker_slots == 0 {
        return 0.0;
    }
    (total_questions as f64 * delay_ms as f64 / 1000.0) / (60.0 * worker_slots as f64)
}
