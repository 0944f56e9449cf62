//! 全局进度 - 编排层
//!
//! 多个评测流共享的进度计数器。这是并行模式下唯一被多个流
//! 写入的共享状态，只用于展示，用原子自增保证并发安全

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

/// 全局进度计数器
///
/// 显式创建后以 Arc 传给每个评测流，不做成模块级全局变量
#[derive(Debug)]
pub struct Progress {
    total_models: usize,
    completed_models: AtomicUsize,
    total_questions: usize,
    answered_questions: AtomicUsize,
}

impl Progress {
    /// 创建新的进度计数器
    ///
    /// # 参数
    /// - `total_models`: 参与评测的模型数量
    /// - `questions_per_model`: 每个模型要答的题目数量
    pub fn new(total_models: usize, questions_per_model: usize) -> Self {
        Self {
            total_models,
            completed_models: AtomicUsize::new(0),
            total_questions: total_models * questions_per_model,
            answered_questions: AtomicUsize::new(0),
        }
    }

    /// 记录一道题答完，返回累计答题数
    pub fn question_done(&self) -> usize {
        self.answered_questions.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 记录一个模型答完整套题
    pub fn model_done(&self, model_name: &str) {
        let done = self.completed_models.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "🏁 全局进度: {}/{} 个模型完成 ({})",
            done, self.total_models, model_name
        );
    }

    /// 已完成的模型数量
    pub fn completed_models(&self) -> usize {
        self.completed_models.load(Ordering::SeqCst)
    }

    /// 累计答题数量
    pub fn answered_questions(&self) -> usize {
        self.answered_questions.load(Ordering::SeqCst)
    }

    /// 所有模型合计的题目总数
    pub fn total_questions(&self) -> usize {
        self.total_questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters() {
        let progress = Progress::new(2, 3);
        assert_eq!(progress.total_questions(), 6);
        assert_eq!(progress.question_done(), 1);
        assert_eq!(progress.question_done(), 2);
        assert_eq!(progress.answered_questions(), 2);

        progress.model_done("m1");
        assert_eq!(progress.completed_models(), 1);
    }

    #[test]
    fn test_concurrent_increments() {
        // 多个线程同时自增不会丢计数
        let progress = Arc::new(Progress::new(4, 25));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let progress = progress.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    progress.question_done();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(progress.answered_questions(), 100);
    }
}
