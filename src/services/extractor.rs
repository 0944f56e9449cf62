//! 答案提取 - 业务能力层
//!
//! 把模型的自由文本回复解析为一个选项字母，或者判定为无法识别。
//! 不同模型的回复习惯差异很大：推理段标签、客套前缀、裸字母、
//! 直接复述选项原文……这里用一组有序的匹配策略逐一尝试，
//! 第一个命中的结果生效
//!
//! ## 匹配顺序
//! 1. 去掉 <think>…</think> 推理段（未闭合时丢弃标签之后的全部内容）
//! 2. 显式答案句式（"the answer is X" / "answer: X" / "I choose X"）
//! 3. 第一个独立出现的选项字母
//! 4. 回复中逐字复述的选项原文
//!
//! 提取永远不会失败：找不到答案就是"无法识别"，不是错误

use anyhow::Result;
use regex::Regex;
use tracing::debug;

use crate::models::question::{ChoiceSet, Letter};

/// 匹配策略
///
/// 每个策略独立地从清理后的文本中尝试找出一个选项字母。
/// 新的回复习惯只需要增加一个策略实现并插入列表
pub trait MatchStrategy: Send + Sync {
    /// 策略名称，用于调试日志
    fn name(&self) -> &'static str;

    /// 尝试匹配，返回找到的字母
    fn try_match(&self, text: &str, choices: &ChoiceSet) -> Option<Letter>;
}

/// 显式答案句式
///
/// 覆盖 "the answer is X"、"answer: X"、"I choose X"、"option X"
/// 等常见说法；多个句式同时出现时取文本中最靠前的那个
struct ExplicitAnswerPhrase {
    patterns: Vec<Regex>,
}

impl ExplicitAnswerPhrase {
    fn new() -> Result<Self> {
        let patterns = vec![
            Regex::new(
                r"(?i)\b(?:the\s+)?(?:correct\s+)?(?:final\s+)?(?:answer|choice)\s+is\s*:?\s*\(?([a-d])\b",
            )?,
            Regex::new(r"(?i)\b(?:answer|choice)\s*:\s*\(?([a-d])\b")?,
            Regex::new(r"(?i)\bi\s+(?:choose|pick|select)\s+(?:option\s+)?\(?([a-d])\b")?,
            Regex::new(r"(?i)\boption\s+\(?([a-d])\b")?,
        ];
        Ok(Self { patterns })
    }
}

impl MatchStrategy for ExplicitAnswerPhrase {
    fn name(&self) -> &'static str {
        "explicit_phrase"
    }

    fn try_match(&self, text: &str, _choices: &ChoiceSet) -> Option<Letter> {
        // 所有句式里取最靠前的命中
        let mut best: Option<(usize, Letter)> = None;
        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(text) {
                let m = caps.get(1)?;
                let letter = Letter::from_char(m.as_str().chars().next()?)?;
                let start = caps.get(0)?.start();
                if best.map_or(true, |(s, _)| start < s) {
                    best = Some((start, letter));
                }
            }
        }
        best.map(|(_, letter)| letter)
    }
}

/// 独立字母
///
/// 找第一个不嵌在其他单词里的 A/B/C/D。
/// 多个字母同时出现时取第一个（"A or B?" 视为 A）
struct StandaloneLetter {
    pattern: Regex,
}

impl StandaloneLetter {
    fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"(?i)\b([a-d])\b")?,
        })
    }
}

impl MatchStrategy for StandaloneLetter {
    fn name(&self) -> &'static str {
        "standalone_letter"
    }

    fn try_match(&self, text: &str, _choices: &ChoiceSet) -> Option<Letter> {
        let caps = self.pattern.captures(text)?;
        Letter::from_char(caps.get(1)?.as_str().chars().next()?)
    }
}

/// 选项原文复述
///
/// 模型没有给出字母、而是逐字复述了某个选项的文本时，
/// 反查出该选项对应的字母；多个选项都出现时取最靠前的
struct OptionTextEcho;

impl MatchStrategy for OptionTextEcho {
    fn name(&self) -> &'static str {
        "option_echo"
    }

    fn try_match(&self, text: &str, choices: &ChoiceSet) -> Option<Letter> {
        let lowered = text.to_lowercase();
        let mut best: Option<(usize, Letter)> = None;
        for (letter, option) in choices.iter() {
            let needle = option.to_lowercase();
            if needle.is_empty() {
                continue;
            }
            if let Some(pos) = lowered.find(&needle) {
                if best.map_or(true, |(p, _)| pos < p) {
                    best = Some((pos, letter));
                }
            }
        }
        best.map(|(_, letter)| letter)
    }
}

/// 去掉推理段
///
/// <think>…</think> 之间的内容不算答案；标签大小写不敏感。
/// 未闭合的推理段说明模型还没说出结论，标签之后的内容全部丢弃
fn strip_reasoning(raw: &str) -> String {
    // 先剥掉成对闭合的推理段
    let closed = Regex::new(r"(?is)<think>.*?</think>")
        .map(|re| re.replace_all(raw, "").into_owned())
        .unwrap_or_else(|_| raw.to_string());

    // 残留的开标签意味着推理段未闭合，只保留前缀
    if let Ok(open_tag) = Regex::new(r"(?i)<think>") {
        if let Some(m) = open_tag.find(&closed) {
            return closed[..m.start()].to_string();
        }
    }

    // 个别模型只输出闭标签，取最后一个闭标签之后的部分
    if let Ok(close_tag) = Regex::new(r"(?i)</think>") {
        if let Some(m) = close_tag.find_iter(&closed).last() {
            return closed[m.end()..].to_string();
        }
    }

    closed
}

/// 答案提取器
///
/// 持有按优先级排列的策略列表。提取是纯函数：
/// 相同的回复文本和选项集合永远得到相同的结果
pub struct AnswerExtractor {
    strategies: Vec<Box<dyn MatchStrategy>>,
}

impl AnswerExtractor {
    /// 创建带默认策略列表的提取器
    pub fn new() -> Result<Self> {
        Ok(Self {
            strategies: vec![
                Box::new(ExplicitAnswerPhrase::new()?),
                Box::new(StandaloneLetter::new()?),
                Box::new(OptionTextEcho),
            ],
        })
    }

    /// 从模型回复中提取选项字母
    ///
    /// # 参数
    /// - `raw`: 模型回复的原始文本
    /// - `choices`: 该题的选项集合（原文复述策略需要）
    ///
    /// # 返回
    /// 提取到的字母；所有策略都未命中时返回 None（无法识别）
    pub fn extract(&self, raw: &str, choices: &ChoiceSet) -> Option<Letter> {
        let visible = strip_reasoning(raw);

        for strategy in &self.strategies {
            if let Some(letter) = strategy.try_match(&visible, choices) {
                debug!("策略 {} 命中: {}", strategy.name(), letter);
                return Some(letter);
            }
        }

        None
    }
}
