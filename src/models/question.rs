use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 选项字母
///
/// 每道题的四个选项分别标记为 A/B/C/D
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
}

impl Letter {
    /// 按顺序排列的所有选项字母
    pub const ALL: [Letter; 4] = [Letter::A, Letter::B, Letter::C, Letter::D];

    /// 获取字母字符
    pub fn as_char(self) -> char {
        match self {
            Letter::A => 'A',
            Letter::B => 'B',
            Letter::C => 'C',
            Letter::D => 'D',
        }
    }

    /// 获取数组下标（A=0, B=1, C=2, D=3）
    pub fn index(self) -> usize {
        self as usize
    }

    /// 从字符解析选项字母（大小写不敏感）
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            _ => None,
        }
    }

    /// 从下标解析选项字母
    pub fn from_index(index: usize) -> Option<Self> {
        Letter::ALL.get(index).copied()
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// 题目难度标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    /// 题库未标注难度
    Unknown,
}

impl Difficulty {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Unknown => "unknown",
        }
    }

    /// 从题库标签解析难度，无法识别时归为 Unknown
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Unknown,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 单道题目
///
/// 从题库加载后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// 题库内的行号（1 起始）
    pub id: usize,
    /// 题干
    pub text: String,
    /// 正确答案原文
    pub correct_answer: String,
    /// 三个错误答案
    pub incorrect_answers: Vec<String>,
    /// 难度标签
    pub difficulty: Difficulty,
}

/// 选项集合
///
/// 职责：
/// - 持有一道题的四个选项的固定排列（字母 → 文本）
/// - 记录正确答案对应的字母
///
/// 每道题在一次运行中只生成一次，所有模型共享同一套字母映射，
/// 保证不同模型看到完全相同的题面
#[derive(Debug, Clone)]
pub struct ChoiceSet {
    options: [String; 4],
    correct: Letter,
}

impl ChoiceSet {
    /// 用给定的随机数生成器打乱选项顺序，构建选项集合
    pub fn build(question: &Question, rng: &mut impl Rng) -> Self {
        let mut shuffled: Vec<String> = Vec::with_capacity(4);
        shuffled.push(question.correct_answer.clone());
        shuffled.extend(question.incorrect_answers.iter().cloned());
        shuffled.shuffle(rng);

        let correct_index = shuffled
            .iter()
            .position(|a| a == &question.correct_answer)
            .unwrap_or(0);
        let correct = Letter::from_index(correct_index).unwrap_or(Letter::A);

        let mut options: [String; 4] = Default::default();
        for (i, answer) in shuffled.into_iter().take(4).enumerate() {
            options[i] = answer;
        }

        Self { options, correct }
    }

    /// 直接指定选项排列，构造测试用的选项集合
    #[cfg(test)]
    pub(crate) fn from_parts(options: [String; 4], correct: Letter) -> Self {
        Self { options, correct }
    }

    /// 获取指定字母对应的选项文本
    pub fn option(&self, letter: Letter) -> &str {
        &self.options[letter.index()]
    }

    /// 遍历（字母, 选项文本）
    pub fn iter(&self) -> impl Iterator<Item = (Letter, &str)> {
        Letter::ALL
            .iter()
            .map(move |&letter| (letter, self.option(letter)))
    }

    /// 正确答案对应的字母
    pub fn correct_letter(&self) -> Letter {
        self.correct
    }

    /// 正确答案原文
    pub fn correct_text(&self) -> &str {
        self.option(self.correct)
    }

    /// 渲染选项列表（"A) xxx" 每行一个）
    pub fn render_options(&self) -> String {
        self.iter()
            .map(|(letter, text)| format!("{}) {}", letter, text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 准备就绪的题目
///
/// 题目 + 固定选项顺序 + 完整提示词，是发给每个模型的最小单元
#[derive(Debug, Clone)]
pub struct PreparedQuestion {
    /// 本次运行内的题目序号（1 起始）
    pub index: usize,
    pub question: Question,
    pub choices: ChoiceSet,
    /// 发送给推理服务的完整提示词
    pub prompt: String,
}

/// 构建题目提示词
///
/// 提示词完全由题干和选项顺序决定，同一道题对所有模型一字不差
pub fn build_prompt(question_text: &str, choices: &ChoiceSet) -> String {
    format!(
        r#"You are a helpful assistant answering trivia questions. Answer with ONLY the letter (A, B, C, or D) that corresponds to the correct answer.

QUESTION: {}

OPTIONS:
{}

Think through this step by step if needed, but end your response with just the letter of the correct answer.

IMPORTANT: After your reasoning, provide your final answer as just the letter (A, B, C, or D) on a new line."#,
        question_text,
        choices.render_options()
    )
}

/// 准备整套题目
///
/// 用固定种子对每道题的选项做一次乱序，生成所有模型共享的题目序列。
/// 种子在一次运行内固定，保证公平性；不同运行之间可以更换
///
/// # 参数
/// - `bank`: 题库（已按来源顺序排列）
/// - `max_questions`: 题目数量上限（None 表示全部）
/// - `seed`: 乱序随机种子
pub fn prepare_questions(
    bank: &[Question],
    max_questions: Option<usize>,
    seed: u64,
) -> Vec<PreparedQuestion> {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let count = max_questions.unwrap_or(bank.len()).min(bank.len());
    let mut rng = StdRng::seed_from_u64(seed);

    bank.iter()
        .take(count)
        .enumerate()
        .map(|(i, question)| {
            let choices = ChoiceSet::build(question, &mut rng);
            let prompt = build_prompt(&question.text, &choices);
            PreparedQuestion {
                index: i + 1,
                question: question.clone(),
                choices,
                prompt,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_question(id: usize) -> Question {
        Question {
            id,
            text: "Who is the lead singer of Fall Out Boy?".to_string(),
            correct_answer: "Patrick Stump".to_string(),
            incorrect_answers: vec![
                "Brendon Urie".to_string(),
                "Gary Lee Weinrib".to_string(),
                "Pete Wentz".to_string(),
            ],
            difficulty: Difficulty::Medium,
        }
    }

    #[test]
    fn test_choice_set_contains_all_answers() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let question = sample_question(1);
        let mut rng = StdRng::seed_from_u64(42);
        let choices = ChoiceSet::build(&question, &mut rng);

        let texts: Vec<&str> = choices.iter().map(|(_, t)| t).collect();
        assert!(texts.contains(&"Patrick Stump"));
        assert!(texts.contains(&"Brendon Urie"));
        assert!(texts.contains(&"Gary Lee Weinrib"));
        assert!(texts.contains(&"Pete Wentz"));
    }

    #[test]
    fn test_correct_letter_round_trip() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        // 从字母映射反查出的文本必须还原出原始正确答案
        let question = sample_question(1);
        let mut rng = StdRng::seed_from_u64(7);
        let choices = ChoiceSet::build(&question, &mut rng);

        assert_eq!(choices.correct_text(), question.correct_answer);
        assert_eq!(
            choices.option(choices.correct_letter()),
            question.correct_answer
        );
    }

    #[test]
    fn test_same_seed_same_mapping() {
        // 公平性：同一种子下两次准备的字母映射完全一致
        let bank = vec![sample_question(1), sample_question(2), sample_question(3)];
        let first = prepare_questions(&bank, None, 42);
        let second = prepare_questions(&bank, None, 42);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.prompt, b.prompt);
            assert_eq!(a.choices.correct_letter(), b.choices.correct_letter());
            for letter in Letter::ALL {
                assert_eq!(a.choices.option(letter), b.choices.option(letter));
            }
        }
    }

    #[test]
    fn test_prepare_respects_max_questions() {
        let bank = vec![sample_question(1), sample_question(2), sample_question(3)];
        let prepared = prepare_questions(&bank, Some(2), 42);
        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared[0].index, 1);
        assert_eq!(prepared[1].index, 2);

        // 上限超过题库规模时取全部
        let prepared = prepare_questions(&bank, Some(10), 42);
        assert_eq!(prepared.len(), 3);
    }

    #[test]
    fn test_prompt_embeds_question_and_options() {
        let bank = vec![sample_question(1)];
        let prepared = prepare_questions(&bank, None, 42);
        let prompt = &prepared[0].prompt;

        assert!(prompt.contains("Who is the lead singer of Fall Out Boy?"));
        for letter in Letter::ALL {
            assert!(prompt.contains(&format!(
                "{}) {}",
                letter,
                prepared[0].choices.option(letter)
            )));
        }
    }

    #[test]
    fn test_letter_parsing() {
        assert_eq!(Letter::from_char('a'), Some(Letter::A));
        assert_eq!(Letter::from_char('D'), Some(Letter::D));
        assert_eq!(Letter::from_char('E'), None);
        assert_eq!(Letter::from_index(2), Some(Letter::C));
        assert_eq!(Letter::from_index(4), None);
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(Difficulty::parse("Easy"), Difficulty::Easy);
        assert_eq!(Difficulty::parse(" hard "), Difficulty::Hard);
        assert_eq!(Difficulty::parse("???"), Difficulty::Unknown);
    }
}
