use std::io::Read;
use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use crate::error::{AppError, AppResult, FileError};
use crate::models::question::{Difficulty, Question};

/// 题库必需的列
const REQUIRED_COLUMNS: [&str; 5] = [
    "question",
    "correct_answer",
    "incorrect_answer_1",
    "incorrect_answer_2",
    "incorrect_answer_3",
];

/// 从 CSV 文件加载题库
///
/// 题库由外部下载器生成，列结构固定：
/// `question, correct_answer, incorrect_answer_1..3, difficulty`。
/// 缺字段的行会被跳过并告警，不会中断整个加载
pub async fn load_question_bank(csv_path: &str) -> AppResult<Vec<Question>> {
    let path = Path::new(csv_path);
    if !path.exists() {
        return Err(AppError::File(FileError::NotFound {
            path: csv_path.to_string(),
        }));
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(csv_path, e))?;

    let bank = parse_question_records(content.as_bytes(), csv_path)?;
    info!("✅ 题库加载完成: {} 道题 ({})", bank.len(), csv_path);

    Ok(bank)
}

/// 解析 CSV 内容为题目列表
///
/// # 参数
/// - `reader`: CSV 内容
/// - `path_label`: 用于错误信息的来源标识
pub fn parse_question_records<R: Read>(reader: R, path_label: &str) -> AppResult<Vec<Question>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| AppError::csv_parse_failed(path_label, e))?
        .clone();

    let column = |name: &str| headers.iter().position(|h| h == name);

    // 必需列缺失属于结构性错误，直接终止加载
    for required in REQUIRED_COLUMNS {
        if column(required).is_none() {
            return Err(AppError::Other(format!(
                "题库缺少必需列 '{}': {}",
                required, path_label
            )));
        }
    }

    let question_col = column("question").unwrap_or(0);
    let correct_col = column("correct_answer").unwrap_or(0);
    let incorrect_cols = [
        column("incorrect_answer_1").unwrap_or(0),
        column("incorrect_answer_2").unwrap_or(0),
        column("incorrect_answer_3").unwrap_or(0),
    ];
    let difficulty_col = column("difficulty");

    let mut bank = Vec::new();
    let mut skipped = 0usize;

    for (row, result) in rdr.records().enumerate() {
        let row_number = row + 1;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("⚠️ 第 {} 行解析失败，跳过: {}", row_number, e);
                skipped += 1;
                continue;
            }
        };

        let field = |col: usize| {
            record
                .get(col)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let text = field(question_col);
        let correct_answer = field(correct_col);
        let incorrect_answers: Vec<String> =
            incorrect_cols.iter().filter_map(|&col| field(col)).collect();

        match (text, correct_answer) {
            (Some(text), Some(correct_answer)) if incorrect_answers.len() == 3 => {
                let difficulty = difficulty_col
                    .and_then(|col| record.get(col))
                    .map(Difficulty::parse)
                    .unwrap_or(Difficulty::Unknown);

                bank.push(Question {
                    id: row_number,
                    text,
                    correct_answer,
                    incorrect_answers,
                    difficulty,
                });
            }
            _ => {
                warn!("⚠️ 第 {} 行字段不完整，跳过", row_number);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("⚠️ 共跳过 {} 行不完整记录", skipped);
    }

    Ok(bank)
}
