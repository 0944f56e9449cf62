//! Ollama 客户端 - 业务能力层
//!
//! 只负责与本地推理服务的 HTTP 交互，不关心评测流程
//!
//! ## 技术栈
//! - 使用 `reqwest` 直接调用 Ollama 原生 API
//! - `/api/tags` 列出已安装的模型
//! - `/api/generate` 发送提示词并取回完整回复（非流式）

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::model_config::ModelConfig;
use crate::models::record::FailureKind;

/// 模型列表接口的超时，与单题请求无关
const LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// 推理服务上的一个可用模型
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    /// 模型体积（字节）
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// /api/generate 请求体
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
    /// 防止模型自问自答下一题
    stop: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// 单题请求的结果
#[derive(Debug, Clone)]
pub struct AskReply {
    /// 成功时为模型回复的原始文本，失败时为失败类型
    pub outcome: Result<String, FailureKind>,
    /// 从发出请求到收到回复（或失败）的耗时
    pub elapsed: Duration,
}

/// Ollama 客户端
///
/// 职责：
/// - 列出服务上的文本模型
/// - 把单道题的提示词发给指定模型并取回原始回复
/// - 只处理单次请求，不做重试
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// 创建新的 Ollama 客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.ollama_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 列出服务上的全部文本模型
    ///
    /// embedding 和 vision 模型不参与选择题评测，直接过滤掉
    pub async fn list_models(&self) -> AppResult<Vec<ModelInfo>> {
        let endpoint = format!("{}/api/tags", self.base_url);
        debug!("请求模型列表: {}", endpoint);

        let response = self
            .http
            .get(&endpoint)
            .timeout(LIST_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        if !response.status().is_success() {
            return Err(AppError::Api(ApiError::BadResponse {
                status: response.status().as_u16(),
                endpoint,
            }));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        let text_models: Vec<ModelInfo> = tags
            .models
            .into_iter()
            .filter(|m| is_text_model(&m.name))
            .collect();

        if text_models.is_empty() {
            return Err(AppError::Api(ApiError::EmptyResponse { endpoint }));
        }

        Ok(text_models)
    }

    /// 向指定模型发送一道题
    ///
    /// 超时、连接失败、响应缺字段分别映射为对应的失败类型，
    /// 不做自动重试，失败会被如实记录到评测结果里
    ///
    /// # 参数
    /// - `model`: 模型评测配置（决定超时与 token 预算）
    /// - `prompt`: 完整的题目提示词
    pub async fn ask(&self, model: &ModelConfig, prompt: &str) -> AskReply {
        let endpoint = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &model.name,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: model.temperature,
                top_p: 0.9,
                num_predict: model.max_tokens,
                stop: vec!["\n\nQUESTION:", "\n\n---"],
            },
        };

        let started = Instant::now();

        let response = self
            .http
            .post(&endpoint)
            .timeout(model.timeout)
            .json(&request)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                let kind = classify_request_error(&e);
                warn!("模型 {} 请求失败 ({}): {}", model.name, kind, e);
                return AskReply {
                    outcome: Err(kind),
                    elapsed: started.elapsed(),
                };
            }
        };

        if !response.status().is_success() {
            warn!(
                "模型 {} 返回错误状态: HTTP {}",
                model.name,
                response.status()
            );
            return AskReply {
                outcome: Err(FailureKind::MalformedResponse),
                elapsed: started.elapsed(),
            };
        }

        match response.json::<GenerateResponse>().await {
            Ok(body) => {
                let elapsed = started.elapsed();
                match body.response.map(|t| t.trim().to_string()) {
                    Some(text) if !text.is_empty() => AskReply {
                        outcome: Ok(text),
                        elapsed,
                    },
                    _ => AskReply {
                        outcome: Err(FailureKind::MalformedResponse),
                        elapsed,
                    },
                }
            }
            Err(e) => {
                let kind = if e.is_timeout() {
                    FailureKind::Timeout
                } else {
                    FailureKind::MalformedResponse
                };
                warn!("模型 {} 响应解析失败: {}", model.name, e);
                AskReply {
                    outcome: Err(kind),
                    elapsed: started.elapsed(),
                }
            }
        }
    }
}

/// 判断是否为可评测的文本模型
fn is_text_model(name: &str) -> bool {
    let lowered = name.to_lowercase();
    !lowered.contains("embed") && !lowered.contains("vision")
}

/// 把请求错误映射为失败类型
fn classify_request_error(e: &reqwest::Error) -> FailureKind {
    if e.is_timeout() {
        FailureKind::Timeout
    } else {
        // 连接被拒、DNS 失败等都视为服务不可达
        FailureKind::ConnectionError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_model_filter() {
        assert!(is_text_model("qwen3:8b"));
        assert!(is_text_model("llama3:latest"));
        assert!(!is_text_model("nomic-embed-text:latest"));
        assert!(!is_text_model("llama3.2-vision:11b"));
    }

    #[test]
    fn test_generate_request_shape() {
        let model = ModelConfig::resolve("llama3:8b", 8 * 1024 * 1024 * 1024);
        let request = GenerateRequest {
            model: &model.name,
            prompt: "QUESTION: test",
            stream: false,
            options: GenerateOptions {
                temperature: model.temperature,
                top_p: 0.9,
                num_predict: model.max_tokens,
                stop: vec!["\n\nQUESTION:", "\n\n---"],
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "llama3:8b");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["num_predict"], 1000);
        assert!((value["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_tags_response_parsing() {
        let json = r#"{"models":[{"name":"qwen3:8b","size":5026604032},{"name":"nomic-embed-text","size":274302450}]}"#;
        let tags: TagsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(tags.models.len(), 2);
        assert_eq!(tags.models[0].name, "qwen3:8b");
        assert_eq!(tags.models[0].size, 5026604032);
    }

    /// 连通性测试，需要本地 Ollama 服务
    ///
    /// 运行方式：
    /// ```bash
    /// cargo test test_list_models_live -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_list_models_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::default();
        let client = OllamaClient::new(&config);

        let models = client.list_models().await.expect("Ollama 应该可访问");
        println!("找到 {} 个文本模型", models.len());
        for model in &models {
            println!("  • {} ({:.1} GB)", model.name, model.size as f64 / 1e9);
        }
        assert!(!models.is_empty());
    }

    /// 单题请求测试，需要本地 Ollama 服务和至少一个已安装模型
    #[tokio::test]
    #[ignore]
    async fn test_ask_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::default();
        let client = OllamaClient::new(&config);

        let models = client.list_models().await.expect("Ollama 应该可访问");
        let first = &models[0];
        let model = ModelConfig::resolve(&first.name, first.size);

        let reply = client
            .ask(&model, "Answer with ONLY the letter A.")
            .await;

        match reply.outcome {
            Ok(text) => {
                println!("模型回复 ({:.1}s): {}", reply.elapsed.as_secs_f64(), text);
                assert!(!text.is_empty());
            }
            Err(kind) => panic!("请求失败: {}", kind),
        }
    }
}
