use anyhow::Result;

use trivia_model_bench::logger;
use trivia_model_bench::App;
use trivia_model_bench::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env();

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
