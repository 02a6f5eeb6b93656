use anyhow::Context;
use clap::Parser;
use net_file_uploader::{config::DEFAULT_CONFIG_PATH, logging, AppConfig, UploadManager};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "net-file-uploader", version, about = "上传文件到 FTP 目录，自动处理同名文件")]
struct Cli {
    /// 配置文件路径（TOML）
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// FTP 服务器地址，如 ftp://example.com/
    #[arg(long)]
    address: Option<String>,

    /// 远程目标目录
    #[arg(long)]
    dest: Option<String>,

    /// 用户名
    #[arg(short, long)]
    user: Option<String>,

    /// 密码
    #[arg(short, long)]
    password: Option<String>,

    /// 批量上传时最大同时连接数
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// 输出 JSON 格式的上传报告
    #[arg(long)]
    json: bool,

    /// 要上传的本地文件
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(address) = &self.address {
            config.ftp.address = address.clone();
        }
        if let Some(dest) = &self.dest {
            config.ftp.destination_path = dest.clone();
        }
        if let Some(user) = &self.user {
            config.ftp.username = user.clone();
        }
        if let Some(password) = &self.password {
            config.ftp.password = password.clone();
        }
        if let Some(max) = self.max_concurrent {
            config.upload.max_concurrent_tasks = max;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let (mut config, load_error) = AppConfig::load_or_default(&cli.config).await;
    cli.apply_overrides(&mut config);

    // 必须保持 _log_guard 存活
    let _log_guard = logging::init_logging(&config.log);

    match load_error {
        None => info!("配置文件加载成功: {}", cli.config),
        Some(e) => warn!("配置文件加载失败，使用默认配置: {:#}", e),
    }

    config.validate().context("配置无效")?;
    info!(
        "目标: {} 目录 {} (用户: {})",
        config.ftp.socket_addr(),
        config.ftp.remote_dir(),
        config.ftp.login_user()
    );

    let manager = UploadManager::new(config.ftp.clone(), config.upload.clone());

    if let [file] = cli.files.as_slice() {
        // 单文件：阻塞上传，错误直接返回
        let file = file.clone();
        let task = tokio::task::spawn_blocking(move || manager.upload_file(&file))
            .await
            .context("上传任务异常")?;

        return match task {
            Ok(task) => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&task)?);
                }
                info!("上传完成: {}", task.remote_name);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                error!("上传失败: {}", e);
                Ok(ExitCode::FAILURE)
            }
        };
    }

    let report = manager.upload_files(cli.files.clone()).await;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary());
    }

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
