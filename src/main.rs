// ==========================================
// 线索导入系统 - 命令行入口
// ==========================================
// 输出: 查询结果以 JSON 打印到 stdout，日志写 stderr
// ==========================================

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use lead_import::api::{ExportFormat, StartedImport};
use lead_import::app::{get_default_db_path, AppState};
use lead_import::domain::LeadFilter;
use lead_import::{logging, ImportStatus, Industry, LeadStatus, Seniority};

#[derive(Parser)]
#[command(name = "lead-import", version, about = "线索导入系统: 批量导入、富化、评分与去重")]
struct Cli {
    /// 数据库文件路径
    #[arg(long, global = true, env = "LEAD_IMPORT_DB_PATH")]
    db: Option<String>,

    /// 以 JSON 行格式输出日志
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 导入一个或多个文件（并发执行，Ctrl-C 取消）
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// 查询导入批次
    Status { import_id: String },
    /// 最近导入列表
    Imports {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// 删除导入批次记录
    DeleteImport { import_id: String },
    /// 线索列表
    Leads {
        #[arg(long)]
        status: Option<LeadStatus>,
        #[arg(long)]
        min_score: Option<u32>,
        #[arg(long)]
        max_score: Option<u32>,
        #[arg(long)]
        industry: Option<Industry>,
        #[arg(long)]
        seniority: Option<Seniority>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// 线索详情
    Lead { lead_id: String },
    /// 更新线索状态
    SetStatus {
        status: LeadStatus,
        #[arg(required = true)]
        lead_ids: Vec<String>,
    },
    /// 导出线索 CSV
    Export {
        #[arg(long, default_value = "standard")]
        format: ExportFormat,
        /// 仅导出指定线索
        #[arg(long = "id")]
        ids: Vec<String>,
        /// 输出文件（缺省写 stdout）
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// 统计总览
    Stats,
    /// 配置管理
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// 查询配置（缺省列出全部）
    Get { key: Option<String> },
    /// 更新配置
    Set { key: String, value: String },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_imports(state: &AppState, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("收到中断信号，取消导入");
                cancel.cancel();
            }
        })
    };

    let (started, rejected) = state.import_api.start_imports(&files, Some(&cancel)).await;
    for (path, e) in &rejected {
        error!(file_path = %path.display(), error = %e, "导入未能启动");
    }

    let mut failed = rejected.len();
    for StartedImport { import, task } in started {
        match task.await {
            Ok(Ok(done)) => {
                if done.status == ImportStatus::Failed {
                    failed += 1;
                }
                // 输出失败不能中断对其余任务的等待
                if let Err(e) = print_json(&done) {
                    error!(import_id = %done.id, error = %e, "结果输出失败");
                }
            }
            Ok(Err(e)) => {
                failed += 1;
                error!(import_id = %import.id, error = %e, "导入未能完成");
            }
            Err(e) => {
                failed += 1;
                error!(import_id = %import.id, error = %e, "导入任务异常退出");
            }
        }
    }
    watcher.abort();

    if failed > 0 {
        bail!("{} 个导入失败", failed);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.json_log {
        logging::init_json();
    } else {
        logging::init();
    }

    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    info!(version = lead_import::VERSION, db_path = %db_path, "{}", lead_import::APP_NAME);

    let state = AppState::new(db_path)
        .map_err(anyhow::Error::msg)
        .context("无法初始化AppState")?;

    match cli.command {
        Command::Import { files } => run_imports(&state, files).await?,
        Command::Status { import_id } => print_json(&state.import_api.get_import(&import_id)?)?,
        Command::Imports { limit } => {
            print_json(&state.import_api.list_recent_imports(limit)?)?
        }
        Command::DeleteImport { import_id } => state.import_api.delete_import(&import_id)?,
        Command::Leads {
            status,
            min_score,
            max_score,
            industry,
            seniority,
            search,
            page,
            limit,
        } => {
            let filter = LeadFilter {
                status,
                min_score,
                max_score,
                industry,
                seniority,
                search,
                page,
                limit,
            };
            print_json(&state.lead_api.list_leads(&filter)?)?
        }
        Command::Lead { lead_id } => print_json(&state.lead_api.get_lead(&lead_id)?)?,
        Command::SetStatus { status, lead_ids } => {
            if let [lead_id] = lead_ids.as_slice() {
                print_json(&state.lead_api.update_lead_status(lead_id, status)?)?
            } else {
                let updated = state.lead_api.bulk_update_status(&lead_ids, status)?;
                print_json(&serde_json::json!({ "updated": updated }))?
            }
        }
        Command::Export {
            format,
            ids,
            output,
        } => {
            let selection = (!ids.is_empty()).then_some(ids.as_slice());
            let csv = state.lead_api.export_leads(format, selection)?;
            match output {
                Some(path) => std::fs::write(&path, csv)
                    .with_context(|| format!("写入导出文件失败: {}", path.display()))?,
                None => print!("{}", csv),
            }
        }
        Command::Stats => print_json(&state.dashboard_api.get_stats()?)?,
        Command::Config { action } => match action {
            ConfigAction::Get { key: None } => print_json(&state.config_api.list_configs()?)?,
            ConfigAction::Get { key: Some(key) } => {
                print_json(&state.config_api.get_config(&key)?)?
            }
            ConfigAction::Set { key, value } => {
                print_json(&state.config_api.update_config(&key, &value)?)?
            }
        },
    }

    Ok(())
}
