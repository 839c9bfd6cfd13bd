// ==========================================
// 撿貨資訊聯邦查詢引擎 - 命令行入口
// ==========================================
// 子命令: search / import / list / clear
// 输出: stdout 打印 JSON 响应信封，日志写入 stderr
// ==========================================

use anyhow::Result;
use clap::{Parser, Subcommand};
use pick_federation::api::PickRequest;
use pick_federation::app::AppState;
use pick_federation::domain::SourceKind;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pick-federation")]
#[command(about = "撿貨資訊聯邦查詢引擎")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// 按 MIC需求起日 区间搜尋撿貨資訊
    Search {
        /// MIC需求起日
        start: String,

        /// MIC需求訖日（省略时等同起日）
        end: Option<String>,

        /// 排序字段
        #[arg(long)]
        sort: Option<String>,

        /// 排序方向 asc | desc
        #[arg(long)]
        order: Option<String>,
    },

    /// 上传来源文件 (.xlsx/.xls/.csv)
    #[command(after_help = "\
来源: purchase_shipping | inventory_need | customer_need | products | items")]
    Import {
        /// 来源
        source: SourceKind,

        /// 文件路径
        file: PathBuf,
    },

    /// 列出庫存異動記錄
    List {
        /// 返回条数上限
        limit: Option<usize>,
    },

    /// 清空庫存異動記錄
    Clear {
        /// 确认清空
        #[arg(long)]
        confirm: bool,
    },
}

fn search_request(
    start: String,
    end: Option<String>,
    sort: Option<String>,
    order: Option<String>,
) -> PickRequest {
    PickRequest {
        start: Some(start),
        end,
        sort_field: sort,
        sort_order: order,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    pick_federation::logging::init();

    tracing::info!(version = pick_federation::VERSION, "{}", pick_federation::APP_NAME);
    let state = AppState::from_env().map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Command::Search {
            start,
            end,
            sort,
            order,
        } => {
            let request = search_request(start, end, sort, order);
            print_json(&state.pick_api.search_pick(&request).await)?
        }
        Command::Import { source, file } => {
            print_json(&state.import_api.upload(source, file).await)?
        }
        Command::List { limit } => print_json(&state.import_api.list_items(limit))?,
        Command::Clear { confirm } => print_json(&state.import_api.clear(confirm))?,
    }
    Ok(())
}
