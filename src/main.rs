// ==========================================
// 金矿物流溯源系统 - 批处理命令行入口
// ==========================================
// run:    加载配置（配置错误在读取任何记录前中止）→ 单次运行
//         → 告警分发 → 持久化 → 打印汇总
// alerts: 查看告警日志最近的条目
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ore_trace::config::{default_db_path, env_keys, ConfigLoader};
use ore_trace::engine::{RunInputs, RunOutput, TraceRun};
use ore_trace::notify::{JsonLinesNotifier, NotifierHub, TracingNotifier};
use ore_trace::repository::RunRepository;
use ore_trace::{logging, Severity};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ore-trace")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "金矿物流溯源与校验引擎", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 执行一次全量溯源运行
    Run {
        /// 配置目录（facilities.json / validation_rules.json ...）
        #[arg(long, env = env_keys::CONFIG_DIR, default_value = "config")]
        config_dir: PathBuf,

        /// 卡车运输记录（csv / xlsx / json）
        #[arg(long)]
        shipments: Option<PathBuf>,

        /// 料仓转运记录（每个工作表对应一个工厂）
        #[arg(long)]
        transfers: Option<PathBuf>,

        /// 化验记录
        #[arg(long)]
        assays: Option<PathBuf>,

        /// SQLite 数据库路径
        #[arg(long, env = env_keys::DB_PATH)]
        db: Option<PathBuf>,

        /// 不写数据库
        #[arg(long, default_value_t = false)]
        no_db: bool,

        /// JSON Lines 告警日志
        #[arg(long)]
        alert_log: Option<PathBuf>,

        /// 运行汇总输出（JSON）
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },

    /// 查看告警日志
    Alerts {
        /// JSON Lines 告警日志
        #[arg(long)]
        alert_log: PathBuf,

        /// 最多显示条数
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config_dir,
            shipments,
            transfers,
            assays,
            db,
            no_db,
            alert_log,
            summary_json,
        } => {
            tracing::info!(version = ore_trace::VERSION, "{}", ore_trace::APP_NAME);

            // 配置先于任何记录加载
            let config = ConfigLoader::new(&config_dir)
                .load()
                .with_context(|| format!("配置加载失败: {}", config_dir.display()))?;
            let run = TraceRun::new(config).context("配置校验失败")?;

            let inputs = RunInputs::from_files(
                shipments.as_deref(),
                transfers.as_deref(),
                assays.as_deref(),
            )
            .context("输入文件读取失败")?;

            let output = run.execute(&inputs);

            let mut hub = NotifierHub::new().with(TracingNotifier);
            if let Some(path) = alert_log {
                hub.register(Box::new(JsonLinesNotifier::new(path)));
            }
            hub.dispatch(&output.alerts).await;

            if !no_db {
                let db_path = db.unwrap_or_else(default_db_path);
                RunRepository::open(&db_path)
                    .and_then(|repo| repo.save_run(&output))
                    .with_context(|| format!("运行结果持久化失败: {}", db_path.display()))?;
            }

            if let Some(path) = summary_json {
                let json = serde_json::to_string_pretty(&output.summary)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("汇总写入失败: {}", path.display()))?;
            }

            print_summary(&output);
        }
        Commands::Alerts { alert_log, limit } => {
            let entries = JsonLinesNotifier::new(&alert_log).read_alerts(limit).await?;
            for entry in entries {
                println!("{} [{}] {}: {}", entry.timestamp, entry.level, entry.rule, entry.message);
            }
        }
    }

    Ok(())
}

fn print_summary(output: &RunOutput) {
    let summary = &output.summary;
    println!("run_id: {}", output.run_id);
    println!(
        "records: shipments={} transfers={} assays={} (invalid codes={}, rejected rows={}, summary rows skipped={})",
        summary.shipments,
        summary.transfers,
        summary.assays,
        summary.invalid_sample_codes,
        summary.rejected_rows,
        summary.skipped_summary_rows,
    );
    println!(
        "trace: total={} resolved={} partial={} unresolved={} link_rate={:.1}%",
        summary.trace.total_samples,
        summary.trace.resolved,
        summary.trace.partial,
        summary.trace.unresolved,
        summary.trace.link_rate * 100.0,
    );
    println!(
        "alerts: total={} critical={} warning={}",
        summary.alerts.total_alerts,
        summary.alerts.count(Severity::Critical),
        summary.alerts.count(Severity::Warning),
    );
    for (rule, count) in &summary.alerts.by_rule {
        println!("  {:<24} {}", rule, count);
    }
}
