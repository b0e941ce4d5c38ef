use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use classpulse::ai::{self, ChatClient};
use classpulse::report::{self, Report};
use classpulse::{AppConfig, audit, config, ingest};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "classpulse",
    version,
    about = "课堂教学数据分析：导入周数据，生成带 AI 摘要的交互式 HTML 周报"
)]
struct Cli {
    /// Config file path (created with defaults when missing).
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,
    /// Access password (user tier or admin tier).
    #[arg(short, long, global = true, default_value = "")]
    password: String,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a weekly export and write the HTML report.
    Report(ReportArgs),
    /// Submit a feedback entry (rating plus optional comment).
    Feedback(FeedbackArgs),
    /// Print the access log (admin only).
    Logs(LogsArgs),
    /// Update persisted configuration fields (admin only).
    SetConfig(SetConfigArgs),
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Input spreadsheet export (CSV with a header row).
    #[arg(short, long)]
    input: PathBuf,
    /// Output HTML path; defaults to "<input stem>_报表.html".
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Skip the AI narrative entirely.
    #[arg(long, default_value_t = false)]
    no_ai: bool,
    /// One revision instruction for the AI summary (sent as a second round).
    #[arg(long)]
    refine: Option<String>,
    /// Client identifier recorded in the access log.
    #[arg(long, default_value = "Unknown")]
    client_id: String,
}

#[derive(Args, Debug)]
struct FeedbackArgs {
    /// Rating token, e.g. 👍 / 😐 / 👎.
    #[arg(long)]
    rating: String,
    /// Free-text comment.
    #[arg(long, default_value = "")]
    comment: String,
}

#[derive(Args, Debug)]
struct LogsArgs {
    /// Show the feedback log instead of the access log.
    #[arg(long, default_value_t = false)]
    feedback: bool,
}

#[derive(Args, Debug)]
struct SetConfigArgs {
    #[arg(long)]
    app_title: Option<String>,
    #[arg(long)]
    user_password: Option<String>,
    #[arg(long)]
    admin_password: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    secret_key: Option<String>,
    #[arg(long)]
    upload_hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Admin,
    User,
}

fn authenticate(cfg: &AppConfig, password: &str) -> Result<Access> {
    if password == cfg.admin_password {
        Ok(Access::Admin)
    } else if password == cfg.user_password {
        Ok(Access::User)
    } else {
        bail!("密码错误。提示：输入普通密码使用功能，输入管理员密码进入后台。")
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let access = authenticate(&cfg, &cli.password)?;

    match cli.cmd {
        Command::Report(args) => cmd_report(&cfg, access, args),
        Command::Feedback(args) => cmd_feedback(args),
        Command::Logs(args) => cmd_logs(access, args),
        Command::SetConfig(args) => cmd_set_config(&cli.config, cfg, access, args),
    }
}

fn cmd_report(cfg: &AppConfig, access: Access, args: ReportArgs) -> Result<()> {
    if access == Access::User {
        audit::log_access(audit::ACCESS_LOG, &args.client_id, "普通用户登录")?;
    }
    eprintln!("{}", cfg.upload_hint);

    let table = ingest::read_table(&args.input)?;
    log::info!(
        "已读取 {}（{} 行 × {} 列）",
        args.input.display(),
        table.rows.len(),
        table.headers.len()
    );

    let report = Report::build(&table)?;

    let narrative = if args.no_ai {
        "（本次报表未生成 AI 摘要）".to_string()
    } else {
        let client = ChatClient::default();
        ai::generate_narrative(
            &client,
            &cfg.api_key,
            &cfg.secret_key,
            &report,
            args.refine.as_deref(),
        )
    };

    let html = report::render_html(&report, &narrative, &cfg.app_title);
    let out = args.out.unwrap_or_else(|| default_out_path(&args.input));
    std::fs::write(&out, html).with_context(|| format!("写入报表 {}", out.display()))?;
    eprintln!("报表已生成：{}（周期 {}）", out.display(), report.period);
    Ok(())
}

fn default_out_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    input.with_file_name(format!("{stem}_报表.html"))
}

fn cmd_feedback(args: FeedbackArgs) -> Result<()> {
    audit::log_feedback(audit::FEEDBACK_LOG, &args.rating, &args.comment)?;
    println!("反馈已提交。");
    Ok(())
}

fn cmd_logs(access: Access, args: LogsArgs) -> Result<()> {
    if access != Access::Admin {
        bail!("查看日志需要管理员密码。");
    }
    let path = if args.feedback {
        audit::FEEDBACK_LOG
    } else {
        audit::ACCESS_LOG
    };
    match std::fs::read_to_string(path) {
        Ok(raw) => print!("{raw}"),
        Err(_) => println!("（暂无日志：{path}）"),
    }
    Ok(())
}

fn cmd_set_config(
    path: &Path,
    mut cfg: AppConfig,
    access: Access,
    args: SetConfigArgs,
) -> Result<()> {
    if access != Access::Admin {
        bail!("修改配置需要管理员密码。");
    }
    if let Some(v) = args.app_title {
        cfg.app_title = v;
    }
    if let Some(v) = args.user_password {
        cfg.user_password = v;
    }
    if let Some(v) = args.admin_password {
        cfg.admin_password = v;
    }
    if let Some(v) = args.api_key {
        cfg.api_key = v;
    }
    if let Some(v) = args.secret_key {
        cfg.secret_key = v;
    }
    if let Some(v) = args.upload_hint {
        cfg.upload_hint = v;
    }
    config::save(path, &cfg)?;
    println!("配置已更新。");
    Ok(())
}
