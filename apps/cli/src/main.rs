mod render;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use workbench_explorer::{
    ContentTree, ContentType, Snapshot, TabContent, TableContent, TreeError, ViewConfig, Workbench,
};
use workbench_schedule::{ScheduleClient, ScheduleDraft, DEFAULT_ENDPOINT};

use crate::render::{outline, PlainTextRenderer};

const LOG_ENV: &str = "WORKBENCH_LOG";

#[derive(Parser)]
#[command(
    name = "workbench-cli",
    about = "Inspect and edit workbench content trees",
    author,
    version
)]
struct Cli {
    /// 內容快照 JSON；省略時從空樹開始。 / Content snapshot JSON; starts from an empty tree when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    data: Option<PathBuf>,
    /// 檢視設定 JSON；省略時使用內建設定。 / View configuration JSON; the built-in schema is used when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// 輸出除錯記錄。 / Emit debug logs on stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出樹狀大綱。 / Print the tree outline.
    Tree,
    /// 顯示節點的分頁。 / Show the tabs projected for a node.
    Show(ShowArgs),
    /// 新增節點。 / Add a node.
    Add(AddArgs),
    /// 更新葉節點內容。 / Replace the body of a leaf node.
    Edit(EditArgs),
    /// 設定分頁內容。 / Store content in one tab of a node.
    SetTab(SetTabArgs),
    /// 建立排程。 / Register a schedule with the scheduling service.
    Schedule(ScheduleArgs),
}

#[derive(Args)]
struct ShowArgs {
    /// 節點識別碼。 / Node id.
    id: String,
    /// 只顯示指定分頁。 / Only print this tab.
    #[arg(long, value_name = "TAB")]
    tab: Option<String>,
}

#[derive(Args)]
struct OutputArgs {
    /// 將更新後的快照寫入檔案；預設輸出至標準輸出。 / Write the updated snapshot to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct AddArgs {
    /// 顯示名稱。 / Display label.
    #[arg(long)]
    label: String,
    /// 節點類型（folder、py、sql…）。 / Node kind (folder, py, sql, ...).
    #[arg(long)]
    kind: String,
    /// 初始內容。 / Initial body for leaf nodes.
    #[arg(long)]
    body: Option<String>,
    /// 父資料夾識別碼；省略時加入根層。 / Parent folder id; appended to the roots when omitted.
    #[arg(long, value_name = "ID")]
    parent: Option<String>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct EditArgs {
    /// 節點識別碼。 / Node id.
    id: String,
    /// 新內容。 / New body text.
    #[arg(long, conflicts_with = "body_file", required_unless_present = "body_file")]
    body: Option<String>,
    /// 從檔案讀取新內容。 / Read the new body from a file.
    #[arg(long, value_name = "FILE")]
    body_file: Option<PathBuf>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct SetTabArgs {
    /// 節點識別碼。 / Node id.
    id: String,
    /// 分頁識別碼。 / Tab id.
    #[arg(long)]
    tab: String,
    /// 內容類型（text、markdown、table…）。 / Content type (text, markdown, table, ...).
    #[arg(long = "type", value_name = "TYPE")]
    content_type: String,
    /// 內容；table 需為 JSON。 / Content; JSON for tables.
    #[arg(long)]
    content: String,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct ScheduleArgs {
    /// 排程名稱。 / Schedule name.
    #[arg(long)]
    name: String,
    /// Cron 表示式。 / Cron expression.
    #[arg(long)]
    cron: String,
    /// 下次執行時間（ISO 8601）。 / Next run timestamp (ISO 8601).
    #[arg(long)]
    next_run: Option<String>,
    /// 開始日期。 / Start date (YYYY-MM-DD).
    #[arg(long)]
    start_date: Option<String>,
    /// 結束日期。 / End date (YYYY-MM-DD).
    #[arg(long)]
    end_date: Option<String>,
    /// 排程服務位址。 / Scheduling endpoint.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    /// 只輸出請求內容，不送出。 / Print the request body without sending it.
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        data,
        config,
        verbose,
        command,
    } = Cli::parse();
    init_logging(verbose);

    match command {
        Commands::Tree => {
            let workbench = load_workbench(data, config)?;
            print!("{}", outline(workbench.tree()));
            Ok(())
        }
        Commands::Show(args) => execute_show(&mut load_workbench(data, config)?, args),
        Commands::Add(args) => execute_add(&mut load_workbench(data, config)?, args),
        Commands::Edit(args) => execute_edit(&mut load_workbench(data, config)?, args),
        Commands::SetTab(args) => execute_set_tab(&mut load_workbench(data, config)?, args),
        Commands::Schedule(args) => execute_schedule(args),
    }
}

fn load_workbench(data: Option<PathBuf>, config: Option<PathBuf>) -> Result<Workbench> {
    let config = match config {
        Some(path) => ViewConfig::load(&path)
            .with_context(|| format!("failed to load view config {}", path.display()))?,
        None => ViewConfig::builtin(),
    };
    let tree = match data {
        Some(path) => Snapshot::load(&path)
            .with_context(|| format!("failed to load snapshot {}", path.display()))?
            .into_tree(),
        None => ContentTree::default(),
    };
    debug!(nodes = tree.len(), "content tree loaded");
    Ok(Workbench::new(config, tree))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn execute_show(workbench: &mut Workbench, args: ShowArgs) -> Result<()> {
    let Some(view) = workbench.select(&args.id) else {
        bail!("{}", TreeError::NotFound(args.id.as_str().into()));
    };
    if let Some(buffer) = workbench.editor_buffer() {
        println!("{} ({})", buffer.label, buffer.render_hint);
        if !buffer.body.is_empty() {
            println!("{}", buffer.body);
        }
    } else if let Some(node) = workbench.selected_node() {
        println!("{}/", node.label());
    }

    if view.is_empty() {
        println!("(no tabs for this kind)");
        return Ok(());
    }

    for (tab, content) in view.visible_tabs() {
        if args.tab.as_deref().is_some_and(|wanted| wanted != tab.id) {
            continue;
        }
        let marker = if view.active_tab.as_deref() == Some(tab.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} [{}] {}", tab.id, tab.label);
        match content {
            Some(content) => println!("{}", content.accept(&mut PlainTextRenderer)),
            None => println!("(empty)"),
        }
    }
    Ok(())
}

fn execute_add(workbench: &mut Workbench, args: AddArgs) -> Result<()> {
    let id = workbench.add_node(
        &args.label,
        &args.kind,
        args.body.as_deref(),
        args.parent.as_deref(),
    )?;
    emit_snapshot(workbench.tree(), &args.output, &format!("Added node {id}"))
}

fn execute_edit(workbench: &mut Workbench, args: EditArgs) -> Result<()> {
    let body = match (args.body, args.body_file) {
        (Some(body), _) => body,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => bail!("either --body or --body-file is required"),
    };
    if workbench.select(&args.id).is_none() {
        bail!("{}", TreeError::NotFound(args.id.as_str().into()));
    }
    workbench.apply_editor_change(body)?;
    emit_snapshot(
        workbench.tree(),
        &args.output,
        &format!("Updated body of {}", args.id),
    )
}

fn execute_set_tab(workbench: &mut Workbench, args: SetTabArgs) -> Result<()> {
    let content = build_tab_content(&args.content_type, args.content)?;
    workbench.add_tab_content(&args.id, &args.tab, content)?;
    emit_snapshot(
        workbench.tree(),
        &args.output,
        &format!("Stored tab {} on {}", args.tab, args.id),
    )
}

fn build_tab_content(type_name: &str, content: String) -> Result<TabContent> {
    match type_name.parse::<ContentType>() {
        Ok(ContentType::Table) => {
            let table: TableContent = serde_json::from_str(&content)
                .context("table content must be a JSON object with columns and rows")?;
            Ok(TabContent::Table(table.validated()?))
        }
        Ok(content_type) => TabContent::textual(content_type, content)
            .with_context(|| format!("{content_type} content must be text")),
        Err(_) => {
            let payload = serde_json::from_str(&content).unwrap_or(Value::String(content));
            Ok(TabContent::from_parts(type_name, payload))
        }
    }
}

fn emit_snapshot(tree: &ContentTree, output: &OutputArgs, message: &str) -> Result<()> {
    let json = Snapshot::from_tree(tree).to_json_pretty()?;
    match &output.output {
        Some(path) => {
            write_output(path, &json)?;
            info!(path = %path.display(), "snapshot written");
            println!("{message}");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn execute_schedule(args: ScheduleArgs) -> Result<()> {
    let request = ScheduleDraft {
        name: args.name,
        cron: args.cron,
        next_run: args.next_run,
        start_date: args.start_date,
        end_date: args.end_date,
    }
    .into_request()?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    let record = ScheduleClient::new(args.endpoint).submit(&request)?;
    match record.id {
        Some(id) => println!("Created schedule '{}' ({id})", record.name),
        None => println!("Created schedule '{}'", record.name),
    }
    Ok(())
}
