// ============================================
// src/main.rs (メインファイル)
// ============================================

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Select, theme::ColorfulTheme};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sciquiz::questions::{MAX_LEVEL, MIN_LEVEL};
use sciquiz::save_data::default_data_dir;
use sciquiz::{
    AchievementTracker, Category, FileProgressStore, Game, ProgressStore, QuestionBank,
};

// `src/tui.rs` をモジュールとして読み込む
mod tui;

const LOG_FILE: &str = "sciquiz.log";

// --------------------------------------------------
// コマンドライン引数
// --------------------------------------------------

#[derive(Parser)]
#[command(name = "sciquiz")]
#[command(about = "サイエンスクイズ - 宇宙・物理・化学・生物・地学の4択クイズ")]
#[command(version)]
struct Cli {
    /// 問題カタログの JSON (省略時は同梱のカタログ)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// セーブデータとログの保存先 (省略時は OS 標準のデータディレクトリ)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// デバッグログを出力する
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// クイズを遊ぶ (カテゴリ・レベルを省略すると選択画面を表示)
    Play {
        /// カテゴリ (宇宙/物理/化学/生物/地学 または space/physics/...)
        #[arg(short, long)]
        category: Option<Category>,

        /// 難易度 (1-5)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
        level: Option<u8>,
    },

    /// 実績の一覧を表示する
    Achievements,

    /// 累計の成績を表示する
    Stats,

    /// カテゴリ・レベルごとの問題数を表示する
    Categories,
}

// --------------------------------------------------
// メイン関数
// --------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let store = FileProgressStore::new(&data_dir)
        .with_context(|| format!("データディレクトリを作成できません: {}", data_dir.display()))?;

    let command = cli.command.unwrap_or(Commands::Play {
        category: None,
        level: None,
    });
    // TUI が画面を使うあいだはログをファイルに書く
    let log_to_file = matches!(command, Commands::Play { .. });
    init_logging(cli.verbose, log_to_file.then(|| data_dir.join(LOG_FILE)))?;

    let bank = match &cli.catalog {
        Some(path) => QuestionBank::load(path)?,
        None => QuestionBank::bundled()?,
    };

    match command {
        Commands::Play { category, level } => play(&bank, store, category, level),
        Commands::Achievements => {
            show_achievements(&AchievementTracker::new(store));
            Ok(())
        }
        Commands::Stats => {
            show_stats(&AchievementTracker::new(store));
            Ok(())
        }
        Commands::Categories => {
            show_categories(&bank);
            Ok(())
        }
    }
}

/// ログの初期化 (RUST_LOG があればそちらを優先)
fn init_logging(verbose: bool, log_file: Option<PathBuf>) -> Result<()> {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("ログファイルを開けません: {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

// --------------------------------------------------
// サブコマンド
// --------------------------------------------------

/// MARK:カテゴリ・レベルを決めてクイズ画面を起動する
fn play<S: ProgressStore>(
    bank: &QuestionBank,
    store: S,
    category: Option<Category>,
    level: Option<u8>,
) -> Result<()> {
    let category = match category {
        Some(c) => c,
        None => pick_category(bank)?,
    };
    let level = match level {
        Some(l) => l,
        None => pick_level(bank, category)?,
    };

    let tracker = AchievementTracker::new(store);
    let mut game = Game::start(bank, tracker, Some(category), Some(level))?;
    tui::run(&mut game).context("ターミナルの操作に失敗しました")?;

    let session = game.session();
    info!(
        total_correct = session.total_correct(),
        total_answered = session.total_answered(),
        "quiz finished"
    );
    println!(
        "{} 正解 {} / {}",
        style("おつかれさまでした!").cyan().bold(),
        session.total_correct(),
        session.total_answered()
    );
    Ok(())
}

fn pick_category(bank: &QuestionBank) -> Result<Category> {
    let categories = bank.categories();
    if categories.is_empty() {
        anyhow::bail!("問題カタログが空です");
    }
    let items: Vec<String> = categories
        .iter()
        .map(|c| format!("{} {} ({}問)", c.label(), c.english_name(), bank.count_by_category(*c)))
        .collect();
    let selected = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("カテゴリを選んでください")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(categories[selected])
}

fn pick_level(bank: &QuestionBank, category: Category) -> Result<u8> {
    let levels: Vec<u8> = (MIN_LEVEL..=MAX_LEVEL).collect();
    let items: Vec<String> = levels
        .iter()
        .map(|l| format!("Lv.{l} ({}問)", bank.count_by(Some(category), Some(*l))))
        .collect();
    let selected = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{} の難易度を選んでください", category.label()))
        .items(&items)
        .default(0)
        .interact()?;
    Ok(levels[selected])
}

fn show_achievements<S: ProgressStore>(tracker: &AchievementTracker<S>) {
    let all = tracker.all_achievements();
    println!(
        "{}  {}/{}",
        style("実績").bold(),
        tracker.unlocked_count(),
        all.len()
    );
    for (achievement, unlocked) in all {
        if unlocked {
            println!(
                "  {} {}  {}",
                achievement.icon,
                style(achievement.title).green().bold(),
                achievement.description
            );
        } else {
            println!(
                "  🔒 {}  {}",
                style(achievement.title).dim(),
                style(achievement.description).dim()
            );
        }
    }
}

fn show_stats<S: ProgressStore>(tracker: &AchievementTracker<S>) {
    let p = tracker.progress();
    println!("{}", style("累計成績").bold());
    println!("  回答数        : {}", p.total_answered);
    println!("  連続正解      : {} (最高 {})", p.current_streak, p.best_streak);
    println!("  ヒントなし連続: {}", p.hint_free_streak);
    for category in Category::ALL {
        println!("  {} 正解数   : {}", category.label(), p.correct_in(category));
    }
    match p.last_played {
        Some(t) => println!(
            "  最終プレイ    : {}",
            t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
        ),
        None => println!("  最終プレイ    : -"),
    }
}

fn show_categories(bank: &QuestionBank) {
    println!("{}  全{}問", style("問題数").bold(), bank.total_count());
    for category in bank.categories() {
        let per_level: Vec<String> = (MIN_LEVEL..=MAX_LEVEL)
            .map(|l| format!("Lv.{l}:{}", bank.count_by(Some(category), Some(l))))
            .collect();
        println!(
            "  {:<4} {:>3}問  {}",
            style(category.label()).cyan(),
            bank.count_by_category(category),
            per_level.join(" ")
        );
    }
}
