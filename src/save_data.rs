// ============================================
// src/save_data.rs
// 累計の進行状況 (実績用カウンタ) と保存先
// ============================================

use bincode::config::standard;
use bincode::{Decode, Encode};
use chrono::{DateTime, TimeZone, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::achievements::AchievementId;
use crate::error::QuizError;
use crate::questions::Category;

const SAVE_FILE_BIN: &str = "progress.bin";
const SAVE_FILE_JSON: &str = "progress.json"; // デバッグ用

/// アプリを再起動しても残るカウンタ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// 現在の連続正解数
    pub current_streak: u32,
    /// これまでの最高連続正解数
    pub best_streak: u32,
    /// 累計回答数
    pub total_answered: u32,
    /// ヒントなしでの連続正解数
    pub hint_free_streak: u32,
    /// カテゴリごとの累計正解数
    pub correct_by_category: BTreeMap<Category, u32>,
    /// 解除済みの実績
    pub unlocked: BTreeSet<AchievementId>,
    /// 最後に回答した時刻
    pub last_played: Option<DateTime<Utc>>,
}

impl Progress {
    pub fn correct_in(&self, category: Category) -> u32 {
        self.correct_by_category.get(&category).copied().unwrap_or(0)
    }

    pub fn is_unlocked(&self, id: AchievementId) -> bool {
        self.unlocked.contains(&id)
    }
}

/// bincode用の内部表現（DateTimeをi64に、列挙型を文字列に変換）
#[derive(Encode, Decode)]
struct ProgressBin {
    current_streak: u32,
    best_streak: u32,
    total_answered: u32,
    hint_free_streak: u32,
    correct_by_category: Vec<(String, u32)>,
    unlocked: Vec<String>,
    last_played_secs: Option<i64>,
}

impl From<&Progress> for ProgressBin {
    fn from(p: &Progress) -> Self {
        Self {
            current_streak: p.current_streak,
            best_streak: p.best_streak,
            total_answered: p.total_answered,
            hint_free_streak: p.hint_free_streak,
            correct_by_category: p
                .correct_by_category
                .iter()
                .map(|(c, n)| (c.label().to_string(), *n))
                .collect(),
            unlocked: p.unlocked.iter().map(|id| id.as_str().to_string()).collect(),
            last_played_secs: p.last_played.map(|t| t.timestamp()),
        }
    }
}

impl From<ProgressBin> for Progress {
    fn from(bin: ProgressBin) -> Self {
        Self {
            current_streak: bin.current_streak,
            best_streak: bin.best_streak,
            total_answered: bin.total_answered,
            hint_free_streak: bin.hint_free_streak,
            // 知らないカテゴリ・実績は読み飛ばす
            correct_by_category: bin
                .correct_by_category
                .into_iter()
                .filter_map(|(c, n)| c.parse::<Category>().ok().map(|c| (c, n)))
                .collect(),
            unlocked: bin
                .unlocked
                .iter()
                .filter_map(|s| AchievementId::parse(s))
                .collect(),
            last_played: bin
                .last_played_secs
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        }
    }
}

/// 進行状況の永続化先
pub trait ProgressStore {
    /// 保存済みの状態を読む (読めなければ初期値)
    fn load(&self) -> Progress;

    /// 状態を書き込む
    fn save(&mut self, progress: &Progress) -> Result<(), QuizError>;
}

/// メモリ上だけに保持するストア (テスト・お試しプレイ用)
#[derive(Debug, Default, Clone)]
pub struct MemoryProgressStore {
    saved: Option<Progress>,
    save_count: usize,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存の状態から始める
    pub fn with_progress(progress: Progress) -> Self {
        Self {
            saved: Some(progress),
            save_count: 0,
        }
    }

    /// save() が呼ばれた回数
    pub fn save_count(&self) -> usize {
        self.save_count
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self) -> Progress {
        self.saved.clone().unwrap_or_default()
    }

    fn save(&mut self, progress: &Progress) -> Result<(), QuizError> {
        self.saved = Some(progress.clone());
        self.save_count += 1;
        Ok(())
    }
}

/// データディレクトリに bincode (本番用) と JSON (デバッグ用) で保存するストア
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    dir: PathBuf,
}

impl FileProgressStore {
    /// 指定ディレクトリを保存先にする (なければ作成)
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, QuizError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// OS標準のデータディレクトリを保存先にする
    pub fn open_default() -> Result<Self, QuizError> {
        Self::new(default_data_dir()?)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn bin_path(&self) -> PathBuf {
        self.dir.join(SAVE_FILE_BIN)
    }

    fn json_path(&self) -> PathBuf {
        self.dir.join(SAVE_FILE_JSON)
    }

    fn load_bin(&self) -> Option<Progress> {
        let path = self.bin_path();
        let buffer = fs::read(&path).ok()?;
        match bincode::decode_from_slice::<ProgressBin, _>(&buffer, standard()) {
            Ok((bin, _)) => Some(Progress::from(bin)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "binary save data is corrupt");
                None
            }
        }
    }

    fn load_json(&self) -> Option<Progress> {
        let path = self.json_path();
        let json = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&json) {
            Ok(progress) => Some(progress),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "json save data is corrupt");
                None
            }
        }
    }
}

impl ProgressStore for FileProgressStore {
    /// MARK:バイナリ優先、JSONフォールバック、どちらも駄目なら初期値
    fn load(&self) -> Progress {
        if let Some(progress) = self.load_bin() {
            return progress;
        }
        if let Some(progress) = self.load_json() {
            debug!("restored progress from json mirror");
            return progress;
        }
        Progress::default()
    }

    /// MARK:データをファイルに保存する (バイナリ + JSON)
    fn save(&mut self, progress: &Progress) -> Result<(), QuizError> {
        let encoded = bincode::encode_to_vec(ProgressBin::from(progress), standard())?;
        fs::write(self.bin_path(), encoded)?;

        // JSON は確認用なので失敗しても続行する
        match serde_json::to_string_pretty(progress) {
            Ok(json) => {
                if let Err(e) = fs::write(self.json_path(), json) {
                    warn!(error = %e, "failed to write json mirror");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize json mirror"),
        }
        Ok(())
    }
}

/// セーブデータとログを置くディレクトリ
pub fn default_data_dir() -> Result<PathBuf, QuizError> {
    ProjectDirs::from("jp", "Fukumoto0141", "SCIENCE_QUIZ")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(QuizError::NoDataDir)
}
