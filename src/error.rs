// ============================================
// src/error.rs
// クレート共通のエラー型
// ============================================

use std::path::PathBuf;

use thiserror::Error;

use crate::questions::Category;
use crate::session::SessionState;

/// クイズのコア処理が返すエラー
#[derive(Debug, Error)]
pub enum QuizError {
    /// カタログファイルが開けない (存在しない・権限がない)
    #[error("問題カタログを読み込めません ({path}): {source}")]
    CatalogUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// カタログの JSON が壊れている
    #[error("問題カタログの形式が不正です: {0}")]
    CatalogMalformed(#[from] serde_json::Error),

    /// 個々の問題データが不正
    #[error("問題 #{id} が不正です: {reason}")]
    InvalidQuestion { id: u32, reason: String },

    /// 指定した条件に一致する問題がない
    #[error("この難易度の問題がありません (カテゴリ: {}, レベル: {})", fmt_category(.category), fmt_level(.level))]
    NoQuestions {
        category: Option<Category>,
        level: Option<u8>,
    },

    #[error("回答を受け付けられる状態ではありません: {0:?}")]
    SessionNotInProgress(SessionState),

    #[error("選択肢の番号が範囲外です: {0}")]
    InvalidChoice(usize),

    #[error("この問題では既にヒントを使用しました")]
    HintAlreadyUsed,

    #[error("セーブデータの入出力に失敗しました: {0}")]
    Io(#[from] std::io::Error),

    #[error("セーブデータのエンコードに失敗しました: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("セーブデータの保存先を決定できません")]
    NoDataDir,
}

fn fmt_category(category: &Option<Category>) -> &'static str {
    category.map(Category::label).unwrap_or("すべて")
}

fn fmt_level(level: &Option<u8>) -> String {
    level.map(|l| format!("Lv.{l}")).unwrap_or_else(|| "すべて".to_string())
}
