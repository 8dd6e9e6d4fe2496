//! サイエンスクイズのコア: 問題カタログ、プレイ中のセッション、実績判定と保存

pub mod achievements;
pub mod error;
pub mod game;
pub mod questions;
pub mod save_data;
pub mod session;

pub use achievements::{ACHIEVEMENTS, Achievement, AchievementId, AchievementTracker};
pub use error::QuizError;
pub use game::{AnswerOutcome, Game};
pub use questions::{Category, Question, QuestionBank};
pub use save_data::{FileProgressStore, MemoryProgressStore, Progress, ProgressStore};
pub use session::{BatchSummary, QUESTIONS_PER_SET, QuizSession, SessionState, SetGrade};
