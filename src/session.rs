// ============================================
// src/session.rs
// 1回のプレイ中だけ使う進行状況 (メモリ上のみ)
// ============================================

use crate::error::QuizError;
use crate::questions::{Category, Question};

/// 1セットあたりの問題数
pub const QUESTIONS_PER_SET: u32 = 10;

/// セッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 回答待ちの問題がある
    InProgress,
    /// 1セット (10問) を解き終えた
    BatchComplete,
    /// セットの途中で問題が尽きた
    Exhausted,
}

/// セット終了時の集計
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub batch_correct: u32,
    pub batch_answered: u32,
    pub total_correct: u32,
    pub total_answered: u32,
    /// 次のセットに進めるか
    pub has_more: bool,
}

/// セット結果の評価
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetGrade {
    Perfect,
    Great,
    Good,
    TryAgain,
}

impl SetGrade {
    pub fn message(self) -> &'static str {
        match self {
            Self::Perfect => "パーフェクト!",
            Self::Great => "よくできました!",
            Self::Good => "まずまずです!",
            Self::TryAgain => "もう少し頑張ろう!",
        }
    }
}

impl BatchSummary {
    pub fn is_perfect(&self) -> bool {
        self.batch_correct == QUESTIONS_PER_SET
    }

    /// セット内の正答率で評価する (分母はセットの問題数)
    pub fn grade(&self) -> SetGrade {
        let ratio = self.batch_correct as f64 / QUESTIONS_PER_SET as f64;
        if ratio >= 1.0 {
            SetGrade::Perfect
        } else if ratio >= 0.7 {
            SetGrade::Great
        } else if ratio >= 0.4 {
            SetGrade::Good
        } else {
            SetGrade::TryAgain
        }
    }

    /// 累計の正答率 (%)
    pub fn total_percentage(&self) -> u32 {
        if self.total_answered == 0 {
            return 0;
        }
        ((self.total_correct as f64 / self.total_answered as f64) * 100.0).round() as u32
    }
}

/// カテゴリとレベルを選んでから抜けるまでのプレイ状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    questions: Vec<Question>,
    category: Option<Category>,
    level: Option<u8>,
    question_index: usize,
    total_answered: u32,
    total_correct: u32,
    batch_answered: u32,
    batch_correct: u32,
}

impl QuizSession {
    /// シャッフル済みの問題リストからセッションを作る
    pub fn new(questions: Vec<Question>, category: Option<Category>, level: Option<u8>) -> Self {
        Self {
            questions,
            category,
            level,
            question_index: 0,
            total_answered: 0,
            total_correct: 0,
            batch_answered: 0,
            batch_correct: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.batch_answered >= QUESTIONS_PER_SET {
            SessionState::BatchComplete
        } else if self.question_index >= self.questions.len() {
            SessionState::Exhausted
        } else {
            SessionState::InProgress
        }
    }

    /// 現在の問題 (最後まで進んでいれば None)
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.question_index)
    }

    pub fn has_more_questions(&self) -> bool {
        self.question_index < self.questions.len()
    }

    /// 回答結果を記録する
    pub fn record_answer(&mut self, is_correct: bool) -> Result<(), QuizError> {
        let state = self.state();
        if state != SessionState::InProgress {
            return Err(QuizError::SessionNotInProgress(state));
        }
        self.total_answered += 1;
        self.batch_answered += 1;
        if is_correct {
            self.total_correct += 1;
            self.batch_correct += 1;
        }
        Ok(())
    }

    /// 次の問題へ
    pub fn advance(&mut self) {
        if self.question_index < self.questions.len() {
            self.question_index += 1;
        }
    }

    /// セットの集計をリセットして次のセットへ
    pub fn complete_batch(&mut self) {
        self.batch_answered = 0;
        self.batch_correct = 0;
    }

    /// すべてのカウンタを初期状態に戻す (問題リストの取り直しは呼び出し側)
    pub fn reset_all(&mut self) {
        self.question_index = 0;
        self.total_answered = 0;
        self.total_correct = 0;
        self.batch_answered = 0;
        self.batch_correct = 0;
    }

    /// 問題リストを差し替える (リスタート用)
    pub fn replace_questions(&mut self, questions: Vec<Question>) {
        self.questions = questions;
        self.question_index = self.question_index.min(self.questions.len());
    }

    pub fn batch_summary(&self) -> BatchSummary {
        BatchSummary {
            batch_correct: self.batch_correct,
            batch_answered: self.batch_answered,
            total_correct: self.total_correct,
            total_answered: self.total_answered,
            has_more: self.has_more_questions(),
        }
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn level(&self) -> Option<u8> {
        self.level
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn total_answered(&self) -> u32 {
        self.total_answered
    }

    pub fn total_correct(&self) -> u32 {
        self.total_correct
    }

    pub fn total_incorrect(&self) -> u32 {
        self.total_answered - self.total_correct
    }

    pub fn batch_answered(&self) -> u32 {
        self.batch_answered
    }

    pub fn batch_correct(&self) -> u32 {
        self.batch_correct
    }
}
