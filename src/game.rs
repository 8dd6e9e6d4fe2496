// ============================================
// src/game.rs
// セッション・問題カタログ・実績判定をまとめて進行させる
// ============================================

use tracing::{debug, info, warn};

use crate::achievements::{Achievement, AchievementTracker};
use crate::error::QuizError;
use crate::questions::{CHOICE_COUNT, Category, Question, QuestionBank};
use crate::save_data::ProgressStore;
use crate::session::{BatchSummary, QuizSession, SessionState};

/// 1回答分の結果 (結果画面に渡す)
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub correct_choice: usize,
    pub correct_text: String,
    pub explanation: String,
    /// 今回の回答で解除された実績 (パーフェクトを含む)
    pub unlocked: Vec<&'static Achievement>,
    /// この回答でセットが終わった場合の集計
    pub batch: Option<BatchSummary>,
}

/// 選んだカテゴリ・レベルでのプレイ全体
pub struct Game<'a, S: ProgressStore> {
    bank: &'a QuestionBank,
    session: QuizSession,
    tracker: AchievementTracker<S>,
    /// 現在の問題でヒントが消した選択肢
    hint: Option<[usize; 2]>,
}

impl<'a, S: ProgressStore> Game<'a, S> {
    /// 問題を取り出してセッションを開始する
    pub fn start(
        bank: &'a QuestionBank,
        tracker: AchievementTracker<S>,
        category: Option<Category>,
        level: Option<u8>,
    ) -> Result<Self, QuizError> {
        let questions = bank.questions_by(category, level);
        if questions.is_empty() {
            return Err(QuizError::NoQuestions { category, level });
        }
        info!(?category, ?level, count = questions.len(), "quiz started");
        Ok(Self {
            bank,
            session: QuizSession::new(questions, category, level),
            tracker,
            hint: None,
        })
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn tracker(&self) -> &AchievementTracker<S> {
        &self.tracker
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.session.current_question()
    }

    /// 現在の問題で消されている選択肢
    pub fn hidden_choices(&self) -> Option<[usize; 2]> {
        self.hint
    }

    pub fn used_hint(&self) -> bool {
        self.hint.is_some()
    }

    /// MARK:不正解の選択肢を2つ消す (1問につき1回)
    pub fn use_hint(&mut self) -> Result<[usize; 2], QuizError> {
        let state = self.session.state();
        if state != SessionState::InProgress {
            return Err(QuizError::SessionNotInProgress(state));
        }
        if self.hint.is_some() {
            return Err(QuizError::HintAlreadyUsed);
        }
        let question = self
            .session
            .current_question()
            .ok_or(QuizError::SessionNotInProgress(state))?;
        let eliminated = question.hint_eliminations(&mut rand::rng());
        debug!(id = question.id, ?eliminated, "hint used");
        self.hint = Some(eliminated);
        Ok(eliminated)
    }

    /// MARK:回答を記録して次の問題に進む
    pub fn answer(&mut self, choice: usize) -> Result<AnswerOutcome, QuizError> {
        if choice >= CHOICE_COUNT {
            return Err(QuizError::InvalidChoice(choice));
        }
        let state = self.session.state();
        if state != SessionState::InProgress {
            return Err(QuizError::SessionNotInProgress(state));
        }
        let question = self
            .session
            .current_question()
            .cloned()
            .ok_or(QuizError::SessionNotInProgress(state))?;

        let is_correct = question.is_correct(choice);
        // 保存に失敗したらセッションも変えない (同じ問題にもう一度回答できる)
        let mut unlocked =
            self.tracker
                .on_question_answered(is_correct, question.category, self.hint.is_some())?;
        self.session.record_answer(is_correct)?;
        self.session.advance();
        self.hint = None;

        let batch = if self.session.state() == SessionState::BatchComplete {
            let summary = self.session.batch_summary();
            // 回答自体は記録済みなので、ここでの保存失敗は回答を失敗扱いにしない
            match self.tracker.on_batch_completed(&summary) {
                Ok(Some(a)) => unlocked.push(a),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to save perfect set"),
            }
            info!(
                correct = summary.batch_correct,
                total_correct = summary.total_correct,
                total_answered = summary.total_answered,
                "set completed"
            );
            Some(summary)
        } else {
            None
        };

        Ok(AnswerOutcome {
            is_correct,
            correct_choice: question.correct_index,
            correct_text: question.correct_choice().to_string(),
            explanation: question.explanation,
            unlocked,
            batch,
        })
    }

    /// 次のセットへ進む
    pub fn next_batch(&mut self) {
        self.session.complete_batch();
    }

    /// MARK:最初からやり直す (問題は引き直す)
    pub fn restart(&mut self) {
        let questions = self
            .bank
            .questions_by(self.session.category(), self.session.level());
        self.session.reset_all();
        self.session.replace_questions(questions);
        self.hint = None;
        info!("quiz restarted");
    }
}
