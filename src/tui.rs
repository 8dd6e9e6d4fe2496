// ============================================
// src/tui.rs
// クイズ画面 (ratatui)
// ============================================

use std::io::{Result, stdout};
use std::time::Duration;

use crossterm::{
    ExecutableCommand,
    cursor::{Hide, Show},
    event::{self, Event, KeyCode},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};

use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};

use sciquiz::questions::CHOICE_COUNT;
use sciquiz::{AnswerOutcome, BatchSummary, Game, ProgressStore, QUESTIONS_PER_SET, SessionState};
use tracing::warn;

const CHOICE_LABELS: [&str; CHOICE_COUNT] = ["A", "B", "C", "D"];

// --------------------------------------------------
// データ構造
// --------------------------------------------------

/// 表示中の画面
enum Screen {
    /// 問題に回答中
    Question,
    /// 1問ごとの結果
    Answered(AnswerOutcome),
    /// セット (10問) の結果
    SetResult(BatchSummary),
    /// 問題がもうない
    Finished,
}

/// 画面全体の状態
struct AppState<'g, 'a, S: ProgressStore> {
    game: &'g mut Game<'a, S>,
    screen: Screen,
    /// 一時的なお知らせ (ヒント使用済みなど)
    notice: Option<String>,
    quit: bool,
}

impl<'g, 'a, S: ProgressStore> AppState<'g, 'a, S> {
    fn new(game: &'g mut Game<'a, S>) -> Self {
        let screen = match game.state() {
            SessionState::InProgress => Screen::Question,
            SessionState::BatchComplete => Screen::SetResult(game.session().batch_summary()),
            SessionState::Exhausted => Screen::Finished,
        };
        Self {
            game,
            screen,
            notice: None,
            quit: false,
        }
    }

    /// キー入力の処理
    fn handle_key(&mut self, code: KeyCode) {
        self.notice = None;
        match std::mem::replace(&mut self.screen, Screen::Finished) {
            Screen::Question => self.handle_question_key(code),
            Screen::Answered(outcome) => self.handle_answered_key(code, outcome),
            Screen::SetResult(summary) => self.handle_set_result_key(code, summary),
            Screen::Finished => {
                if matches!(code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q')) {
                    self.quit = true;
                }
            }
        }
    }

    fn handle_question_key(&mut self, code: KeyCode) {
        self.screen = Screen::Question;
        let choice = match code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.quit = true;
                return;
            }
            KeyCode::Char('h') => {
                if let Err(e) = self.game.use_hint() {
                    self.notice = Some(e.to_string());
                } else {
                    self.notice = Some("2つの不正解を消去しました".to_string());
                }
                return;
            }
            KeyCode::Char('r') => {
                self.game.restart();
                self.notice = Some("リセットしました".to_string());
                return;
            }
            KeyCode::Char(c @ '1'..='4') => c as usize - '1' as usize,
            KeyCode::Char(c @ 'a'..='d') => c as usize - 'a' as usize,
            _ => return,
        };

        if self
            .game
            .hidden_choices()
            .is_some_and(|hidden| hidden.contains(&choice))
        {
            self.notice = Some("その選択肢はヒントで消えています".to_string());
            return;
        }

        match self.game.answer(choice) {
            Ok(outcome) => self.screen = Screen::Answered(outcome),
            Err(e) => {
                warn!(error = %e, "answer rejected");
                self.notice = Some(e.to_string());
            }
        }
    }

    fn handle_answered_key(&mut self, code: KeyCode, outcome: AnswerOutcome) {
        match code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.screen = match (outcome.batch, self.game.state()) {
                    (Some(summary), _) => Screen::SetResult(summary),
                    (None, SessionState::InProgress) => Screen::Question,
                    (None, _) => Screen::Finished,
                };
            }
            KeyCode::Esc | KeyCode::Char('q') => self.quit = true,
            _ => self.screen = Screen::Answered(outcome),
        }
    }

    fn handle_set_result_key(&mut self, code: KeyCode, summary: BatchSummary) {
        match code {
            KeyCode::Enter | KeyCode::Char(' ') if summary.has_more => {
                self.game.next_batch();
                self.screen = Screen::Question;
            }
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => self.quit = true,
            _ => self.screen = Screen::SetResult(summary),
        }
    }
}

// --------------------------------------------------
// 実行ループ
// --------------------------------------------------

/// MARK:ターミナルを準備してクイズを実行する
pub fn run<S: ProgressStore>(game: &mut Game<'_, S>) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, game);
    restore_terminal()?;
    result
}

fn setup_terminal() -> Result<Terminal<impl Backend>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?; // 代替スクリーンを使用
    stdout().execute(Hide)?; // カーソルを非表示
    let backend = CrosstermBackend::new(stdout());
    Terminal::new(backend)
}

fn restore_terminal() -> Result<()> {
    stdout().execute(Show)?;
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

fn run_app<S: ProgressStore>(
    terminal: &mut Terminal<impl Backend>,
    game: &mut Game<'_, S>,
) -> Result<()> {
    let mut app_state = AppState::new(game);

    while !app_state.quit {
        terminal.draw(|f| ui(f, &app_state))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == event::KeyEventKind::Press {
                    app_state.handle_key(key.code);
                }
            }
        }
    }

    Ok(())
}

// --------------------------------------------------
// UI描画
// --------------------------------------------------

fn ui<S: ProgressStore>(f: &mut Frame, app_state: &AppState<'_, '_, S>) {
    let size = f.area();
    let block = Block::default()
        .borders(Borders::ALL)
        .title("サイエンスクイズ");
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] ステータスバー (カテゴリ, 正解数)
            Constraint::Length(1), // [1] セット進行ゲージ
            Constraint::Length(1), // [2] 空白
            Constraint::Min(1),    // [3] メイン
            Constraint::Length(1), // [4] お知らせ
            Constraint::Length(1), // [5] 操作説明
        ])
        .split(inner_area);

    render_status(f, app_state, chunks[0], chunks[1]);

    let help = match &app_state.screen {
        Screen::Question => {
            render_question(f, app_state, chunks[3]);
            "1-4/A-D: 回答  H: ヒント  R: リセット  Esc: 終了"
        }
        Screen::Answered(outcome) => {
            render_answered(f, outcome, chunks[3]);
            "Enter: 次へ  Esc: 終了"
        }
        Screen::SetResult(summary) => {
            render_set_result(f, summary, chunks[3]);
            if summary.has_more {
                "Enter: 次のセットへ  Esc: ホームに戻る"
            } else {
                "Enter/Esc: ホームに戻る"
            }
        }
        Screen::Finished => {
            render_finished(f, app_state, chunks[3]);
            "Enter/Esc: ホームに戻る"
        }
    };

    if let Some(notice) = &app_state.notice {
        f.render_widget(
            Paragraph::new(notice.as_str())
                .style(Style::default().fg(Color::Yellow))
                .centered(),
            chunks[4],
        );
    }
    f.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(Color::DarkGray))
            .centered(),
        chunks[5],
    );
}

fn render_status<S: ProgressStore>(
    f: &mut Frame,
    app_state: &AppState<'_, '_, S>,
    status_area: Rect,
    gauge_area: Rect,
) {
    let session = app_state.game.session();
    let category = session
        .category()
        .map(|c| format!("{} {}", c.label(), c.english_name()))
        .unwrap_or_else(|| "全カテゴリ".to_string());
    let level = session
        .level()
        .map(|l| format!("Lv.{l}"))
        .unwrap_or_else(|| "全レベル".to_string());
    let status = format!(
        "{category} / {level}   正解 {}/{}   連続 {}",
        session.total_correct(),
        session.total_answered(),
        app_state.game.tracker().current_streak()
    );
    f.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Cyan)),
        status_area,
    );

    let answered = session.batch_answered().min(QUESTIONS_PER_SET);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::NONE))
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
        .ratio(answered as f64 / QUESTIONS_PER_SET as f64)
        .label(format!("セット {answered}/{QUESTIONS_PER_SET}"));
    f.render_widget(gauge, gauge_area);
}

fn render_question<S: ProgressStore>(f: &mut Frame, app_state: &AppState<'_, '_, S>, area: Rect) {
    let Some(question) = app_state.game.current_question() else {
        return;
    };
    let hidden = app_state.game.hidden_choices().unwrap_or([usize::MAX; 2]);
    let number = app_state.game.session().batch_answered() + 1;

    let mut lines = vec![
        Line::from(format!("Q.{number:02}  [{} Lv.{}]", question.category, question.level))
            .style(Style::default().fg(Color::Gray)),
        Line::from(""),
        Line::from(question.text.as_str()).style(Style::default().fg(Color::White).bold()),
        Line::from(""),
    ];
    for (i, choice) in question.choices.iter().enumerate() {
        let text = format!("{}. {}", CHOICE_LABELS[i], choice);
        let style = if hidden.contains(&i) {
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(Span::styled(text, style)));
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn render_answered(f: &mut Frame, outcome: &AnswerOutcome, area: Rect) {
    let verdict = if outcome.is_correct {
        Line::from("正解!").style(Style::default().fg(Color::Green).bold())
    } else {
        Line::from("不正解...").style(Style::default().fg(Color::Red).bold())
    };

    let mut lines = vec![
        verdict,
        Line::from(""),
        Line::from(format!(
            "正解: {}. {}",
            CHOICE_LABELS[outcome.correct_choice], outcome.correct_text
        )),
        Line::from(""),
        Line::from(outcome.explanation.as_str()).style(Style::default().fg(Color::Gray)),
    ];
    if !outcome.unlocked.is_empty() {
        lines.push(Line::from(""));
    }
    for achievement in &outcome.unlocked {
        lines.push(
            Line::from(format!("{} 実績解除: {}", achievement.icon, achievement.title))
                .style(Style::default().fg(Color::Yellow)),
        );
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn render_set_result(f: &mut Frame, summary: &BatchSummary, area: Rect) {
    let grade = summary.grade();
    let color = match grade {
        sciquiz::SetGrade::Perfect => Color::Green,
        sciquiz::SetGrade::Great => Color::Cyan,
        sciquiz::SetGrade::Good => Color::Blue,
        sciquiz::SetGrade::TryAgain => Color::Red,
    };

    let lines = vec![
        Line::from(format!("{}/{}", summary.batch_correct, QUESTIONS_PER_SET))
            .style(Style::default().fg(color).bold()),
        Line::from(grade.message()).style(Style::default().fg(color)),
        Line::from(""),
        Line::from(format!(
            "累計: {} / {} 正解  (正答率: {}%)",
            summary.total_correct,
            summary.total_answered,
            summary.total_percentage()
        )),
    ];
    f.render_widget(Paragraph::new(lines).centered(), area);
}

fn render_finished<S: ProgressStore>(f: &mut Frame, app_state: &AppState<'_, '_, S>, area: Rect) {
    let session = app_state.game.session();
    let lines = vec![
        Line::from("問題がもうありません").style(Style::default().bold()),
        Line::from(""),
        Line::from(format!(
            "累計結果: {} / {} 正解",
            session.total_correct(),
            session.total_answered()
        )),
    ];
    f.render_widget(Paragraph::new(lines).centered(), area);
}
