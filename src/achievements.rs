// ============================================
// src/achievements.rs
// 実績の定義と解除判定
// ============================================

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::QuizError;
use crate::questions::Category;
use crate::save_data::{Progress, ProgressStore};
use crate::session::BatchSummary;

/// 連続正解で解除される実績 (しきい値, ID)
const STREAK_MILESTONES: [(u32, AchievementId); 3] = [
    (3, AchievementId::Streak3),
    (5, AchievementId::Streak5),
    (10, AchievementId::Streak10),
];

/// 累計回答数で解除される実績
const ANSWERED_MILESTONES: [(u32, AchievementId); 2] = [
    (100, AchievementId::Quiz100),
    (500, AchievementId::Quiz500),
];

/// ヒントなし連続正解の必要数
pub const NO_HINT_THRESHOLD: u32 = 10;
/// カテゴリマスターに必要な正解数
pub const CATEGORY_MASTER_THRESHOLD: u32 = 50;

/// 実績の識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstCorrect,
    #[serde(rename = "streak_3")]
    Streak3,
    #[serde(rename = "streak_5")]
    Streak5,
    #[serde(rename = "streak_10")]
    Streak10,
    PerfectSet,
    NoHint,
    SpaceMaster,
    PhysicsMaster,
    ChemistryMaster,
    BiologyMaster,
    EarthMaster,
    #[serde(rename = "quiz_100")]
    Quiz100,
    #[serde(rename = "quiz_500")]
    Quiz500,
}

impl AchievementId {
    /// 保存用の文字列ID
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstCorrect => "first_correct",
            Self::Streak3 => "streak_3",
            Self::Streak5 => "streak_5",
            Self::Streak10 => "streak_10",
            Self::PerfectSet => "perfect_set",
            Self::NoHint => "no_hint",
            Self::SpaceMaster => "space_master",
            Self::PhysicsMaster => "physics_master",
            Self::ChemistryMaster => "chemistry_master",
            Self::BiologyMaster => "biology_master",
            Self::EarthMaster => "earth_master",
            Self::Quiz100 => "quiz_100",
            Self::Quiz500 => "quiz_500",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ACHIEVEMENTS.iter().map(|a| a.id).find(|id| id.as_str() == s)
    }

    /// カテゴリに対応するマスター実績
    pub fn master_of(category: Category) -> Self {
        match category {
            Category::Space => Self::SpaceMaster,
            Category::Physics => Self::PhysicsMaster,
            Category::Chemistry => Self::ChemistryMaster,
            Category::Biology => Self::BiologyMaster,
            Category::Earth => Self::EarthMaster,
        }
    }
}

/// 実績カタログの1項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Achievement {
    pub id: AchievementId,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

impl Achievement {
    pub fn get(id: AchievementId) -> &'static Achievement {
        match ACHIEVEMENTS.iter().find(|a| a.id == id) {
            Some(a) => a,
            None => unreachable!("{} is missing from ACHIEVEMENTS", id.as_str()),
        }
    }
}

/// 全実績 (表示順)
pub static ACHIEVEMENTS: [Achievement; 13] = [
    Achievement {
        id: AchievementId::FirstCorrect,
        title: "初めての正解",
        description: "初めて問題に正解した",
        icon: "🌟",
    },
    Achievement {
        id: AchievementId::Streak3,
        title: "3連続正解",
        description: "3問連続で正解した",
        icon: "🔥",
    },
    Achievement {
        id: AchievementId::Streak5,
        title: "5連続正解",
        description: "5問連続で正解した",
        icon: "💫",
    },
    Achievement {
        id: AchievementId::Streak10,
        title: "10連続正解",
        description: "10問連続で正解した",
        icon: "🚀",
    },
    Achievement {
        id: AchievementId::PerfectSet,
        title: "パーフェクト",
        description: "1セット全問正解した",
        icon: "👑",
    },
    Achievement {
        id: AchievementId::NoHint,
        title: "自力で解決",
        description: "ヒントを使わずに10問正解",
        icon: "🧠",
    },
    Achievement {
        id: AchievementId::SpaceMaster,
        title: "宇宙マスター",
        description: "宇宙カテゴリで50問正解",
        icon: "🪐",
    },
    Achievement {
        id: AchievementId::PhysicsMaster,
        title: "物理マスター",
        description: "物理カテゴリで50問正解",
        icon: "⚛️",
    },
    Achievement {
        id: AchievementId::ChemistryMaster,
        title: "化学マスター",
        description: "化学カテゴリで50問正解",
        icon: "🧪",
    },
    Achievement {
        id: AchievementId::BiologyMaster,
        title: "生物マスター",
        description: "生物カテゴリで50問正解",
        icon: "🧬",
    },
    Achievement {
        id: AchievementId::EarthMaster,
        title: "地学マスター",
        description: "地学カテゴリで50問正解",
        icon: "🌍",
    },
    Achievement {
        id: AchievementId::Quiz100,
        title: "クイズ100問",
        description: "累計100問に回答した",
        icon: "📚",
    },
    Achievement {
        id: AchievementId::Quiz500,
        title: "クイズ500問",
        description: "累計500問に回答した",
        icon: "🏆",
    },
];

/// 回答ごとにカウンタを更新し、実績の解除を判定する
pub struct AchievementTracker<S: ProgressStore> {
    store: S,
    progress: Progress,
}

impl<S: ProgressStore> AchievementTracker<S> {
    /// ストアから現在の状態を読み込んで作る
    pub fn new(store: S) -> Self {
        let progress = store.load();
        debug!(
            total_answered = progress.total_answered,
            unlocked = progress.unlocked.len(),
            "loaded progress"
        );
        Self { store, progress }
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_streak(&self) -> u32 {
        self.progress.current_streak
    }

    pub fn total_answered(&self) -> u32 {
        self.progress.total_answered
    }

    pub fn is_unlocked(&self, id: AchievementId) -> bool {
        self.progress.is_unlocked(id)
    }

    /// 全実績と解除状態
    pub fn all_achievements(&self) -> Vec<(&'static Achievement, bool)> {
        ACHIEVEMENTS
            .iter()
            .map(|a| (a, self.is_unlocked(a.id)))
            .collect()
    }

    pub fn unlocked_achievements(&self) -> Vec<&'static Achievement> {
        ACHIEVEMENTS
            .iter()
            .filter(|a| self.is_unlocked(a.id))
            .collect()
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked_achievements().len()
    }

    /// MARK:1問回答するたびに呼ぶ。今回新しく解除された実績を返す
    pub fn on_question_answered(
        &mut self,
        is_correct: bool,
        category: Category,
        used_hint: bool,
    ) -> Result<Vec<&'static Achievement>, QuizError> {
        let mut newly_unlocked = Vec::new();
        // 保存に成功するまで self.progress は書き換えない
        let mut next = self.progress.clone();
        let p = &mut next;

        p.total_answered += 1;
        p.last_played = Some(Utc::now());

        if is_correct {
            p.current_streak += 1;
            p.best_streak = p.best_streak.max(p.current_streak);
            *p.correct_by_category.entry(category).or_insert(0) += 1;
            if used_hint {
                p.hint_free_streak = 0;
            } else {
                p.hint_free_streak += 1;
            }

            let category_correct = p.correct_in(category);
            let mut candidates = vec![AchievementId::FirstCorrect];
            candidates.extend(
                STREAK_MILESTONES
                    .iter()
                    .filter(|(threshold, _)| p.current_streak >= *threshold)
                    .map(|(_, id)| *id),
            );
            if p.hint_free_streak >= NO_HINT_THRESHOLD {
                candidates.push(AchievementId::NoHint);
            }
            if category_correct >= CATEGORY_MASTER_THRESHOLD {
                candidates.push(AchievementId::master_of(category));
            }
            for id in candidates {
                if let Some(a) = Self::unlock(p, id) {
                    newly_unlocked.push(a);
                }
            }
        } else {
            p.current_streak = 0;
            p.hint_free_streak = 0;
        }

        // 累計回答数は正誤に関係なく判定する
        for (threshold, id) in ANSWERED_MILESTONES {
            if p.total_answered >= threshold {
                if let Some(a) = Self::unlock(p, id) {
                    newly_unlocked.push(a);
                }
            }
        }

        debug!(
            is_correct,
            %category,
            used_hint,
            streak = p.current_streak,
            total = p.total_answered,
            "recorded answer"
        );
        self.store.save(&next)?;
        self.progress = next;
        Ok(newly_unlocked)
    }

    /// MARK:1セット全問正解したときに呼ぶ
    pub fn on_perfect_set(&mut self) -> Result<Option<&'static Achievement>, QuizError> {
        let mut next = self.progress.clone();
        let unlocked = Self::unlock(&mut next, AchievementId::PerfectSet);
        if unlocked.is_some() {
            self.store.save(&next)?;
            self.progress = next;
        }
        Ok(unlocked)
    }

    /// セット終了時の判定 (全問正解ならパーフェクト)
    pub fn on_batch_completed(
        &mut self,
        summary: &BatchSummary,
    ) -> Result<Option<&'static Achievement>, QuizError> {
        if summary.is_perfect() {
            self.on_perfect_set()
        } else {
            Ok(None)
        }
    }

    /// 未解除なら解除して返す (解除済みなら None)
    fn unlock(progress: &mut Progress, id: AchievementId) -> Option<&'static Achievement> {
        if !progress.unlocked.insert(id) {
            return None;
        }
        let achievement = Achievement::get(id);
        info!(id = id.as_str(), title = achievement.title, "achievement unlocked");
        Some(achievement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save_data::MemoryProgressStore;
    use crate::save_data::tests::FlakyStore;

    fn tracker() -> AchievementTracker<MemoryProgressStore> {
        AchievementTracker::new(MemoryProgressStore::new())
    }

    fn ids(list: &[&Achievement]) -> Vec<AchievementId> {
        list.iter().map(|a| a.id).collect()
    }

    #[test]
    fn every_id_resolves_to_its_catalog_entry() {
        for a in &ACHIEVEMENTS {
            assert_eq!(Achievement::get(a.id), a);
            assert_eq!(AchievementId::parse(a.id.as_str()), Some(a.id));
        }
        assert_eq!(AchievementId::parse("unknown"), None);
    }

    #[test]
    fn failed_save_leaves_progress_untouched() {
        let mut t = AchievementTracker::new(FlakyStore::failing(1));
        let err = t.on_question_answered(true, Category::Physics, false);
        assert!(matches!(err, Err(QuizError::Io(_))));
        assert_eq!(*t.progress(), Progress::default());

        let unlocked = t.on_question_answered(true, Category::Physics, false).unwrap();
        assert_eq!(ids(&unlocked), vec![AchievementId::FirstCorrect]);
        assert_eq!(t.total_answered(), 1);
        assert_eq!(t.current_streak(), 1);
        assert_eq!(t.store().load(), *t.progress());
    }

    #[test]
    fn failed_perfect_set_save_can_be_retried() {
        let mut t = AchievementTracker::new(FlakyStore::failing(1));
        assert!(t.on_perfect_set().is_err());
        assert!(!t.is_unlocked(AchievementId::PerfectSet));
        let retried = t.on_perfect_set().unwrap();
        assert_eq!(retried.map(|a| a.id), Some(AchievementId::PerfectSet));
    }

    #[test]
    fn serde_names_match_storage_ids() {
        for a in &ACHIEVEMENTS {
            let json = serde_json::to_string(&a.id).unwrap();
            assert_eq!(json, format!("\"{}\"", a.id.as_str()));
        }
    }

    #[test]
    fn first_correct_then_streak_three_exactly_once() {
        let mut t = tracker();
        let first = t.on_question_answered(true, Category::Space, false).unwrap();
        assert_eq!(ids(&first), vec![AchievementId::FirstCorrect]);

        let second = t.on_question_answered(true, Category::Space, false).unwrap();
        assert!(second.is_empty());

        let third = t.on_question_answered(true, Category::Space, false).unwrap();
        assert_eq!(ids(&third), vec![AchievementId::Streak3]);

        let fourth = t.on_question_answered(true, Category::Space, false).unwrap();
        assert!(!ids(&fourth).contains(&AchievementId::Streak3));
    }

    #[test]
    fn wrong_answer_resets_the_streak() {
        let mut t = tracker();
        for _ in 0..2 {
            t.on_question_answered(true, Category::Physics, false).unwrap();
        }
        let wrong = t.on_question_answered(false, Category::Physics, false).unwrap();
        assert!(wrong.is_empty());
        assert_eq!(t.current_streak(), 0);

        let a = t.on_question_answered(true, Category::Physics, false).unwrap();
        let b = t.on_question_answered(true, Category::Physics, false).unwrap();
        assert!(!ids(&a).contains(&AchievementId::Streak3));
        assert!(!ids(&b).contains(&AchievementId::Streak3));
        let c = t.on_question_answered(true, Category::Physics, false).unwrap();
        assert_eq!(ids(&c), vec![AchievementId::Streak3]);
    }

    #[test]
    fn quiz_100_on_the_hundredth_answer() {
        let mut t = tracker();
        for i in 1..100 {
            let unlocked = t.on_question_answered(false, Category::Earth, false).unwrap();
            assert!(
                !ids(&unlocked).contains(&AchievementId::Quiz100),
                "unlocked early at {i}"
            );
        }
        let hundredth = t.on_question_answered(false, Category::Earth, false).unwrap();
        assert_eq!(ids(&hundredth), vec![AchievementId::Quiz100]);
        assert_eq!(t.total_answered(), 100);
    }

    #[test]
    fn hint_breaks_the_no_hint_streak() {
        let mut t = tracker();
        for _ in 0..9 {
            t.on_question_answered(true, Category::Chemistry, false).unwrap();
        }
        t.on_question_answered(true, Category::Chemistry, true).unwrap();
        assert_eq!(t.progress().hint_free_streak, 0);
        assert!(!t.is_unlocked(AchievementId::NoHint));
        // ヒントありでも連続正解は続く
        assert_eq!(t.current_streak(), 10);
        assert!(t.is_unlocked(AchievementId::Streak10));

        for i in 1..=10 {
            let unlocked = t.on_question_answered(true, Category::Chemistry, false).unwrap();
            assert_eq!(ids(&unlocked).contains(&AchievementId::NoHint), i == 10);
        }
    }

    #[test]
    fn category_master_needs_fifty_in_that_category() {
        let mut progress = Progress::default();
        progress.correct_by_category.insert(Category::Biology, 49);
        progress.correct_by_category.insert(Category::Space, 49);
        progress.unlocked.insert(AchievementId::FirstCorrect);
        let mut t = AchievementTracker::new(MemoryProgressStore::with_progress(progress));

        let unlocked = t.on_question_answered(true, Category::Biology, true).unwrap();
        assert_eq!(ids(&unlocked), vec![AchievementId::BiologyMaster]);
        assert!(!t.is_unlocked(AchievementId::SpaceMaster));
        assert_eq!(t.progress().correct_in(Category::Biology), 50);
    }

    #[test]
    fn incorrect_answers_unlock_nothing_but_totals() {
        let mut t = tracker();
        let unlocked = t.on_question_answered(false, Category::Space, false).unwrap();
        assert!(unlocked.is_empty());
        assert_eq!(t.progress().correct_in(Category::Space), 0);
        assert!(!t.is_unlocked(AchievementId::FirstCorrect));
    }

    #[test]
    fn unlocks_never_revert() {
        let mut t = tracker();
        for _ in 0..5 {
            t.on_question_answered(true, Category::Earth, false).unwrap();
        }
        let before = t.progress().unlocked.clone();
        for i in 0..40 {
            t.on_question_answered(i % 3 == 0, Category::Earth, i % 2 == 0).unwrap();
            assert!(before.is_subset(&t.progress().unlocked));
        }
    }

    #[test]
    fn perfect_set_only_once() {
        let mut t = tracker();
        let first = t.on_perfect_set().unwrap();
        assert_eq!(first.map(|a| a.id), Some(AchievementId::PerfectSet));
        assert!(t.on_perfect_set().unwrap().is_none());
    }

    #[test]
    fn imperfect_batch_does_not_unlock() {
        let mut t = tracker();
        let summary = BatchSummary {
            batch_correct: 9,
            batch_answered: 10,
            total_correct: 9,
            total_answered: 10,
            has_more: true,
        };
        assert!(t.on_batch_completed(&summary).unwrap().is_none());
        assert!(!t.is_unlocked(AchievementId::PerfectSet));
    }

    #[test]
    fn every_answer_is_persisted() {
        let mut t = tracker();
        t.on_question_answered(true, Category::Space, false).unwrap();
        t.on_question_answered(false, Category::Space, false).unwrap();
        assert_eq!(t.store().save_count(), 2);
        assert_eq!(t.store().load(), *t.progress());
        assert_eq!(t.progress().best_streak, 1);
        assert!(t.progress().last_played.is_some());
    }

    #[test]
    fn listing_joins_catalog_with_progress() {
        let mut t = tracker();
        t.on_question_answered(true, Category::Space, false).unwrap();
        let all = t.all_achievements();
        assert_eq!(all.len(), 13);
        assert_eq!(all.iter().filter(|(_, unlocked)| *unlocked).count(), 1);
        assert_eq!(t.unlocked_count(), 1);
        assert_eq!(t.unlocked_achievements()[0].id, AchievementId::FirstCorrect);
    }
}
