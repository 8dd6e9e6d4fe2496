/*
 * src/questions.rs
 * 問題カタログの読み込みと検索
 */

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::QuizError;

/// バイナリに埋め込む標準カタログ
const BUNDLED_CATALOG: &str = include_str!("../data/questions.json");

/// 選択肢の数
pub const CHOICE_COUNT: usize = 4;
/// 難易度の範囲
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;

/// 問題のカテゴリ (JSON では日本語ラベルで表現される)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "宇宙")]
    Space,
    #[serde(rename = "物理")]
    Physics,
    #[serde(rename = "化学")]
    Chemistry,
    #[serde(rename = "生物")]
    Biology,
    #[serde(rename = "地学")]
    Earth,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Space,
        Category::Physics,
        Category::Chemistry,
        Category::Biology,
        Category::Earth,
    ];

    /// 画面表示用の日本語ラベル
    pub fn label(self) -> &'static str {
        match self {
            Self::Space => "宇宙",
            Self::Physics => "物理",
            Self::Chemistry => "化学",
            Self::Biology => "生物",
            Self::Earth => "地学",
        }
    }

    /// 英語の見出し (例: "PHYSICS")
    pub fn english_name(self) -> &'static str {
        match self {
            Self::Space => "SPACE",
            Self::Physics => "PHYSICS",
            Self::Chemistry => "CHEMISTRY",
            Self::Biology => "BIOLOGY",
            Self::Earth => "EARTH",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    /// 日本語ラベルと英語名 (大文字小文字は無視) のどちらも受け付ける
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s || c.english_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("不明なカテゴリです: {s}"))
    }
}

/// 1問分のデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    #[serde(rename = "question")]
    pub text: String,
    pub choices: [String; CHOICE_COUNT],
    #[serde(rename = "answerIndex")]
    pub correct_index: usize,
    pub level: u8,
    pub category: Category,
    pub explanation: String,
}

impl Question {
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_index
    }

    /// 正解の選択肢の文字列
    pub fn correct_choice(&self) -> &str {
        &self.choices[self.correct_index]
    }

    /// ヒントで消す不正解の選択肢を2つ選ぶ
    pub fn hint_eliminations<R: Rng + ?Sized>(&self, rng: &mut R) -> [usize; 2] {
        let wrong: Vec<usize> = (0..CHOICE_COUNT)
            .filter(|&i| i != self.correct_index)
            .collect();
        let picked: Vec<usize> = wrong.choose_multiple(rng, 2).copied().collect();
        [picked[0], picked[1]]
    }

    fn validate(&self) -> Result<(), QuizError> {
        if self.correct_index >= CHOICE_COUNT {
            return Err(QuizError::InvalidQuestion {
                id: self.id,
                reason: format!("answerIndex {} は 0..=3 の範囲外", self.correct_index),
            });
        }
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.level) {
            return Err(QuizError::InvalidQuestion {
                id: self.id,
                reason: format!("level {} は 1..=5 の範囲外", self.level),
            });
        }
        Ok(())
    }
}

/// questions.json のトップレベル
#[derive(Deserialize)]
struct CatalogFile {
    questions: Vec<Question>,
}

/// 読み込み済みの問題カタログ (起動後は変更しない)
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// 検証済みの問題リストからカタログを作る
    pub fn new(questions: Vec<Question>) -> Result<Self, QuizError> {
        let mut seen = HashSet::new();
        for q in &questions {
            q.validate()?;
            if !seen.insert(q.id) {
                return Err(QuizError::InvalidQuestion {
                    id: q.id,
                    reason: "id が重複しています".to_string(),
                });
            }
        }
        Ok(Self { questions })
    }

    pub fn from_json_str(json: &str) -> Result<Self, QuizError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.questions)
    }

    /// MARK:ファイルからカタログを読み込む
    pub fn load(path: &Path) -> Result<Self, QuizError> {
        let json = fs::read_to_string(path).map_err(|source| QuizError::CatalogUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let bank = Self::from_json_str(&json)?;
        info!(path = %path.display(), count = bank.total_count(), "loaded question catalog");
        Ok(bank)
    }

    /// MARK:バイナリに埋め込まれたカタログを読み込む
    pub fn bundled() -> Result<Self, QuizError> {
        let bank = Self::from_json_str(BUNDLED_CATALOG)?;
        info!(count = bank.total_count(), "loaded bundled question catalog");
        Ok(bank)
    }

    pub fn total_count(&self) -> usize {
        self.questions.len()
    }

    pub fn count_by(&self, category: Option<Category>, level: Option<u8>) -> usize {
        self.matching(category, level).count()
    }

    pub fn count_by_category(&self, category: Category) -> usize {
        self.count_by(Some(category), None)
    }

    pub fn count_by_level(&self, level: u8) -> usize {
        self.count_by(None, Some(level))
    }

    /// 条件に一致する問題をシャッフルして返す (呼ぶたびに並びが変わる)
    pub fn questions_by(&self, category: Option<Category>, level: Option<u8>) -> Vec<Question> {
        self.questions_by_with(&mut rand::rng(), category, level)
    }

    pub fn questions_by_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        category: Option<Category>,
        level: Option<u8>,
    ) -> Vec<Question> {
        let mut list: Vec<Question> = self.matching(category, level).cloned().collect();
        list.shuffle(rng);
        debug!(?category, ?level, count = list.len(), "shuffled questions");
        list
    }

    /// カタログに登場するカテゴリ (初出順、重複なし)
    pub fn categories(&self) -> Vec<Category> {
        let mut out = Vec::new();
        for q in &self.questions {
            if !out.contains(&q.category) {
                out.push(q.category);
            }
        }
        out
    }

    fn matching(
        &self,
        category: Option<Category>,
        level: Option<u8>,
    ) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(move |q| {
            category.is_none_or(|c| q.category == c) && level.is_none_or(|l| q.level == l)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    pub(crate) fn question(id: u32, category: Category, level: u8) -> Question {
        Question {
            id,
            text: format!("問題{id}"),
            choices: [
                "A".to_string(),
                "B".to_string(),
                "C".to_string(),
                "D".to_string(),
            ],
            correct_index: (id as usize) % CHOICE_COUNT,
            level,
            category,
            explanation: String::new(),
        }
    }

    fn sample_bank() -> QuestionBank {
        QuestionBank::new(vec![
            question(1, Category::Biology, 1),
            question(2, Category::Biology, 1),
            question(3, Category::Physics, 2),
            question(4, Category::Physics, 2),
            question(5, Category::Physics, 3),
            question(6, Category::Space, 2),
        ])
        .unwrap()
    }

    fn sorted_ids(list: &[Question]) -> Vec<u32> {
        let mut ids: Vec<u32> = list.iter().map(|q| q.id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn counts_follow_filters() {
        let bank = sample_bank();
        assert_eq!(bank.total_count(), 6);
        assert_eq!(bank.count_by(None, None), 6);
        assert_eq!(bank.count_by(Some(Category::Biology), Some(1)), 2);
        assert_eq!(bank.count_by_category(Category::Physics), 3);
        assert_eq!(bank.count_by_level(2), 3);
        assert_eq!(bank.count_by(Some(Category::Earth), None), 0);
    }

    #[test]
    fn filtered_questions_keep_the_same_ids() {
        let bank = sample_bank();
        for _ in 0..5 {
            let list = bank.questions_by(Some(Category::Physics), Some(2));
            assert!(list.iter().all(|q| q.category == Category::Physics && q.level == 2));
            assert_eq!(sorted_ids(&list), vec![3, 4]);
        }
    }

    #[test]
    fn biology_level_one_returns_both_questions() {
        let bank = sample_bank();
        let list = bank.questions_by(Some(Category::Biology), Some(1));
        assert_eq!(sorted_ids(&list), vec![1, 2]);
        assert_eq!(bank.count_by(Some(Category::Biology), Some(1)), 2);
    }

    #[test]
    fn seeded_shuffle_is_deterministic() {
        let bank = sample_bank();
        let a = bank.questions_by_with(&mut StdRng::seed_from_u64(7), None, None);
        let b = bank.questions_by_with(&mut StdRng::seed_from_u64(7), None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn categories_in_catalog_order() {
        let bank = sample_bank();
        assert_eq!(
            bank.categories(),
            vec![Category::Biology, Category::Physics, Category::Space]
        );
    }

    #[test]
    fn parses_japanese_catalog_keys() {
        let json = r#"{"questions": [{
            "id": 10, "question": "水の化学式は?",
            "choices": ["H2O", "CO2", "O2", "NaCl"],
            "answerIndex": 0, "level": 1, "category": "化学",
            "explanation": "水素2つと酸素1つ"
        }]}"#;
        let bank = QuestionBank::from_json_str(json).unwrap();
        assert_eq!(bank.count_by(Some(Category::Chemistry), Some(1)), 1);
        let q = &bank.questions_by(None, None)[0];
        assert_eq!(q.correct_choice(), "H2O");
    }

    #[test]
    fn rejects_out_of_range_answer_index() {
        let mut q = question(1, Category::Earth, 1);
        q.correct_index = 4;
        let err = QuestionBank::new(vec![q]).unwrap_err();
        assert!(matches!(err, QuizError::InvalidQuestion { id: 1, .. }));
    }

    #[test]
    fn rejects_out_of_range_level() {
        let err = QuestionBank::new(vec![question(2, Category::Earth, 6)]).unwrap_err();
        assert!(matches!(err, QuizError::InvalidQuestion { id: 2, .. }));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = QuestionBank::new(vec![
            question(3, Category::Earth, 1),
            question(3, Category::Space, 1),
        ])
        .unwrap_err();
        assert!(matches!(err, QuizError::InvalidQuestion { id: 3, .. }));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = QuestionBank::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, QuizError::CatalogMalformed(_)));
    }

    #[test]
    fn missing_file_is_unavailable_not_empty() {
        let err = QuestionBank::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, QuizError::CatalogUnavailable { .. }));
    }

    #[test]
    fn hint_never_removes_the_correct_choice() {
        let q = question(2, Category::Space, 1);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let [a, b] = q.hint_eliminations(&mut rng);
            assert_ne!(a, b);
            assert_ne!(a, q.correct_index);
            assert_ne!(b, q.correct_index);
        }
    }

    #[test]
    fn category_parses_both_names() {
        assert_eq!("物理".parse::<Category>(), Ok(Category::Physics));
        assert_eq!("earth".parse::<Category>(), Ok(Category::Earth));
        assert!("数学".parse::<Category>().is_err());
    }

    #[test]
    fn bundled_catalog_loads() {
        let bank = QuestionBank::bundled().unwrap();
        assert!(bank.total_count() > 0);
        assert_eq!(bank.categories().len(), Category::ALL.len());
    }
}
