//! Categorized change report

use std::collections::BTreeMap;
use std::fmt;

/// Fixed set of change categories, in digest order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    LevelsUnrated,
    VerifiedCoins,
    UnverifiedCoins,
    AddedSilverCoins,
    AddedBronzeCoins,
    RemovedSilverCoins,
    RemovedBronzeCoins,
    DifficultyChanged,
    RatingChanged,
    LevelsMoved,
    LevelNameChanged,
    LevelSongChanged,
    NewRatedLevels,
    CreatorNameChanged,
    CreatorAccountChanged,
    CreatorMilestones,
    SongInfoChanged,
    SongsFirstUsed,
}

impl Category {
    pub const ALL: [Category; 18] = [
        Category::LevelsUnrated,
        Category::VerifiedCoins,
        Category::UnverifiedCoins,
        Category::AddedSilverCoins,
        Category::AddedBronzeCoins,
        Category::RemovedSilverCoins,
        Category::RemovedBronzeCoins,
        Category::DifficultyChanged,
        Category::RatingChanged,
        Category::LevelsMoved,
        Category::LevelNameChanged,
        Category::LevelSongChanged,
        Category::NewRatedLevels,
        Category::CreatorNameChanged,
        Category::CreatorAccountChanged,
        Category::CreatorMilestones,
        Category::SongInfoChanged,
        Category::SongsFirstUsed,
    ];

    /// Caption used in digests
    pub fn label(self) -> &'static str {
        match self {
            Category::LevelsUnrated => "Levels unrated",
            Category::VerifiedCoins => "Verified coins",
            Category::UnverifiedCoins => "Unverified coins",
            Category::AddedSilverCoins => "Added silver coins",
            Category::AddedBronzeCoins => "Added bronze coins",
            Category::RemovedSilverCoins => "Removed silver coins",
            Category::RemovedBronzeCoins => "Removed bronze coins",
            Category::DifficultyChanged => "Difficulty changed",
            Category::RatingChanged => "Rating changed",
            Category::LevelsMoved => "Levels moved to another account",
            Category::LevelNameChanged => "Level name changed",
            Category::LevelSongChanged => "Level song changed",
            Category::NewRatedLevels => "New rated levels",
            Category::CreatorNameChanged => "Creator's name changed",
            Category::CreatorAccountChanged => "Creator's accountID changed",
            Category::CreatorMilestones => "Creator's milestones",
            Category::SongInfoChanged => "Song info changed",
            Category::SongsFirstUsed => "Songs used for the first time",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category → ordered lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    lines: BTreeMap<Category, Vec<String>>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: Category, line: impl Into<String>) {
        self.lines.entry(category).or_default().push(line.into());
    }

    pub fn extend<I>(&mut self, category: Category, lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        for line in lines {
            self.push(category, line);
        }
    }

    /// Append every line of `other`, keeping per-category order
    pub fn merge(&mut self, other: Report) {
        for (category, lines) in other.lines {
            self.extend(category, lines);
        }
    }

    pub fn get(&self, category: Category) -> &[String] {
        self.lines.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when every category is empty
    pub fn is_empty(&self) -> bool {
        self.lines.values().all(Vec::is_empty)
    }

    /// Number of lines across all categories
    pub fn len(&self) -> usize {
        self.lines.values().map(Vec::len).sum()
    }

    /// Non-empty categories in digest order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[String])> {
        self.lines
            .iter()
            .filter(|(_, lines)| !lines.is_empty())
            .map(|(category, lines)| (*category, lines.as_slice()))
    }

    /// Categories that hold at least one line
    pub fn populated(&self) -> Vec<Category> {
        self.iter().map(|(category, _)| category).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_follows_category_order() {
        let mut report = Report::new();
        report.push(Category::SongsFirstUsed, "501 - Track by Artist");
        report.push(Category::LevelsUnrated, "A by B (1)");
        report.push(Category::LevelsUnrated, "C by D (2)");

        assert_eq!(
            report.populated(),
            vec![Category::LevelsUnrated, Category::SongsFirstUsed]
        );
        assert_eq!(report.get(Category::LevelsUnrated), ["A by B (1)", "C by D (2)"]);
        assert_eq!(report.len(), 3);
    }

    #[test]
    fn test_merge_appends() {
        let mut a = Report::new();
        a.push(Category::RatingChanged, "first");
        let mut b = Report::new();
        b.push(Category::RatingChanged, "second");
        a.merge(b);
        assert_eq!(a.get(Category::RatingChanged), ["first", "second"]);
        assert!(Report::new().is_empty());
    }

    #[test]
    fn test_labels_are_distinct() {
        let mut labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Category::ALL.len());
    }
}
