//! Contribution scoring, ranking and badges
//!
//! Points are derived from per-user activity counters in four independent
//! categories. Nothing here is persisted: a leaderboard is recomputed from
//! the sources on every query.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardCategory {
    #[default]
    Overall,
    Papers,
    Reviews,
    Community,
    Helpdesk,
}

impl LeaderboardCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overall => "overall",
            Self::Papers => "papers",
            Self::Reviews => "reviews",
            Self::Community => "community",
            Self::Helpdesk => "helpdesk",
        }
    }
}

impl fmt::Display for LeaderboardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaderboardCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overall" => Ok(Self::Overall),
            "papers" => Ok(Self::Papers),
            "reviews" => Ok(Self::Reviews),
            "community" => Ok(Self::Community),
            "helpdesk" => Ok(Self::Helpdesk),
            other => Err(DomainError::validation(format!(
                "unknown leaderboard category: {other}"
            ))),
        }
    }
}

/// Point weights. Defaults match the portal's published scoring rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub paper_upload: i64,
    pub paper_download: i64,
    pub paper_helpful: i64,
    pub review: i64,
    pub review_helpful: i64,
    pub review_detailed_bonus: i64,
    /// Comment length (characters) above which a review earns the detail bonus
    pub review_detail_chars: i64,
    pub post: i64,
    pub post_like: i64,
    pub post_comment: i64,
    pub popular_post_bonus: i64,
    /// Likes at which a post counts as popular
    pub popular_post_likes: i64,
    pub ticket: i64,
    pub ticket_resolved: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            paper_upload: 50,
            paper_download: 2,
            paper_helpful: 10,
            review: 25,
            review_helpful: 5,
            review_detailed_bonus: 15,
            review_detail_chars: 200,
            post: 15,
            post_like: 3,
            post_comment: 5,
            popular_post_bonus: 20,
            popular_post_likes: 10,
            ticket: 10,
            ticket_resolved: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperStats {
    pub approved_uploads: i64,
    pub downloads: i64,
    pub helpful_marks: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub reviews: i64,
    pub helpful_marks: i64,
    /// Reviews whose comment is longer than the detail threshold
    pub detailed_reviews: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityStats {
    pub posts: i64,
    pub likes: i64,
    pub comments: i64,
    /// Posts at or above the popularity threshold
    pub popular_posts: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpdeskStats {
    pub tickets: i64,
    pub resolved_tickets: i64,
}

impl PaperStats {
    pub fn points(&self, w: &ScoringWeights) -> i64 {
        self.approved_uploads * w.paper_upload
            + self.downloads * w.paper_download
            + self.helpful_marks * w.paper_helpful
    }
}

impl ReviewStats {
    pub fn points(&self, w: &ScoringWeights) -> i64 {
        self.reviews * w.review
            + self.helpful_marks * w.review_helpful
            + self.detailed_reviews * w.review_detailed_bonus
    }
}

impl CommunityStats {
    pub fn points(&self, w: &ScoringWeights) -> i64 {
        self.posts * w.post
            + self.likes * w.post_like
            + self.comments * w.post_comment
            + self.popular_posts * w.popular_post_bonus
    }
}

impl HelpdeskStats {
    pub fn points(&self, w: &ScoringWeights) -> i64 {
        self.tickets * w.ticket + self.resolved_tickets * w.ticket_resolved
    }
}

/// Points per source category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub papers: i64,
    pub reviews: i64,
    pub community: i64,
    pub helpdesk: i64,
}

impl Breakdown {
    pub fn total(&self) -> i64 {
        self.papers + self.reviews + self.community + self.helpdesk
    }

    pub fn points_for(&self, category: LeaderboardCategory) -> i64 {
        match category {
            LeaderboardCategory::Overall => self.total(),
            LeaderboardCategory::Papers => self.papers,
            LeaderboardCategory::Reviews => self.reviews,
            LeaderboardCategory::Community => self.community,
            LeaderboardCategory::Helpdesk => self.helpdesk,
        }
    }

    pub fn set(&mut self, category: LeaderboardCategory, points: i64) {
        match category {
            LeaderboardCategory::Overall => {}
            LeaderboardCategory::Papers => self.papers = points,
            LeaderboardCategory::Reviews => self.reviews = points,
            LeaderboardCategory::Community => self.community = points,
            LeaderboardCategory::Helpdesk => self.helpdesk = points,
        }
    }
}

/// Serialized as `{"kind", "label", "color"}` so clients can render it as is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Badge {
    Champion,
    SecondPlace,
    ThirdPlace,
    Top10,
    Top25,
    Contributor,
}

/// `(highest rank included, badge)`, checked in order
const BADGE_TABLE: [(u32, Badge); 5] = [
    (1, Badge::Champion),
    (2, Badge::SecondPlace),
    (3, Badge::ThirdPlace),
    (10, Badge::Top10),
    (25, Badge::Top25),
];

impl Badge {
    /// Badge for a 1-based rank
    pub fn for_rank(rank: u32) -> Self {
        BADGE_TABLE
            .iter()
            .find(|(max_rank, _)| rank <= *max_rank)
            .map_or(Self::Contributor, |(_, badge)| *badge)
    }

    pub const ALL: [Badge; 6] = [
        Self::Champion,
        Self::SecondPlace,
        Self::ThirdPlace,
        Self::Top10,
        Self::Top25,
        Self::Contributor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Champion => "champion",
            Self::SecondPlace => "second_place",
            Self::ThirdPlace => "third_place",
            Self::Top10 => "top10",
            Self::Top25 => "top25",
            Self::Contributor => "contributor",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Champion => "Champion",
            Self::SecondPlace => "2nd Place",
            Self::ThirdPlace => "3rd Place",
            Self::Top10 => "Top 10",
            Self::Top25 => "Top 25",
            Self::Contributor => "Contributor",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Champion => "gold",
            Self::SecondPlace => "silver",
            Self::ThirdPlace => "bronze",
            Self::Top10 => "blue",
            Self::Top25 => "purple",
            Self::Contributor => "gray",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Badge {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown badge: {s}")))
    }
}

#[derive(Serialize, Deserialize)]
struct BadgeView<'a> {
    kind: Cow<'a, str>,
    #[serde(default)]
    label: Cow<'a, str>,
    #[serde(default)]
    color: Cow<'a, str>,
}

impl Serialize for Badge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BadgeView {
            kind: Cow::Borrowed(self.as_str()),
            label: Cow::Borrowed(self.label()),
            color: Cow::Borrowed(self.color()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Badge {
    /// Only `kind` is read back; label and color always follow from it
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let view = BadgeView::deserialize(deserializer)?;
        view.kind.parse().map_err(serde::de::Error::custom)
    }
}

/// A user's scored breakdown before ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredUser {
    pub user_id: Snowflake,
    pub breakdown: Breakdown,
    /// At least one category source failed and was counted as zero
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: Snowflake,
    pub breakdown: Breakdown,
    pub total_points: i64,
    /// Points in the requested category (equals `total_points` for overall)
    pub points: i64,
    pub rank: u32,
    pub badge: Badge,
    pub partial: bool,
}

/// Sort, rank and badge a scored population.
///
/// Order is points in `category` descending, then user id ascending, so
/// ranks are a strict total order. Users with no points in the category
/// are left out.
pub fn rank_users(
    mut users: Vec<ScoredUser>,
    category: LeaderboardCategory,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    users.retain(|u| u.breakdown.points_for(category) > 0);
    users.sort_by(|a, b| {
        b.breakdown
            .points_for(category)
            .cmp(&a.breakdown.points_for(category))
            .then(a.user_id.cmp(&b.user_id))
    });

    users
        .into_iter()
        .take(limit)
        .zip(1u32..)
        .map(|(user, rank)| LeaderboardEntry {
            user_id: user.user_id,
            total_points: user.breakdown.total(),
            points: user.breakdown.points_for(category),
            breakdown: user.breakdown,
            rank,
            badge: Badge::for_rank(rank),
            partial: user.partial,
        })
        .collect()
}
