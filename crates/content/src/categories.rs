//! The fixed set of user/organization-owned record categories and the
//! ordered plan for deleting them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user- or organization-owned record category.
///
/// One variant per table targeted by exports and the deletion cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Profile,
    BrandProfiles,
    Campaigns,
    CampaignAssets,
    ScheduledPosts,
    Scripts,
    VideoJobs,
    AnalyticsRecords,
    Leads,
    Notifications,
    SocialConnections,
    AssetLibrary,
    ActivityLog,
    ChatMessages,
    Experiments,
    UsageEvents,
}

impl Category {
    /// Stable table name, used as the key in export snapshots.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Profile => "profile",
            Category::BrandProfiles => "brand_profiles",
            Category::Campaigns => "campaigns",
            Category::CampaignAssets => "campaign_assets",
            Category::ScheduledPosts => "scheduled_posts",
            Category::Scripts => "scripts",
            Category::VideoJobs => "video_jobs",
            Category::AnalyticsRecords => "analytics_records",
            Category::Leads => "leads",
            Category::Notifications => "notifications",
            Category::SocialConnections => "social_connections",
            Category::AssetLibrary => "asset_library",
            Category::ActivityLog => "activity_log",
            Category::ChatMessages => "chat_messages",
            Category::Experiments => "experiments",
            Category::UsageEvents => "usage_events",
        }
    }

    /// All category variants.
    pub fn all() -> Vec<Category> {
        vec![
            Category::Profile,
            Category::BrandProfiles,
            Category::Campaigns,
            Category::CampaignAssets,
            Category::ScheduledPosts,
            Category::Scripts,
            Category::VideoJobs,
            Category::AnalyticsRecords,
            Category::Leads,
            Category::Notifications,
            Category::SocialConnections,
            Category::AssetLibrary,
            Category::ActivityLog,
            Category::ChatMessages,
            Category::Experiments,
            Category::UsageEvents,
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ordered deletion plan the cascade worker walks.
///
/// Deletion order is the reverse of the dependency order: tables that
/// reference another category are cleared before the category they point at,
/// with the profile last. Memberships and the organization record itself are
/// handled by the worker after the plan completes. The order is declared
/// data, not derived, so it can be audited and tested on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadePlan {
    pub version: u32,
    pub steps: Vec<Category>,
}

impl CascadePlan {
    /// The current plan.
    pub fn current() -> Self {
        Self {
            version: 1,
            steps: vec![
                Category::UsageEvents,
                Category::Notifications,
                Category::ChatMessages,
                Category::ActivityLog,
                Category::AnalyticsRecords,
                Category::Leads,
                Category::VideoJobs,
                Category::Scripts,
                Category::ScheduledPosts,
                Category::CampaignAssets,
                Category::AssetLibrary,
                Category::Experiments,
                Category::Campaigns,
                Category::SocialConnections,
                Category::BrandProfiles,
                Category::Profile,
            ],
        }
    }
}

impl Default for CascadePlan {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_covers_every_category_once() {
        let plan = CascadePlan::current();
        let all = Category::all();
        assert_eq!(plan.steps.len(), all.len());
        for category in all {
            assert_eq!(
                plan.steps.iter().filter(|c| **c == category).count(),
                1,
                "{category} must appear exactly once"
            );
        }
    }

    #[test]
    fn test_dependents_precede_their_referents() {
        let plan = CascadePlan::current();
        let pos = |c: Category| plan.steps.iter().position(|s| *s == c).unwrap();

        // Referencing tables clear before the tables they point at.
        assert!(pos(Category::CampaignAssets) < pos(Category::Campaigns));
        assert!(pos(Category::ScheduledPosts) < pos(Category::Campaigns));
        assert!(pos(Category::ScheduledPosts) < pos(Category::SocialConnections));
        assert!(pos(Category::VideoJobs) < pos(Category::Scripts));
        assert!(pos(Category::Campaigns) < pos(Category::BrandProfiles));

        // The root entity is last.
        assert_eq!(*plan.steps.last().unwrap(), Category::Profile);
    }

    #[test]
    fn test_table_names_are_snake_case() {
        for category in Category::all() {
            let name = category.as_str();
            assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
