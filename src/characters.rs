//! Companion character roster.
//!
//! The static tables behind the contacts screen and reply generation.
//! Each companion carries display metadata (name, accent color, icon,
//! bio) plus the persona text injected as the system prompt when that
//! companion answers a post. Routing is category-based: a post tagged
//! `cardio` gets the cardio specialist, untagged posts get the
//! all-rounder.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::feed::PostCategory;

/// A built-in companion character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionProfile {
    /// Stable lowercase identifier, recorded on every generated reply.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// One-line bio for the contacts screen.
    pub bio: &'static str,
    /// Accent color hex used for the avatar ring.
    pub accent_color: &'static str,
    /// Symbolic icon name resolved by the UI layer.
    pub icon: &'static str,
    /// System prompt establishing voice and ground rules.
    pub persona: &'static str,
    /// Post categories this companion claims.
    pub specialties: &'static [PostCategory],
}

/// Companion used when no specialist claims a post's category.
pub const DEFAULT_COMPANION_ID: &str = "nova";

/// All built-in companions, in contacts-screen order.
pub const COMPANIONS: &[CompanionProfile] = &[
    CompanionProfile {
        id: "max",
        name: "Max",
        bio: "Strength coach. Counts your plates so you don't have to.",
        accent_color: "#E8590C",
        icon: "dumbbell",
        persona: "You are Max, a veteran strength coach reacting to a member's post on a \
                  fitness feed. Reply in one or two punchy sentences. Celebrate concrete \
                  numbers and PRs, nudge toward progressive overload, and never shame \
                  anyone for a light session.",
        specialties: &[PostCategory::Strength],
    },
    CompanionProfile {
        id: "dash",
        name: "Dash",
        bio: "Distance runner. Believes every forecast says 'good running weather'.",
        accent_color: "#1971C2",
        icon: "bolt",
        persona: "You are Dash, an upbeat distance runner reacting to a member's post on a \
                  fitness feed. Reply in one or two energetic sentences. Call out pace, \
                  distance, or consistency when the post mentions them, and treat easy days \
                  as training, not slacking.",
        specialties: &[PostCategory::Cardio],
    },
    CompanionProfile {
        id: "ivy",
        name: "Ivy",
        bio: "Yoga teacher. Will absolutely notice if you skipped the cooldown.",
        accent_color: "#2F9E44",
        icon: "leaf",
        persona: "You are Ivy, a calm yoga and mobility teacher reacting to a member's post \
                  on a fitness feed. Reply in one or two grounded sentences. Praise rest and \
                  recovery as real training, and keep the tone warm rather than mystical.",
        specialties: &[PostCategory::Yoga, PostCategory::Recovery],
    },
    CompanionProfile {
        id: "sage",
        name: "Sage",
        bio: "Sports nutritionist. Pro-snack, anti-guilt.",
        accent_color: "#9C36B5",
        icon: "carrot",
        persona: "You are Sage, a practical sports nutritionist reacting to a member's post \
                  on a fitness feed. Reply in one or two friendly sentences. Applaud \
                  preparation and balanced choices, never moralize about food, and skip the \
                  calorie math unless the member brought it up.",
        specialties: &[PostCategory::Nutrition],
    },
    CompanionProfile {
        id: "nova",
        name: "Nova",
        bio: "Your hype crew of one. Shows up for every single post.",
        accent_color: "#C2255C",
        icon: "spark",
        persona: "You are Nova, an all-round hype companion reacting to a member's post on \
                  a fitness feed. Reply in one or two enthusiastic sentences. Make the \
                  member feel seen, reference what they actually wrote, and for milestones \
                  make it feel like the whole crew is cheering.",
        specialties: &[PostCategory::Milestone],
    },
];

static BY_ID: Lazy<HashMap<&'static str, &'static CompanionProfile>> =
    Lazy::new(|| COMPANIONS.iter().map(|profile| (profile.id, profile)).collect());

/// All built-in companions, in contacts-screen order.
pub fn roster() -> &'static [CompanionProfile] {
    COMPANIONS
}

/// Look up a companion by id, case-insensitively.
pub fn by_id(id: &str) -> Option<&'static CompanionProfile> {
    BY_ID.get(id.to_ascii_lowercase().as_str()).copied()
}

/// Pick the companion for a post's category.
///
/// The first roster entry claiming the category wins; uncategorized
/// posts and unclaimed categories fall back to the default companion.
/// Total by construction, so reply generation never lacks a voice.
pub fn companion_for(category: Option<PostCategory>) -> &'static CompanionProfile {
    category
        .and_then(|category| {
            COMPANIONS
                .iter()
                .find(|profile| profile.specialties.contains(&category))
        })
        .unwrap_or_else(default_companion)
}

fn default_companion() -> &'static CompanionProfile {
    BY_ID
        .get(DEFAULT_COMPANION_ID)
        .copied()
        .unwrap_or(&COMPANIONS[0])
}

/// Render the roster as an indented list for logs and debug screens.
pub fn format_roster() -> String {
    let mut out = String::from("Companions:\n");
    for profile in COMPANIONS {
        let default_marker = if profile.id == DEFAULT_COMPANION_ID {
            " (default)"
        } else {
            ""
        };
        out.push_str(&format!(
            "  {} — {}{}\n",
            profile.name, profile.bio, default_marker
        ));
    }
    out
}
