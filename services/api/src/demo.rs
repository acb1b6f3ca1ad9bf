use crate::infra::{load_fixture, MemoryReviewService, ReviewStack};
use clap::Args;
use review_rewards::error::AppError;
use review_rewards::workflows::reviews::{
    AchievementView, PointKind, SeedUser, SubmissionOutcome, User, UserId,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// JSON seed fixture; defaults to the built-in catalog with three demo users.
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    /// Number of review rounds to script.
    #[arg(long, default_value_t = 5)]
    pub(crate) rounds: usize,
}

fn demo_users() -> Vec<SeedUser> {
    [("ana", "Ana Ruiz"), ("bo", "Bo Lindqvist"), ("cy", "Cy Okafor")]
        .into_iter()
        .map(|(id, name)| SeedUser {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{id}@defects.test"),
            username: id.to_string(),
            avatar: None,
            token: None,
        })
        .collect()
}

/// Each round every user reviews the next one in line.
fn review_pairs(users: &[UserId]) -> Vec<(UserId, UserId)> {
    if users.len() < 2 {
        return Vec::new();
    }
    users
        .iter()
        .enumerate()
        .map(|(index, reviewer)| {
            let reviewee = &users[(index + 1) % users.len()];
            (reviewer.clone(), reviewee.clone())
        })
        .collect()
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { seed, rounds } = args;

    let mut fixture = load_fixture(seed.as_deref())?;
    if fixture.users.is_empty() {
        fixture.users = demo_users();
    }

    let stack = ReviewStack::in_memory();
    let summary = stack.seed(&fixture)?;
    println!("Review rewards demo");
    println!(
        "- Seeded {} badges, {} achievements, {} users",
        summary.badges, summary.achievements, summary.users
    );

    let participants: Vec<UserId> = fixture
        .users
        .iter()
        .filter_map(|user| UserId::parse(&user.id))
        .collect();
    let pairs = review_pairs(&participants);
    if pairs.is_empty() {
        println!("  At least two users are needed to exchange reviews");
        return Ok(());
    }

    for round in 1..=rounds {
        println!("\nRound {round}");
        for (reviewer, reviewee) in &pairs {
            let text = format!("Round {round} review of {reviewee}'s defect reports");
            match stack
                .reviews
                .submit_review(reviewer, reviewee.as_str(), &text)
            {
                Ok(outcome) => render_submission(&stack, &outcome),
                Err(err) => println!("  Submission rejected: {}", err),
            }
        }
    }

    render_leaderboard(&stack.reviews);
    Ok(())
}

fn render_submission(stack: &ReviewStack, outcome: &SubmissionOutcome) {
    println!(
        "- {} -> {} ({})",
        outcome.reviewer.name, outcome.reviewee.name, outcome.review.id
    );
    let catalog = match stack.catalog.list_achievements() {
        Ok(catalog) => catalog,
        Err(err) => {
            println!("    Catalog unavailable: {}", err);
            return;
        }
    };
    render_unlocked(&catalog, &outcome.reviewer, PointKind::Sending);
    render_unlocked(&catalog, &outcome.reviewee, PointKind::Receiving);
}

/// Achievements whose threshold is the counter value this submission just reached.
fn render_unlocked(catalog: &[AchievementView], user: &User, kind: PointKind) {
    let counter = user.points(kind);
    for view in catalog.iter().filter(|view| {
        view.achievement.matches(kind, counter) && user.has_achievement(&view.achievement.id)
    }) {
        let badge = view
            .badge_detail
            .as_ref()
            .map(|badge| badge.name.as_str())
            .unwrap_or("no badge");
        println!(
            "    {} unlocked '{}' [{}] at {:.1} {} points",
            user.name,
            view.achievement.name,
            badge,
            counter,
            kind.label()
        );
    }
}

fn render_leaderboard(service: &MemoryReviewService) {
    println!("\nLeaderboard");
    match service.leaderboard() {
        Ok(entries) => {
            for (rank, entry) in entries.iter().enumerate() {
                println!("  {}. {} - {:.1} points", rank + 1, entry.name, entry.total_points);
            }
        }
        Err(err) => println!("  Leaderboard unavailable: {}", err),
    }
}
