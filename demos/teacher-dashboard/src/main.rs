//! Terminal teacher dashboard.
//!
//! ```text
//! AMEP_API_URL=http://localhost:8000/api \
//! AMEP_EMAIL=teacher@school.edu AMEP_PASSWORD=secret \
//! cargo run -p teacher-dashboard
//! ```
//!
//! Optional: `AMEP_TOKEN_FILE` (persist the session), `AMEP_REFRESH_SECS`
//! (dashboard interval), `AMEP_JSON=1` (print raw snapshots). Ctrl-C quits.

use std::time::Duration;

use amep::prelude::*;

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[tokio::main]
async fn main() -> Result<(), AmepError> {
    amep::init_tracing();

    let mut builder = AmepClient::builder();
    if let Some(url) = env("AMEP_API_URL") {
        builder = builder.base_url(&url);
    }
    if let Some(path) = env("AMEP_TOKEN_FILE") {
        builder = builder.token_file(path);
    }
    if let Some(secs) = env("AMEP_REFRESH_SECS").and_then(|s| s.parse().ok()) {
        builder = builder.dashboard_interval(Duration::from_secs(secs));
    }
    let client = builder.build().await?;

    if !client.session().is_authenticated() {
        if let (Some(email), Some(password)) = (env("AMEP_EMAIL"), env("AMEP_PASSWORD")) {
            match client.session().login(&email, &password).await {
                Ok(user) => tracing::info!(user = %user, "logged in"),
                Err(e) => tracing::warn!(error = %e, "login failed, continuing anonymously"),
            }
        }
    }
    match client.session().user() {
        Some(user) => println!("Signed in as {user}"),
        None => println!("Not signed in"),
    }

    let json = env("AMEP_JSON").is_some();
    let mut updates = client.dashboard().subscribe();
    render(&client.dashboard().current(), json);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                render(&snapshot, json);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.shutdown().await?;
    Ok(())
}

fn render(snapshot: &DashboardSnapshot, json: bool) {
    if json {
        match serde_json::to_string_pretty(snapshot) {
            Ok(text) => println!("{text}"),
            Err(e) => tracing::error!(error = %e, "could not serialize snapshot"),
        }
        return;
    }

    let m = snapshot.class_metrics;
    println!();
    println!("=== AMEP Analytics Hub (update #{}) ===", snapshot.sequence);
    println!(
        "Mastery {}% | Adoption {}% | Confidence {}% | Engagement {}%",
        m.mastery_rate, m.adoption_rate, m.confidence_score, m.engagement_index
    );

    println!("Concept mastery:");
    for concept in &snapshot.concept_mastery {
        let band = match concept.band() {
            MasteryBand::High => "high",
            MasteryBand::Moderate => "moderate",
            MasteryBand::Low => "LOW",
        };
        println!("  {:<10} {:>3}%  {band}", concept.topic, concept.mastery);
    }

    if let Some(delta) = snapshot.engagement_delta() {
        println!("Engagement trend: {delta:+} points");
    }

    let tally = snapshot.attention_tally();
    println!(
        "Attention: {} engaged, {} passive, {} at risk",
        tally.engaged, tally.passive, tally.at_risk
    );

    let i = &snapshot.intervention;
    println!(
        "Intervention on {}: {}% -> {}% ({:+})",
        i.topic, i.before, i.after, i.improvement
    );

    for alert in snapshot.alerts() {
        println!("! {alert}");
    }
    for rec in snapshot.recommendations() {
        println!("* {}: {}", rec.title, rec.detail);
    }
}
