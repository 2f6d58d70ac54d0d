//! Console front-end for the rules backend
//!
//! Fetches the full rule list and prints it with the dashboard's filter
//! and sort applied. Usage:
//!
//! ```text
//! rules-console [search-term] [sort-key]
//! ```
//!
//! Sort keys: name, action, created, modified (default).

use rules_console::rules::display;
use rules_console::{AppConfig, RuleFilter, RuleListController, RulesApiClient, SortKey};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let mut args = std::env::args().skip(1);
    let search = args.next().unwrap_or_default();
    let sort_key = match args.next() {
        Some(raw) => SortKey::from_str(&raw)?,
        None => SortKey::default(),
    };

    let client = RulesApiClient::with_timeout(config.api_base_url.as_str(), config.timeout)?;
    let mut controller = RuleListController::new(Arc::new(client));

    let total = controller.refresh().await?;
    controller.sort(sort_key);
    let visible = controller.set_filter(RuleFilter::with_search(search.as_str()));

    if search.trim().is_empty() {
        println!("{} rules (sorted by {})", total, sort_key.as_str());
    } else {
        println!(
            "{} of {} rules match '{}' (sorted by {})",
            visible,
            total,
            search.trim(),
            sort_key.as_str()
        );
    }
    println!();

    let now = chrono::Utc::now();
    for rule in controller.visible_rules() {
        let status = if rule.is_active { "active" } else { "inactive" };
        println!(
            "[{:<8}] {:<30} {:<8} modified {}",
            display::short_label(rule.action),
            rule.name,
            status,
            display::relative_date(rule.modified_date, now)
        );
        if !rule.description.is_empty() {
            println!("           {}", display::preview(&rule.description));
        }
        if !rule.query.is_empty() {
            println!("           query: {}", rule.query);
        }
        println!(
            "           max: {}  processed: {}",
            rule.max_results, rule.count_processed
        );
    }

    Ok(())
}
