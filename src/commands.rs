//! CLI command implementations.
//!
//! Each command opens a [`QueryService`] over the configured index and
//! prints human-readable output to stdout.

use anyhow::Result;
use std::sync::Arc;

use odp_search_core::filter::FilterConfig;

use crate::config::Config;
use crate::server;
use crate::service::{QueryService, RebuildOutcome};

pub async fn run_rebuild(config: Config) -> Result<()> {
    let service = QueryService::open(config).await?;
    let outcome = service.rebuild().await;
    println!("{outcome}");
    if let RebuildOutcome::Failed(reason) = outcome {
        anyhow::bail!("rebuild failed: {reason}");
    }
    Ok(())
}

pub async fn run_search(
    mut config: Config,
    query: &str,
    category: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    if let Some(limit) = limit.filter(|l| *l > 0) {
        config.retrieval.final_limit = limit;
    }
    let service = QueryService::open(config).await?;
    let filter = FilterConfig {
        category,
        ..Default::default()
    };
    let results = service.search(query, &filter).await;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, r) in results.iter().enumerate() {
        println!("{}. [{:.3}] {}", i + 1, r.confidence, r.pattern.name);
        println!("    id: {}", r.pattern.id);
        if !r.pattern.categories.is_empty() {
            println!("    categories: {}", r.pattern.categories.join(", "));
        }
        if let Some(intent) = r.pattern.intent.as_deref() {
            println!("    intent: {}", first_line(intent));
        }
        println!();
    }
    Ok(())
}

pub async fn run_get(config: Config, id: &str) -> Result<()> {
    let service = QueryService::open(config).await?;
    let record = match service.get_pattern(id).await? {
        Some(r) => r,
        None => anyhow::bail!("pattern not found: {id}"),
    };

    println!("--- Pattern ---");
    println!("id:           {}", record.id);
    println!("name:         {}", record.name);
    println!("categories:   {}", record.categories.join(", "));
    if let Some(size) = &record.size {
        println!("size:         {size}");
    }
    if let Some(profile) = &record.profile {
        println!("profile:      {profile}");
    }
    if let Some(strategy) = &record.strategy {
        println!("strategy:     {strategy}");
    }
    if !record.mappings.is_empty() {
        println!("mappings:     {}", record.mappings.join(", "));
    }
    if let Some(image) = &record.image_ref {
        println!("image:        {image}");
    }
    println!();

    for (title, text) in [
        ("Intent", &record.intent),
        ("Solution", &record.description),
        ("Consequences", &record.consequences),
    ] {
        if let Some(text) = text {
            println!("--- {title} ---");
            println!("{text}");
            println!();
        }
    }

    if !record.competency_questions.is_empty() {
        println!("--- Competency questions ({}) ---", record.competency_questions.len());
        for cq in &record.competency_questions {
            println!("- {cq}");
        }
        println!();
    }
    if !record.scenarios.is_empty() {
        println!("--- Scenarios ({}) ---", record.scenarios.len());
        for s in &record.scenarios {
            println!("- {s}");
        }
    }
    Ok(())
}

pub async fn run_categories(config: Config) -> Result<()> {
    let service = QueryService::open(config).await?;
    for c in service.categories().await {
        println!("{c}");
    }
    Ok(())
}

pub async fn run_list(config: Config, category: &str) -> Result<()> {
    let service = QueryService::open(config).await?;
    let patterns = service.patterns_by_category(category).await?;
    if patterns.is_empty() {
        println!("No patterns in category {category}.");
        return Ok(());
    }
    for p in patterns {
        println!("{}\t{}", p.id, p.name);
    }
    Ok(())
}

pub async fn run_serve(config: Config) -> Result<()> {
    let bind = config.server.bind.clone();
    let service = Arc::new(QueryService::open(config).await?);
    server::run_server(service, &bind).await
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}
