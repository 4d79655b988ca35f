use serde::Serialize;

use crate::app::{AppContext, HarvestError, Result};
use crate::coordinator::Entity;
use crate::crawl;
use crate::domain::{Board, EntityKind, Member, Topic};
use crate::store::Store;

pub async fn resolve(ctx: &AppContext, kind: EntityKind, id: i64, refresh: bool) -> Result<()> {
    let mut coordinator = ctx.coordinator()?;

    let record = if refresh {
        match kind {
            EntityKind::Board => coordinator.refresh::<Board>(id).await?.into_record(),
            EntityKind::Member => coordinator.refresh::<Member>(id).await?.into_record(),
            EntityKind::Topic => coordinator.refresh::<Topic>(id).await?.into_record(),
        }
    } else {
        coordinator.resolve(kind, id).await?
    };

    print_json(&record)?;
    tracing::info!("Made {} requests", coordinator.requests_issued());
    Ok(())
}

pub fn list_topic_messages(ctx: &AppContext, topic: i64) -> Result<()> {
    let messages = ctx.store.get_topic_messages(topic)?;
    if messages.is_empty() {
        println!("No stored messages for topic {}", topic);
        return Ok(());
    }
    print_json(&messages)
}

pub async fn scrape_messages(ctx: &AppContext, topic: i64, page: u32) -> Result<()> {
    let mut coordinator = ctx.coordinator()?;
    let messages = coordinator.scrape_messages(topic, page).await?;
    print_json(&messages)
}

pub async fn crawl_topics(ctx: &AppContext, start: i64, end: i64) -> Result<()> {
    if start > end {
        return Err(HarvestError::Other(format!(
            "empty topic range: {} is after {}",
            start, end
        )));
    }

    let mut coordinator = ctx.coordinator()?;
    let summary = crawl::crawl_topics(&mut coordinator, start..=end).await?;

    println!(
        "Crawled {} topics and {} messages with {} requests ({} skipped)",
        summary.topics, summary.messages, summary.requests, summary.skipped
    );
    Ok(())
}

pub fn show(ctx: &AppContext, kind: EntityKind, id: i64) -> Result<()> {
    let record = ctx.store.read(kind, id)?;
    print_json(&record)
}

pub fn stats(ctx: &AppContext) -> Result<()> {
    for kind in EntityKind::ALL {
        println!("{:<10} {}", kind.table(), ctx.store.count(kind)?);
    }
    println!("{:<10} {}", "messages", ctx.store.count_messages()?);
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| HarvestError::Other(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
